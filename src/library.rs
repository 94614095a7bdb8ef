//! The library facade: one store, one configuration, one clock.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use serde_json::Value as JsonValue;

use crate::catalog;
use crate::circulation::{self, IssueRequest, ReturnReceipt};
use crate::clock::{SystemTimeSource, TimeSource};
use crate::config::LibraryConfig;
use crate::error::{LibraryError, LibraryResult};
use crate::local_db_model::{
    Book, BookDraft, BookId, BookPatch, CirculationRecord, IssueId, Member, MemberDraft, MemberId,
    MemberPatch,
};
use crate::local_db_state::AppDbState;
use crate::reports::{self, BorrowedItem, IssueView, OverdueView};
use crate::snapshot::{self, Snapshot};
use crate::storage::{InMemoryStore, KeyValueStore};

/// Library backed by LMDB on disk.
pub type LocalLibrary = Library<AppDbState>;

/// Catalog, circulation ledger and reports over a single [`KeyValueStore`].
///
/// Every operation reloads the collections it touches, so two `Library`
/// values over the same store see each other's writes.
///
/// ```rust
/// use offline_library_core::{Library, LibraryConfig};
/// use offline_library_core::local_db_model::BookDraft;
///
/// let mut library = Library::in_memory(LibraryConfig::default())?;
/// assert_eq!(library.list_books("")?.len(), 5);
///
/// let book = library.add_book(BookDraft::new("ACC100", "The Rust Programming Language", 2))?;
/// assert_eq!(book.id, 6);
/// assert_eq!(library.list_books("rust")?.len(), 1);
/// # Ok::<(), offline_library_core::LibraryError>(())
/// ```
pub struct Library<S: KeyValueStore> {
    store: S,
    config: LibraryConfig,
    clock: Box<dyn TimeSource>,
}

impl Library<AppDbState> {
    /// Opens the LMDB environment named by `config` and initializes missing data.
    pub fn open_local(config: LibraryConfig) -> LibraryResult<Self> {
        config.validate()?;
        let store = AppDbState::open(&config.db_path(), config.map_size)?;
        Self::open(store, config)
    }
}

impl Library<InMemoryStore> {
    pub fn in_memory(config: LibraryConfig) -> LibraryResult<Self> {
        Self::open(InMemoryStore::new(), config)
    }
}

impl<S: KeyValueStore> Library<S> {
    pub fn open(store: S, config: LibraryConfig) -> LibraryResult<Self> {
        Self::with_time_source(store, config, Box::new(SystemTimeSource))
    }

    pub fn with_time_source(
        mut store: S,
        config: LibraryConfig,
        clock: Box<dyn TimeSource>,
    ) -> LibraryResult<Self> {
        config.validate()?;
        snapshot::initialize(&mut store, config.seed_sample_data, clock.now())?;
        info!("Library '{}' opened", config.name);
        Ok(Self {
            store,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn set_time_source(&mut self, clock: Box<dyn TimeSource>) {
        self.clock = clock;
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // Books

    pub fn list_books(&self, search: &str) -> LibraryResult<Vec<Book>> {
        catalog::list(&self.store, search)
    }

    pub fn find_book(&self, id: BookId) -> LibraryResult<Option<Book>> {
        catalog::find(&self.store, id)
    }

    pub fn add_book(&mut self, draft: BookDraft) -> LibraryResult<Book> {
        catalog::add::<Book, _>(&mut self.store, draft, self.clock.now())
    }

    pub fn update_book(&mut self, id: BookId, patch: BookPatch) -> LibraryResult<Book> {
        catalog::update::<Book, _>(&mut self.store, id, patch, self.clock.now())
    }

    pub fn delete_book(&mut self, id: BookId) -> LibraryResult<Book> {
        catalog::delete::<Book, _>(&mut self.store, id)
    }

    // Members

    pub fn list_members(&self, search: &str) -> LibraryResult<Vec<Member>> {
        catalog::list(&self.store, search)
    }

    pub fn find_member(&self, id: MemberId) -> LibraryResult<Option<Member>> {
        catalog::find(&self.store, id)
    }

    pub fn add_member(&mut self, draft: MemberDraft) -> LibraryResult<Member> {
        catalog::add::<Member, _>(&mut self.store, draft, self.clock.now())
    }

    pub fn update_member(&mut self, id: MemberId, patch: MemberPatch) -> LibraryResult<Member> {
        catalog::update::<Member, _>(&mut self.store, id, patch, self.clock.now())
    }

    pub fn delete_member(&mut self, id: MemberId) -> LibraryResult<Member> {
        catalog::delete::<Member, _>(&mut self.store, id)
    }

    // Circulation

    pub fn issue_book(&mut self, request: &IssueRequest) -> LibraryResult<CirculationRecord> {
        circulation::issue(&mut self.store, request, &self.config, self.clock.now())
    }

    pub fn return_book(
        &mut self,
        issue_id: IssueId,
        return_date: NaiveDate,
    ) -> LibraryResult<ReturnReceipt> {
        circulation::return_book(
            &mut self.store,
            issue_id,
            return_date,
            &self.config,
            self.clock.now(),
        )
    }

    // Reports

    pub fn recent_issues(&self) -> LibraryResult<Vec<IssueView>> {
        reports::recent_issues(&self.store, &self.config)
    }

    pub fn overdue(&self) -> LibraryResult<Vec<OverdueView>> {
        reports::overdue(&self.store, self.today(), &self.config)
    }

    pub fn member_history(&self, member_id: MemberId) -> LibraryResult<Vec<IssueView>> {
        reports::member_history(&self.store, member_id)
    }

    pub fn borrowed_items(&self, member_id: MemberId) -> LibraryResult<Vec<BorrowedItem>> {
        reports::borrowed_items(&self.store, member_id, self.today(), &self.config)
    }

    pub fn available_books(&self) -> LibraryResult<Vec<Book>> {
        reports::available_books(&self.store)
    }

    // Snapshots

    pub fn export_snapshot(&self) -> LibraryResult<Snapshot> {
        snapshot::export(&self.store, self.clock.now())
    }

    pub fn export_file_name(&self) -> String {
        snapshot::export_file_name(self.clock.now())
    }

    /// Writes a pretty-printed snapshot to `path`.
    pub fn export_to_path(&self, path: &Path) -> LibraryResult<Snapshot> {
        let snapshot = self.export_snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json).map_err(crate::storage::StorageError::from)?;
        info!("Snapshot exported to {}", path.display());
        Ok(snapshot)
    }

    pub fn import_snapshot(&mut self, data: &JsonValue) -> LibraryResult<Snapshot> {
        snapshot::import(&mut self.store, data, self.clock.now())
    }

    pub fn import_from_path(&mut self, path: &Path) -> LibraryResult<Snapshot> {
        let text = fs::read_to_string(path).map_err(|e| {
            LibraryError::InvalidFormat(format!("Cannot read backup file {}: {e}", path.display()))
        })?;
        let data: JsonValue = serde_json::from_str(&text)
            .map_err(|e| LibraryError::InvalidFormat(format!("Error parsing backup file: {e}")))?;
        self.import_snapshot(&data)
    }

    /// Deletes all data and re-seeds according to the configuration.
    pub fn clear_data(&mut self) -> LibraryResult<()> {
        snapshot::clear(&mut self.store, self.config.seed_sample_data, self.clock.now())
    }
}
