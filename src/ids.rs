//! Monotonic identifier allocation, one counter per entity kind.

use serde::{Deserialize, Serialize};

use crate::error::LibraryResult;
use crate::local_db_model::{Book, CirculationRecord, Member};
use crate::storage::{
    load_collection, load_record, save_record, KeyValueStore, BOOKS_KEY, CIRCULATION_KEY,
    MEMBERS_KEY, NEXT_IDS_KEY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Books,
    Members,
    Circulation,
}

/// The persisted counters record: the next id to hand out per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextIds {
    pub books: u64,
    pub members: u64,
    pub circulation: u64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self {
            books: 1,
            members: 1,
            circulation: 1,
        }
    }
}

impl NextIds {
    /// Counters that continue after the highest id present in each collection.
    pub fn after(books: &[Book], members: &[Member], circulation: &[CirculationRecord]) -> Self {
        Self {
            books: books.iter().map(|b| b.id).max().map_or(1, |id| id + 1),
            members: members.iter().map(|m| m.id).max().map_or(1, |id| id + 1),
            circulation: circulation.iter().map(|c| c.id).max().map_or(1, |id| id + 1),
        }
    }

    /// Field-wise maximum, so no counter falls behind either input.
    pub fn max(self, other: NextIds) -> Self {
        Self {
            books: self.books.max(other.books),
            members: self.members.max(other.members),
            circulation: self.circulation.max(other.circulation),
        }
    }

    fn slot(&mut self, kind: IdKind) -> &mut u64 {
        match kind {
            IdKind::Books => &mut self.books,
            IdKind::Members => &mut self.members,
            IdKind::Circulation => &mut self.circulation,
        }
    }
}

/// Reads the counters record, rebuilding it from the stored collections when absent.
pub fn load_next_ids<S: KeyValueStore + ?Sized>(store: &S) -> LibraryResult<NextIds> {
    if let Some(ids) = load_record(store, NEXT_IDS_KEY)? {
        return Ok(ids);
    }
    let books: Vec<Book> = load_collection(store, BOOKS_KEY)?;
    let members: Vec<Member> = load_collection(store, MEMBERS_KEY)?;
    let circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    Ok(NextIds::after(&books, &members, &circulation))
}

/// Returns the current counter for `kind` and persists the incremented record.
pub fn next_id<S: KeyValueStore + ?Sized>(store: &mut S, kind: IdKind) -> LibraryResult<u64> {
    let mut ids = load_next_ids(store)?;
    let slot = ids.slot(kind);
    let id = *slot;
    *slot += 1;
    save_record(store, NEXT_IDS_KEY, &ids)?;
    Ok(id)
}
