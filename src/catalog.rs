//! Entity stores for books and members.
//!
//! Both collections share the same contract: list with a case-insensitive
//! search, add with a uniqueness check on a business key, update through an
//! explicit patch, and delete unless an outstanding circulation record still
//! points at the entity. [`CatalogEntity`] captures what differs between the
//! two, and the free functions in this module implement the shared contract
//! once.

use chrono::{DateTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LibraryError, LibraryResult};
use crate::ids::{next_id, IdKind};
use crate::local_db_model::{
    Book, BookDraft, BookPatch, CirculationRecord, Member, MemberDraft, MemberPatch,
};
use crate::storage::{
    load_collection, save_collection, KeyValueStore, BOOKS_KEY, CIRCULATION_KEY, MEMBERS_KEY,
};

/// A record type managed by an entity store.
pub trait CatalogEntity: Clone + Serialize + DeserializeOwned {
    type Draft;
    type Patch;

    /// Storage key of the collection.
    const COLLECTION: &'static str;
    const ID_KIND: IdKind;
    /// Display noun used in messages ("Book").
    const NOUN: &'static str;
    /// Display name of the uniqueness field ("Accession number").
    const KEY_LABEL: &'static str;

    fn id(&self) -> u64;
    fn unique_key(&self) -> &str;
    /// `needle` is already lowercased and non-empty.
    fn matches(&self, needle: &str) -> bool;

    fn validate_draft(draft: &Self::Draft) -> LibraryResult<()>;
    fn draft_key(draft: &Self::Draft) -> &str;
    fn from_draft(draft: Self::Draft, id: u64, now: DateTime<Utc>) -> Self;

    fn patch_key(patch: &Self::Patch) -> Option<&str>;
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> LibraryResult<()>;

    /// Whether `record` references the entity with `id`.
    fn referenced_by(record: &CirculationRecord, id: u64) -> bool;
}

impl CatalogEntity for Book {
    type Draft = BookDraft;
    type Patch = BookPatch;

    const COLLECTION: &'static str = BOOKS_KEY;
    const ID_KIND: IdKind = IdKind::Books;
    const NOUN: &'static str = "Book";
    const KEY_LABEL: &'static str = "Accession number";

    fn id(&self) -> u64 {
        self.id
    }

    fn unique_key(&self) -> &str {
        &self.accession_no
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.author, &self.accession_no, &self.isbn]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    fn validate_draft(draft: &BookDraft) -> LibraryResult<()> {
        draft.validate()
    }

    fn draft_key(draft: &BookDraft) -> &str {
        &draft.accession_no
    }

    fn from_draft(draft: BookDraft, id: u64, now: DateTime<Utc>) -> Self {
        draft.into_book(id, now)
    }

    fn patch_key(patch: &BookPatch) -> Option<&str> {
        patch.accession_no.as_deref()
    }

    fn apply_patch(&mut self, patch: BookPatch, now: DateTime<Utc>) -> LibraryResult<()> {
        patch.apply_to(self, now)
    }

    fn referenced_by(record: &CirculationRecord, id: u64) -> bool {
        record.book_id == id
    }
}

impl CatalogEntity for Member {
    type Draft = MemberDraft;
    type Patch = MemberPatch;

    const COLLECTION: &'static str = MEMBERS_KEY;
    const ID_KIND: IdKind = IdKind::Members;
    const NOUN: &'static str = "Member";
    const KEY_LABEL: &'static str = "Member code";

    fn id(&self) -> u64 {
        self.id
    }

    fn unique_key(&self) -> &str {
        &self.member_code
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.name, &self.member_code, &self.department]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }

    fn validate_draft(draft: &MemberDraft) -> LibraryResult<()> {
        draft.validate()
    }

    fn draft_key(draft: &MemberDraft) -> &str {
        &draft.member_code
    }

    fn from_draft(draft: MemberDraft, id: u64, now: DateTime<Utc>) -> Self {
        draft.into_member(id, now)
    }

    fn patch_key(patch: &MemberPatch) -> Option<&str> {
        patch.member_code.as_deref()
    }

    fn apply_patch(&mut self, patch: MemberPatch, now: DateTime<Utc>) -> LibraryResult<()> {
        patch.apply_to(self, now)
    }

    fn referenced_by(record: &CirculationRecord, id: u64) -> bool {
        record.member_id == id
    }
}

/// Records matching `search` in stored order. A blank term returns everything.
pub fn list<E, S>(store: &S, search: &str) -> LibraryResult<Vec<E>>
where
    E: CatalogEntity,
    S: KeyValueStore + ?Sized,
{
    let items: Vec<E> = load_collection(store, E::COLLECTION)?;
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(items);
    }
    Ok(items.into_iter().filter(|item| item.matches(&needle)).collect())
}

pub fn find<E, S>(store: &S, id: u64) -> LibraryResult<Option<E>>
where
    E: CatalogEntity,
    S: KeyValueStore + ?Sized,
{
    let items: Vec<E> = load_collection(store, E::COLLECTION)?;
    Ok(items.into_iter().find(|item| item.id() == id))
}

pub fn add<E, S>(store: &mut S, draft: E::Draft, now: DateTime<Utc>) -> LibraryResult<E>
where
    E: CatalogEntity,
    S: KeyValueStore + ?Sized,
{
    let mut items: Vec<E> = load_collection(store, E::COLLECTION)?;
    E::validate_draft(&draft)?;

    let key = E::draft_key(&draft);
    if items.iter().any(|item| item.unique_key() == key) {
        return Err(duplicate::<E>());
    }

    let id = next_id(store, E::ID_KIND)?;
    let entity = E::from_draft(draft, id, now);
    items.push(entity.clone());
    save_collection(store, E::COLLECTION, &items)?;

    info!("{} {} added ({})", E::NOUN, id, entity.unique_key());
    Ok(entity)
}

pub fn update<E, S>(store: &mut S, id: u64, patch: E::Patch, now: DateTime<Utc>) -> LibraryResult<E>
where
    E: CatalogEntity,
    S: KeyValueStore + ?Sized,
{
    let mut items: Vec<E> = load_collection(store, E::COLLECTION)?;
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| not_found::<E>(id))?;

    if let Some(key) = E::patch_key(&patch) {
        if items.iter().any(|item| item.id() != id && item.unique_key() == key) {
            return Err(duplicate::<E>());
        }
    }

    items[index].apply_patch(patch, now)?;
    let updated = items[index].clone();
    save_collection(store, E::COLLECTION, &items)?;

    info!("{} {} updated", E::NOUN, id);
    Ok(updated)
}

/// Removes the entity unless an outstanding circulation record references it.
pub fn delete<E, S>(store: &mut S, id: u64) -> LibraryResult<E>
where
    E: CatalogEntity,
    S: KeyValueStore + ?Sized,
{
    let circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    if circulation
        .iter()
        .any(|record| record.is_outstanding() && E::referenced_by(record, id))
    {
        return Err(LibraryError::HasActiveReferences(format!(
            "Cannot delete {} with active issues",
            E::NOUN.to_lowercase()
        )));
    }

    let mut items: Vec<E> = load_collection(store, E::COLLECTION)?;
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| not_found::<E>(id))?;
    let removed = items.remove(index);
    save_collection(store, E::COLLECTION, &items)?;

    info!("{} {} deleted", E::NOUN, id);
    Ok(removed)
}

fn duplicate<E: CatalogEntity>() -> LibraryError {
    LibraryError::DuplicateKey(format!("{} already exists", E::KEY_LABEL))
}

fn not_found<E: CatalogEntity>(id: u64) -> LibraryError {
    LibraryError::NotFound(format!("{} not found: {}", E::NOUN, id))
}
