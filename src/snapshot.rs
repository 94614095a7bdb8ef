//! Whole-state snapshots: initialization, export, import and reset.
//!
//! The four persisted records travel together. Export reads all of them,
//! import validates a snapshot and then overwrites all of them, and clear
//! deletes them and seeds them again.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{LibraryError, LibraryResult};
use crate::ids::{load_next_ids, NextIds};
use crate::local_db_model::{Book, CirculationRecord, Member, MemberRole};
use crate::storage::{
    load_collection, save_collection, save_record, KeyValueStore, ALL_KEYS, BOOKS_KEY,
    CIRCULATION_KEY, MEMBERS_KEY, NEXT_IDS_KEY,
};

/// The full persisted state plus the moment it was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub books: Vec<Book>,
    pub members: Vec<Member>,
    pub circulation: Vec<CirculationRecord>,
    pub next_ids: NextIds,
    pub export_date: DateTime<Utc>,
}

/// Writes whichever of the four records is missing.
///
/// With `seed_sample_data` the catalog starts with the built-in sample books
/// and members. Otherwise it starts empty.
pub fn initialize<S: KeyValueStore + ?Sized>(
    store: &mut S,
    seed_sample_data: bool,
    now: DateTime<Utc>,
) -> LibraryResult<()> {
    if !store.contains(BOOKS_KEY)? {
        let books = if seed_sample_data { sample_books(now) } else { Vec::new() };
        save_collection(store, BOOKS_KEY, &books)?;
        info!("Initialized books collection with {} records", books.len());
    }
    if !store.contains(MEMBERS_KEY)? {
        let members = if seed_sample_data { sample_members(now) } else { Vec::new() };
        save_collection(store, MEMBERS_KEY, &members)?;
        info!("Initialized members collection with {} records", members.len());
    }
    if !store.contains(CIRCULATION_KEY)? {
        save_collection::<CirculationRecord, _>(store, CIRCULATION_KEY, &[])?;
    }
    if !store.contains(NEXT_IDS_KEY)? {
        let ids = load_next_ids(store)?;
        save_record(store, NEXT_IDS_KEY, &ids)?;
    }
    Ok(())
}

pub fn export<S: KeyValueStore + ?Sized>(store: &S, now: DateTime<Utc>) -> LibraryResult<Snapshot> {
    Ok(Snapshot {
        books: load_collection(store, BOOKS_KEY)?,
        members: load_collection(store, MEMBERS_KEY)?,
        circulation: load_collection(store, CIRCULATION_KEY)?,
        next_ids: load_next_ids(store)?,
        export_date: now,
    })
}

/// Suggested file name for an export taken at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("lms_backup_{}.json", now.format("%Y-%m-%d"))
}

/// Validates `data` as a snapshot and replaces the whole state with it.
///
/// `books`, `members` and `circulation` must be present. A missing
/// `next_ids` is rebuilt from the imported records, and a present one is
/// raised past the highest imported id of each kind. Nothing is written
/// unless the whole snapshot parses.
pub fn import<S: KeyValueStore + ?Sized>(
    store: &mut S,
    data: &JsonValue,
    now: DateTime<Utc>,
) -> LibraryResult<Snapshot> {
    let object = data
        .as_object()
        .ok_or_else(|| invalid("Invalid backup file format"))?;
    for name in ["books", "members", "circulation"] {
        if object.get(name).map_or(true, JsonValue::is_null) {
            return Err(invalid("Invalid backup file format"));
        }
    }

    let books: Vec<Book> = field(object, "books")?;
    let members: Vec<Member> = field(object, "members")?;
    let circulation: Vec<CirculationRecord> = field(object, "circulation")?;
    let floor = NextIds::after(&books, &members, &circulation);
    let next_ids = match object.get("next_ids") {
        Some(value) if !value.is_null() => {
            let imported: NextIds = serde_json::from_value(value.clone())
                .map_err(|e| invalid(&format!("Invalid next_ids: {e}")))?;
            let raised = imported.max(floor);
            if raised != imported {
                warn!("Imported next_ids {:?} behind imported records, using {:?}", imported, raised);
            }
            raised
        }
        _ => floor,
    };
    let export_date = match object.get("export_date") {
        Some(value) if !value.is_null() => serde_json::from_value(value.clone())
            .map_err(|e| invalid(&format!("Invalid export_date: {e}")))?,
        _ => now,
    };

    save_collection(store, BOOKS_KEY, &books)?;
    save_collection(store, MEMBERS_KEY, &members)?;
    save_collection(store, CIRCULATION_KEY, &circulation)?;
    save_record(store, NEXT_IDS_KEY, &next_ids)?;

    info!(
        "Imported snapshot: {} books, {} members, {} circulation records",
        books.len(),
        members.len(),
        circulation.len()
    );
    Ok(Snapshot {
        books,
        members,
        circulation,
        next_ids,
        export_date,
    })
}

/// Deletes the four records and initializes them again.
pub fn clear<S: KeyValueStore + ?Sized>(
    store: &mut S,
    seed_sample_data: bool,
    now: DateTime<Utc>,
) -> LibraryResult<()> {
    for key in ALL_KEYS {
        store.delete(key)?;
    }
    info!("All library data cleared");
    initialize(store, seed_sample_data, now)
}

fn field<T: serde::de::DeserializeOwned>(
    object: &serde_json::Map<String, JsonValue>,
    name: &str,
) -> LibraryResult<T> {
    let value = object.get(name).cloned().unwrap_or(JsonValue::Null);
    serde_json::from_value(value).map_err(|e| invalid(&format!("Invalid {name}: {e}")))
}

fn invalid(message: &str) -> LibraryError {
    LibraryError::InvalidFormat(message.to_string())
}

/// The built-in sample catalog.
pub fn sample_books(now: DateTime<Utc>) -> Vec<Book> {
    let rows: [(&str, &str, &str, &str, &str, i32, u32, &str); 5] = [
        ("ACC001", "978-0134685991", "Effective Java", "Joshua Bloch", "Addison-Wesley", 2017, 3, "Programming"),
        ("ACC002", "978-0132350884", "Clean Code", "Robert C. Martin", "Prentice Hall", 2008, 2, "Software Engineering"),
        ("ACC003", "978-0596007126", "Head First Design Patterns", "Eric Freeman", "O'Reilly Media", 2004, 2, "Design Patterns"),
        ("ACC004", "978-0596517748", "JavaScript: The Good Parts", "Douglas Crockford", "O'Reilly Media", 2008, 1, "Web Development"),
        ("ACC005", "978-1491950357", "Learning React", "Alex Banks", "O'Reilly Media", 2020, 2, "Web Development"),
    ];
    rows.iter()
        .zip(1u64..)
        .map(|(&(accession_no, isbn, title, author, publisher, year, qty, subject), id)| Book {
            id,
            accession_no: accession_no.to_string(),
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            publisher: publisher.to_string(),
            year: Some(year),
            total_qty: qty,
            available_qty: qty,
            subject: subject.to_string(),
            created_at: Some(now),
            updated_at: Some(now),
        })
        .collect()
}

/// The built-in sample members.
pub fn sample_members(now: DateTime<Utc>) -> Vec<Member> {
    let rows: [(&str, &str, &str, &str, &str, MemberRole); 5] = [
        ("MEM001", "John Smith", "Computer Science", "john.smith@university.edu", "555-0101", MemberRole::Student),
        ("MEM002", "Sarah Johnson", "Mathematics", "sarah.johnson@university.edu", "555-0102", MemberRole::Student),
        ("MEM003", "Mike Wilson", "Physics", "mike.wilson@university.edu", "555-0103", MemberRole::Faculty),
        ("MEM004", "Emily Davis", "Computer Science", "emily.davis@university.edu", "555-0104", MemberRole::Student),
        ("MEM005", "David Brown", "Engineering", "david.brown@university.edu", "555-0105", MemberRole::Faculty),
    ];
    rows.iter()
        .zip(1u64..)
        .map(|(&(member_code, name, department, email, phone, role), id)| Member {
            id,
            member_code: member_code.to_string(),
            name: name.to_string(),
            department: department.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            role,
            created_at: Some(now),
            updated_at: Some(now),
        })
        .collect()
}
