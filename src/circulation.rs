//! Circulation ledger: issuing and returning copies, and overdue fines.
//!
//! A record is created `Issued` with no fine. It is mutated exactly once, on
//! return, into `Returned`. Records are never deleted, so the collection is
//! also the borrowing history. Each issue takes one copy out of the book's
//! `available_qty` and each return puts it back.

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::LibraryConfig;
use crate::error::{LibraryError, LibraryResult};
use crate::ids::{next_id, IdKind};
use crate::local_db_model::{
    Book, BookId, CirculationRecord, CirculationStatus, IssueId, Member, MemberId,
};
use crate::storage::{
    load_collection, save_collection, KeyValueStore, BOOKS_KEY, CIRCULATION_KEY, MEMBERS_KEY,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Outcome of a successful return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub record: CirculationRecord,
    pub overdue_days: i64,
    pub fine: f64,
}

/// Whole calendar days `on` lies past `due`, never negative.
pub fn overdue_days(due: NaiveDate, on: NaiveDate) -> i64 {
    (on - due).num_days().max(0)
}

pub fn fine_for(days: i64, fine_per_day: f64) -> f64 {
    days as f64 * fine_per_day
}

/// Records a new issue and takes one copy out of circulation.
pub fn issue<S: KeyValueStore + ?Sized>(
    store: &mut S,
    request: &IssueRequest,
    config: &LibraryConfig,
    now: DateTime<Utc>,
) -> LibraryResult<CirculationRecord> {
    let mut books: Vec<Book> = load_collection(store, BOOKS_KEY)?;
    let mut circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;

    let book = books
        .iter_mut()
        .find(|b| b.id == request.book_id)
        .ok_or_else(|| LibraryError::NotFound(format!("Book not found: {}", request.book_id)))?;

    if book.available_qty == 0 {
        return Err(LibraryError::Unavailable(format!(
            "Book is not available: {}",
            book.title
        )));
    }

    let members: Vec<Member> = load_collection(store, MEMBERS_KEY)?;
    if !members.iter().any(|m| m.id == request.member_id) {
        if config.require_known_member {
            return Err(LibraryError::NotFound(format!(
                "Member not found: {}",
                request.member_id
            )));
        }
        warn!(
            "Issuing book {} to unknown member {}",
            request.book_id, request.member_id
        );
    }

    if request.due_date < request.issue_date {
        return Err(LibraryError::Validation(
            "Due date cannot be before issue date".to_string(),
        ));
    }

    let id = next_id(store, IdKind::Circulation)?;
    let record = CirculationRecord {
        id,
        book_id: request.book_id,
        member_id: request.member_id,
        issue_date: request.issue_date,
        due_date: request.due_date,
        return_date: None,
        status: CirculationStatus::Issued,
        fine_amount: 0.0,
        created_at: now,
        updated_at: now,
    };
    circulation.push(record.clone());

    book.available_qty -= 1;
    book.updated_at = Some(now);

    save_collection(store, CIRCULATION_KEY, &circulation)?;
    save_collection(store, BOOKS_KEY, &books)?;

    info!(
        "Issue {} created: book {} to member {}, due {}",
        id, record.book_id, record.member_id, record.due_date
    );
    Ok(record)
}

/// Closes an outstanding issue, computes its fine and restores the copy.
pub fn return_book<S: KeyValueStore + ?Sized>(
    store: &mut S,
    issue_id: IssueId,
    return_date: NaiveDate,
    config: &LibraryConfig,
    now: DateTime<Utc>,
) -> LibraryResult<ReturnReceipt> {
    let mut circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    let mut books: Vec<Book> = load_collection(store, BOOKS_KEY)?;

    let record = circulation
        .iter_mut()
        .find(|r| r.id == issue_id && r.is_outstanding())
        .ok_or_else(|| {
            LibraryError::NotFound(format!("Issue not found or already returned: {issue_id}"))
        })?;

    let days = overdue_days(record.due_date, return_date);
    let fine = fine_for(days, config.fine_per_day);

    record.return_date = Some(return_date);
    record.status = CirculationStatus::Returned;
    record.fine_amount = fine;
    record.updated_at = now;
    let record = record.clone();

    match books.iter_mut().find(|b| b.id == record.book_id) {
        Some(book) => {
            book.available_qty = (book.available_qty + 1).min(book.total_qty);
            book.updated_at = Some(now);
        }
        None => warn!(
            "Issue {} references missing book {}; availability not restored",
            issue_id, record.book_id
        ),
    }

    save_collection(store, CIRCULATION_KEY, &circulation)?;
    save_collection(store, BOOKS_KEY, &books)?;

    info!("Issue {} returned after {} overdue days, fine {:.2}", issue_id, days, fine);
    Ok(ReturnReceipt {
        record,
        overdue_days: days,
        fine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn late_return_is_fined_per_day() {
        let days = overdue_days(date("2024-01-10"), date("2024-01-15"));
        assert_eq!(days, 5);
        assert_eq!(fine_for(days, 1.0), 5.0);
    }

    #[test]
    fn early_or_on_time_return_is_free() {
        assert_eq!(overdue_days(date("2024-01-10"), date("2024-01-10")), 0);
        assert_eq!(overdue_days(date("2024-01-10"), date("2024-01-02")), 0);
    }

    #[test]
    fn overdue_span_crosses_month_and_leap_day() {
        assert_eq!(overdue_days(date("2024-02-27"), date("2024-03-02")), 4);
    }
}
