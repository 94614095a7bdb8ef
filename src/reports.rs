//! Read-only views joined from the circulation ledger and the catalog.
//!
//! Nothing here is cached. Each call reloads the collections it needs.

use std::cmp::Reverse;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::circulation::{fine_for, overdue_days};
use crate::config::LibraryConfig;
use crate::error::LibraryResult;
use crate::local_db_model::{Book, BookId, CirculationRecord, IssueId, Member, MemberId};
use crate::storage::{load_collection, KeyValueStore, BOOKS_KEY, CIRCULATION_KEY, MEMBERS_KEY};

pub const UNKNOWN_BOOK: &str = "Unknown Book";
pub const UNKNOWN_MEMBER: &str = "Unknown Member";

/// A circulation record with the book title and member name attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub record: CirculationRecord,
    pub title: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueView {
    #[serde(flatten)]
    pub issue: IssueView,
    pub days_overdue: i64,
    /// Fine the member would pay when returning today.
    pub accrued_fine: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DueStatus {
    Overdue { days: i64 },
    DueSoon { days: i64 },
    OnTime { days: i64 },
}

impl DueStatus {
    pub fn classify(due: NaiveDate, today: NaiveDate, due_soon_days: i64) -> Self {
        let days_left = (due - today).num_days();
        if days_left < 0 {
            DueStatus::Overdue { days: -days_left }
        } else if days_left <= due_soon_days {
            DueStatus::DueSoon { days: days_left }
        } else {
            DueStatus::OnTime { days: days_left }
        }
    }
}

/// An outstanding loan as seen from the borrowing member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowedItem {
    pub issue_id: IssueId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub due_status: DueStatus,
}

struct Joined {
    books: Vec<Book>,
    members: Vec<Member>,
}

impl Joined {
    fn load<S: KeyValueStore + ?Sized>(store: &S) -> LibraryResult<Self> {
        Ok(Self {
            books: load_collection(store, BOOKS_KEY)?,
            members: load_collection(store, MEMBERS_KEY)?,
        })
    }

    fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    fn view(&self, record: CirculationRecord) -> IssueView {
        let title = self
            .book(record.book_id)
            .map_or_else(|| UNKNOWN_BOOK.to_string(), |b| b.title.clone());
        let name = self
            .members
            .iter()
            .find(|m| m.id == record.member_id)
            .map_or_else(|| UNKNOWN_MEMBER.to_string(), |m| m.name.clone());
        IssueView {
            record,
            title,
            name,
        }
    }
}

/// Newest records first (ties broken by higher id), capped at the configured limit.
pub fn recent_issues<S: KeyValueStore + ?Sized>(
    store: &S,
    config: &LibraryConfig,
) -> LibraryResult<Vec<IssueView>> {
    let mut circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    circulation.sort_by_key(|r| Reverse((r.created_at, r.id)));
    circulation.truncate(config.recent_issues_limit);

    let joined = Joined::load(store)?;
    Ok(circulation.into_iter().map(|r| joined.view(r)).collect())
}

/// Outstanding records whose due date has passed, soonest-due first.
pub fn overdue<S: KeyValueStore + ?Sized>(
    store: &S,
    today: NaiveDate,
    config: &LibraryConfig,
) -> LibraryResult<Vec<OverdueView>> {
    let circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    let joined = Joined::load(store)?;

    let mut rows: Vec<OverdueView> = circulation
        .into_iter()
        .filter(|r| r.is_outstanding() && r.due_date < today)
        .map(|r| {
            let days = overdue_days(r.due_date, today);
            OverdueView {
                issue: joined.view(r),
                days_overdue: days,
                accrued_fine: fine_for(days, config.fine_per_day),
            }
        })
        .collect();
    rows.sort_by_key(|row| (row.issue.record.due_date, row.issue.record.id));
    Ok(rows)
}

/// Every record of one member, newest first.
pub fn member_history<S: KeyValueStore + ?Sized>(
    store: &S,
    member_id: MemberId,
) -> LibraryResult<Vec<IssueView>> {
    let mut circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    circulation.retain(|r| r.member_id == member_id);
    circulation.sort_by_key(|r| Reverse((r.created_at, r.id)));

    let joined = Joined::load(store)?;
    Ok(circulation.into_iter().map(|r| joined.view(r)).collect())
}

/// Outstanding loans of one member, soonest-due first.
pub fn borrowed_items<S: KeyValueStore + ?Sized>(
    store: &S,
    member_id: MemberId,
    today: NaiveDate,
    config: &LibraryConfig,
) -> LibraryResult<Vec<BorrowedItem>> {
    let circulation: Vec<CirculationRecord> = load_collection(store, CIRCULATION_KEY)?;
    let joined = Joined::load(store)?;

    let mut items: Vec<BorrowedItem> = circulation
        .into_iter()
        .filter(|r| r.member_id == member_id && r.is_outstanding())
        .map(|r| {
            let book = joined.book(r.book_id);
            BorrowedItem {
                issue_id: r.id,
                book_id: r.book_id,
                title: book.map_or_else(|| UNKNOWN_BOOK.to_string(), |b| b.title.clone()),
                author: book.map(|b| b.author.clone()).unwrap_or_default(),
                issue_date: r.issue_date,
                due_date: r.due_date,
                due_status: DueStatus::classify(r.due_date, today, config.due_soon_days),
            }
        })
        .collect();
    items.sort_by_key(|item| (item.due_date, item.issue_id));
    Ok(items)
}

/// Books with at least one copy on the shelf, in stored order.
pub fn available_books<S: KeyValueStore + ?Sized>(store: &S) -> LibraryResult<Vec<Book>> {
    let books: Vec<Book> = load_collection(store, BOOKS_KEY)?;
    Ok(books.into_iter().filter(|b| b.available_qty > 0).collect())
}
