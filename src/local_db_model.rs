//! Data model definitions for the persisted library collections.
//!
//! Three record types live in storage: [`Book`], [`Member`] and
//! [`CirculationRecord`]. Each is kept as one element of a JSON array under a
//! fixed key. The request types ([`BookDraft`], [`BookPatch`], [`MemberDraft`],
//! [`MemberPatch`]) describe which fields a caller may supply. Fields derived by
//! the library (`id`, timestamps, availability on issue/return) are not part
//! of any patch.
//!
//! ```rust
//! use offline_library_core::local_db_model::{Book, CirculationStatus};
//! use serde_json::json;
//!
//! let book: Book = serde_json::from_value(json!({
//!     "id": 1,
//!     "accession_no": "ACC001",
//!     "title": "Effective Java",
//!     "total_qty": 3,
//!     "available_qty": 3
//! }))?;
//! assert_eq!(book.author, "");
//! assert_eq!(book.year, None);
//!
//! let status: CirculationStatus = serde_json::from_value(json!("issued"))?;
//! assert_eq!(status, CirculationStatus::Issued);
//! # Ok::<(), serde_json::Error>(())
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LibraryError, LibraryResult};

pub type BookId = u64;
pub type MemberId = u64;
pub type IssueId = u64;

/// A catalogued title with its copy counts.
///
/// `available_qty` never leaves `0..=total_qty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    /// Library-assigned unique identifier of the title.
    pub accession_no: String,
    #[serde(default)]
    pub isbn: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub total_qty: u32,
    pub available_qty: u32,
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Copies currently out on loan.
    pub fn copies_out(&self) -> u32 {
        self.total_qty.saturating_sub(self.available_qty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Student,
    Faculty,
    Admin,
}

/// A registered borrower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_code: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `Issued -> Returned` is the only transition. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CirculationStatus {
    Issued,
    Returned,
}

/// One issue/return transaction of a single copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirculationRecord {
    pub id: IssueId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: CirculationStatus,
    pub fine_amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CirculationRecord {
    pub fn is_outstanding(&self) -> bool {
        self.status == CirculationStatus::Issued
    }
}

/// Fields of a book to be added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BookDraft {
    pub accession_no: String,
    pub title: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default = "default_total_qty")]
    pub total_qty: u32,
    /// Defaults to `total_qty`.
    #[serde(default)]
    pub available_qty: Option<u32>,
    #[serde(default)]
    pub subject: String,
}

fn default_total_qty() -> u32 {
    1
}

impl BookDraft {
    pub fn new(accession_no: impl Into<String>, title: impl Into<String>, total_qty: u32) -> Self {
        Self {
            accession_no: accession_no.into(),
            title: title.into(),
            total_qty,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> LibraryResult<()> {
        require_text("Accession number", &self.accession_no)?;
        require_text("Title", &self.title)?;
        check_quantities(self.total_qty, self.available_qty.unwrap_or(self.total_qty))
    }

    pub(crate) fn into_book(self, id: BookId, now: DateTime<Utc>) -> Book {
        Book {
            id,
            available_qty: self.available_qty.unwrap_or(self.total_qty),
            accession_no: self.accession_no,
            isbn: self.isbn,
            title: self.title,
            author: self.author,
            publisher: self.publisher,
            year: self.year,
            total_qty: self.total_qty,
            subject: self.subject,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Mutable fields of a book. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookPatch {
    pub accession_no: Option<String>,
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    /// `Some(None)` (JSON `null`) clears the year.
    #[serde(deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub year: Option<Option<i32>>,
    pub total_qty: Option<u32>,
    pub available_qty: Option<u32>,
    pub subject: Option<String>,
}

impl BookPatch {
    /// Applies the patch, keeping `available_qty` within `0..=total_qty`.
    ///
    /// Changing `total_qty` alone shifts `available_qty` by the same amount, so
    /// copies already on loan stay accounted for. Neither field may drop the
    /// copies on loan out of the count. The book is left untouched when the
    /// patch is rejected.
    pub(crate) fn apply_to(self, book: &mut Book, now: DateTime<Utc>) -> LibraryResult<()> {
        if let Some(accession_no) = &self.accession_no {
            require_text("Accession number", accession_no)?;
        }
        if let Some(title) = &self.title {
            require_text("Title", title)?;
        }

        let out = book.copies_out();
        let total = self.total_qty.unwrap_or(book.total_qty);
        if total < out {
            return Err(LibraryError::Validation(format!(
                "Total quantity {total} is below the {out} copies currently issued"
            )));
        }
        let available = self.available_qty.unwrap_or(total - out);
        check_quantities(total, available)?;
        if available > total - out {
            return Err(LibraryError::Validation(format!(
                "Available quantity {available} leaves fewer than the {out} copies currently issued"
            )));
        }

        if let Some(v) = self.accession_no {
            book.accession_no = v;
        }
        if let Some(v) = self.isbn {
            book.isbn = v;
        }
        if let Some(v) = self.title {
            book.title = v;
        }
        if let Some(v) = self.author {
            book.author = v;
        }
        if let Some(v) = self.publisher {
            book.publisher = v;
        }
        if let Some(v) = self.year {
            book.year = v;
        }
        if let Some(v) = self.subject {
            book.subject = v;
        }
        book.total_qty = total;
        book.available_qty = available;
        book.updated_at = Some(now);
        Ok(())
    }
}

/// Fields of a member to be added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberDraft {
    pub member_code: String,
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub role: MemberRole,
}

impl MemberDraft {
    pub fn new(member_code: impl Into<String>, name: impl Into<String>, role: MemberRole) -> Self {
        Self {
            member_code: member_code.into(),
            name: name.into(),
            role,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> LibraryResult<()> {
        require_text("Member code", &self.member_code)?;
        require_text("Name", &self.name)
    }

    pub(crate) fn into_member(self, id: MemberId, now: DateTime<Utc>) -> Member {
        Member {
            id,
            member_code: self.member_code,
            name: self.name,
            department: self.department,
            email: self.email,
            phone: self.phone,
            role: self.role,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Mutable fields of a member. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberPatch {
    pub member_code: Option<String>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<MemberRole>,
}

impl MemberPatch {
    pub(crate) fn apply_to(self, member: &mut Member, now: DateTime<Utc>) -> LibraryResult<()> {
        if let Some(code) = &self.member_code {
            require_text("Member code", code)?;
        }
        if let Some(name) = &self.name {
            require_text("Name", name)?;
        }

        if let Some(v) = self.member_code {
            member.member_code = v;
        }
        if let Some(v) = self.name {
            member.name = v;
        }
        if let Some(v) = self.department {
            member.department = v;
        }
        if let Some(v) = self.email {
            member.email = v;
        }
        if let Some(v) = self.phone {
            member.phone = v;
        }
        if let Some(v) = self.role {
            member.role = v;
        }
        member.updated_at = Some(now);
        Ok(())
    }
}

/// Maps a present field to `Some`, so that `null` becomes `Some(None)` while an
/// absent field falls back to the container default `None`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require_text(field: &str, value: &str) -> LibraryResult<()> {
    if value.trim().is_empty() {
        return Err(LibraryError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_quantities(total: u32, available: u32) -> LibraryResult<()> {
    if available > total {
        return Err(LibraryError::Validation(format!(
            "Available quantity {available} exceeds total quantity {total}"
        )));
    }
    Ok(())
}
