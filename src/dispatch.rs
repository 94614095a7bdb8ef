//! Named-action entry point used by the presentation layer.
//!
//! The host sends an action name and a JSON payload and gets back an
//! [`AppResponse`]. Every failure is turned into an error record, so
//! [`Library::dispatch`] never fails.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::app_response::AppResponse;
use crate::circulation::IssueRequest;
use crate::error::{LibraryError, LibraryResult};
use crate::library::Library;
use crate::local_db_model::{BookDraft, BookPatch, MemberDraft, MemberPatch};
use crate::storage::KeyValueStore;

/// Actions understood by [`Library::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GetBooks,
    AddBook,
    UpdateBook,
    DeleteBook,
    GetMembers,
    AddMember,
    UpdateMember,
    DeleteMember,
    IssueBook,
    ReturnBook,
    RecentIssues,
    Overdue,
    MemberHistory,
    BorrowedBooks,
    AvailableBooks,
    ExportData,
    ImportData,
    ClearData,
}

impl FromStr for Action {
    type Err = LibraryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let action = match name {
            "getBooks" => Action::GetBooks,
            "addBook" => Action::AddBook,
            "updateBook" => Action::UpdateBook,
            "deleteBook" => Action::DeleteBook,
            "getMembers" => Action::GetMembers,
            "addMember" => Action::AddMember,
            "updateMember" => Action::UpdateMember,
            "deleteMember" => Action::DeleteMember,
            "issueBook" => Action::IssueBook,
            "returnBook" => Action::ReturnBook,
            "recentIssues" => Action::RecentIssues,
            "overdue" => Action::Overdue,
            "memberHistory" => Action::MemberHistory,
            "borrowedBooks" => Action::BorrowedBooks,
            "availableBooks" => Action::AvailableBooks,
            "exportData" => Action::ExportData,
            "importData" => Action::ImportData,
            "clearData" => Action::ClearData,
            other => return Err(LibraryError::BadRequest(format!("Invalid action: {other}"))),
        };
        Ok(action)
    }
}

impl<S: KeyValueStore> Library<S> {
    /// Routes `action` with `payload` to the matching operation.
    pub fn dispatch(&mut self, action: &str, payload: JsonValue) -> AppResponse {
        debug!("Dispatching '{}'", action);
        let result = action
            .parse::<Action>()
            .and_then(|action| self.run(action, &payload));
        match result {
            Ok(response) => response,
            Err(e) => {
                warn!("Action '{}' failed: {}", action, e);
                AppResponse::from(e)
            }
        }
    }

    fn run(&mut self, action: Action, payload: &JsonValue) -> LibraryResult<AppResponse> {
        let response = match action {
            Action::GetBooks => {
                let books = self.list_books(search_term(payload))?;
                AppResponse::with_body(None, [("books", to_json(&books)?)])
            }
            Action::AddBook => {
                let book = self.add_book(parse_payload::<BookDraft>(payload)?)?;
                AppResponse::with_body(Some("Book added successfully"), [("book", to_json(&book)?)])
            }
            Action::UpdateBook => {
                let id = required_id(payload, "id")?;
                let book = self.update_book(id, parse_payload::<BookPatch>(payload)?)?;
                AppResponse::with_body(Some("Book updated successfully"), [("book", to_json(&book)?)])
            }
            Action::DeleteBook => {
                self.delete_book(required_id(payload, "id")?)?;
                AppResponse::success("Book deleted successfully")
            }
            Action::GetMembers => {
                let members = self.list_members(search_term(payload))?;
                AppResponse::with_body(None, [("members", to_json(&members)?)])
            }
            Action::AddMember => {
                let member = self.add_member(parse_payload::<MemberDraft>(payload)?)?;
                AppResponse::with_body(
                    Some("Member added successfully"),
                    [("member", to_json(&member)?)],
                )
            }
            Action::UpdateMember => {
                let id = required_id(payload, "id")?;
                let member = self.update_member(id, parse_payload::<MemberPatch>(payload)?)?;
                AppResponse::with_body(
                    Some("Member updated successfully"),
                    [("member", to_json(&member)?)],
                )
            }
            Action::DeleteMember => {
                self.delete_member(required_id(payload, "id")?)?;
                AppResponse::success("Member deleted successfully")
            }
            Action::IssueBook => {
                let request = IssueRequest {
                    book_id: required_id(payload, "book_id")?,
                    member_id: required_id(payload, "member_id")?,
                    issue_date: optional_date(payload, "issue_date")?.unwrap_or_else(|| self.today()),
                    due_date: optional_date(payload, "due_date")?.ok_or_else(|| {
                        LibraryError::BadRequest("Missing field: due_date".to_string())
                    })?,
                };
                let record = self.issue_book(&request)?;
                AppResponse::with_body(
                    Some("Book issued successfully"),
                    [("issue", to_json(&record)?)],
                )
            }
            Action::ReturnBook => {
                let issue_id = required_id(payload, "issue_id")?;
                let return_date = optional_date(payload, "return_date")?.unwrap_or_else(|| self.today());
                let receipt = self.return_book(issue_id, return_date)?;
                AppResponse::with_body(
                    Some("Book returned successfully"),
                    [
                        ("fine", json!(receipt.fine)),
                        ("overdue_days", json!(receipt.overdue_days)),
                        ("issue", to_json(&receipt.record)?),
                    ],
                )
            }
            Action::RecentIssues => {
                AppResponse::with_body(None, [("issues", to_json(&self.recent_issues()?)?)])
            }
            Action::Overdue => AppResponse::with_body(None, [("overdue", to_json(&self.overdue()?)?)]),
            Action::MemberHistory => {
                let history = self.member_history(required_id(payload, "member_id")?)?;
                AppResponse::with_body(None, [("history", to_json(&history)?)])
            }
            Action::BorrowedBooks => {
                let borrowed = self.borrowed_items(required_id(payload, "member_id")?)?;
                AppResponse::with_body(None, [("borrowed", to_json(&borrowed)?)])
            }
            Action::AvailableBooks => {
                AppResponse::with_body(None, [("books", to_json(&self.available_books()?)?)])
            }
            Action::ExportData => {
                let snapshot = self.export_snapshot()?;
                AppResponse::with_body(
                    Some("Data exported successfully"),
                    [
                        ("file_name", JsonValue::String(self.export_file_name())),
                        ("data", to_json(&snapshot)?),
                    ],
                )
            }
            Action::ImportData => {
                let data = import_data(payload)?;
                self.import_snapshot(&data)?;
                AppResponse::success("Data imported successfully")
            }
            Action::ClearData => {
                self.clear_data()?;
                AppResponse::success("All data cleared and reset to sample data")
            }
        };
        Ok(response)
    }
}

fn to_json<T: Serialize>(value: &T) -> LibraryResult<JsonValue> {
    Ok(serde_json::to_value(value)?)
}

fn parse_payload<T: DeserializeOwned>(payload: &JsonValue) -> LibraryResult<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| LibraryError::BadRequest(format!("Invalid payload: {e}")))
}

fn search_term(payload: &JsonValue) -> &str {
    payload.get("q").and_then(JsonValue::as_str).unwrap_or("")
}

/// Reads an id given either as a JSON number or as a numeric string.
pub fn coerce_id(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn required_id(payload: &JsonValue, field: &str) -> LibraryResult<u64> {
    let value = payload
        .get(field)
        .ok_or_else(|| LibraryError::BadRequest(format!("Missing field: {field}")))?;
    coerce_id(value).ok_or_else(|| LibraryError::BadRequest(format!("Invalid {field}: {value}")))
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (its UTC calendar date).
pub fn parse_calendar_date(text: &str) -> LibraryResult<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc().date())
        .map_err(|_| LibraryError::BadRequest(format!("Invalid date: {text}")))
}

fn optional_date(payload: &JsonValue, field: &str) -> LibraryResult<Option<NaiveDate>> {
    match payload.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) if s.trim().is_empty() => Ok(None),
        Some(JsonValue::String(s)) => parse_calendar_date(s).map(Some),
        Some(other) => Err(LibraryError::BadRequest(format!("Invalid {field}: {other}"))),
    }
}

/// The snapshot to import, given inline or as the text of a backup file.
fn import_data(payload: &JsonValue) -> LibraryResult<JsonValue> {
    match payload.get("data") {
        Some(JsonValue::String(text)) => serde_json::from_str(text)
            .map_err(|e| LibraryError::InvalidFormat(format!("Error parsing backup file: {e}"))),
        Some(value) => Ok(value.clone()),
        None => Err(LibraryError::InvalidFormat("Invalid backup file format".to_string())),
    }
}
