//! # Offline Library Core
//!
//! A local-first library circulation engine designed for FFI (Foreign Function
//! Interface) integration with Flutter and other cross-platform front ends.
//! It keeps a catalog of books and members, records checkouts and returns,
//! and computes overdue fines. All state is stored in LMDB as four JSON
//! blobs.
//!
//! ## Features
//!
//! - **Entity stores**: books and members with case-insensitive search and
//!   unique accession numbers / member codes
//! - **Circulation ledger**: issue/return bookkeeping that keeps every
//!   book's `available_qty` within `0..=total_qty`
//! - **Fines**: whole calendar days past the due date times a daily rate
//! - **Reports**: recent issues, overdue list, member history, borrowed items
//! - **Snapshots**: export/import of the complete state as one JSON document
//! - **Pluggable storage**: any [`KeyValueStore`]; LMDB on disk, in-memory for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use offline_library_core::{create_library, dispatch, free_response};
//! use std::ffi::CString;
//!
//! let name = CString::new("my_library").unwrap();
//! let library = create_library(name.as_ptr());
//!
//! let action = CString::new("getBooks").unwrap();
//! let payload = CString::new(r#"{"q":"java"}"#).unwrap();
//! let response = dispatch(library, action.as_ptr(), payload.as_ptr());
//! free_response(response as *mut _);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_library`] - Open (or create) `<name>.lmdb` with default settings
//! - [`create_library_with_config`] - Open with a JSON [`LibraryConfig`]
//! - [`dispatch`] - Run a named action with a JSON payload
//! - [`free_response`] - Release a string returned by this library
//! - [`close_library`] - Explicit connection cleanup

pub mod app_response;
pub mod catalog;
pub mod circulation;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod library;
pub mod local_db_model;
pub mod local_db_state;
pub mod reports;
pub mod snapshot;
pub mod storage;

pub use crate::app_response::AppResponse;
pub use crate::config::LibraryConfig;
pub use crate::error::{LibraryError, LibraryResult};
pub use crate::library::{Library, LocalLibrary};
pub use crate::storage::{InMemoryStore, KeyValueStore};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use log::{info, warn};

/// Opens the library stored at `<name>.lmdb`, creating and seeding it if needed.
///
/// # Returns
///
/// Returns a pointer to the [`LocalLibrary`] instance on success, or a null
/// pointer on failure. Release it with [`close_library`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use offline_library_core::create_library;
///
/// let name = CString::new("test_library").unwrap();
/// let library = create_library(name.as_ptr());
///
/// if !library.is_null() {
///     // Library opened successfully
/// }
/// ```
///
/// # Errors
///
/// Returns null pointer if:
/// - Input name pointer is null
/// - Input string contains invalid UTF-8
/// - Database initialization fails
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_library(name: *const c_char) -> *mut LocalLibrary {
    if name.is_null() {
        warn!("Null name pointer passed to create_library");
        return std::ptr::null_mut();
    }

    let name_str = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    open_boxed(LibraryConfig::named(name_str))
}

/// Opens a library from a JSON [`LibraryConfig`] document.
///
/// Missing fields take their defaults, so `{"name":"branch_a"}` is a complete
/// configuration. Returns a null pointer on invalid input or initialization
/// failure.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use offline_library_core::create_library_with_config;
///
/// let config = CString::new(r#"{"name":"branch_a","fine_per_day":0.5}"#).unwrap();
/// let library = create_library_with_config(config.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_library_with_config(config_json: *const c_char) -> *mut LocalLibrary {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_library_with_config");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match LibraryConfig::from_json(json) {
        Ok(config) => open_boxed(config),
        Err(e) => {
            warn!("Invalid library configuration: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_boxed(config: LibraryConfig) -> *mut LocalLibrary {
    let path = config.db_path();
    info!("Attempting to open library at: {}", path.display());

    match LocalLibrary::open_local(config) {
        Ok(library) => {
            info!("✅ Library initialized successfully");
            Box::into_raw(Box::new(library))
        }
        Err(e) => {
            warn!("❌ Failed to initialize library: {e}");
            warn!("Attempted path: {}", path.display());
            std::ptr::null_mut()
        }
    }
}

/// Runs a named action against the library.
///
/// # Parameters
///
/// * `state` - Pointer returned by [`create_library`]
/// * `action` - Action name, e.g. `"issueBook"`
/// * `payload` - JSON object with the action's arguments; null means `{}`
///
/// # Returns
///
/// A JSON-formatted C string with the [`AppResponse`]. Release it with
/// [`free_response`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use offline_library_core::{create_library, dispatch};
///
/// let name = CString::new("test_library").unwrap();
/// let library = create_library(name.as_ptr());
///
/// let action = CString::new("issueBook").unwrap();
/// let payload = CString::new(
///     r#"{"book_id":1,"member_id":"2","issue_date":"2024-01-01","due_date":"2024-01-10"}"#,
/// ).unwrap();
/// let result = dispatch(library, action.as_ptr(), payload.as_ptr());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn dispatch(
    state: *mut LocalLibrary,
    action: *const c_char,
    payload: *const c_char,
) -> *const c_char {
    let library = match unsafe { state.as_mut() } {
        Some(l) => l,
        None => {
            let error = AppResponse::BadRequest("Null state pointer passed to dispatch".to_string());
            return response_to_c_string(&error);
        }
    };

    let action = match c_ptr_to_string(action, "action") {
        Ok(a) => a,
        Err(error_ptr) => return error_ptr,
    };

    let payload = if payload.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        let text = match c_ptr_to_string(payload, "payload") {
            Ok(t) => t,
            Err(error_ptr) => return error_ptr,
        };
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                let error = AppResponse::SerializationError(format!("Invalid JSON: {e}"));
                return response_to_c_string(&error);
            }
        }
    };

    let response = library.dispatch(&action, payload);
    response_to_c_string(&response)
}

/// Releases a string previously returned by [`dispatch`] or [`close_library`].
///
/// Passing null is a no-op.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr));
    }
}

/// Closes the library and releases its LMDB environment.
///
/// The pointer must not be used afterwards.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use offline_library_core::{create_library, close_library};
///
/// let name = CString::new("test_library").unwrap();
/// let library = create_library(name.as_ptr());
///
/// // Before hot restart or application shutdown
/// let result = close_library(library);
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_library(state: *mut LocalLibrary) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_library".to_string());
        return response_to_c_string(&error);
    }

    let library = unsafe { Box::from_raw(state) };
    if let Err(e) = library.store().sync() {
        warn!("Failed to sync LMDB environment before close: {e}");
    }
    drop(library);

    let success = AppResponse::success("Library closed successfully");
    response_to_c_string(&success)
}

/// Serializes a response into a C string owned by the caller.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust `String`, or to an error response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
