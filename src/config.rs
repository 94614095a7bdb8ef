//! Runtime configuration of a library instance.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, LibraryResult};

/// Default LMDB map size (10 MiB).
pub const DEFAULT_MAP_SIZE: usize = 10 * 1024 * 1024;

/// Settings for one library instance.
///
/// Every field has a default, so a host may pass `{}` or only the fields it
/// wants to change:
///
/// ```rust
/// use offline_library_core::LibraryConfig;
///
/// let config = LibraryConfig::from_json(r#"{"name":"branch_a","fine_per_day":0.5}"#)?;
/// assert_eq!(config.name, "branch_a");
/// assert_eq!(config.recent_issues_limit, 20);
/// # Ok::<(), offline_library_core::LibraryError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Database name. The LMDB environment lives at `<name>.lmdb`.
    pub name: String,
    /// LMDB map size in bytes.
    pub map_size: usize,
    /// Fine charged per overdue calendar day.
    pub fine_per_day: f64,
    /// Maximum number of rows returned by the recent-issues view.
    pub recent_issues_limit: usize,
    /// Outstanding issues due within this many days are reported as due soon.
    pub due_soon_days: i64,
    /// Seed the sample catalog when the store is empty or cleared.
    pub seed_sample_data: bool,
    /// Reject issues whose member id does not resolve to a member.
    pub require_known_member: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: "library".to_string(),
            map_size: DEFAULT_MAP_SIZE,
            fine_per_day: 1.0,
            recent_issues_limit: 20,
            due_soon_days: 3,
            seed_sample_data: true,
            require_known_member: false,
        }
    }
}

impl LibraryConfig {
    /// Default settings with a different database name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> LibraryResult<Self> {
        let config: LibraryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LibraryResult<()> {
        if self.name.trim().is_empty() {
            return Err(LibraryError::Validation("Database name cannot be empty".to_string()));
        }
        if !self.fine_per_day.is_finite() || self.fine_per_day < 0.0 {
            return Err(LibraryError::Validation(format!(
                "Fine per day must be a non-negative number, got {}",
                self.fine_per_day
            )));
        }
        if self.recent_issues_limit == 0 {
            return Err(LibraryError::Validation(
                "Recent issues limit must be at least 1".to_string(),
            ));
        }
        if self.map_size == 0 {
            return Err(LibraryError::Validation("Map size must be positive".to_string()));
        }
        Ok(())
    }

    /// Directory of the LMDB environment for this configuration.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.lmdb", self.name))
    }
}
