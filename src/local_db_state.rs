//! LMDB-backed implementation of [`KeyValueStore`].
//!
//! Each library instance owns one LMDB environment stored as a directory named
//! `<name>.lmdb`. The four library blobs live in a single named database. Every
//! write runs in its own read-write transaction and is committed before the
//! call returns.

use std::fs;
use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info};

use crate::storage::{KeyValueStore, StorageError, StorageResult};

const MAIN_DB: &str = "library";

pub struct AppDbState {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl AppDbState {
    /// Opens (or creates) the environment in directory `path`.
    pub fn open(path: &Path, map_size: usize) -> StorageResult<Self> {
        fs::create_dir_all(path)?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(map_size)
            .open(path)?;
        let db = env.create_db(Some(MAIN_DB), DatabaseFlags::empty())?;

        info!("LMDB environment ready at {}", path.display());
        Ok(Self {
            env,
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffered writes to disk.
    pub fn sync(&self) -> StorageResult<()> {
        self.env.sync(true)?;
        Ok(())
    }
}

impl KeyValueStore for AppDbState {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| StorageError::Encoding(key.to_string()))?,
            ),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &key, &value, WriteFlags::empty())?;
        txn.commit()?;
        debug!("Wrote {} bytes under '{}'", value.len(), key);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StorageResult<bool> {
        let mut txn = self.env.begin_rw_txn()?;
        let existed = match txn.del(self.db, &key, None) {
            Ok(()) => true,
            Err(lmdb::Error::NotFound) => false,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        Ok(existed)
    }
}
