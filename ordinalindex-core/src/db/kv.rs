use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use rocksdb::{IteratorMode, Options, ReadOptions, DB};

use crate::db::keys::prefix_upper_bound;

#[derive(Debug, Clone)]
pub enum KvError {
    NotOpen,
    Io(String),
}

impl fmt::Display for KvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KvError::NotOpen => write!(f, "kv backend is not open"),
            KvError::Io(e) => write!(f, "kv backend I/O error: {e}"),
        }
    }
}

impl std::error::Error for KvError {}

/// Ordered byte-keyed embedded store. Backed by RocksDB opened with mmap
/// reads enabled, which is the nearest faithful analog to a memory-mapped
/// ordered store in the teacher's dependency stack (`ordhook-core` already
/// depends on `rocksdb`).
///
/// Single-writer semantics are the caller's responsibility (the block-apply
/// thread owns all `put`/`delete` calls); queries may run concurrently from
/// other threads.
pub struct OrdinalKv {
    path: PathBuf,
    map_size_mib: usize,
    db: RwLock<Option<DB>>,
    /// Last observed I/O failure. Once set, every operation fails until a
    /// successful `open()` clears it.
    failed: Mutex<Option<KvError>>,
}

impl OrdinalKv {
    pub fn new(path: impl AsRef<Path>, map_size_mib: usize) -> Result<Self, KvError> {
        let kv = OrdinalKv {
            path: path.as_ref().to_path_buf(),
            map_size_mib,
            db: RwLock::new(None),
            failed: Mutex::new(None),
        };
        kv.open()?;
        Ok(kv)
    }

    fn options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_allow_mmap_reads(true);
        opts.set_allow_mmap_writes(true);
        opts.set_write_buffer_size(self.map_size_mib * 1024 * 1024 / 4);
        opts
    }

    pub fn open(&self) -> Result<(), KvError> {
        let opts = self.options();
        let db = DB::open(&opts, &self.path).map_err(|e| KvError::Io(e.to_string()))?;
        *self.db.write().unwrap() = Some(db);
        *self.failed.lock().unwrap() = None;
        Ok(())
    }

    pub fn close(&self) {
        *self.db.write().unwrap() = None;
    }

    pub fn is_open(&self) -> bool {
        self.db.read().unwrap().is_some() && self.failed.lock().unwrap().is_none()
    }

    pub fn set_map_size(&mut self, mib: usize) {
        self.map_size_mib = mib;
    }

    /// Records a failure and attempts exactly one reopen. Always returns
    /// the original error — the reopen only affects whether subsequent
    /// calls succeed.
    fn record_failure_and_retry_open(&self, err: KvError) -> KvError {
        *self.failed.lock().unwrap() = Some(err.clone());
        let _ = self.open();
        err
    }

    fn guard(&self) -> Result<(), KvError> {
        if let Some(e) = self.failed.lock().unwrap().clone() {
            return Err(e);
        }
        if self.db.read().unwrap().is_none() {
            return Err(KvError::NotOpen);
        }
        Ok(())
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        let result = db.put(key, value);
        drop(guard);
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.record_failure_and_retry_open(KvError::Io(e.to_string()))),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        db.get(key).map_err(|e| KvError::Io(e.to_string()))
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        let result = db.delete(key);
        drop(guard);
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.record_failure_and_retry_open(KvError::Io(e.to_string()))),
        }
    }

    pub fn exists(&self, key: &[u8]) -> Result<bool, KvError> {
        Ok(self.get(key)?.is_some())
    }

    /// Visits every `(key, value)` pair with `key` starting with `prefix`
    /// in ascending key order. `visit` returns `true` to continue, `false`
    /// to stop early.
    pub fn iterate_prefix<F>(&self, prefix: &[u8], mut visit: F) -> Result<(), KvError>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        let mut read_opts = ReadOptions::default();
        if let Some(bound) = prefix_upper_bound(prefix) {
            read_opts.set_iterate_upper_bound(bound);
        }
        let mode = IteratorMode::From(prefix, rocksdb::Direction::Forward);
        let iter = db.iterator_opt(mode, read_opts);
        for item in iter {
            let (k, v) = item.map_err(|e| KvError::Io(e.to_string()))?;
            if !k.starts_with(prefix) {
                break;
            }
            if !visit(&k, &v) {
                break;
            }
        }
        Ok(())
    }

    pub fn first(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        let mut iter = db.iterator(IteratorMode::Start);
        match iter.next() {
            Some(item) => {
                let (k, v) = item.map_err(|e| KvError::Io(e.to_string()))?;
                Ok(Some((k.to_vec(), v.to_vec())))
            }
            None => Ok(None),
        }
    }

    pub fn last(&self) -> Result<Option<(Vec<u8>, Vec<u8>)>, KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        let mut iter = db.iterator(IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (k, v) = item.map_err(|e| KvError::Io(e.to_string()))?;
                Ok(Some((k.to_vec(), v.to_vec())))
            }
            None => Ok(None),
        }
    }

    /// Total entry count. Not cached — callers that need exact, cheap
    /// counts should maintain their own persistent counters (see
    /// `crate::core::counters`).
    pub fn size(&self) -> Result<u64, KvError> {
        self.guard()?;
        let guard = self.db.read().unwrap();
        let db = guard.as_ref().ok_or(KvError::NotOpen)?;
        Ok(db.iterator(IteratorMode::Start).count() as u64)
    }

    /// Deletes and recreates the backing database file, used to enter
    /// recreate mode. A full wipe is acceptable here because the ordinal
    /// index is a secondary structure, not the source of truth.
    pub fn wipe(&self) -> Result<(), KvError> {
        self.close();
        if self.path.exists() {
            DB::destroy(&self.options(), &self.path).map_err(|e| KvError::Io(e.to_string()))?;
        }
        self.open()
    }
}
