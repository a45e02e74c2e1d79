//! Persistent per-prefix counters, maintained incrementally on every
//! insert/delete rather than derived from a KV size estimate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::OrdinalKv;

/// Reserved prefix for counter entries. Distinct from the `0x01`..`0x04`
/// prefixes used for domain data, so it never collides with a
/// prefix-iteration scan over those.
const COUNTER_PREFIX: u8 = 0x05;

const NAMES_COUNTER: u8 = 0x00;
const TOKENS_COUNTER: u8 = 0x01;
const INSCRIPTIONS_COUNTER: u8 = 0x02;

fn counter_key(which: u8) -> [u8; 2] {
    [COUNTER_PREFIX, which]
}

fn load_u64(kv: &OrdinalKv, which: u8) -> u64 {
    match kv.get(&counter_key(which)) {
        Ok(Some(bytes)) if bytes.len() == 8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes);
            u64::from_le_bytes(buf)
        }
        _ => 0,
    }
}

/// In-memory mirrors of the three `total_*` counters, backed by dedicated
/// KV entries so every query is O(1) instead of a full-prefix scan.
/// Initialized lazily from KV on first use, then kept in sync by
/// `incr`/`decr` on every insert/delete.
pub struct Counters {
    kv: Arc<OrdinalKv>,
    names: AtomicU64,
    tokens: AtomicU64,
    inscriptions: AtomicU64,
    initialized: std::sync::atomic::AtomicBool,
}

impl Counters {
    pub fn new(kv: Arc<OrdinalKv>) -> Self {
        Counters {
            kv,
            names: AtomicU64::new(0),
            tokens: AtomicU64::new(0),
            inscriptions: AtomicU64::new(0),
            initialized: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn ensure_initialized(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.names.store(load_u64(&self.kv, NAMES_COUNTER), Ordering::SeqCst);
        self.tokens.store(load_u64(&self.kv, TOKENS_COUNTER), Ordering::SeqCst);
        self.inscriptions
            .store(load_u64(&self.kv, INSCRIPTIONS_COUNTER), Ordering::SeqCst);
    }

    fn persist(&self, which: u8, value: u64) {
        let _ = self.kv.put(&counter_key(which), &value.to_le_bytes());
    }

    pub fn names(&self) -> u64 {
        self.ensure_initialized();
        self.names.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> u64 {
        self.ensure_initialized();
        self.tokens.load(Ordering::SeqCst)
    }

    pub fn inscriptions(&self) -> u64 {
        self.ensure_initialized();
        self.inscriptions.load(Ordering::SeqCst)
    }

    pub fn incr_names(&self) {
        self.ensure_initialized();
        let v = self.names.fetch_add(1, Ordering::SeqCst) + 1;
        self.persist(NAMES_COUNTER, v);
    }

    pub fn decr_names(&self) {
        self.ensure_initialized();
        let prev = self.names.load(Ordering::SeqCst);
        let v = if prev == 0 { 0 } else { prev - 1 };
        self.names.store(v, Ordering::SeqCst);
        self.persist(NAMES_COUNTER, v);
    }

    pub fn incr_tokens(&self) {
        self.ensure_initialized();
        let v = self.tokens.fetch_add(1, Ordering::SeqCst) + 1;
        self.persist(TOKENS_COUNTER, v);
    }

    pub fn incr_inscriptions(&self) {
        self.ensure_initialized();
        let v = self.inscriptions.fetch_add(1, Ordering::SeqCst) + 1;
        self.persist(INSCRIPTIONS_COUNTER, v);
    }

    /// Resets every counter to zero and re-derives it from a full KV scan.
    /// Used when exiting recreate mode with caches that were not kept
    /// counter-synced (defensive; the normal path keeps counters in sync
    /// incrementally so this should be a no-op in practice).
    pub fn resync_from_kv(&self, names: u64, tokens: u64, inscriptions: u64) {
        self.names.store(names, Ordering::SeqCst);
        self.tokens.store(tokens, Ordering::SeqCst);
        self.inscriptions.store(inscriptions, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        self.persist(NAMES_COUNTER, names);
        self.persist(TOKENS_COUNTER, tokens);
        self.persist(INSCRIPTIONS_COUNTER, inscriptions);
    }
}
