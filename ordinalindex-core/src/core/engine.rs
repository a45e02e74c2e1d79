//! Ordinal Index Core (OIC). Owns the KV handle, the
//! checkpoint, the lifecycle state machine, the recreate-mode caches, the
//! persistent counters and the notification emitter, and implements the
//! block apply/rollback algorithm.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::chain::Block;
use crate::core::chain::Transaction;
use crate::core::counters::Counters;
use crate::core::lifecycle::Lifecycle;
use crate::core::notify::NotificationRouter;
use crate::core::parser::{parse_inscription, ParsedInscription};
use crate::core::resolver::PubkeyResolver;
use crate::core::types::{
    Inscription, InscriptionKind, InscriptionMeta, NameOpKind, NameRecord, NotificationKind,
    TokenState,
};
use crate::db::checkpoint::WRONG_SENTINEL;
use crate::db::{keys, Checkpoint, OrdinalKv};
use crate::utils::Context;
use crate::{try_info, try_warn};

/// How often a progress line is logged while indexing.
const PROGRESS_LOG_INTERVAL: u64 = 100_000;

/// In-memory caches that exist only in recreate mode. Dropped wholesale on
/// `on_read_finished`.
#[derive(Default)]
struct RecreateCaches {
    names: HashMap<(String, String), NameRecord>,
    tokens: HashMap<String, TokenState>,
}

pub struct OrdinalIndexCore {
    kv: Arc<OrdinalKv>,
    checkpoint: Mutex<Checkpoint>,
    counters: Counters,
    notifier: NotificationRouter,
    resolver: Arc<dyn PubkeyResolver>,
    ctx: Context,
    lifecycle: Mutex<Lifecycle>,
    caches: Mutex<Option<RecreateCaches>>,
    last_indexed: AtomicU64,
}

impl OrdinalIndexCore {
    pub fn new(
        kv: Arc<OrdinalKv>,
        checkpoint: Checkpoint,
        resolver: Arc<dyn PubkeyResolver>,
        notifier: NotificationRouter,
        ctx: Context,
    ) -> OrdinalIndexCore {
        let last_indexed = checkpoint.load();
        OrdinalIndexCore {
            kv: kv.clone(),
            checkpoint: Mutex::new(checkpoint),
            counters: Counters::new(kv),
            notifier,
            resolver,
            ctx,
            lifecycle: Mutex::new(Lifecycle::new()),
            caches: Mutex::new(None),
            last_indexed: AtomicU64::new(last_indexed),
        }
    }

    pub fn last_indexed(&self) -> u64 {
        self.last_indexed.load(Ordering::SeqCst)
    }

    pub fn is_recreate(&self) -> bool {
        self.lifecycle.lock().unwrap().recreate
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    fn force_recreate(&self) -> Result<(), String> {
        try_warn!(self.ctx, "ordinal index entering recreate mode");
        self.kv.wipe().map_err(|e| e.to_string())?;
        self.last_indexed.store(0, Ordering::SeqCst);
        self.checkpoint.lock().unwrap().store(0);
        self.counters.resync_from_kv(0, 0, 0);
        *self.caches.lock().unwrap() = Some(RecreateCaches::default());
        let mut lifecycle = self.lifecycle.lock().unwrap();
        lifecycle.force_recreate();
        Ok(())
    }

    /// Called once before the bulk backfill begins, deciding whether to
    /// resume from the last checkpoint or fall back to a full recreate.
    pub fn on_start_read_from_db(&self, last_written: u64) -> Result<(), String> {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            lifecycle.enter_loading();
        }
        let last_indexed = self.checkpoint.lock().unwrap().load();
        if last_indexed == WRONG_SENTINEL || last_indexed > last_written {
            self.force_recreate()?;
        } else {
            try_info!(
                self.ctx,
                "resuming ordinal indexing from block {} to {}",
                last_indexed + 1,
                last_written
            );
        }
        self.lifecycle.lock().unwrap().enter_indexing();
        Ok(())
    }

    /// Applies one block during the bulk backfill pass.
    pub fn on_read_from_db(&self, block: &Block) -> Result<(), String> {
        let recreate = self.lifecycle.lock().unwrap().recreate;
        if recreate || self.last_indexed() < block.seq {
            self.apply_block(block)?;
        }
        Ok(())
    }

    /// Called once the bulk backfill pass has caught up to the chain tip.
    pub fn on_read_finished(&self) -> Result<(), String> {
        self.lifecycle.lock().unwrap().finish_indexing();
        *self.caches.lock().unwrap() = None;
        self.checkpoint.lock().unwrap().store(self.last_indexed());
        Ok(())
    }

    /// Reverses a block's effects during a reorg.
    pub fn on_remove_block(&self, block: &Block) -> Result<(), String> {
        self.rollback_block(block)
    }

    /// Applies a newly confirmed block and advances the checkpoint.
    pub fn on_new_block(&self, block: &Block) -> Result<(), String> {
        self.apply_block(block)?;
        self.checkpoint.lock().unwrap().store(self.last_indexed());
        Ok(())
    }

    fn apply_block(&self, block: &Block) -> Result<(), String> {
        for tx in &block.transactions {
            if let Some(parsed) = parse_inscription(tx) {
                self.apply_transaction(block.seq, tx, parsed)?;
            }
        }
        self.last_indexed.store(block.seq, Ordering::SeqCst);
        if block.seq % PROGRESS_LOG_INTERVAL == 0 {
            try_info!(self.ctx, "indexed ordinal block {}", block.seq);
        }
        Ok(())
    }

    fn apply_transaction(
        &self,
        block_seq: u64,
        tx: &Transaction,
        parsed: ParsedInscription,
    ) -> Result<(), String> {
        let kind = match &parsed.inscription {
            Inscription::NameOp { .. } => InscriptionKind::NameOp,
            Inscription::TokenDeploy { .. } => InscriptionKind::TokenDeploy,
            Inscription::TokenMint { .. } => InscriptionKind::TokenMint,
        };
        // the `0x04` meta record stores the raw public key, not the
        // wire-format (base58) address.
        let source = match self.resolver.resolve(&tx.source) {
            Ok(pubkey) => pubkey,
            Err(e) => {
                try_warn!(
                    self.ctx,
                    "failed to resolve source address for tx {:?}: {}",
                    tx.id(),
                    e
                );
                return Ok(());
            }
        };
        let meta = InscriptionMeta {
            kind,
            block_number: block_seq,
            tx_index: tx.index as u64,
            source,
            raw_json: parsed.raw_json,
        };
        let meta_key = keys::meta_key(tx.pool_seq, tx.index);
        if let Err(e) = self.kv.put(&meta_key, &meta.encode()) {
            try_warn!(
                self.ctx,
                "failed to store inscription metadata for tx {:?}: {}",
                tx.id(),
                e
            );
            return Ok(());
        }
        self.counters.incr_inscriptions();

        match parsed.inscription {
            Inscription::NameOp {
                namespace,
                op,
                name,
                relay,
            } => self.dispatch_name_op(block_seq, tx, namespace.as_str(), op, name, relay),
            Inscription::TokenDeploy {
                ticker, max, lim, ..
            } => self.dispatch_token_deploy(block_seq, tx, ticker, max, lim),
            Inscription::TokenMint { ticker, amt, .. } => {
                self.dispatch_token_mint(block_seq, tx, ticker, amt)
            }
        }
    }

    fn dispatch_name_op(
        &self,
        block_seq: u64,
        tx: &Transaction,
        ns: &str,
        op: NameOpKind,
        name: String,
        relay: Option<String>,
    ) -> Result<(), String> {
        let existing = self.lookup_name_raw(ns, &name)?;
        match op {
            NameOpKind::Reg => {
                if existing.is_some() {
                    return Ok(());
                }
                let record = NameRecord {
                    namespace: ns.to_string(),
                    name: name.clone(),
                    relay,
                    owner: tx.source.clone(),
                    first_seen_block: tx.pool_seq,
                    first_seen_tx_index: tx.index,
                };
                self.store_name(ns, &name, &record)?;
                self.counters.incr_names();
                self.notify(NotificationKind::NameRegistration, &record, block_seq, tx.index);
            }
            NameOpKind::Upd => {
                let mut record = match existing {
                    Some(r) => r,
                    None => return Ok(()),
                };
                if record.owner != tx.source {
                    return Ok(());
                }
                record.relay = relay;
                self.store_name(ns, &name, &record)?;
                self.notify(NotificationKind::NameUpdate, &record, block_seq, tx.index);
            }
            NameOpKind::Trf => {
                let mut record = match existing {
                    Some(r) => r,
                    None => return Ok(()),
                };
                if record.owner != tx.source {
                    return Ok(());
                }
                record.owner = tx.target.clone();
                self.store_name(ns, &name, &record)?;
                self.notify(NotificationKind::NameTransfer, &record, block_seq, tx.index);
            }
        }
        Ok(())
    }

    fn dispatch_token_deploy(
        &self,
        block_seq: u64,
        tx: &Transaction,
        ticker: String,
        max: i64,
        lim: i64,
    ) -> Result<(), String> {
        if self.lookup_token_raw(&ticker)?.is_some() {
            return Ok(());
        }
        let state = TokenState {
            ticker: ticker.clone(),
            max_supply: max,
            limit_per_mint: lim,
            total_minted: 0,
            deploy_block: tx.pool_seq,
            deployer: tx.source.clone(),
        };
        self.store_token(&ticker, &state)?;
        self.counters.incr_tokens();
        self.notify(NotificationKind::TokenDeploy, &state, block_seq, tx.index);
        Ok(())
    }

    fn dispatch_token_mint(
        &self,
        block_seq: u64,
        tx: &Transaction,
        ticker: String,
        amt: i64,
    ) -> Result<(), String> {
        let mut state = match self.lookup_token_raw(&ticker)? {
            Some(s) => s,
            None => return Ok(()),
        };
        if amt > state.limit_per_mint {
            return Ok(());
        }
        if state.total_minted.saturating_add(amt) > state.max_supply {
            return Ok(());
        }
        state.total_minted += amt;
        self.store_token(&ticker, &state)?;
        self.add_balance(&tx.source, &ticker, amt)?;
        self.notify(NotificationKind::TokenMint, &state, block_seq, tx.index);
        Ok(())
    }

    fn rollback_block(&self, block: &Block) -> Result<(), String> {
        // Walked in canonical (not reversed) order: rollback is not a
        // strict inverse of apply, so replaying transactions forward and
        // undoing each one's effect individually is sufficient.
        for tx in &block.transactions {
            if let Some(parsed) = parse_inscription(tx) {
                self.rollback_transaction(&parsed.inscription)?;
            }
        }
        let prev = self.last_indexed().saturating_sub(1);
        self.last_indexed.store(prev, Ordering::SeqCst);
        self.checkpoint.lock().unwrap().store(prev);
        Ok(())
    }

    fn rollback_transaction(&self, inscription: &Inscription) -> Result<(), String> {
        match inscription {
            Inscription::NameOp { namespace, op, name, .. } => match op {
                NameOpKind::Reg => {
                    self.delete_name(namespace.as_str(), name)?;
                    self.counters.decr_names();
                }
                NameOpKind::Upd | NameOpKind::Trf => {
                    try_warn!(
                        self.ctx,
                        "rollback of {:?} for {}/{} is not invertible; relay/owner left unchanged",
                        op,
                        namespace.as_str(),
                        name
                    );
                }
            },
            Inscription::TokenDeploy { ticker, .. } => {
                try_warn!(
                    self.ctx,
                    "rollback of token deploy for {} is not invertible",
                    ticker
                );
            }
            Inscription::TokenMint { ticker, amt, .. } => {
                if let Some(mut state) = self.lookup_token_raw(ticker)? {
                    state.total_minted = (state.total_minted - amt).max(0);
                    self.store_token(ticker, &state)?;
                }
                try_warn!(
                    self.ctx,
                    "rollback of mint for {} reduced totalMinted only; holder balances are not inverted",
                    ticker
                );
            }
        }
        Ok(())
    }

    fn notify<T: serde::Serialize>(
        &self,
        kind: NotificationKind,
        payload: &T,
        block: u64,
        tx_index: u32,
    ) {
        let payload_json = serde_json::to_string(payload).unwrap_or_default();
        self.notifier.emit(kind, payload_json, block, tx_index);
    }

    fn lookup_name_raw(&self, ns: &str, name: &str) -> Result<Option<NameRecord>, String> {
        let caches = self.caches.lock().unwrap();
        if let Some(c) = caches.as_ref() {
            return Ok(c.names.get(&(ns.to_string(), name.to_string())).cloned());
        }
        drop(caches);
        let key = keys::name_key(ns, name);
        match self.kv.get(&key).map_err(|e| e.to_string())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    fn store_name(&self, ns: &str, name: &str, record: &NameRecord) -> Result<(), String> {
        let key = keys::name_key(ns, name);
        let bytes = serde_json::to_vec(record).map_err(|e| e.to_string())?;
        self.kv.put(&key, &bytes).map_err(|e| e.to_string())?;
        if let Some(c) = self.caches.lock().unwrap().as_mut() {
            c.names.insert((ns.to_string(), name.to_string()), record.clone());
        }
        Ok(())
    }

    fn delete_name(&self, ns: &str, name: &str) -> Result<(), String> {
        let key = keys::name_key(ns, name);
        self.kv.delete(&key).map_err(|e| e.to_string())?;
        if let Some(c) = self.caches.lock().unwrap().as_mut() {
            c.names.remove(&(ns.to_string(), name.to_string()));
        }
        Ok(())
    }

    fn lookup_token_raw(&self, ticker: &str) -> Result<Option<TokenState>, String> {
        let caches = self.caches.lock().unwrap();
        if let Some(c) = caches.as_ref() {
            return Ok(c.tokens.get(ticker).cloned());
        }
        drop(caches);
        let key = keys::token_key(ticker);
        match self.kv.get(&key).map_err(|e| e.to_string())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    fn store_token(&self, ticker: &str, state: &TokenState) -> Result<(), String> {
        let key = keys::token_key(ticker);
        let bytes = serde_json::to_vec(state).map_err(|e| e.to_string())?;
        self.kv.put(&key, &bytes).map_err(|e| e.to_string())?;
        if let Some(c) = self.caches.lock().unwrap().as_mut() {
            c.tokens.insert(ticker.to_string(), state.clone());
        }
        Ok(())
    }

    fn add_balance(&self, address: &str, ticker: &str, delta: i64) -> Result<(), String> {
        let pubkey = self.resolver.resolve(address)?;
        let key = keys::balance_key(&pubkey, ticker);
        let current = match self.kv.get(&key).map_err(|e| e.to_string())? {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                i64::from_le_bytes(buf)
            }
            _ => 0,
        };
        let updated = current + delta;
        self.kv
            .put(&key, &updated.to_le_bytes())
            .map_err(|e| e.to_string())
    }

    pub(crate) fn kv(&self) -> &OrdinalKv {
        &self.kv
    }

    pub(crate) fn resolver(&self) -> &dyn PubkeyResolver {
        self.resolver.as_ref()
    }
}
