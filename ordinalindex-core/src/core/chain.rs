//! Plain data types describing what the core consumes from the node.
//! These are intentionally minimal — the real block/transaction
//! representations (signatures, scripts, fee data, ...) live in the node
//! and are out of this subsystem's scope. Analogous in spirit to
//! `chainhook-types-rs` being a small shared data crate, folded here since
//! this subsystem only needs a handful of fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One of the transaction's keyed "user-fields". Only the `String` kind
/// is ever treated as a candidate inscription payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UserField {
    String(String),
    Other,
}

/// `(poolSeq, index)`, the transaction's identity within the chain.
pub type TxId = (u64, u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub pool_seq: u64,
    pub index: u32,
    pub source: String,
    pub target: String,
    pub user_fields: BTreeMap<i64, UserField>,
}

impl Transaction {
    pub fn id(&self) -> TxId {
        (self.pool_seq, self.index)
    }
}

/// Also serializable: the `cli`'s offline rollback tool reads a JSON array
/// of these from a file supplied by the node during a reorg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub seq: u64,
    pub transactions: Vec<Transaction>,
}
