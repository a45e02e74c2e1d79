//! Domain entities for the ordinal index: names, tokens, and the
//! inscriptions that mutate them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameNamespace {
    Cdns,
    Cns,
}

impl NameNamespace {
    pub fn parse(s: &str) -> Option<NameNamespace> {
        match s {
            "cdns" => Some(NameNamespace::Cdns),
            "cns" => Some(NameNamespace::Cns),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NameNamespace::Cdns => "cdns",
            NameNamespace::Cns => "cns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOpKind {
    Reg,
    Upd,
    Trf,
}

impl NameOpKind {
    pub fn parse(s: &str) -> Option<NameOpKind> {
        match s {
            "reg" => Some(NameOpKind::Reg),
            "upd" => Some(NameOpKind::Upd),
            "trf" => Some(NameOpKind::Trf),
            _ => None,
        }
    }
}

/// A parsed, but not-yet-applied, inscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Inscription {
    NameOp {
        namespace: NameNamespace,
        op: NameOpKind,
        name: String,
        relay: Option<String>,
    },
    TokenDeploy {
        protocol: String,
        ticker: String,
        max: i64,
        lim: i64,
    },
    TokenMint {
        protocol: String,
        ticker: String,
        amt: i64,
    },
}

/// Logical row keyed by `(namespace, name)`, both already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    pub namespace: String,
    pub name: String,
    pub relay: Option<String>,
    /// base58-encoded address, mirroring the KV value's wire shape.
    pub owner: String,
    pub first_seen_block: u64,
    pub first_seen_tx_index: u32,
}

/// Keyed by `ticker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenState {
    pub ticker: String,
    pub max_supply: i64,
    pub limit_per_mint: i64,
    pub total_minted: i64,
    pub deploy_block: u64,
    pub deployer: String,
}

/// Keyed by `(poolSeq, txIndex)`: an audit record of every applied
/// inscription.
#[derive(Debug, Clone, PartialEq)]
pub struct InscriptionMeta {
    pub kind: InscriptionKind,
    pub block_number: u64,
    pub tx_index: u64,
    pub source: Vec<u8>,
    pub raw_json: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InscriptionKind {
    NameOp = 1,
    TokenDeploy = 2,
    TokenMint = 3,
}

impl InscriptionKind {
    pub fn from_u8(b: u8) -> Option<InscriptionKind> {
        match b {
            1 => Some(InscriptionKind::NameOp),
            2 => Some(InscriptionKind::TokenDeploy),
            3 => Some(InscriptionKind::TokenMint),
            _ => None,
        }
    }
}

impl InscriptionMeta {
    /// Packs this record into the `0x04` value layout:
    /// `{type: u8, blockNumber: u64, txIndex: u64, source: raw_public_key,
    /// data_len: usize, raw_json}`. `source` and `raw_json` are
    /// length-prefixed so the fixed header can be read back unambiguously.
    pub fn encode(&self) -> Vec<u8> {
        let json_bytes = self.raw_json.as_bytes();
        let mut out = Vec::with_capacity(1 + 8 + 8 + 8 + self.source.len() + 8 + json_bytes.len());
        out.push(self.kind as u8);
        out.extend_from_slice(&self.block_number.to_le_bytes());
        out.extend_from_slice(&self.tx_index.to_le_bytes());
        out.extend_from_slice(&(self.source.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.source);
        out.extend_from_slice(&(json_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(json_bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> Option<InscriptionMeta> {
        let mut pos = 0usize;
        let read_u8 = |pos: &mut usize| -> Option<u8> {
            let b = *bytes.get(*pos)?;
            *pos += 1;
            Some(b)
        };
        let read_u64 = |pos: &mut usize| -> Option<u64> {
            let slice = bytes.get(*pos..*pos + 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(slice);
            *pos += 8;
            Some(u64::from_le_bytes(buf))
        };
        let kind = InscriptionKind::from_u8(read_u8(&mut pos)?)?;
        let block_number = read_u64(&mut pos)?;
        let tx_index = read_u64(&mut pos)?;
        let source_len = read_u64(&mut pos)? as usize;
        let source = bytes.get(pos..pos + source_len)?.to_vec();
        pos += source_len;
        let json_len = read_u64(&mut pos)? as usize;
        let raw_json = std::str::from_utf8(bytes.get(pos..pos + json_len)?)
            .ok()?
            .to_string();
        Some(InscriptionMeta {
            kind,
            block_number,
            tx_index,
            source,
            raw_json,
        })
    }
}


/// Emitted after a successful state change.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub payload_json: String,
    pub block: u64,
    pub tx_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NameRegistration,
    NameUpdate,
    NameTransfer,
    TokenDeploy,
    TokenMint,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NameRegistration => "name_registration",
            NotificationKind::NameUpdate => "name_update",
            NotificationKind::NameTransfer => "name_transfer",
            NotificationKind::TokenDeploy => "token_deploy",
            NotificationKind::TokenMint => "token_mint",
        }
    }
}
