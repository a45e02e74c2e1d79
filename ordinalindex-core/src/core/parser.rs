//! Inscription Parser: extracts a candidate JSON payload from a
//! transaction's user fields and classifies it into a domain inscription.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::chain::{Transaction, UserField};
use crate::core::types::{Inscription, NameNamespace, NameOpKind};

/// Transaction user-field tag read first; if absent, the fallback tags are
/// tried in order and the first whose string value contains both `"p"` and
/// `"op"` substrings wins.
pub const PRIMARY_FIELD_TAG: i64 = 1000;
pub const FALLBACK_FIELD_TAGS: [i64; 7] = [0, 1, 2, 5, 10, 100, 999];

/// A transaction that carried a well-formed inscription payload, parsed
/// but not yet validated against domain rules.
pub struct ParsedInscription {
    pub inscription: Inscription,
    pub raw_json: String,
}

fn candidate_field(tx: &Transaction) -> Option<&str> {
    if let Some(UserField::String(s)) = tx.user_fields.get(&PRIMARY_FIELD_TAG) {
        return Some(s.as_str());
    }
    for tag in FALLBACK_FIELD_TAGS {
        if let Some(UserField::String(s)) = tx.user_fields.get(&tag) {
            if s.contains('p') && s.contains("op") {
                return Some(s.as_str());
            }
        }
    }
    None
}

/// Parses `raw` as a restricted single-level string→string JSON object.
/// Any other shape (nesting, arrays, non-string values, non-object top
/// level, invalid JSON) is rejected.
fn parse_restricted_object(raw: &str) -> Option<BTreeMap<String, String>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let mut fields = BTreeMap::new();
    for (k, v) in object.iter() {
        let s = v.as_str()?;
        fields.insert(k.clone(), s.to_string());
    }
    Some(fields)
}

fn is_well_formed_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(' ')
}

fn classify(fields: &BTreeMap<String, String>) -> Option<Inscription> {
    let p = fields.get("p")?;
    let op = fields.get("op")?.to_lowercase();

    match op.as_str() {
        "reg" | "upd" | "trf" => {
            let namespace = NameNamespace::parse(p.to_lowercase().as_str())?;
            let op_kind = NameOpKind::parse(op.as_str())?;
            let name = fields.get("cns")?;
            if !is_well_formed_name(name) {
                return None;
            }
            Some(Inscription::NameOp {
                namespace,
                op: op_kind,
                name: name.to_lowercase(),
                relay: fields.get("relay").cloned(),
            })
        }
        "deploy" => {
            let tick = fields.get("tick")?;
            let max: i64 = fields.get("max")?.parse().ok()?;
            let lim: i64 = fields.get("lim")?.parse().ok()?;
            if max <= 0 || lim <= 0 {
                return None;
            }
            Some(Inscription::TokenDeploy {
                protocol: p.clone(),
                ticker: tick.clone(),
                max,
                lim,
            })
        }
        "mint" => {
            let tick = fields.get("tick")?;
            let amt: i64 = fields.get("amt")?.parse().ok()?;
            if amt <= 0 {
                return None;
            }
            Some(Inscription::TokenMint {
                protocol: p.clone(),
                ticker: tick.clone(),
                amt,
            })
        }
        // Classified, but an operation this index does not recognize.
        _ => None,
    }
}

/// Attempts to parse an inscription out of a transaction. Returns `None`
/// if there is no candidate field, the field isn't a string, the JSON
/// isn't well-formed/restricted, or required keys/values are missing or
/// invalid. Never panics and never aborts block processing — the caller
/// treats `None` as "not an inscription".
pub fn parse_inscription(tx: &Transaction) -> Option<ParsedInscription> {
    let raw = candidate_field(tx)?;
    let fields = parse_restricted_object(raw)?;
    let inscription = classify(&fields)?;
    Some(ParsedInscription {
        inscription,
        raw_json: raw.to_string(),
    })
}
