//! Public query API over the ordinal index's KV state.

use crate::core::engine::OrdinalIndexCore;
use crate::core::types::{NameRecord, TokenState};
use crate::db::keys;

impl OrdinalIndexCore {
    pub fn name_available(&self, namespace: &str, name: &str) -> Result<bool, String> {
        Ok(self.lookup_name(namespace, name)?.is_none())
    }

    pub fn lookup_name(&self, namespace: &str, name: &str) -> Result<Option<NameRecord>, String> {
        let ns = namespace.to_lowercase();
        let name = name.to_lowercase();
        let key = keys::name_key(&ns, &name);
        match self.kv().get(&key).map_err(|e| e.to_string())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    /// Iterates the `0x01` name prefix and returns every record owned by
    /// `owner`.
    pub fn names_by_owner(&self, owner: &str) -> Result<Vec<NameRecord>, String> {
        let mut out = Vec::new();
        self.kv()
            .iterate_prefix(&[keys::NAME_PREFIX], |_k, v| {
                if let Ok(record) = serde_json::from_slice::<NameRecord>(v) {
                    if record.owner == owner {
                        out.push(record);
                    }
                }
                true
            })
            .map_err(|e| e.to_string())?;
        Ok(out)
    }

    pub fn get_token(&self, ticker: &str) -> Result<Option<TokenState>, String> {
        let key = keys::token_key(ticker);
        match self.kv().get(&key).map_err(|e| e.to_string())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    /// `offset`/`limit` paginate the `0x02` prefix in ascending ticker
    /// order; `filter`, when given, is matched against the ticker as a
    /// case-sensitive substring (tickers are never normalized).
    pub fn list_tokens(
        &self,
        offset: usize,
        limit: usize,
        filter: Option<&str>,
    ) -> Result<Vec<TokenState>, String> {
        let mut matched = Vec::new();
        self.kv()
            .iterate_prefix(&[keys::TOKEN_PREFIX], |_k, v| {
                if let Ok(state) = serde_json::from_slice::<TokenState>(v) {
                    let keep = match filter {
                        Some(f) => state.ticker.contains(f),
                        None => true,
                    };
                    if keep {
                        matched.push(state);
                    }
                }
                true
            })
            .map_err(|e| e.to_string())?;
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    pub fn get_token_balance(&self, address: &str, ticker: &str) -> Result<i64, String> {
        let pubkey = self.resolver().resolve(address)?;
        let key = keys::balance_key(&pubkey, ticker);
        match self.kv().get(&key).map_err(|e| e.to_string())? {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                Ok(i64::from_le_bytes(buf))
            }
            _ => Ok(0),
        }
    }

    pub fn total_names(&self) -> u64 {
        self.counters().names()
    }

    pub fn total_tokens(&self) -> u64 {
        self.counters().tokens()
    }

    pub fn total_inscriptions(&self) -> u64 {
        self.counters().inscriptions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolver::IdentityResolver;
    use crate::core::{Block, NotificationRouter, Transaction, UserField};
    use crate::db::{Checkpoint, OrdinalKv};
    use crate::utils::Context;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn make_core() -> (OrdinalIndexCore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv = Arc::new(OrdinalKv::new(dir.path().join("kv"), 64).unwrap());
        let checkpoint = Checkpoint::open(dir.path().join("ordinal_last_indexed")).unwrap();
        let (router, _receiver) = NotificationRouter::channel();
        let core = OrdinalIndexCore::new(kv, checkpoint, Arc::new(IdentityResolver), router, Context::empty());
        (core, dir)
    }

    fn tx(pool_seq: u64, index: u32, source: &str, payload: &str) -> Transaction {
        let mut fields = BTreeMap::new();
        fields.insert(1000, UserField::String(payload.to_string()));
        Transaction {
            pool_seq,
            index,
            source: source.to_string(),
            target: "".to_string(),
            user_fields: fields,
        }
    }

    /// `names_by_owner` iterates the `0x01` prefix and filters by owner.
    #[test]
    fn names_by_owner_returns_only_matching_records() {
        let (core, _dir) = make_core();
        core.on_new_block(&Block {
            seq: 1,
            transactions: vec![
                tx(1, 0, "A", r#"{"p":"cns","op":"reg","cns":"one"}"#),
                tx(1, 1, "B", r#"{"p":"cns","op":"reg","cns":"two"}"#),
                tx(1, 2, "A", r#"{"p":"cns","op":"reg","cns":"three"}"#),
            ],
        })
        .unwrap();

        let mut names: Vec<String> = core.names_by_owner("A").unwrap().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn list_tokens_paginates_and_filters_by_substring() {
        let (core, _dir) = make_core();
        for (i, tick) in ["AAA", "BBB", "ABC"].iter().enumerate() {
            core.on_new_block(&Block {
                seq: i as u64 + 1,
                transactions: vec![tx(
                    i as u64 + 1,
                    0,
                    "D",
                    &format!(r#"{{"p":"crc20","op":"deploy","tick":"{tick}","max":"10","lim":"10"}}"#),
                )],
            })
            .unwrap();
        }

        let all = core.list_tokens(0, 10, None).unwrap();
        assert_eq!(all.len(), 3);

        let filtered = core.list_tokens(0, 10, Some("A")).unwrap();
        let mut tickers: Vec<String> = filtered.into_iter().map(|t| t.ticker).collect();
        tickers.sort();
        assert_eq!(tickers, vec!["AAA".to_string(), "ABC".to_string()]);

        let page = core.list_tokens(1, 1, None).unwrap();
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn name_available_reflects_normalized_form() {
        let (core, _dir) = make_core();
        assert!(core.name_available("cns", "alice").unwrap());
        core.on_new_block(&Block {
            seq: 1,
            transactions: vec![tx(1, 0, "A", r#"{"p":"cns","op":"reg","cns":"Alice"}"#)],
        })
        .unwrap();
        assert!(!core.name_available("CNS", "ALICE").unwrap());
    }
}
