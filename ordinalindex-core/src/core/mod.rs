pub mod chain;
pub mod counters;
pub mod engine;
pub mod lifecycle;
pub mod notify;
pub mod parser;
pub mod queries;
pub mod resolver;
pub mod types;

pub use chain::{Block, Transaction, TxId, UserField};
pub use engine::OrdinalIndexCore;
pub use lifecycle::IndexState;
pub use notify::NotificationRouter;
pub use resolver::PubkeyResolver;
pub use types::*;

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::core::resolver::IdentityResolver;
    use crate::db::{Checkpoint, OrdinalKv};
    use crate::utils::Context;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_core() -> (OrdinalIndexCore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let kv = Arc::new(OrdinalKv::new(dir.path().join("kv"), 64).unwrap());
        let checkpoint = Checkpoint::open(dir.path().join("ordinal_last_indexed")).unwrap();
        let (router, _receiver) = NotificationRouter::channel();
        let core = OrdinalIndexCore::new(
            kv,
            checkpoint,
            Arc::new(IdentityResolver),
            router,
            Context::empty(),
        );
        (core, dir)
    }

    fn tx(pool_seq: u64, index: u32, source: &str, target: &str, payload: &str) -> Transaction {
        let mut fields = BTreeMap::new();
        fields.insert(1000, UserField::String(payload.to_string()));
        Transaction {
            pool_seq,
            index,
            source: source.to_string(),
            target: target.to_string(),
            user_fields: fields,
        }
    }

    fn block(seq: u64, transactions: Vec<Transaction>) -> Block {
        Block { seq, transactions }
    }

    #[test]
    fn scenario_genesis_registration() {
        let (core, _dir) = make_core();
        let b = block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"Alice","relay":"ipfs://x"}"#)],
        );
        core.on_new_block(&b).unwrap();

        let record = core.lookup_name("cns", "alice").unwrap().expect("registered");
        assert_eq!(record.owner, "A");
        assert_eq!(record.relay.as_deref(), Some("ipfs://x"));
        assert_eq!(record.first_seen_block, 1);
        assert_eq!(record.first_seen_tx_index, 0);
        assert_eq!(core.total_names(), 1);
    }

    #[test]
    fn scenario_first_seen_wins_within_a_block() {
        let (core, _dir) = make_core();
        let b = block(
            2,
            vec![
                tx(2, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"bob"}"#),
                tx(2, 1, "B", "", r#"{"p":"cns","op":"reg","cns":"bob"}"#),
            ],
        );
        core.on_new_block(&b).unwrap();

        let record = core.lookup_name("cns", "bob").unwrap().expect("registered");
        assert_eq!(record.owner, "A");
        assert_eq!(core.total_names(), 1);
    }

    #[test]
    fn scenario_ownership_preserving_transfer() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"Alice"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            3,
            vec![tx(3, 0, "A", "B", r#"{"p":"cns","op":"trf","cns":"Alice"}"#)],
        ))
        .unwrap();

        let record = core.lookup_name("cns", "alice").unwrap().expect("exists");
        assert_eq!(record.owner, "B");
        assert_eq!(record.first_seen_block, 1);
        assert_eq!(record.first_seen_tx_index, 0);
    }

    #[test]
    fn scenario_transfer_by_non_owner_is_ignored() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "C", "D", r#"{"p":"cns","op":"trf","cns":"alice"}"#)],
        ))
        .unwrap();

        let record = core.lookup_name("cns", "alice").unwrap().expect("exists");
        assert_eq!(record.owner, "A");
    }

    #[test]
    fn scenario_token_deploy_and_mint_cap() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            4,
            vec![tx(4, 0, "D", "", r#"{"p":"crc20","op":"deploy","tick":"FOO","max":"100","lim":"40"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            5,
            vec![tx(5, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"40"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            6,
            vec![tx(6, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"40"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            7,
            vec![tx(7, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"40"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            8,
            vec![tx(8, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"20"}"#)],
        ))
        .unwrap();

        let state = core.get_token("FOO").unwrap().expect("deployed");
        assert_eq!(state.total_minted, 100);
        assert_eq!(core.get_token_balance("M", "FOO").unwrap(), 100);
    }

    #[test]
    fn boundary_mint_at_cap_then_over_cap() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "D", "", r#"{"p":"crc20","op":"deploy","tick":"BAR","max":"10","lim":"10"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"BAR","amt":"10"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            3,
            vec![tx(3, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"BAR","amt":"1"}"#)],
        ))
        .unwrap();

        let state = core.get_token("BAR").unwrap().unwrap();
        assert_eq!(state.total_minted, 10);
    }

    #[test]
    fn boundary_mint_over_limit_per_mint_rejected() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "D", "", r#"{"p":"crc20","op":"deploy","tick":"BAZ","max":"1000","lim":"40"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"BAZ","amt":"41"}"#)],
        ))
        .unwrap();

        let state = core.get_token("BAZ").unwrap().unwrap();
        assert_eq!(state.total_minted, 0);
    }

    #[test]
    fn boundary_mixed_case_name_collision_rejected() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"Alice"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "B", "", r#"{"p":"cns","op":"reg","cns":"ALICE"}"#)],
        ))
        .unwrap();

        let record = core.lookup_name("cns", "alice").unwrap().unwrap();
        assert_eq!(record.owner, "A");
        assert_eq!(core.total_names(), 1);
    }

    #[test]
    fn boundary_unknown_op_ignored() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"teleport","cns":"alice"}"#)],
        ))
        .unwrap();

        assert!(core.lookup_name("cns", "alice").unwrap().is_none());
        assert_eq!(core.total_names(), 0);
        // The metadata write still happens for an unparsed op? No — classify
        // rejects before a ParsedInscription is produced, so no meta/audit
        // entry and no inscription counted either.
        assert_eq!(core.total_inscriptions(), 0);
    }

    #[test]
    fn scenario_reorg_of_a_registration() {
        let (core, _dir) = make_core();
        let b = block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"Alice"}"#)],
        );
        core.on_new_block(&b).unwrap();
        assert_eq!(core.last_indexed(), 1);

        core.on_remove_block(&b).unwrap();

        assert!(core.lookup_name("cns", "alice").unwrap().is_none());
        assert_eq!(core.last_indexed(), 0);
        assert_eq!(core.total_names(), 0);
    }

    #[test]
    fn recreate_mode_triggered_when_checkpoint_ahead_of_last_written() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            5,
            vec![tx(5, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"Alice"}"#)],
        ))
        .unwrap();
        assert_eq!(core.last_indexed(), 5);

        core.on_start_read_from_db(3).unwrap();
        assert!(core.is_recreate());
        assert_eq!(core.last_indexed(), 0);
        assert!(core.lookup_name("cns", "alice").unwrap().is_none());
    }

    #[test]
    fn recreate_caches_are_dropped_after_on_read_finished() {
        let (core, _dir) = make_core();
        core.on_start_read_from_db(WRONG_SENTINEL_MINUS_ONE).unwrap();
        core.on_read_from_db(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)],
        ))
        .unwrap();
        assert!(core.is_recreate());
        core.on_read_finished().unwrap();
        assert!(!core.is_recreate());
        let record = core.lookup_name("cns", "alice").unwrap().expect("persisted to KV");
        assert_eq!(record.owner, "A");
    }

    const WRONG_SENTINEL_MINUS_ONE: u64 = u64::MAX - 1;

    #[test]
    fn update_by_owner_changes_relay_only() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice","relay":"old"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "A", "", r#"{"p":"cns","op":"upd","cns":"alice","relay":"new"}"#)],
        ))
        .unwrap();

        let record = core.lookup_name("cns", "alice").unwrap().unwrap();
        assert_eq!(record.relay.as_deref(), Some("new"));
        assert_eq!(record.first_seen_block, 1);
    }

    #[test]
    fn redeploy_of_existing_ticker_is_ignored() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"crc20","op":"deploy","tick":"FOO","max":"10","lim":"10"}"#)],
        ))
        .unwrap();
        core.on_new_block(&block(
            2,
            vec![tx(2, 0, "B", "", r#"{"p":"crc20","op":"deploy","tick":"FOO","max":"999","lim":"999"}"#)],
        ))
        .unwrap();

        let state = core.get_token("FOO").unwrap().unwrap();
        assert_eq!(state.max_supply, 10);
        assert_eq!(state.deployer, "A");
        assert_eq!(core.total_tokens(), 1);
    }

    #[test]
    fn non_inscription_transaction_is_ignored() {
        let (core, _dir) = make_core();
        let mut fields = BTreeMap::new();
        fields.insert(1000, UserField::Other);
        let b = block(
            1,
            vec![Transaction {
                pool_seq: 1,
                index: 0,
                source: "A".to_string(),
                target: "".to_string(),
                user_fields: fields,
            }],
        );
        core.on_new_block(&b).unwrap();
        assert_eq!(core.total_inscriptions(), 0);
        assert_eq!(core.total_names(), 0);
    }

    #[test]
    fn checkpoint_is_non_decreasing_across_live_blocks() {
        let (core, _dir) = make_core();
        for seq in 1..=5u64 {
            core.on_new_block(&block(seq, vec![])).unwrap();
            assert_eq!(core.last_indexed(), seq);
        }
    }

    /// Rollback of `trf` is not a strict inverse — only the checkpoint
    /// decrements, ownership stays put.
    #[test]
    fn rollback_of_transfer_does_not_restore_previous_owner() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)],
        ))
        .unwrap();
        let transfer_block = block(2, vec![tx(2, 0, "A", "B", r#"{"p":"cns","op":"trf","cns":"alice"}"#)]);
        core.on_new_block(&transfer_block).unwrap();
        assert_eq!(core.lookup_name("cns", "alice").unwrap().unwrap().owner, "B");

        core.on_remove_block(&transfer_block).unwrap();

        assert_eq!(core.lookup_name("cns", "alice").unwrap().unwrap().owner, "B");
        assert_eq!(core.last_indexed(), 1);
    }

    /// Mint rollback only decrements `totalMinted`, never the holder's
    /// balance.
    #[test]
    fn rollback_of_mint_reduces_total_minted_but_not_balance() {
        let (core, _dir) = make_core();
        core.on_new_block(&block(
            1,
            vec![tx(1, 0, "D", "", r#"{"p":"crc20","op":"deploy","tick":"FOO","max":"100","lim":"50"}"#)],
        ))
        .unwrap();
        let mint_block = block(2, vec![tx(2, 0, "M", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"50"}"#)]);
        core.on_new_block(&mint_block).unwrap();
        assert_eq!(core.get_token_balance("M", "FOO").unwrap(), 50);

        core.on_remove_block(&mint_block).unwrap();

        assert_eq!(core.get_token("FOO").unwrap().unwrap().total_minted, 0);
        assert_eq!(core.get_token_balance("M", "FOO").unwrap(), 50);
    }

    /// `on_read_from_db` must not re-dispatch a block at or below the
    /// resumed checkpoint outside recreate mode.
    #[test]
    fn resume_skips_already_indexed_blocks() {
        let dir = tempdir().unwrap();
        {
            let kv = Arc::new(OrdinalKv::new(dir.path().join("kv"), 64).unwrap());
            let checkpoint = Checkpoint::open(dir.path().join("ordinal_last_indexed")).unwrap();
            let (router, _receiver) = NotificationRouter::channel();
            let core = OrdinalIndexCore::new(kv, checkpoint, Arc::new(IdentityResolver), router, Context::empty());
            core.on_new_block(&block(
                1,
                vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)],
            ))
            .unwrap();
        }

        let kv = Arc::new(OrdinalKv::new(dir.path().join("kv"), 64).unwrap());
        let checkpoint = Checkpoint::open(dir.path().join("ordinal_last_indexed")).unwrap();
        let (router, _receiver) = NotificationRouter::channel();
        let core = OrdinalIndexCore::new(kv, checkpoint, Arc::new(IdentityResolver), router, Context::empty());
        core.on_start_read_from_db(1).unwrap();
        assert!(!core.is_recreate());

        core.on_read_from_db(&block(
            1,
            vec![tx(1, 0, "Intruder", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)],
        ))
        .unwrap();
        core.on_read_finished().unwrap();

        assert_eq!(core.total_names(), 1);
        assert_eq!(core.lookup_name("cns", "alice").unwrap().unwrap().owner, "A");
    }

    /// P8: recreating from genesis through block n, then switching to live
    /// and appending more blocks, matches applying every block live in one
    /// pass from genesis.
    #[test]
    fn recreate_then_live_matches_pure_live_replay() {
        let blocks = vec![
            block(1, vec![tx(1, 0, "A", "", r#"{"p":"cns","op":"reg","cns":"alice"}"#)]),
            block(2, vec![tx(2, 0, "A", "B", r#"{"p":"cns","op":"trf","cns":"alice"}"#)]),
            block(
                3,
                vec![tx(3, 0, "D", "", r#"{"p":"crc20","op":"deploy","tick":"FOO","max":"100","lim":"50"}"#)],
            ),
            block(4, vec![tx(4, 0, "C", "", r#"{"p":"crc20","op":"mint","tick":"FOO","amt":"50"}"#)]),
        ];

        let (live_core, _live_dir) = make_core();
        for b in &blocks {
            live_core.on_new_block(b).unwrap();
        }

        let (recreate_core, _recreate_dir) = make_core();
        recreate_core.on_start_read_from_db(2).unwrap();
        recreate_core.on_read_from_db(&blocks[0]).unwrap();
        recreate_core.on_read_from_db(&blocks[1]).unwrap();
        recreate_core.on_read_finished().unwrap();
        recreate_core.on_new_block(&blocks[2]).unwrap();
        recreate_core.on_new_block(&blocks[3]).unwrap();

        assert_eq!(
            live_core.lookup_name("cns", "alice").unwrap(),
            recreate_core.lookup_name("cns", "alice").unwrap()
        );
        assert_eq!(
            live_core.get_token("FOO").unwrap(),
            recreate_core.get_token("FOO").unwrap()
        );
        assert_eq!(live_core.last_indexed(), recreate_core.last_indexed());
        assert_eq!(live_core.total_names(), recreate_core.total_names());
        assert_eq!(live_core.total_tokens(), recreate_core.total_tokens());
    }
}
