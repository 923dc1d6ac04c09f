//! Property-based tests for the sync cursor, the gate and height extraction

use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tictactoe_params::SyncTiming;
use tictactoe_storage_sqlite::MemoryStore;
use tictactoe_sync::testing::{new_block, MockLedger};
use tictactoe_sync::{extract_height, ClientConfig, GateTransition, HeightLedger, SyncEngine, SyncGate};

const CHAIN: &str = "aa01";

fn heights_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..1_000_000, 0..40)
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_cursor_is_running_max(persisted in 0u64..1_000_000, heights in heights_strategy()) {
        let store = Arc::new(MemoryStore::new().with_raw_height(CHAIN, &persisted.to_string()));
        let ledger = HeightLedger::load(CHAIN, store.clone());

        let mut expected = persisted;
        for h in &heights {
            expected = expected.max(*h);
            prop_assert_eq!(ledger.observe(*h), expected);
        }
        prop_assert_eq!(ledger.cursor(), expected);
        if !heights.is_empty() {
            let stored = expected.to_string();
            let raw = store.raw_height(CHAIN);
            prop_assert_eq!(raw.as_deref(), Some(stored.as_str()));
        }
    }

    #[test]
    fn prop_cursor_ignores_order(heights in heights_strategy()) {
        let forward = HeightLedger::load(CHAIN, Arc::new(MemoryStore::new()));
        let backward = HeightLedger::load(CHAIN, Arc::new(MemoryStore::new()));
        for h in &heights {
            forward.observe(*h);
        }
        for h in heights.iter().rev() {
            backward.observe(*h);
        }
        prop_assert_eq!(forward.cursor(), backward.cursor());
    }

    #[test]
    fn prop_gate_unlocks_exactly_once(threshold in 1u64..1_000, heights in prop::collection::vec(0u64..2_000, 0..40)) {
        let gate = SyncGate::armed(Some(threshold));
        let mut unlocks = 0;
        for (i, h) in heights.iter().enumerate() {
            let reached = heights[..=i].iter().any(|x| *x >= threshold);
            if gate.observe(*h) == GateTransition::Unlocked {
                unlocks += 1;
            }
            prop_assert_eq!(gate.is_unlocked(), reached);
        }
        prop_assert!(unlocks <= 1);
        prop_assert_eq!(gate.threshold(), threshold);
    }

    #[test]
    fn prop_new_block_height_extracted(height in any::<u64>()) {
        prop_assert_eq!(extract_height(&new_block(CHAIN, height)), Some(height));
        prop_assert_eq!(extract_height(&json!({ "height": height })), Some(height));
    }

    #[test]
    fn prop_match_fields_neutral_while_locked(
        threshold in 2u64..500,
        heights in prop::collection::vec(0u64..500, 1..20),
    ) {
        let below: Vec<u64> = heights.into_iter().filter(|h| *h < threshold).collect();
        let rt = paused_runtime();
        rt.block_on(async {
            let ledger = MockLedger::new(CHAIN);
            ledger.set_game_data(json!({
                "game": null, "matchStatus": "InProgress", "isHost": true,
                "opponentChainId": "bb02", "board": [0, 1, -1, -1, -1, -1, -1, -1, -1],
                "currentTurnChainId": CHAIN, "winnerChainId": null, "lastNotification": null
            }));
            let store = Arc::new(MemoryStore::new().with_raw_height(CHAIN, &threshold.to_string()));
            let config = ClientConfig {
                application_id: "ab:cd".to_string(),
                timing: SyncTiming { debounce_ms: 150, poll_interval_ms: 2_500, init_grace_ms: 100 },
                ..ClientConfig::default()
            };
            let engine = SyncEngine::with_store(config, Arc::new(ledger.clone()), store);
            engine.run().await.unwrap();

            for h in &below {
                engine.handle_notification(&new_block(CHAIN, *h));
                engine.refresh().await;
            }
            tokio::time::sleep(std::time::Duration::from_secs(6)).await;

            let view = engine.view();
            assert_eq!(ledger.fetch_count(), 0);
            assert_eq!(view.match_status.get(), None);
            assert!(!view.is_host.get());
            assert_eq!(view.board.get(), None);
            assert_eq!(view.opponent_chain_id.get(), None);
            assert_eq!(engine.sync_cursor(), Some(threshold));
            engine.shutdown();
        });
    }
}
