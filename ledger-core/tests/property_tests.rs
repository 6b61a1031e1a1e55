//! Property-based tests for ledger invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Deterministic replay: flushed transactions replay to the same balances
//! - Atomic rejection: an overdraft changes nothing
//! - Minting: rewards only credit the receiver
//! - Idempotent flush: an empty buffer writes nothing

use balance_ledger::{
    Account, Balances, Config, Error, Genesis, MemoryLog, State, Transaction,
};
use proptest::prelude::*;
use tempfile::TempDir;

const ACCOUNTS: &[&str] = &["andrej", "babayaga", "caesar", "dorota"];

/// Strategy for generating account names
fn account_strategy() -> impl Strategy<Value = Account> {
    prop::sample::select(ACCOUNTS).prop_map(Account::new)
}

/// Strategy for generating a genesis over the fixed account set
fn genesis_strategy() -> impl Strategy<Value = Genesis> {
    prop::collection::vec(0u64..10_000, ACCOUNTS.len()).prop_map(|amounts| {
        Genesis::from_balances(
            ACCOUNTS
                .iter()
                .zip(amounts)
                .map(|(name, amount)| (Account::new(*name), amount)),
        )
    })
}

/// Strategy for generating transactions, some of which overdraft
fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (
        account_strategy(),
        account_strategy(),
        0u64..5_000,
        prop_oneof![4 => Just(""), 1 => Just("reward"), 1 => Just("rent")],
    )
        .prop_map(|(from, to, value, data)| Transaction::new(from, to, value, data))
}

/// Create on-disk config with the given genesis
fn create_test_config(genesis: &Genesis) -> (Config, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::for_data_dir(temp_dir.path());
    std::fs::write(&config.genesis_path, serde_json::to_vec(genesis).unwrap()).unwrap();
    (config, temp_dir)
}

fn balance_of(balances: &Balances, name: &str) -> u64 {
    balances.get(&Account::new(name)).copied().unwrap_or(0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: flushed transactions replay to exactly the same balances
    #[test]
    fn prop_flush_replay_round_trip(
        genesis in genesis_strategy(),
        txs in prop::collection::vec(transaction_strategy(), 0..40),
    ) {
        let (config, _temp) = create_test_config(&genesis);

        let mut state = State::open(&config).unwrap();
        let mut accepted = 0;
        for tx in txs {
            if state.apply(tx).is_ok() {
                accepted += 1;
            }
        }
        prop_assert_eq!(state.pending().len(), accepted);

        prop_assert_eq!(state.flush().unwrap(), accepted);
        let expected = state.balances().clone();
        state.close().unwrap();

        let reopened = State::open(&config).unwrap();
        prop_assert_eq!(reopened.balances(), &expected);
        prop_assert_eq!(reopened.replayed(), accepted);
        prop_assert!(reopened.pending().is_empty());
    }

    /// Property: an overdraft fails and leaves the state untouched
    #[test]
    fn prop_overdraft_rejected_atomically(
        genesis in genesis_strategy(),
        from in account_strategy(),
        to in account_strategy(),
        excess in 1u64..1_000,
    ) {
        let mut state = State::from_parts(genesis, MemoryLog::new()).unwrap();
        let before = state.balances().clone();
        let value = state.balance(&from) + excess;

        let result = state.apply(Transaction::new(from, to, value, ""));

        let is_insufficient = matches!(result, Err(Error::InsufficientBalance { .. }));
        prop_assert!(is_insufficient);
        prop_assert_eq!(state.balances(), &before);
        prop_assert!(state.pending().is_empty());
    }

    /// Property: rewards always succeed and only credit the receiver
    #[test]
    fn prop_reward_only_credits_receiver(
        genesis in genesis_strategy(),
        from in "[a-z]{1,8}",
        to in account_strategy(),
        value in 0u64..1_000_000,
    ) {
        let mut state = State::from_parts(genesis, MemoryLog::new()).unwrap();
        let before = state.balances().clone();

        state.apply(Transaction::new(from, to.clone(), value, "reward")).unwrap();

        for (account, balance) in state.balances() {
            if *account == to {
                prop_assert_eq!(*balance, before[account] + value);
            } else {
                prop_assert_eq!(Some(balance), before.get(account));
            }
        }
        prop_assert_eq!(state.balances().len(), before.len());
    }

    /// Property: a second flush with nothing new applied writes no records
    #[test]
    fn prop_flush_idempotent_on_empty_buffer(
        genesis in genesis_strategy(),
        txs in prop::collection::vec(transaction_strategy(), 0..20),
    ) {
        let mut state = State::from_parts(genesis, MemoryLog::new()).unwrap();
        for tx in txs {
            let _ = state.apply(tx);
        }

        state.flush().unwrap();
        let records = state.log().records().to_vec();

        prop_assert_eq!(state.flush().unwrap(), 0);
        prop_assert_eq!(state.log().records(), records.as_slice());
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_worked_example() {
        let genesis = Genesis::from_balances([(Account::new("a"), 100)]);
        let (config, _temp) = create_test_config(&genesis);

        let mut state = State::open(&config).unwrap();

        state.apply(Transaction::new("a", "b", 40, "")).unwrap();
        assert_eq!(balance_of(state.balances(), "a"), 60);
        assert_eq!(balance_of(state.balances(), "b"), 40);

        let before = state.balances().clone();
        let err = state.apply(Transaction::new("b", "a", 1000, "")).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(state.balances(), &before);

        state.apply(Transaction::new("sys", "b", 10, "reward")).unwrap();
        assert_eq!(balance_of(state.balances(), "a"), 60);
        assert_eq!(balance_of(state.balances(), "b"), 50);
        assert_eq!(state.balances().len(), 2);

        assert_eq!(state.flush().unwrap(), 2);
        state.close().unwrap();

        let state = State::open(&config).unwrap();
        assert_eq!(balance_of(state.balances(), "a"), 60);
        assert_eq!(balance_of(state.balances(), "b"), 50);
        assert_eq!(state.total_supply(), 110);
        state.close().unwrap();
    }

    #[test]
    fn test_zero_value_is_buffered_and_flushed() {
        let genesis = Genesis::from_balances([(Account::new("a"), 100)]);
        let (config, _temp) = create_test_config(&genesis);

        let mut state = State::open(&config).unwrap();
        state.apply(Transaction::new("nobody", "a", 0, "")).unwrap();

        assert_eq!(state.balance(&Account::new("a")), 100);
        assert_eq!(state.balance(&Account::new("nobody")), 0);
        assert_eq!(state.pending().len(), 1);

        assert_eq!(state.flush().unwrap(), 1);
        state.close().unwrap();

        let log = std::fs::read_to_string(&config.tx_log_path).unwrap();
        assert_eq!(log, "{\"from\":\"nobody\",\"to\":\"a\",\"value\":0,\"data\":\"\"}\n");

        let state = State::open(&config).unwrap();
        assert_eq!(state.replayed(), 1);
        assert_eq!(state.balance(&Account::new("a")), 100);
    }

    #[test]
    fn test_appends_after_existing_records() {
        let genesis = Genesis::from_balances([(Account::new("a"), 10)]);
        let (config, _temp) = create_test_config(&genesis);

        for round in 0..3 {
            let mut state = State::open(&config).unwrap();
            assert_eq!(state.replayed(), round);
            state.apply(Transaction::new("a", "b", 1, "")).unwrap();
            state.flush().unwrap();
            state.close().unwrap();
        }

        let log = std::fs::read_to_string(&config.tx_log_path).unwrap();
        assert_eq!(log.lines().count(), 3);

        let state = State::open(&config).unwrap();
        assert_eq!(state.balance(&Account::new("a")), 7);
        assert_eq!(state.balance(&Account::new("b")), 3);
    }

    #[test]
    fn test_failed_flush_then_retry_replays_once() {
        let genesis = Genesis::from_balances([(Account::new("a"), 100)]);
        let mut state = State::from_parts(genesis.clone(), MemoryLog::new()).unwrap();

        for value in [10, 20, 30] {
            state.apply(Transaction::new("a", "b", value, "")).unwrap();
        }

        state.log_mut().fail_after(1);
        assert!(matches!(state.flush(), Err(Error::Persist { pending: 2, .. })));

        state.log_mut().heal();
        assert_eq!(state.flush().unwrap(), 2);

        let replayed = State::from_parts(genesis, state.log().clone()).unwrap();
        assert_eq!(replayed.balances(), state.balances());
        assert_eq!(replayed.balance(&Account::new("b")), 60);
    }
}
