//! Test fixtures: a fault-injecting in-memory state, seeded managers and an on-disk store.

use crate::config::ValidatedConfig;
use crate::state::{Adb, Memory, State};
use crate::Manager;
use anyhow::{anyhow, Context as _, Result};
use commonware_cryptography::sha256::Digest;
use commonware_runtime::{buffer::PoolRef, Clock, Metrics, Spawner, Storage};
use commonware_storage::{qmdb, translator::EightCap};
use commonware_utils::{NZUsize, NZU64};
use malachite::Natural;
use nhbchain_types::{Account, Address, Key, Value};
use std::collections::BTreeSet;

/// Receives escrow release fees in managers built by [`manager`].
pub const TREASURY: Address = Address::new([0xfe; 20]);

/// Deterministic non-zero address.
pub fn address(seed: u8) -> Address {
    Address::new([seed.max(1); 20])
}

/// In-memory state whose writes can be made to fail once per key.
#[derive(Default)]
pub struct FaultyState {
    inner: Memory,
    failing: BTreeSet<Digest>,
}

impl FaultyState {
    /// Makes the next insert or delete of `key` fail.
    pub fn fail_next_write(&mut self, key: &Key) {
        self.failing.insert(key.digest());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&mut self, key: &Key) -> Result<()> {
        if self.failing.remove(&key.digest()) {
            return Err(anyhow!(
                "injected write failure at {}",
                String::from_utf8_lossy(&key.path())
            ));
        }
        Ok(())
    }
}

impl State for FaultyState {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.check(&key)?;
        self.inner.insert(key, value).await
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.check(key)?;
        self.inner.delete(key).await
    }
}

/// Empty manager with [`TREASURY`] configured as the fee treasury.
pub fn manager() -> Manager<FaultyState> {
    let config = ValidatedConfig {
        fee_treasury: Some(TREASURY),
        ..ValidatedConfig::default()
    };
    Manager::new(FaultyState::default(), config)
}

/// Manager seeded with `(address, nhb, znhb)` balances.
pub async fn funded_manager(balances: &[(Address, u64, u64)]) -> Manager<FaultyState> {
    let mut manager = manager();
    for (address, nhb, znhb) in balances {
        let account = Account {
            balance_nhb: Natural::from(*nhb),
            balance_znhb: Natural::from(*znhb),
            ..Account::default()
        };
        manager
            .put_account(address, &account)
            .await
            .expect("seed account");
    }
    manager
}

/// Opens an authenticated store under the `state` label of `context`.
pub async fn create_state<E: Spawner + Metrics + Storage + Clock>(
    context: &E,
) -> Result<Adb<E, EightCap>> {
    let buffer_pool = PoolRef::new(NZUsize!(1024), NZUsize!(1024));
    Adb::init(
        context.with_label("state"),
        qmdb::any::VariableConfig {
            mmr_journal_partition: String::from("state-mmr-journal"),
            mmr_metadata_partition: String::from("state-mmr-metadata"),
            mmr_items_per_blob: NZU64!(1024),
            mmr_write_buffer: NZUsize!(1024),
            log_partition: String::from("state-log-journal"),
            log_items_per_blob: NZU64!(1024),
            log_write_buffer: NZUsize!(1024),
            log_compression: None,
            log_codec_config: (),
            translator: EightCap,
            thread_pool: None,
            buffer_pool,
        },
    )
    .await
    .context("init state adb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    #[test]
    fn injected_failure_is_one_shot() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = FaultyState::default();
            state.fail_next_write(&Key::ProposalSeq);
            assert!(state
                .insert(Key::ProposalSeq, Value::Counter(1))
                .await
                .is_err());
            assert!(state.is_empty());
            state
                .insert(Key::ProposalSeq, Value::Counter(1))
                .await
                .unwrap();
            assert_eq!(state.len(), 1);
        });
    }

    #[test]
    fn address_is_never_zero() {
        assert!(!address(0).is_zero());
        assert_ne!(address(1), address(2));
    }
}
