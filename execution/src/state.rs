use anyhow::{Context as _, Result};
use commonware_cryptography::sha256::{Digest, Sha256};
use commonware_runtime::{Clock, Metrics, Spawner, Storage};
use commonware_storage::qmdb::any::unordered::variable::Db as AnyAdb;
use commonware_storage::translator::Translator;
use nhbchain_types::{Key, Value};
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use commonware_codec::{DecodeExt, Encode};
#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// Authenticated store keyed by `sha256(path)`.
pub type Adb<E, T> = AnyAdb<E, Digest, Value, Sha256, T>;

/// Hashed key-value store the engine reads and writes.
///
/// Implementations resolve a [`Key`] through [`Key::digest`], so two keys that normalise to the
/// same path address the same slot.
pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    /// Writes `changes` in order, stopping at the first failure.
    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

impl<E: Spawner + Metrics + Clock + Storage, T: Translator> State for Adb<E, T> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        AnyAdb::get(self, &key.digest()).await.context("adb get")
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.update(key.digest(), value)
            .await
            .context("adb update")?;
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        AnyAdb::delete(self, key.digest())
            .await
            .context("adb delete")?;
        Ok(())
    }
}

/// In-memory store holding encoded values, so reads go through the same decoder as [`Adb`].
#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Digest, Vec<u8>>,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.state
            .get(&key.digest())
            .map(|encoded| Value::decode(encoded.as_slice()).context("memory decode"))
            .transpose()
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key.digest(), value.encode().to_vec());
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(&key.digest());
        Ok(())
    }
}

/// Pending write for a key.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

impl From<Option<Value>> for Status {
    fn from(previous: Option<Value>) -> Self {
        match previous {
            Some(value) => Status::Update(value),
            None => Status::Delete,
        }
    }
}

/// Records the prior contents of every key an operation writes, so the writes that already
/// landed can be undone with compensating writes if a later one fails.
pub struct Journal {
    undo: Vec<(Key, Status)>,
}

impl Journal {
    pub fn new() -> Self {
        Self { undo: Vec::new() }
    }

    /// Writes `value` at `key`, remembering what was there before.
    pub async fn insert<S: State>(&mut self, state: &mut S, key: Key, value: Value) -> Result<()> {
        let previous = state.get(&key).await?;
        state.insert(key.clone(), value).await?;
        self.undo.push((key, previous.into()));
        Ok(())
    }

    /// Deletes `key`, remembering what was there before.
    pub async fn delete<S: State>(&mut self, state: &mut S, key: Key) -> Result<()> {
        let previous = state.get(&key).await?;
        state.delete(&key).await?;
        self.undo.push((key, previous.into()));
        Ok(())
    }

    /// Restores every journaled key, newest first.
    pub async fn rollback<S: State>(self, state: &mut S) -> Result<()> {
        let mut undo = self.undo;
        undo.reverse();
        state.apply(undo).await.context("journal rollback")
    }

    /// Unwinds on failure and returns the original error, chaining any rollback failure onto it.
    pub async fn finish<S: State, T, E>(
        self,
        state: &mut S,
        result: std::result::Result<T, E>,
    ) -> std::result::Result<T, crate::Error>
    where
        E: Into<crate::Error>,
    {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let err = err.into();
                match self.rollback(state).await {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(crate::Error::Persistence(
                        rollback.context(format!("after failure: {err}")),
                    )),
                }
            }
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FaultyState;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use nhbchain_types::Address;

    #[test]
    fn memory_resolves_keys_by_digest() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = Memory::default();
            let owner = Value::Address(Address::new([1u8; 20]));
            state
                .insert(Key::Username("Alice".into()), owner.clone())
                .await
                .unwrap();
            assert_eq!(
                state.get(&Key::Username("alice".into())).await.unwrap(),
                Some(owner)
            );
            state.delete(&Key::Username("ALICE".into())).await.unwrap();
            assert!(state.is_empty());
        });
    }

    #[test]
    fn journal_restores_previous_values() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut state = FaultyState::default();
            state
                .insert(Key::ProposalSeq, Value::Counter(4))
                .await
                .unwrap();

            let mut journal = Journal::new();
            journal
                .insert(&mut state, Key::ProposalSeq, Value::Counter(5))
                .await
                .unwrap();
            journal
                .insert(&mut state, Key::AuditSeq, Value::Counter(1))
                .await
                .unwrap();
            journal.rollback(&mut state).await.unwrap();

            assert_eq!(
                state.get(&Key::ProposalSeq).await.unwrap(),
                Some(Value::Counter(4))
            );
            assert_eq!(state.get(&Key::AuditSeq).await.unwrap(), None);
        });
    }
}
