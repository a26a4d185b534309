use chrono::{DateTime, Utc};
use malachite::num::logic::traits::SignificantBits;
use malachite::Natural;
use nhbchain_types::{Key, Record};

use crate::config::ValidatedConfig;
use crate::state::{Journal, State};
use crate::{store, Error};

mod handlers;

pub use handlers::{
    accounts::EngagementKind,
    claimable::ClaimableOutcome,
    escrow::{EscrowOutcome, EscrowRequest, Resolution},
    fees::FeeTotalsEntry,
    rewards::ClaimOutcome,
    transfer::Leg,
};

/// Widest balance any account may hold.
pub const MAX_BALANCE_BITS: u64 = 256;

/// Owns the state handle and applies every domain operation against it.
///
/// Calls are expected to be applied sequentially by a single writer. Every mutating operation
/// either completes or leaves state as it found it: writes are journaled and, if one fails, the
/// writes that already landed are undone before the error is returned.
pub struct Manager<S: State> {
    state: S,
    config: ValidatedConfig,
}

impl<S: State> Manager<S> {
    pub fn new(state: S, config: ValidatedConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    async fn read<R: Record>(&self, key: &Key) -> Result<Option<R>, Error> {
        store::get(&self.state, key).await
    }

    async fn read_or_default<R: Record + Default>(&self, key: &Key) -> Result<R, Error> {
        store::get_or_default(&self.state, key).await
    }

    /// Journaled write.
    async fn write<R: Record>(
        &mut self,
        journal: &mut Journal,
        key: Key,
        record: R,
    ) -> Result<(), Error> {
        let value = record.into_value();
        store::check_value(&value)?;
        journal.insert(&mut self.state, key, value).await?;
        Ok(())
    }

    async fn commit<T>(&mut self, journal: Journal, result: Result<T, Error>) -> Result<T, Error> {
        journal.finish(&mut self.state, result).await
    }
}

pub(crate) fn fits_balance(value: &Natural) -> bool {
    value.significant_bits() <= MAX_BALANCE_BITS
}

pub(crate) fn utc(now: u64) -> Result<DateTime<Utc>, Error> {
    i64::try_from(now)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(Error::InvalidArgument("timestamp out of range"))
}

/// UTC calendar day of `now` as `YYYY-MM-DD`.
pub(crate) fn day_id(now: u64) -> Result<String, Error> {
    Ok(utc(now)?.format("%Y-%m-%d").to_string())
}
