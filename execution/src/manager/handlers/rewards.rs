use super::super::*;
use super::params::StakingParams;
use super::{require_address, require_positive};
use chrono::Datelike;
use nhbchain_types::fixed::{Uq128x128, FRACTIONAL_BITS};
use nhbchain_types::staking::{
    AccountSnap, GlobalIndex, BPS_DENOMINATOR, SECONDS_PER_DAY, SECONDS_PER_YEAR,
};
use nhbchain_types::Address;
use tracing::debug;

const STAKING: &str = "staking";

/// Months per year in the claim entitlement formula.
const PAYOUTS_PER_YEAR: u64 = 12;

/// Result of a successful reward claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub paid: Natural,
    pub periods: u64,
    /// Earliest time the next claim can succeed.
    pub next_eligible: u64,
    pub apr_bps: u64,
    /// The payout was clamped by the yearly emission cap.
    pub cap_hit: bool,
}

impl<S: State> Manager<S> {
    // === Records ===

    pub async fn global_index(&self) -> Result<GlobalIndex, Error> {
        self.read_or_default(&Key::StakingGlobalIndex).await
    }

    pub async fn put_global_index(&mut self, index: GlobalIndex) -> Result<(), Error> {
        store::put(&mut self.state, Key::StakingGlobalIndex, index).await
    }

    /// Reward checkpoint for `address`; a missing snapshot starts at index `1.0`.
    pub async fn staking_snapshot(&self, address: &Address) -> Result<AccountSnap, Error> {
        require_address(address)?;
        self.read_or_default(&Key::StakingAccount(*address)).await
    }

    pub async fn put_staking_snapshot(
        &mut self,
        address: &Address,
        snap: AccountSnap,
    ) -> Result<(), Error> {
        require_address(address)?;
        store::put(&mut self.state, Key::StakingAccount(*address), snap).await
    }

    /// Total ZNHB emitted as rewards during calendar `year`.
    pub async fn emissions_ytd(&self, year: i32) -> Result<Natural, Error> {
        store::get_amount(&self.state, &Key::StakingYtd(year)).await
    }

    // === Index ===

    /// Advances the global index to `now`.
    ///
    /// Elapsed time is capped at one payout period. The first update of a fresh index only
    /// records `now`, and an update at or before the last one changes nothing.
    pub async fn update_global_index(
        &mut self,
        apr_bps: u64,
        payout_period_days: u64,
        now: u64,
    ) -> Result<GlobalIndex, Error> {
        let max_elapsed = payout_period_days
            .checked_mul(SECONDS_PER_DAY)
            .filter(|secs| *secs > 0)
            .ok_or_else(|| Error::InvalidParam {
                name: "payout_period_days",
                value: payout_period_days.to_string(),
            })?;

        let mut index = self.global_index().await?;
        if index.last_update_unix == 0 {
            index.last_update_unix = now;
            self.put_global_index(index.clone()).await?;
            return Ok(index);
        }
        if now <= index.last_update_unix {
            return Ok(index);
        }

        let elapsed = (now - index.last_update_unix).min(max_elapsed);
        let increment = index.accumulator.raw()
            * Natural::from(apr_bps)
            * Natural::from(elapsed)
            / (Natural::from(SECONDS_PER_YEAR) * Natural::from(BPS_DENOMINATOR));
        index.accumulator = Uq128x128::new(index.accumulator.raw() + increment)?;
        index.last_update_unix = now;
        self.put_global_index(index.clone()).await?;
        debug!(now, elapsed, "global index advanced");
        Ok(index)
    }

    /// Advances the index using the stored staking parameters.
    pub async fn advance_global_index(&mut self, now: u64) -> Result<GlobalIndex, Error> {
        let params = self.staking_params().await?;
        self.update_global_index(params.apr_bps, params.payout_period_days, now)
            .await
    }

    // === Accrual ===

    /// Checkpoints `address` against the current index.
    pub async fn accrue(&mut self, address: &Address) -> Result<AccountSnap, Error> {
        let mut journal = Journal::new();
        let result = self.accrue_in(&mut journal, address).await;
        self.commit(journal, result).await
    }

    async fn accrue_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
    ) -> Result<AccountSnap, Error> {
        let account = self.get_account(address).await?;
        let mut snap = self.staking_snapshot(address).await?;
        let current = self.global_index().await?.accumulator;

        if current > snap.last_index && account.locked_znhb > 0u32 {
            let delta = current.raw() - snap.last_index.raw();
            snap.accrued_znhb += (delta * &account.locked_znhb) >> FRACTIONAL_BITS;
        }
        // Advance even with nothing locked so a later stake cannot claim past growth.
        snap.last_index = current;
        self.write(journal, Key::StakingAccount(*address), snap.clone())
            .await?;
        Ok(snap)
    }

    // === Delegation ===

    /// Locks `amount` more ZNHB for `address`, accruing first.
    pub async fn settle_delegate(
        &mut self,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self.settle_delegate_in(&mut journal, address, amount).await;
        self.commit(journal, result).await
    }

    async fn settle_delegate_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        self.require_unpaused(STAKING).await?;
        self.accrue_in(journal, address).await?;
        if amount == 0u32 {
            return Ok(());
        }
        let mut account = self.get_account(address).await?;
        account.locked_znhb += amount;
        self.put_metadata_in(journal, address, &account).await
    }

    /// Unlocks `amount` ZNHB for `address`, accruing first.
    pub async fn settle_undelegate(
        &mut self,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self
            .settle_undelegate_in(&mut journal, address, amount)
            .await;
        self.commit(journal, result).await
    }

    async fn settle_undelegate_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        self.require_unpaused(STAKING).await?;
        self.accrue_in(journal, address).await?;
        if amount == 0u32 {
            return Ok(());
        }
        let mut account = self.get_account(address).await?;
        if account.locked_znhb < amount {
            return Err(Error::InsufficientStake);
        }
        account.locked_znhb -= amount;
        self.put_metadata_in(journal, address, &account).await
    }

    /// Moves `amount` of liquid ZNHB into stake delegated to `validator`.
    pub async fn delegate(
        &mut self,
        address: &Address,
        validator: &Address,
        amount: Natural,
        now: u64,
    ) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            require_address(validator)?;
            require_positive(&amount)?;
            if self.get_account(address).await?.balance_znhb < amount {
                return Err(Error::InsufficientFunds);
            }
            self.settle_delegate_in(&mut journal, address, amount.clone())
                .await?;

            let mut account = self.get_account(address).await?;
            account.balance_znhb -= &amount;
            account.delegated_validator = Some(*validator);
            self.put_metadata_in(&mut journal, address, &account).await?;

            let mut snap = self.staking_snapshot(address).await?;
            if snap.last_payout_unix == 0 {
                snap.last_payout_unix = now;
                self.write(&mut journal, Key::StakingAccount(*address), snap)
                    .await?;
            }
            debug!(%address, %validator, %amount, "delegated");
            Ok(())
        }
        .await;
        self.commit(journal, result).await
    }

    /// Unlocks `amount` and queues it to return to the liquid balance after the unbonding period.
    pub async fn undelegate(
        &mut self,
        address: &Address,
        amount: Natural,
        now: u64,
    ) -> Result<nhbchain_types::PendingUnbond, Error> {
        let mut journal = Journal::new();
        let result: Result<_, Error> = async {
            require_positive(&amount)?;
            let validator = self
                .get_account(address)
                .await?
                .delegated_validator
                .ok_or(Error::InvalidState("no delegation"))?;
            self.settle_undelegate_in(&mut journal, address, amount.clone())
                .await?;
            let release_time = now
                .checked_add(self.config.unbonding_period_secs)
                .ok_or(Error::Overflow)?;
            let entry = self
                .queue_unbond_in(&mut journal, address, &validator, amount, release_time)
                .await?;

            let mut account = self.get_account(address).await?;
            if account.locked_znhb == 0u32 {
                account.delegated_validator = None;
                self.put_metadata_in(&mut journal, address, &account).await?;
            }
            debug!(%address, id = entry.id, release_time, "undelegated");
            Ok(entry)
        }
        .await;
        self.commit(journal, result).await
    }

    // === Claim ===

    /// Pays out the rewards `address` has earned over whole payout periods.
    pub async fn claim_rewards(
        &mut self,
        address: &Address,
        now: u64,
    ) -> Result<ClaimOutcome, Error> {
        let mut journal = Journal::new();
        let result = self.claim_rewards_in(&mut journal, address, now).await;
        self.commit(journal, result).await
    }

    async fn claim_rewards_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        now: u64,
    ) -> Result<ClaimOutcome, Error> {
        self.require_unpaused(STAKING).await?;
        let params: StakingParams = self.staking_params().await?;
        let period = params.period_secs();

        // An unset payout time counts from the epoch; `paid` is still floored by accrual.
        let last_payout = self.staking_snapshot(address).await?.last_payout_unix;
        let elapsed = now.saturating_sub(last_payout);
        if elapsed < period {
            return Err(Error::NotDue {
                next_eligible: last_payout.saturating_add(period),
            });
        }
        let periods = elapsed / period;

        let mut snap = self.accrue_in(journal, address).await?;
        let mut account = self.get_account(address).await?;

        let entitlement = &account.locked_znhb
            * Natural::from(params.apr_bps)
            * Natural::from(periods)
            / Natural::from(BPS_DENOMINATOR * PAYOUTS_PER_YEAR);
        let mut paid = entitlement.min(snap.accrued_znhb.clone());

        let year = utc(now)?.year();
        let ytd = self.emissions_ytd(year).await?;
        let mut cap_hit = false;
        if params.max_emission_per_year > 0u32 {
            let remaining = if ytd >= params.max_emission_per_year {
                Natural::default()
            } else {
                &params.max_emission_per_year - &ytd
            };
            if paid > remaining {
                if remaining == 0u32 {
                    return Err(Error::EmissionCapHit);
                }
                paid = remaining;
                cap_hit = true;
            }
        }

        snap.last_payout_unix = last_payout + periods * period;
        snap.accrued_znhb -= &paid;
        let next_eligible = snap.last_payout_unix.saturating_add(period);
        self.write(journal, Key::StakingAccount(*address), snap)
            .await?;

        account.balance_znhb += &paid;
        self.put_metadata_in(journal, address, &account).await?;

        let mut index = self.global_index().await?;
        index.ytd_emissions += &paid;
        self.write(journal, Key::StakingGlobalIndex, index).await?;
        self.write(journal, Key::StakingYtd(year), ytd + &paid)
            .await?;

        debug!(%address, %paid, periods, cap_hit, "rewards claimed");
        Ok(ClaimOutcome {
            paid,
            periods,
            next_eligible,
            apr_bps: params.apr_bps,
            cap_hit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::params::{STAKING_MAX_EMISSION, STAKING_PAYOUT_PERIOD_DAYS};
    use super::*;
    use crate::mocks::{address, funded_manager, manager};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use proptest::prelude::*;

    // 2023-01-01T00:00:00Z
    const T0: u64 = 1_672_531_200;
    const PERIOD: u64 = 30 * SECONDS_PER_DAY;

    async fn staked(znhb: u64) -> Manager<crate::mocks::FaultyState> {
        let mut manager = funded_manager(&[(address(1), 0, znhb)]).await;
        manager.update_global_index(1_250, 30, T0).await.unwrap();
        manager
            .delegate(&address(1), &address(9), Natural::from(znhb), T0)
            .await
            .unwrap();
        manager
    }

    #[test]
    fn first_update_only_seeds_timestamp() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let index = manager.update_global_index(1_250, 30, T0).await.unwrap();
            assert_eq!(index.accumulator, Uq128x128::one());
            assert_eq!(index.last_update_unix, T0);

            let again = manager.update_global_index(1_250, 30, T0 - 10).await.unwrap();
            assert_eq!(again, index);
        });
    }

    #[test]
    fn elapsed_time_is_capped_at_one_period() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut capped = manager();
            capped.update_global_index(1_250, 30, T0).await.unwrap();
            let capped = capped
                .update_global_index(1_250, 30, T0 + 10 * PERIOD)
                .await
                .unwrap();

            let mut exact = manager();
            exact.update_global_index(1_250, 30, T0).await.unwrap();
            let exact = exact
                .update_global_index(1_250, 30, T0 + PERIOD)
                .await
                .unwrap();

            assert_eq!(capped.accumulator, exact.accumulator);
            assert!(exact.accumulator > Uq128x128::one());
        });
    }

    #[test]
    fn zero_period_is_rejected() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            assert!(matches!(
                manager.update_global_index(1_250, 0, T0).await,
                Err(Error::InvalidParam { .. })
            ));
        });
    }

    #[test]
    fn accrue_without_stake_only_advances_checkpoint() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            manager.update_global_index(1_250, 30, T0).await.unwrap();
            manager
                .update_global_index(1_250, 30, T0 + PERIOD)
                .await
                .unwrap();
            let snap = manager.accrue(&address(1)).await.unwrap();
            assert_eq!(snap.accrued_znhb, 0u32);
            assert_eq!(
                snap.last_index,
                manager.global_index().await.unwrap().accumulator
            );
        });
    }

    #[test]
    fn scenario_claim_after_one_period() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_znhb, 0u32);
            assert_eq!(account.locked_znhb, 1_000u32);
            assert_eq!(account.delegated_validator, Some(address(9)));

            let now = T0 + PERIOD;
            manager.update_global_index(1_250, 30, now).await.unwrap();
            let outcome = manager.claim_rewards(&address(1), now).await.unwrap();

            // entitlement = 1000 * 1250 / 120000 = 10, accrued ~10.27
            assert_eq!(outcome.paid, 10u32);
            assert_eq!(outcome.periods, 1);
            assert_eq!(outcome.apr_bps, 1_250);
            assert!(!outcome.cap_hit);
            assert_eq!(outcome.next_eligible, T0 + 2 * PERIOD);

            let snap = manager.staking_snapshot(&address(1)).await.unwrap();
            assert_eq!(snap.last_payout_unix, T0 + PERIOD);
            assert_eq!(snap.accrued_znhb, 0u32);
            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_znhb, 10u32);
            assert_eq!(manager.global_index().await.unwrap().ytd_emissions, 10u32);
            assert_eq!(manager.emissions_ytd(2023).await.unwrap(), 10u32);
        });
    }

    #[test]
    fn payout_advances_by_whole_periods_not_to_now() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            let now = T0 + PERIOD + 5 * SECONDS_PER_DAY;
            manager.update_global_index(1_250, 30, now).await.unwrap();
            manager.claim_rewards(&address(1), now).await.unwrap();
            let snap = manager.staking_snapshot(&address(1)).await.unwrap();
            assert_eq!(snap.last_payout_unix, T0 + PERIOD);
        });
    }

    #[test]
    fn early_claim_is_not_due() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            let err = manager
                .claim_rewards(&address(1), T0 + PERIOD - 1)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::NotDue { next_eligible } if next_eligible == T0 + PERIOD
            ));
        });
    }

    #[test]
    fn settled_stake_is_claimable() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = funded_manager(&[(address(1), 0, 0)]).await;
            manager.update_global_index(1_250, 30, T0).await.unwrap();
            manager
                .settle_delegate(&address(1), Natural::from(1_000u32))
                .await
                .unwrap();
            assert_eq!(
                manager
                    .staking_snapshot(&address(1))
                    .await
                    .unwrap()
                    .last_payout_unix,
                0
            );

            let now = T0 + PERIOD;
            manager.update_global_index(1_250, 30, now).await.unwrap();
            let outcome = manager.claim_rewards(&address(1), now).await.unwrap();
            // Floored by the ~10.27 accrued over the single indexed period.
            assert_eq!(outcome.paid, 10u32);
            assert!(outcome.periods > 1);

            let snap = manager.staking_snapshot(&address(1)).await.unwrap();
            assert_eq!(snap.last_payout_unix, outcome.periods * PERIOD);
            assert!(snap.last_payout_unix <= now);
            assert!(snap.last_payout_unix + PERIOD > now);
            assert_eq!(outcome.next_eligible, snap.last_payout_unix + PERIOD);

            // The cadence continues from the aligned payout time.
            let err = manager
                .claim_rewards(&address(1), snap.last_payout_unix + PERIOD - 1)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NotDue { .. }));
        });
    }

    #[test]
    fn emission_cap_clamps_then_blocks() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            manager
                .param_put(STAKING_MAX_EMISSION, b"4".to_vec())
                .await
                .unwrap();
            let now = T0 + PERIOD;
            manager.update_global_index(1_250, 30, now).await.unwrap();
            let outcome = manager.claim_rewards(&address(1), now).await.unwrap();
            assert_eq!(outcome.paid, 4u32);
            assert!(outcome.cap_hit);

            let later = T0 + 2 * PERIOD;
            manager.update_global_index(1_250, 30, later).await.unwrap();
            let before = manager.staking_snapshot(&address(1)).await.unwrap();
            assert!(matches!(
                manager.claim_rewards(&address(1), later).await,
                Err(Error::EmissionCapHit)
            ));
            assert_eq!(manager.staking_snapshot(&address(1)).await.unwrap(), before);
        });
    }

    #[test]
    fn paused_staking_rejects_settlement_and_claims() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            manager.set_module_paused("staking", true).await.unwrap();
            assert!(matches!(
                manager
                    .settle_delegate(&address(1), Natural::from(1u32))
                    .await,
                Err(Error::Paused("staking"))
            ));
            assert!(matches!(
                manager.claim_rewards(&address(1), T0 + PERIOD).await,
                Err(Error::Paused("staking"))
            ));
        });
    }

    #[test]
    fn undelegate_checks_lock_and_queues_unbond() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            assert!(matches!(
                manager
                    .settle_undelegate(&address(1), Natural::from(1_001u32))
                    .await,
                Err(Error::InsufficientStake)
            ));

            let entry = manager
                .undelegate(&address(1), Natural::from(1_000u32), T0 + 10)
                .await
                .unwrap();
            assert_eq!(entry.validator, address(9));
            assert_eq!(
                entry.release_time,
                T0 + 10 + manager.config().unbonding_period_secs
            );
            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.locked_znhb, 0u32);
            assert_eq!(account.delegated_validator, None);
            assert_eq!(account.pending_unbonds.len(), 1);
        });
    }

    #[test]
    fn delegate_requires_liquid_balance() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = funded_manager(&[(address(1), 0, 10)]).await;
            assert!(matches!(
                manager
                    .delegate(&address(1), &address(9), Natural::from(11u32), T0)
                    .await,
                Err(Error::InsufficientFunds)
            ));
            assert_eq!(
                manager.staking_snapshot(&address(1)).await.unwrap(),
                AccountSnap::default()
            );
        });
    }

    #[test]
    fn failed_claim_write_restores_snapshot() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            let now = T0 + PERIOD;
            manager.update_global_index(1_250, 30, now).await.unwrap();
            let before = manager.staking_snapshot(&address(1)).await.unwrap();
            manager.state_mut().fail_next_write(&Key::StakingYtd(2023));
            let err = manager.claim_rewards(&address(1), now).await.unwrap_err();
            assert!(err.is_persistence());

            assert_eq!(manager.staking_snapshot(&address(1)).await.unwrap(), before);
            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_znhb, 0u32);
            assert_eq!(manager.global_index().await.unwrap().ytd_emissions, 0u32);
        });
    }

    #[test]
    fn stored_period_overrides_config() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = staked(1_000).await;
            manager
                .param_put(STAKING_PAYOUT_PERIOD_DAYS, b"10".to_vec())
                .await
                .unwrap();
            let now = T0 + 10 * SECONDS_PER_DAY;
            manager.advance_global_index(now).await.unwrap();
            let outcome = manager.claim_rewards(&address(1), now).await.unwrap();
            assert_eq!(outcome.periods, 1);
            assert_eq!(outcome.next_eligible, now + 10 * SECONDS_PER_DAY);
        });
    }

    proptest! {
        /// Property: with non-decreasing timestamps the accumulator never decreases.
        #[test]
        fn prop_index_is_monotonic(
            apr_bps in 0u64..50_000,
            steps in prop::collection::vec(0u64..5 * PERIOD, 1..16),
        ) {
            let executor = Runner::default();
            executor.start(|_| async move {
                let mut manager = manager();
                let mut now = T0;
                let mut previous = manager
                    .update_global_index(apr_bps, 30, now)
                    .await
                    .unwrap()
                    .accumulator;
                for step in steps {
                    now += step;
                    let next = manager
                        .update_global_index(apr_bps, 30, now)
                        .await
                        .unwrap()
                        .accumulator;
                    assert!(next >= previous);
                    previous = next;
                }
            });
        }

        /// Property: accruing twice without an index or stake change accrues nothing new.
        #[test]
        fn prop_accrue_is_idempotent(locked in 1u64..1_000_000_000, elapsed in 1u64..PERIOD) {
            let executor = Runner::default();
            executor.start(|_| async move {
                let mut manager = funded_manager(&[(address(1), 0, locked)]).await;
                manager.update_global_index(1_250, 30, T0).await.unwrap();
                manager
                    .delegate(&address(1), &address(9), Natural::from(locked), T0)
                    .await
                    .unwrap();
                manager
                    .update_global_index(1_250, 30, T0 + elapsed)
                    .await
                    .unwrap();
                let first = manager.accrue(&address(1)).await.unwrap();
                let second = manager.accrue(&address(1)).await.unwrap();
                assert_eq!(first, second);
            });
        }
    }
}
