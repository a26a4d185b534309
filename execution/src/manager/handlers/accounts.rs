use super::super::*;
use super::{require_address, require_positive};
use nhbchain_types::account::MAX_PENDING_UNBONDS;
use nhbchain_types::{Account, AccountMetadata, Address, CoreAccount, PendingUnbond};
use tracing::debug;

/// Activity counted by [`Manager::record_engagement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngagementKind {
    Heartbeat,
    Transaction,
    Escrow,
    Governance,
}

fn check_widths(account: &Account) -> Result<(), Error> {
    let fields = [
        ("balance_nhb", &account.balance_nhb),
        ("balance_znhb", &account.balance_znhb),
        ("stake", &account.stake),
        ("locked_znhb", &account.locked_znhb),
    ];
    for (name, value) in fields {
        if !fits_balance(value) {
            return Err(Error::OverflowOrNegative(name));
        }
    }
    Ok(())
}

impl<S: State> Manager<S> {
    // === Account ledger ===

    /// Loads the merged account; missing halves load as zeroed defaults.
    pub async fn get_account(&self, address: &Address) -> Result<Account, Error> {
        require_address(address)?;
        let mut core: CoreAccount = self
            .read_or_default(&Key::CoreAccount(*address))
            .await?;
        core.normalize();
        let meta: AccountMetadata = self
            .read_or_default(&Key::AccountMetadata(*address))
            .await?;
        Ok(Account::from_parts(core, meta))
    }

    /// Writes both halves of `account`.
    pub async fn put_account(&mut self, address: &Address, account: &Account) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self.put_account_in(&mut journal, address, account).await;
        self.commit(journal, result).await
    }

    /// Writes only the metadata half, leaving the core record untouched.
    pub async fn put_account_metadata(
        &mut self,
        address: &Address,
        account: &Account,
    ) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self.put_metadata_in(&mut journal, address, account).await;
        self.commit(journal, result).await
    }

    pub(in crate::manager) async fn put_account_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        account: &Account,
    ) -> Result<(), Error> {
        require_address(address)?;
        check_widths(account)?;
        self.write(journal, Key::CoreAccount(*address), account.core())
            .await?;
        self.write(journal, Key::AccountMetadata(*address), account.metadata())
            .await
    }

    pub(in crate::manager) async fn put_metadata_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        account: &Account,
    ) -> Result<(), Error> {
        require_address(address)?;
        check_widths(account)?;
        self.write(journal, Key::AccountMetadata(*address), account.metadata())
            .await
    }

    // === Usernames ===

    /// Claims `name` for `address`, releasing any name the account held before.
    pub async fn set_username(&mut self, address: &Address, name: &str) -> Result<(), Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument("username required"));
        }
        let mut account = self.get_account(address).await?;
        if let Some(owner) = self.account_by_username(name).await? {
            if owner != *address {
                return Err(Error::Conflict("username taken"));
            }
        }

        let mut journal = Journal::new();
        let previous = std::mem::replace(&mut account.username, name.to_string());
        let result: Result<(), Error> = async {
            if !previous.is_empty() && !previous.eq_ignore_ascii_case(name) {
                journal
                    .delete(&mut self.state, Key::Username(previous))
                    .await?;
            }
            self.write(&mut journal, Key::Username(name.to_string()), *address)
                .await?;
            self.put_metadata_in(&mut journal, address, &account).await
        }
        .await;
        self.commit(journal, result).await
    }

    pub async fn account_by_username(&self, name: &str) -> Result<Option<Address>, Error> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        self.read(&Key::Username(name.to_string())).await
    }

    // === Unbonding ===

    /// Queues `amount` for release at `release_time` and returns the new entry.
    pub async fn queue_unbond(
        &mut self,
        address: &Address,
        validator: &Address,
        amount: Natural,
        release_time: u64,
    ) -> Result<PendingUnbond, Error> {
        let mut journal = Journal::new();
        let result = self
            .queue_unbond_in(&mut journal, address, validator, amount, release_time)
            .await;
        self.commit(journal, result).await
    }

    pub(in crate::manager) async fn queue_unbond_in(
        &mut self,
        journal: &mut Journal,
        address: &Address,
        validator: &Address,
        amount: Natural,
        release_time: u64,
    ) -> Result<PendingUnbond, Error> {
        require_positive(&amount)?;
        let mut account = self.get_account(address).await?;
        if account.pending_unbonds.len() >= MAX_PENDING_UNBONDS {
            return Err(Error::InvalidState("too many pending unbonds"));
        }
        let id = account
            .next_unbonding_id
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        let entry = PendingUnbond {
            id,
            validator: *validator,
            amount,
            release_time,
        };
        account.next_unbonding_id = id;
        account.pending_unbonds.push(entry.clone());
        self.put_metadata_in(journal, address, &account).await?;
        Ok(entry)
    }

    /// Releases a matured unbond back to the liquid ZNHB balance.
    pub async fn complete_unbond(
        &mut self,
        address: &Address,
        id: u64,
        now: u64,
    ) -> Result<Natural, Error> {
        let mut account = self.get_account(address).await?;
        let index = account
            .pending_unbonds
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(Error::NotFound("unbond"))?;
        if now < account.pending_unbonds[index].release_time {
            return Err(Error::NotExpired);
        }
        let entry = account.pending_unbonds.remove(index);
        account.balance_znhb += &entry.amount;
        self.put_account_metadata(address, &account).await?;
        debug!(%address, id, amount = %entry.amount, "unbond completed");
        Ok(entry.amount)
    }

    // === Engagement ===

    /// Bumps today's engagement counters, resetting them when the day rolls over.
    pub async fn record_engagement(
        &mut self,
        address: &Address,
        day: &str,
        kind: EngagementKind,
        minutes: u64,
        now: u64,
    ) -> Result<(), Error> {
        let day = day.trim();
        if day.is_empty() {
            return Err(Error::InvalidArgument("day required"));
        }
        let mut account = self.get_account(address).await?;
        let engagement = &mut account.engagement;
        if engagement.day != day {
            engagement.day = day.to_string();
            engagement.minutes = 0;
            engagement.tx_count = 0;
            engagement.escrow_events = 0;
            engagement.gov_events = 0;
        }
        engagement.minutes = engagement.minutes.saturating_add(minutes);
        match kind {
            EngagementKind::Heartbeat => {}
            EngagementKind::Transaction => engagement.tx_count += 1,
            EngagementKind::Escrow => engagement.escrow_events += 1,
            EngagementKind::Governance => engagement.gov_events += 1,
        }
        engagement.last_heartbeat = engagement.last_heartbeat.max(now);
        self.put_account_metadata(address, &account).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{address, funded_manager, manager};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use malachite::num::arithmetic::traits::PowerOf2;
    use nhbchain_types::account::empty_code_hash;
    use nhbchain_types::codec::MAX_STRING_LENGTH;

    #[test]
    fn missing_account_loads_as_zero() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let manager = manager();
            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_nhb, 0u32);
            assert_eq!(account.locked_znhb, 0u32);
            assert_eq!(account.code_hash, empty_code_hash());
            assert!(account.pending_unbonds.is_empty());
        });
    }

    #[test]
    fn zero_address_is_rejected() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let manager = manager();
            assert!(matches!(
                manager.get_account(&Address::ZERO).await,
                Err(Error::InvalidAddress)
            ));
        });
    }

    #[test]
    fn metadata_write_leaves_core_untouched() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = funded_manager(&[(address(1), 100, 0)]).await;
            let mut account = manager.get_account(&address(1)).await.unwrap();
            account.balance_nhb = Natural::from(5u32);
            account.balance_znhb = Natural::from(7u32);
            manager
                .put_account_metadata(&address(1), &account)
                .await
                .unwrap();

            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_nhb, 100u32);
            assert_eq!(account.balance_znhb, 7u32);
        });
    }

    #[test]
    fn oversized_balance_is_rejected() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let account = Account {
                balance_nhb: Natural::power_of_2(256),
                ..Account::default()
            };
            assert!(matches!(
                manager.put_account(&address(1), &account).await,
                Err(Error::OverflowOrNegative("balance_nhb"))
            ));
            assert!(manager.state().is_empty());
        });
    }

    #[test]
    fn failed_metadata_write_restores_core() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = funded_manager(&[(address(1), 100, 0)]).await;
            let mut account = manager.get_account(&address(1)).await.unwrap();
            account.balance_nhb = Natural::from(1u32);
            account.balance_znhb = Natural::from(1u32);

            manager
                .state_mut()
                .fail_next_write(&Key::AccountMetadata(address(1)));
            let err = manager.put_account(&address(1), &account).await.unwrap_err();
            assert!(err.is_persistence());

            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_nhb, 100u32);
            assert_eq!(account.balance_znhb, 0u32);
        });
    }

    #[test]
    fn usernames_are_unique_and_case_insensitive() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            manager.set_username(&address(1), "Alice").await.unwrap();
            assert_eq!(
                manager.account_by_username("alice").await.unwrap(),
                Some(address(1))
            );
            assert!(matches!(
                manager.set_username(&address(2), "ALICE").await,
                Err(Error::Conflict(_))
            ));

            manager.set_username(&address(1), "bob").await.unwrap();
            assert_eq!(manager.account_by_username("alice").await.unwrap(), None);
            assert_eq!(
                manager.get_account(&address(1)).await.unwrap().username,
                "bob"
            );
        });
    }

    #[test]
    fn overlong_username_is_rejected_without_writes() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            manager.set_username(&address(1), "alice").await.unwrap();

            let long = "a".repeat(MAX_STRING_LENGTH + 1);
            assert!(matches!(
                manager.set_username(&address(1), &long).await,
                Err(Error::Oversized("AccountMetadata"))
            ));
            assert_eq!(manager.account_by_username(&long).await.unwrap(), None);
            assert_eq!(
                manager.account_by_username("alice").await.unwrap(),
                Some(address(1))
            );
            assert_eq!(
                manager.get_account(&address(1)).await.unwrap().username,
                "alice"
            );
        });
    }

    #[test]
    fn unbond_matures_back_into_balance() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let entry = manager
                .queue_unbond(&address(1), &address(9), Natural::from(40u32), 1_000)
                .await
                .unwrap();
            assert_eq!(entry.id, 1);

            assert!(matches!(
                manager.complete_unbond(&address(1), entry.id, 999).await,
                Err(Error::NotExpired)
            ));
            assert!(matches!(
                manager.complete_unbond(&address(1), 7, 1_000).await,
                Err(Error::NotFound("unbond"))
            ));
            let released = manager
                .complete_unbond(&address(1), entry.id, 1_000)
                .await
                .unwrap();
            assert_eq!(released, 40u32);

            let account = manager.get_account(&address(1)).await.unwrap();
            assert_eq!(account.balance_znhb, 40u32);
            assert!(account.pending_unbonds.is_empty());
            assert_eq!(account.next_unbonding_id, 1);
        });
    }

    #[test]
    fn engagement_resets_on_new_day() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let who = address(3);
            manager
                .record_engagement(&who, "2024-01-01", EngagementKind::Transaction, 5, 10)
                .await
                .unwrap();
            manager
                .record_engagement(&who, "2024-01-01", EngagementKind::Escrow, 3, 20)
                .await
                .unwrap();
            let engagement = manager.get_account(&who).await.unwrap().engagement;
            assert_eq!(engagement.minutes, 8);
            assert_eq!(engagement.tx_count, 1);
            assert_eq!(engagement.escrow_events, 1);

            manager
                .record_engagement(&who, "2024-01-02", EngagementKind::Governance, 1, 30)
                .await
                .unwrap();
            let engagement = manager.get_account(&who).await.unwrap().engagement;
            assert_eq!(engagement.day, "2024-01-02");
            assert_eq!(engagement.minutes, 1);
            assert_eq!(engagement.tx_count, 0);
            assert_eq!(engagement.gov_events, 1);
            assert_eq!(engagement.last_heartbeat, 30);
        });
    }
}
