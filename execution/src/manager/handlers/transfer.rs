use super::super::*;
use super::{require_address, require_positive};
use nhbchain_types::{Account, Address, Token};
use tracing::debug;

/// One side of a balance movement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Leg {
    Debit {
        address: Address,
        token: Token,
        amount: Natural,
    },
    Credit {
        address: Address,
        token: Token,
        amount: Natural,
    },
}

impl Leg {
    pub fn address(&self) -> &Address {
        match self {
            Leg::Debit { address, .. } | Leg::Credit { address, .. } => address,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        match self {
            Leg::Debit {
                address, amount, ..
            }
            | Leg::Credit {
                address, amount, ..
            } => {
                require_address(address)?;
                require_positive(amount)
            }
        }
    }
}

fn apply_leg(account: &mut Account, leg: &Leg) -> Result<(), Error> {
    match leg {
        Leg::Debit { token, amount, .. } => {
            let balance = account.balance_mut(*token);
            if *balance < *amount {
                return Err(Error::InsufficientFunds);
            }
            *balance -= amount;
        }
        Leg::Credit { token, amount, .. } => {
            let balance = account.balance_mut(*token);
            let credited = &*balance + amount;
            if !fits_balance(&credited) {
                return Err(Error::Overflow);
            }
            *balance = credited;
        }
    }
    Ok(())
}

impl<S: State> Manager<S> {
    /// Applies `legs` as one unit: either every account is updated or none is.
    ///
    /// Legs are applied in order against working copies, so a debit may spend a credit earlier in
    /// the same batch. Nothing is written until every leg succeeds; accounts are then persisted in
    /// order of first appearance and, if a later write fails, the accounts already written are
    /// restored before the error is returned.
    pub async fn transfer(&mut self, legs: &[Leg]) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self.transfer_in(&mut journal, legs).await;
        self.commit(journal, result).await
    }

    /// Moves `amount` of `token` from `from` to `to`.
    pub async fn move_funds(
        &mut self,
        from: &Address,
        to: &Address,
        token: Token,
        amount: Natural,
    ) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result = self.move_in(&mut journal, from, to, token, amount).await;
        self.commit(journal, result).await
    }

    pub(in crate::manager) async fn move_in(
        &mut self,
        journal: &mut Journal,
        from: &Address,
        to: &Address,
        token: Token,
        amount: Natural,
    ) -> Result<(), Error> {
        let legs = [
            Leg::Debit {
                address: *from,
                token,
                amount: amount.clone(),
            },
            Leg::Credit {
                address: *to,
                token,
                amount,
            },
        ];
        self.transfer_in(journal, &legs).await
    }

    pub(in crate::manager) async fn transfer_in(
        &mut self,
        journal: &mut Journal,
        legs: &[Leg],
    ) -> Result<(), Error> {
        if legs.is_empty() {
            return Err(Error::InvalidArgument("transfer has no legs"));
        }
        for leg in legs {
            leg.validate()?;
        }

        // Working copies in order of first appearance; `slots[i]` is the copy leg `i` touches.
        let mut accounts: Vec<(Address, Account)> = Vec::new();
        let mut slots = Vec::with_capacity(legs.len());
        for leg in legs {
            let address = leg.address();
            let slot = match accounts.iter().position(|(seen, _)| seen == address) {
                Some(slot) => slot,
                None => {
                    let account = self.get_account(address).await?;
                    accounts.push((*address, account));
                    accounts.len() - 1
                }
            };
            slots.push(slot);
        }
        for (leg, slot) in legs.iter().zip(slots) {
            apply_leg(&mut accounts[slot].1, leg)?;
        }

        for (address, account) in &accounts {
            self.put_account_in(journal, address, account).await?;
        }
        debug!(legs = legs.len(), accounts = accounts.len(), "transfer applied");
        Ok(())
    }
}
