use super::super::*;
use super::{parse_token, require_address, require_positive};
use commonware_cryptography::sha256::Digest;
use nhbchain_types::claimable::{Claimable, ClaimableStatus};
use nhbchain_types::{hash_parts, vault_address, Address};
use tracing::debug;

/// Record after a claimable transition and whether this call changed it.
///
/// Replaying a transition on a record that already reached that state returns
/// `changed == false` and moves no funds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimableOutcome {
    pub claimable: Claimable,
    pub changed: bool,
}

impl ClaimableOutcome {
    fn changed(claimable: Claimable) -> Self {
        Self {
            claimable,
            changed: true,
        }
    }

    fn unchanged(claimable: Claimable) -> Self {
        Self {
            claimable,
            changed: false,
        }
    }
}

impl<S: State> Manager<S> {
    pub async fn get_claimable(&self, id: &Digest) -> Result<Option<Claimable>, Error> {
        self.read(&Key::ClaimableRecord(*id)).await
    }

    /// Next nonce `payer` will use to derive a claimable id.
    pub async fn claimable_nonce(&self, payer: &Address) -> Result<u64, Error> {
        store::get_counter(&self.state, &Key::ClaimableNonce(*payer)).await
    }

    async fn require_claimable(&self, id: &Digest) -> Result<Claimable, Error> {
        self.get_claimable(id)
            .await?
            .ok_or(Error::NotFound("claimable"))
    }

    /// Locks `amount` from `payer` in the token vault until it is claimed with the preimage of
    /// `hash_lock`, cancelled, or expired.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_claimable(
        &mut self,
        payer: &Address,
        token: &str,
        amount: Natural,
        hash_lock: Digest,
        recipient_hint: Digest,
        deadline: u64,
        now: u64,
    ) -> Result<Claimable, Error> {
        require_address(payer)?;
        let token = parse_token(token)?;
        require_positive(&amount)?;

        let mut journal = Journal::new();
        let result: Result<Claimable, Error> = async {
            let nonce = self.claimable_nonce(payer).await?;
            let next = nonce.checked_add(1).ok_or(Error::Overflow)?;
            self.write(&mut journal, Key::ClaimableNonce(*payer), next)
                .await?;

            let id = hash_parts(&[payer.as_ref(), &nonce.to_be_bytes()]);
            self.move_in(&mut journal, payer, &vault_address(token), token, amount.clone())
                .await?;

            let claimable = Claimable {
                id,
                payer: *payer,
                token,
                amount,
                hash_lock,
                recipient_hint,
                deadline,
                created_at: now,
                status: ClaimableStatus::Init,
            };
            self.write(&mut journal, Key::ClaimableRecord(id), claimable.clone())
                .await?;
            Ok(claimable)
        }
        .await;
        let claimable = self.commit(journal, result).await?;
        debug!(
            id = ?claimable.id,
            payer = %claimable.payer,
            amount = %claimable.amount,
            "claimable created"
        );
        Ok(claimable)
    }

    /// Pays the vaulted funds to `payee` if `preimage` hashes to the lock.
    pub async fn claim_claimable(
        &mut self,
        id: &Digest,
        preimage: &[u8],
        payee: &Address,
    ) -> Result<ClaimableOutcome, Error> {
        require_address(payee)?;
        let mut claimable = self.require_claimable(id).await?;
        match claimable.status {
            ClaimableStatus::Claimed => return Ok(ClaimableOutcome::unchanged(claimable)),
            ClaimableStatus::Init => {}
            _ => return Err(Error::InvalidState("claimable not claimable")),
        }
        if hash_parts(&[preimage]) != claimable.hash_lock {
            return Err(Error::InvalidPreimage);
        }

        claimable.status = ClaimableStatus::Claimed;
        self.settle_claimable(&claimable, payee).await?;
        debug!(?id, %payee, "claimable claimed");
        Ok(ClaimableOutcome::changed(claimable))
    }

    /// Returns the funds to the payer before the deadline.
    pub async fn cancel_claimable(
        &mut self,
        id: &Digest,
        caller: &Address,
        now: u64,
    ) -> Result<ClaimableOutcome, Error> {
        let mut claimable = self.require_claimable(id).await?;
        match claimable.status {
            ClaimableStatus::Cancelled | ClaimableStatus::Expired => {
                return Ok(ClaimableOutcome::unchanged(claimable))
            }
            ClaimableStatus::Init => {}
            ClaimableStatus::Claimed => {
                return Err(Error::InvalidState("claimable already claimed"))
            }
        }
        if *caller != claimable.payer {
            return Err(Error::Unauthorized);
        }
        if now > claimable.deadline {
            return Err(Error::DeadlineExceeded);
        }

        claimable.status = ClaimableStatus::Cancelled;
        let payer = claimable.payer;
        self.settle_claimable(&claimable, &payer).await?;
        debug!(?id, "claimable cancelled");
        Ok(ClaimableOutcome::changed(claimable))
    }

    /// Returns the funds to the payer once the deadline has passed.
    pub async fn expire_claimable(
        &mut self,
        id: &Digest,
        now: u64,
    ) -> Result<ClaimableOutcome, Error> {
        let mut claimable = self.require_claimable(id).await?;
        match claimable.status {
            ClaimableStatus::Expired | ClaimableStatus::Cancelled => {
                return Ok(ClaimableOutcome::unchanged(claimable))
            }
            ClaimableStatus::Init => {}
            ClaimableStatus::Claimed => {
                return Err(Error::InvalidState("claimable already claimed"))
            }
        }
        if now < claimable.deadline {
            return Err(Error::NotExpired);
        }

        claimable.status = ClaimableStatus::Expired;
        let payer = claimable.payer;
        self.settle_claimable(&claimable, &payer).await?;
        debug!(?id, "claimable expired");
        Ok(ClaimableOutcome::changed(claimable))
    }

    /// Pays the vaulted amount to `to` and stores the transitioned record.
    async fn settle_claimable(&mut self, claimable: &Claimable, to: &Address) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.move_in(
                &mut journal,
                &vault_address(claimable.token),
                to,
                claimable.token,
                claimable.amount.clone(),
            )
            .await?;
            self.write(&mut journal, Key::ClaimableRecord(claimable.id), claimable.clone())
                .await
        }
        .await;
        self.commit(journal, result).await
    }
}
