use super::super::*;
use super::{require_address, require_positive};
use anyhow::Context as _;
use commonware_codec::{DecodeExt, Encode};
use nhbchain_types::codec::MAX_STRING_LENGTH;
use nhbchain_types::governance::{
    AuditEvent, AuditRecord, Proposal, ProposalStatus, Vote, VoteChoice,
};
use nhbchain_types::staking::BPS_DENOMINATOR;
use nhbchain_types::Address;
use tracing::debug;

fn decode_vote(entry: &[u8]) -> Result<Vote, Error> {
    Ok(Vote::decode(entry).context("vote index entry")?)
}

impl<S: State> Manager<S> {
    // === Proposals ===

    pub async fn put_proposal(&mut self, proposal: Proposal) -> Result<(), Error> {
        if proposal.id == 0 {
            return Err(Error::InvalidArgument("proposal id must be positive"));
        }
        if proposal.status == ProposalStatus::Unspecified {
            return Err(Error::InvalidArgument("proposal status required"));
        }
        store::put(&mut self.state, Key::Proposal(proposal.id), proposal).await
    }

    pub async fn get_proposal(&self, id: u64) -> Result<Option<Proposal>, Error> {
        self.read(&Key::Proposal(id)).await
    }

    /// Allocates the next proposal id, starting at 1.
    pub async fn next_proposal_id(&mut self) -> Result<u64, Error> {
        let next = store::get_counter(&self.state, &Key::ProposalSeq)
            .await?
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        store::put(&mut self.state, Key::ProposalSeq, next).await?;
        Ok(next)
    }

    // === Votes ===

    /// Parses `choice` and records the ballot.
    pub async fn cast_vote(
        &mut self,
        proposal_id: u64,
        voter: &Address,
        choice: &str,
        power_bps: u32,
        timestamp: u64,
    ) -> Result<Vote, Error> {
        let choice = VoteChoice::parse(choice).ok_or(Error::InvalidVote("unknown choice"))?;
        let vote = Vote {
            proposal_id,
            voter: *voter,
            choice,
            power_bps,
            timestamp,
        };
        self.put_vote(vote.clone()).await?;
        Ok(vote)
    }

    /// Stores a ballot. A repeat vote replaces the voter's earlier ballot in place.
    pub async fn put_vote(&mut self, vote: Vote) -> Result<(), Error> {
        if vote.proposal_id == 0 {
            return Err(Error::InvalidVote("proposal id must be positive"));
        }
        require_address(&vote.voter)?;
        if u64::from(vote.power_bps) > BPS_DENOMINATOR {
            return Err(Error::InvalidVote("power exceeds 10000 bps"));
        }

        let index_key = Key::VoteIndex(vote.proposal_id);
        let mut index = store::get_list(&self.state, &index_key).await?;
        let encoded = vote.encode().to_vec();
        let mut patched = false;
        for entry in index.iter_mut() {
            if decode_vote(entry)?.voter == vote.voter {
                *entry = encoded.clone();
                patched = true;
                break;
            }
        }
        if !patched {
            index.push(encoded);
        }

        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(&mut journal, Key::Vote(vote.proposal_id, vote.voter), vote.clone())
                .await?;
            self.write(&mut journal, index_key, index).await
        }
        .await;
        self.commit(journal, result).await?;
        debug!(
            proposal = vote.proposal_id,
            voter = %vote.voter,
            choice = vote.choice.as_str(),
            "vote recorded"
        );
        Ok(())
    }

    pub async fn get_vote(&self, proposal_id: u64, voter: &Address) -> Result<Option<Vote>, Error> {
        self.read(&Key::Vote(proposal_id, *voter)).await
    }

    /// Ballots for `proposal_id` in the order voters first voted.
    pub async fn list_votes(&self, proposal_id: u64) -> Result<Vec<Vote>, Error> {
        store::get_list(&self.state, &Key::VoteIndex(proposal_id))
            .await?
            .iter()
            .map(|entry| decode_vote(entry))
            .collect()
    }

    pub async fn has_voted(&self, proposal_id: u64, voter: &Address) -> Result<bool, Error> {
        Ok(self.get_vote(proposal_id, voter).await?.is_some())
    }

    // === Deposit escrow ===

    pub async fn governance_escrow_balance(&self, address: &Address) -> Result<Natural, Error> {
        require_address(address)?;
        store::get_amount(&self.state, &Key::GovernanceEscrow(*address)).await
    }

    /// Adds `amount` to the deposit held for `address`.
    pub async fn governance_escrow_lock(
        &mut self,
        address: &Address,
        amount: Natural,
    ) -> Result<Natural, Error> {
        require_positive(&amount)?;
        let balance = self.governance_escrow_balance(address).await? + amount;
        store::put(&mut self.state, Key::GovernanceEscrow(*address), balance.clone()).await?;
        Ok(balance)
    }

    /// Releases `amount` of the deposit held for `address`; fails if it would go negative.
    pub async fn governance_escrow_unlock(
        &mut self,
        address: &Address,
        amount: Natural,
    ) -> Result<Natural, Error> {
        require_positive(&amount)?;
        let balance = self.governance_escrow_balance(address).await?;
        if balance < amount {
            return Err(Error::InsufficientFunds);
        }
        let balance = balance - amount;
        store::put(&mut self.state, Key::GovernanceEscrow(*address), balance.clone()).await?;
        Ok(balance)
    }

    // === Audit log ===

    /// Appends an audit entry under the next sequence number.
    ///
    /// The record and the sequence counter land together; if either write fails neither is
    /// visible and the sequence is not consumed.
    pub async fn append_audit(
        &mut self,
        event: AuditEvent,
        proposal_id: u64,
        actor: Option<Address>,
        details: &str,
        timestamp: u64,
    ) -> Result<AuditRecord, Error> {
        if details.len() > MAX_STRING_LENGTH {
            return Err(Error::InvalidArgument("audit details too long"));
        }
        let sequence = store::get_counter(&self.state, &Key::AuditSeq)
            .await?
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        let record = AuditRecord {
            sequence,
            timestamp,
            event,
            proposal_id,
            actor,
            details: details.to_string(),
        };

        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(&mut journal, Key::Audit(sequence), record.clone())
                .await?;
            self.write(&mut journal, Key::AuditSeq, sequence).await
        }
        .await;
        self.commit(journal, result).await?;
        Ok(record)
    }

    pub async fn get_audit(&self, sequence: u64) -> Result<Option<AuditRecord>, Error> {
        self.read(&Key::Audit(sequence)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{address, manager};
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;

    fn proposal(id: u64) -> Proposal {
        Proposal {
            id,
            title: "Raise APR".into(),
            status: ProposalStatus::VotingPeriod,
            submitter: address(1),
            deposit: Natural::from(100u32),
            ..Proposal::default()
        }
    }

    #[test]
    fn proposals_require_id_and_status() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            assert_eq!(manager.next_proposal_id().await.unwrap(), 1);
            assert_eq!(manager.next_proposal_id().await.unwrap(), 2);

            assert!(matches!(
                manager.put_proposal(proposal(0)).await,
                Err(Error::InvalidArgument(_))
            ));
            let mut unspecified = proposal(1);
            unspecified.status = ProposalStatus::Unspecified;
            assert!(matches!(
                manager.put_proposal(unspecified).await,
                Err(Error::InvalidArgument(_))
            ));

            manager.put_proposal(proposal(1)).await.unwrap();
            assert_eq!(manager.get_proposal(1).await.unwrap(), Some(proposal(1)));
            assert_eq!(manager.get_proposal(2).await.unwrap(), None);
        });
    }

    #[test]
    fn revote_patches_index_in_place() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            manager.cast_vote(1, &address(1), "yes", 5_000, 10).await.unwrap();
            manager.cast_vote(1, &address(2), "no", 3_000, 11).await.unwrap();
            manager
                .cast_vote(1, &address(1), "ABSTAIN", 5_000, 12)
                .await
                .unwrap();

            let votes = manager.list_votes(1).await.unwrap();
            assert_eq!(votes.len(), 2);
            assert_eq!(votes[0].voter, address(1));
            assert_eq!(votes[0].choice, VoteChoice::Abstain);
            assert_eq!(votes[1].voter, address(2));
            assert!(manager.has_voted(1, &address(2)).await.unwrap());
            assert!(!manager.has_voted(1, &address(3)).await.unwrap());
            assert_eq!(
                manager.get_vote(1, &address(1)).await.unwrap().unwrap().timestamp,
                12
            );
        });
    }

    #[test]
    fn invalid_votes_are_rejected() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            assert!(matches!(
                manager.cast_vote(1, &address(1), "maybe", 1, 0).await,
                Err(Error::InvalidVote(_))
            ));
            assert!(matches!(
                manager.cast_vote(1, &address(1), "yes", 10_001, 0).await,
                Err(Error::InvalidVote(_))
            ));
            assert!(matches!(
                manager.cast_vote(0, &address(1), "yes", 1, 0).await,
                Err(Error::InvalidVote(_))
            ));
            assert!(matches!(
                manager.cast_vote(1, &Address::ZERO, "yes", 1, 0).await,
                Err(Error::InvalidAddress)
            ));
            assert!(manager.list_votes(1).await.unwrap().is_empty());
        });
    }

    #[test]
    fn scenario_escrow_unlock_fails_closed() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let who = address(4);
            manager
                .governance_escrow_lock(&who, Natural::from(100u32))
                .await
                .unwrap();
            let balance = manager
                .governance_escrow_lock(&who, Natural::from(200u32))
                .await
                .unwrap();
            assert_eq!(balance, 300u32);
            assert!(matches!(
                manager
                    .governance_escrow_unlock(&who, Natural::from(500u32))
                    .await,
                Err(Error::InsufficientFunds)
            ));
            assert_eq!(manager.governance_escrow_balance(&who).await.unwrap(), 300u32);
            let balance = manager
                .governance_escrow_unlock(&who, Natural::from(300u32))
                .await
                .unwrap();
            assert_eq!(balance, 0u32);
        });
    }

    #[test]
    fn audit_sequence_is_not_consumed_by_failed_write() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let mut manager = manager();
            let first = manager
                .append_audit(AuditEvent::Proposed, 1, Some(address(1)), "created", 10)
                .await
                .unwrap();
            assert_eq!(first.sequence, 1);

            manager.state_mut().fail_next_write(&Key::AuditSeq);
            let err = manager
                .append_audit(AuditEvent::Vote, 1, None, "vote", 11)
                .await
                .unwrap_err();
            assert!(err.is_persistence());
            assert_eq!(manager.get_audit(2).await.unwrap(), None);

            let second = manager
                .append_audit(AuditEvent::Vote, 1, None, "vote", 12)
                .await
                .unwrap();
            assert_eq!(second.sequence, 2);
            assert_eq!(manager.get_audit(1).await.unwrap(), Some(first));
        });
    }
}
