use super::super::*;
use super::transfer::Leg;
use super::{parse_token, require_positive};
use commonware_cryptography::sha256::Digest;
use nhbchain_types::escrow::{Escrow, EscrowStatus};
use nhbchain_types::{hash_parts, vault_address, Address, Token};
use tracing::debug;

/// Mediator decision on a disputed escrow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Release,
    Refund,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Release => "release",
            Resolution::Refund => "refund",
        }
    }
}

/// Escrow after a transition and whether this call changed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscrowOutcome {
    pub escrow: Escrow,
    pub changed: bool,
}

/// Parameters of a new escrow.
#[derive(Clone, Debug)]
pub struct EscrowRequest {
    pub payer: Address,
    pub payee: Address,
    pub mediator: Option<Address>,
    pub token: String,
    pub amount: Natural,
    pub fee_bps: u32,
    pub deadline: u64,
    pub nonce: u64,
    pub meta_hash: Digest,
}

fn escrow_id(payer: &Address, payee: &Address, nonce: u64) -> Digest {
    hash_parts(&[payer.as_ref(), payee.as_ref(), &nonce.to_be_bytes()])
}

impl<S: State> Manager<S> {
    // === Storage ===

    /// Stores `escrow` after checking its invariants.
    pub async fn escrow_put(&mut self, escrow: Escrow) -> Result<(), Error> {
        escrow.sanitize()?;
        store::put(&mut self.state, Key::EscrowRecord(escrow.id), escrow).await
    }

    pub async fn escrow_get(&self, id: &Digest) -> Result<Option<Escrow>, Error> {
        self.read(&Key::EscrowRecord(*id)).await
    }

    /// Funds of `token` currently held for escrow `id`.
    pub async fn escrow_balance(&self, id: &Digest, token: Token) -> Result<Natural, Error> {
        store::get_amount(&self.state, &Key::EscrowVault(token, *id)).await
    }

    pub async fn escrow_credit(
        &mut self,
        id: &Digest,
        token: Token,
        amount: Natural,
    ) -> Result<Natural, Error> {
        let mut journal = Journal::new();
        let result = self.escrow_credit_in(&mut journal, id, token, amount).await;
        self.commit(journal, result).await
    }

    pub async fn escrow_debit(
        &mut self,
        id: &Digest,
        token: Token,
        amount: Natural,
    ) -> Result<Natural, Error> {
        let mut journal = Journal::new();
        let result = self.escrow_debit_in(&mut journal, id, token, amount).await;
        self.commit(journal, result).await
    }

    async fn escrow_credit_in(
        &mut self,
        journal: &mut Journal,
        id: &Digest,
        token: Token,
        amount: Natural,
    ) -> Result<Natural, Error> {
        require_positive(&amount)?;
        self.require_escrow(id).await?;
        let balance = self.escrow_balance(id, token).await? + amount;
        self.write(journal, Key::EscrowVault(token, *id), balance.clone())
            .await?;
        Ok(balance)
    }

    async fn escrow_debit_in(
        &mut self,
        journal: &mut Journal,
        id: &Digest,
        token: Token,
        amount: Natural,
    ) -> Result<Natural, Error> {
        require_positive(&amount)?;
        let balance = self.escrow_balance(id, token).await?;
        if balance < amount {
            return Err(Error::InsufficientFunds);
        }
        let balance = balance - amount;
        self.write(journal, Key::EscrowVault(token, *id), balance.clone())
            .await?;
        Ok(balance)
    }

    async fn require_escrow(&self, id: &Digest) -> Result<Escrow, Error> {
        self.escrow_get(id).await?.ok_or(Error::NotFound("escrow"))
    }

    // === Engine ===

    /// Opens an escrow; creating one whose id already exists returns the stored record.
    pub async fn create_escrow(
        &mut self,
        request: EscrowRequest,
        now: u64,
    ) -> Result<Escrow, Error> {
        let token = parse_token(&request.token)?;
        require_positive(&request.amount)?;
        if request.deadline < now {
            return Err(Error::InvalidArgument("deadline before now"));
        }

        let id = escrow_id(&request.payer, &request.payee, request.nonce);
        if let Some(existing) = self.escrow_get(&id).await? {
            return Ok(existing);
        }
        let escrow = Escrow {
            id,
            payer: request.payer,
            payee: request.payee,
            mediator: request.mediator,
            token,
            amount: request.amount,
            fee_bps: request.fee_bps,
            deadline: request.deadline,
            created_at: now,
            nonce: request.nonce,
            meta_hash: request.meta_hash,
            status: EscrowStatus::Init,
            frozen_arb: None,
            resolution_hash: None,
        };
        self.escrow_put(escrow.clone()).await?;
        debug!(?id, payer = %escrow.payer, payee = %escrow.payee, "escrow created");
        Ok(escrow)
    }

    /// Moves the escrowed amount from the payer into the vault.
    pub async fn fund_escrow(
        &mut self,
        id: &Digest,
        caller: &Address,
    ) -> Result<EscrowOutcome, Error> {
        let mut escrow = self.require_escrow(id).await?;
        if *caller != escrow.payer {
            return Err(Error::Unauthorized);
        }
        match escrow.status {
            EscrowStatus::Funded => return Ok(unchanged(escrow)),
            EscrowStatus::Init => {}
            _ => return Err(Error::InvalidState("escrow not fundable")),
        }

        escrow.status = EscrowStatus::Funded;
        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            let vault = vault_address(escrow.token);
            self.move_in(&mut journal, &escrow.payer, &vault, escrow.token, escrow.amount.clone())
                .await?;
            self.escrow_credit_in(&mut journal, id, escrow.token, escrow.amount.clone())
                .await?;
            self.write(&mut journal, Key::EscrowRecord(*id), escrow.clone())
                .await
        }
        .await;
        self.commit(journal, result).await?;
        debug!(?id, amount = %escrow.amount, "escrow funded");
        Ok(changed(escrow))
    }

    /// Pays the payee, less the fee which goes to the treasury.
    pub async fn release_escrow(
        &mut self,
        id: &Digest,
        caller: &Address,
    ) -> Result<EscrowOutcome, Error> {
        let escrow = self.require_escrow(id).await?;
        if *caller != escrow.payee && Some(*caller) != escrow.mediator {
            return Err(Error::Unauthorized);
        }
        match escrow.status {
            EscrowStatus::Released => Ok(unchanged(escrow)),
            EscrowStatus::Funded => self.settle_release(escrow, None).await,
            _ => Err(Error::InvalidState("escrow not releasable")),
        }
    }

    /// Returns the funds to the payer before the deadline.
    pub async fn refund_escrow(
        &mut self,
        id: &Digest,
        caller: &Address,
        now: u64,
    ) -> Result<EscrowOutcome, Error> {
        let escrow = self.require_escrow(id).await?;
        if *caller != escrow.payer {
            return Err(Error::Unauthorized);
        }
        match escrow.status {
            EscrowStatus::Refunded => return Ok(unchanged(escrow)),
            EscrowStatus::Init | EscrowStatus::Funded => {}
            _ => return Err(Error::InvalidState("escrow not refundable")),
        }
        if now >= escrow.deadline {
            return Err(Error::DeadlineExceeded);
        }
        self.settle_refund(escrow, EscrowStatus::Refunded, None)
            .await
    }

    /// Returns the funds to the payer once the deadline has passed.
    pub async fn expire_escrow(&mut self, id: &Digest, now: u64) -> Result<EscrowOutcome, Error> {
        let escrow = self.require_escrow(id).await?;
        match escrow.status {
            EscrowStatus::Expired => return Ok(unchanged(escrow)),
            EscrowStatus::Init | EscrowStatus::Funded => {}
            _ => return Err(Error::InvalidState("escrow not expirable")),
        }
        if now < escrow.deadline {
            return Err(Error::NotExpired);
        }
        self.settle_refund(escrow, EscrowStatus::Expired, None).await
    }

    /// Freezes a funded escrow until the mediator resolves it.
    pub async fn dispute_escrow(
        &mut self,
        id: &Digest,
        caller: &Address,
    ) -> Result<EscrowOutcome, Error> {
        let mut escrow = self.require_escrow(id).await?;
        if *caller != escrow.payer && *caller != escrow.payee {
            return Err(Error::Unauthorized);
        }
        match escrow.status {
            EscrowStatus::Disputed => return Ok(unchanged(escrow)),
            EscrowStatus::Funded => {}
            _ => return Err(Error::InvalidState("escrow not disputable")),
        }
        escrow.status = EscrowStatus::Disputed;
        self.escrow_put(escrow.clone()).await?;
        debug!(?id, %caller, "escrow disputed");
        Ok(changed(escrow))
    }

    /// Settles a disputed escrow in favour of the payee or the payer.
    pub async fn resolve_escrow(
        &mut self,
        id: &Digest,
        caller: &Address,
        outcome: Resolution,
    ) -> Result<EscrowOutcome, Error> {
        let escrow = self.require_escrow(id).await?;
        if escrow.mediator != Some(*caller) {
            return Err(Error::Unauthorized);
        }
        if escrow.status != EscrowStatus::Disputed {
            return Err(Error::InvalidState("escrow not disputed"));
        }
        let resolution = hash_parts(&[id.as_ref(), outcome.as_str().as_bytes()]);
        let settled = match outcome {
            Resolution::Release => self.settle_release(escrow, Some(resolution)).await?,
            Resolution::Refund => {
                self.settle_refund(escrow, EscrowStatus::Refunded, Some(resolution))
                    .await?
            }
        };
        debug!(?id, outcome = outcome.as_str(), "escrow resolved");
        Ok(settled)
    }

    async fn settle_release(
        &mut self,
        mut escrow: Escrow,
        resolution: Option<Digest>,
    ) -> Result<EscrowOutcome, Error> {
        let held = self.escrow_balance(&escrow.id, escrow.token).await?;
        let fee = escrow.fee().min(held.clone());
        let net = &held - &fee;
        let vault = vault_address(escrow.token);

        let mut legs = Vec::with_capacity(3);
        if held > 0u32 {
            legs.push(Leg::Debit {
                address: vault,
                token: escrow.token,
                amount: held.clone(),
            });
        }
        if net > 0u32 {
            legs.push(Leg::Credit {
                address: escrow.payee,
                token: escrow.token,
                amount: net,
            });
        }
        if fee > 0u32 {
            let treasury = self
                .config
                .fee_treasury
                .ok_or(Error::InvalidState("fee treasury not configured"))?;
            legs.push(Leg::Credit {
                address: treasury,
                token: escrow.token,
                amount: fee,
            });
        }

        escrow.status = EscrowStatus::Released;
        if resolution.is_some() {
            escrow.resolution_hash = resolution;
        }
        self.pay_out(&escrow, &legs, held).await?;
        debug!(id = ?escrow.id, "escrow released");
        Ok(changed(escrow))
    }

    async fn settle_refund(
        &mut self,
        mut escrow: Escrow,
        status: EscrowStatus,
        resolution: Option<Digest>,
    ) -> Result<EscrowOutcome, Error> {
        let held = self.escrow_balance(&escrow.id, escrow.token).await?;
        let mut legs = Vec::with_capacity(2);
        if held > 0u32 {
            legs.push(Leg::Debit {
                address: vault_address(escrow.token),
                token: escrow.token,
                amount: held.clone(),
            });
            legs.push(Leg::Credit {
                address: escrow.payer,
                token: escrow.token,
                amount: held.clone(),
            });
        }

        escrow.status = status;
        if resolution.is_some() {
            escrow.resolution_hash = resolution;
        }
        self.pay_out(&escrow, &legs, held).await?;
        debug!(id = ?escrow.id, ?status, "escrow refunded");
        Ok(changed(escrow))
    }

    /// Applies `legs`, drains `held` from the escrow balance and stores the record.
    async fn pay_out(&mut self, escrow: &Escrow, legs: &[Leg], held: Natural) -> Result<(), Error> {
        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            if !legs.is_empty() {
                self.transfer_in(&mut journal, legs).await?;
            }
            if held > 0u32 {
                self.escrow_debit_in(&mut journal, &escrow.id, escrow.token, held)
                    .await?;
            }
            escrow.sanitize()?;
            self.write(&mut journal, Key::EscrowRecord(escrow.id), escrow.clone())
                .await
        }
        .await;
        self.commit(journal, result).await
    }
}

fn changed(escrow: Escrow) -> EscrowOutcome {
    EscrowOutcome {
        escrow,
        changed: true,
    }
}

fn unchanged(escrow: Escrow) -> EscrowOutcome {
    EscrowOutcome {
        escrow,
        changed: false,
    }
}
