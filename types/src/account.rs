//! Account records.
//!
//! A logical [`Account`] is stored as two independent records: a [`CoreAccount`] mirroring the
//! execution layer (nonce, base balance, storage root, code hash) and an [`AccountMetadata`]
//! carrying every other field. Metadata can be rewritten without touching the core record.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use malachite::Natural;

use crate::codec::{
    natural_encode_size, read_natural, read_string, string_encode_size, write_natural,
    write_string, MAX_STRING_LENGTH,
};
use crate::primitives::Address;

pub const MAX_PENDING_UNBONDS: usize = 1024;

/// Root of an empty storage trie.
pub fn empty_root_hash() -> Digest {
    Sha256::hash(&[])
}

/// Hash of empty contract code.
pub fn empty_code_hash() -> Digest {
    Sha256::hash(&[])
}

fn is_zero_digest(digest: &Digest) -> bool {
    digest.as_ref().iter().all(|b| *b == 0)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LendingSnapshot {
    pub supply_index: Natural,
    pub borrow_index: Natural,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LendingBreaker {
    pub collateral_disabled: bool,
    pub borrow_disabled: bool,
}

/// Daily engagement meters; counters reset when `day` rolls over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Engagement {
    pub score: u64,
    pub day: String,
    pub minutes: u64,
    pub tx_count: u64,
    pub escrow_events: u64,
    pub gov_events: u64,
    pub last_heartbeat: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingUnbond {
    pub id: u64,
    pub validator: Address,
    pub amount: Natural,
    pub release_time: u64,
}

/// The merged view of an address.
///
/// Every numeric field is a non-negative arbitrary-precision integer; missing values load as
/// zero and are always written back explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub balance_nhb: Natural,
    pub balance_znhb: Natural,
    pub nonce: u64,
    pub storage_root: Digest,
    pub code_hash: Digest,

    pub stake: Natural,
    pub stake_shares: Natural,
    pub stake_last_index: Natural,
    pub stake_last_payout_ts: u64,
    pub locked_znhb: Natural,
    pub collateral_balance: Natural,
    pub debt_principal: Natural,
    pub supply_shares: Natural,
    pub lending_snapshot: LendingSnapshot,
    pub delegated_validator: Option<Address>,
    pub pending_unbonds: Vec<PendingUnbond>,
    pub next_unbonding_id: u64,

    pub username: String,
    pub engagement: Engagement,
    pub lending_breaker: LendingBreaker,
}

impl Default for Account {
    fn default() -> Self {
        Account::from_parts(CoreAccount::default(), AccountMetadata::default())
    }
}

impl Account {
    /// Merges the two stored halves.
    pub fn from_parts(core: CoreAccount, meta: AccountMetadata) -> Self {
        Self {
            balance_nhb: core.balance,
            balance_znhb: meta.balance_znhb,
            nonce: core.nonce,
            storage_root: core.storage_root,
            code_hash: core.code_hash,
            stake: meta.stake,
            stake_shares: meta.stake_shares,
            stake_last_index: meta.stake_last_index,
            stake_last_payout_ts: meta.stake_last_payout_ts,
            locked_znhb: meta.locked_znhb,
            collateral_balance: meta.collateral_balance,
            debt_principal: meta.debt_principal,
            supply_shares: meta.supply_shares,
            lending_snapshot: meta.lending_snapshot,
            delegated_validator: meta.delegated_validator,
            pending_unbonds: meta.pending_unbonds,
            next_unbonding_id: meta.next_unbonding_id,
            username: meta.username,
            engagement: meta.engagement,
            lending_breaker: meta.lending_breaker,
        }
    }

    pub fn core(&self) -> CoreAccount {
        let mut core = CoreAccount {
            nonce: self.nonce,
            balance: self.balance_nhb.clone(),
            storage_root: self.storage_root,
            code_hash: self.code_hash,
        };
        core.normalize();
        core
    }

    pub fn metadata(&self) -> AccountMetadata {
        AccountMetadata {
            balance_znhb: self.balance_znhb.clone(),
            stake: self.stake.clone(),
            stake_shares: self.stake_shares.clone(),
            stake_last_index: self.stake_last_index.clone(),
            stake_last_payout_ts: self.stake_last_payout_ts,
            locked_znhb: self.locked_znhb.clone(),
            collateral_balance: self.collateral_balance.clone(),
            debt_principal: self.debt_principal.clone(),
            supply_shares: self.supply_shares.clone(),
            lending_snapshot: self.lending_snapshot.clone(),
            delegated_validator: self.delegated_validator,
            pending_unbonds: self.pending_unbonds.clone(),
            next_unbonding_id: self.next_unbonding_id,
            username: self.username.clone(),
            engagement: self.engagement.clone(),
            lending_breaker: self.lending_breaker,
        }
    }

    pub fn balance(&self, token: crate::Token) -> &Natural {
        match token {
            crate::Token::Nhb => &self.balance_nhb,
            crate::Token::Znhb => &self.balance_znhb,
        }
    }

    pub fn balance_mut(&mut self, token: crate::Token) -> &mut Natural {
        match token {
            crate::Token::Nhb => &mut self.balance_nhb,
            crate::Token::Znhb => &mut self.balance_znhb,
        }
    }
}

/// Execution-layer account shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreAccount {
    pub nonce: u64,
    pub balance: Natural,
    pub storage_root: Digest,
    pub code_hash: Digest,
}

impl Default for CoreAccount {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: Natural::default(),
            storage_root: empty_root_hash(),
            code_hash: empty_code_hash(),
        }
    }
}

impl CoreAccount {
    /// Replaces zeroed hashes with their empty defaults.
    pub fn normalize(&mut self) {
        if is_zero_digest(&self.storage_root) {
            self.storage_root = empty_root_hash();
        }
        if is_zero_digest(&self.code_hash) {
            self.code_hash = empty_code_hash();
        }
    }
}

impl Write for CoreAccount {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        write_natural(&self.balance, writer);
        self.storage_root.write(writer);
        self.code_hash.write(writer);
    }
}

impl Read for CoreAccount {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let mut core = Self {
            nonce: u64::read(reader)?,
            balance: read_natural(reader)?,
            storage_root: Digest::read(reader)?,
            code_hash: Digest::read(reader)?,
        };
        core.normalize();
        Ok(core)
    }
}

impl EncodeSize for CoreAccount {
    fn encode_size(&self) -> usize {
        u64::SIZE + natural_encode_size(&self.balance) + Digest::SIZE * 2
    }
}

/// Everything an account carries beyond the execution-layer shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountMetadata {
    pub balance_znhb: Natural,
    pub stake: Natural,
    pub stake_shares: Natural,
    pub stake_last_index: Natural,
    pub stake_last_payout_ts: u64,
    pub locked_znhb: Natural,
    pub collateral_balance: Natural,
    pub debt_principal: Natural,
    pub supply_shares: Natural,
    pub lending_snapshot: LendingSnapshot,
    pub delegated_validator: Option<Address>,
    pub pending_unbonds: Vec<PendingUnbond>,
    pub next_unbonding_id: u64,
    pub username: String,
    pub engagement: Engagement,
    pub lending_breaker: LendingBreaker,
}

impl Write for PendingUnbond {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.validator.write(writer);
        write_natural(&self.amount, writer);
        self.release_time.write(writer);
    }
}

impl Read for PendingUnbond {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: u64::read(reader)?,
            validator: Address::read(reader)?,
            amount: read_natural(reader)?,
            release_time: u64::read(reader)?,
        })
    }
}

impl EncodeSize for PendingUnbond {
    fn encode_size(&self) -> usize {
        u64::SIZE + Address::SIZE + natural_encode_size(&self.amount) + u64::SIZE
    }
}

impl Write for Engagement {
    fn write(&self, writer: &mut impl BufMut) {
        self.score.write(writer);
        write_string(&self.day, writer);
        self.minutes.write(writer);
        self.tx_count.write(writer);
        self.escrow_events.write(writer);
        self.gov_events.write(writer);
        self.last_heartbeat.write(writer);
    }
}

impl Read for Engagement {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            score: u64::read(reader)?,
            day: read_string(reader, MAX_STRING_LENGTH)?,
            minutes: u64::read(reader)?,
            tx_count: u64::read(reader)?,
            escrow_events: u64::read(reader)?,
            gov_events: u64::read(reader)?,
            last_heartbeat: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Engagement {
    fn encode_size(&self) -> usize {
        u64::SIZE * 6 + string_encode_size(&self.day)
    }
}

impl Write for AccountMetadata {
    fn write(&self, writer: &mut impl BufMut) {
        write_natural(&self.balance_znhb, writer);
        write_natural(&self.stake, writer);
        write_natural(&self.stake_shares, writer);
        write_natural(&self.stake_last_index, writer);
        self.stake_last_payout_ts.write(writer);
        write_natural(&self.locked_znhb, writer);
        write_natural(&self.collateral_balance, writer);
        write_natural(&self.debt_principal, writer);
        write_natural(&self.supply_shares, writer);
        write_natural(&self.lending_snapshot.supply_index, writer);
        write_natural(&self.lending_snapshot.borrow_index, writer);
        self.delegated_validator.write(writer);
        self.pending_unbonds.write(writer);
        self.next_unbonding_id.write(writer);
        write_string(&self.username, writer);
        self.engagement.write(writer);
        self.lending_breaker.collateral_disabled.write(writer);
        self.lending_breaker.borrow_disabled.write(writer);
    }
}

impl Read for AccountMetadata {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            balance_znhb: read_natural(reader)?,
            stake: read_natural(reader)?,
            stake_shares: read_natural(reader)?,
            stake_last_index: read_natural(reader)?,
            stake_last_payout_ts: u64::read(reader)?,
            locked_znhb: read_natural(reader)?,
            collateral_balance: read_natural(reader)?,
            debt_principal: read_natural(reader)?,
            supply_shares: read_natural(reader)?,
            lending_snapshot: LendingSnapshot {
                supply_index: read_natural(reader)?,
                borrow_index: read_natural(reader)?,
            },
            delegated_validator: Option::<Address>::read(reader)?,
            pending_unbonds: Vec::<PendingUnbond>::read_range(reader, 0..=MAX_PENDING_UNBONDS)?,
            next_unbonding_id: u64::read(reader)?,
            username: read_string(reader, MAX_STRING_LENGTH)?,
            engagement: Engagement::read(reader)?,
            lending_breaker: LendingBreaker {
                collateral_disabled: bool::read(reader)?,
                borrow_disabled: bool::read(reader)?,
            },
        })
    }
}

impl EncodeSize for AccountMetadata {
    fn encode_size(&self) -> usize {
        natural_encode_size(&self.balance_znhb)
            + natural_encode_size(&self.stake)
            + natural_encode_size(&self.stake_shares)
            + natural_encode_size(&self.stake_last_index)
            + u64::SIZE
            + natural_encode_size(&self.locked_znhb)
            + natural_encode_size(&self.collateral_balance)
            + natural_encode_size(&self.debt_principal)
            + natural_encode_size(&self.supply_shares)
            + natural_encode_size(&self.lending_snapshot.supply_index)
            + natural_encode_size(&self.lending_snapshot.borrow_index)
            + self.delegated_validator.encode_size()
            + self.pending_unbonds.encode_size()
            + u64::SIZE
            + string_encode_size(&self.username)
            + self.engagement.encode_size()
            + bool::SIZE * 2
    }
}
