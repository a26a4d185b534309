//! Hash-locked claimable payments.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::sha256::Digest;
use malachite::Natural;

use crate::codec::{natural_encode_size, read_natural, write_natural};
use crate::primitives::{Address, Token};

/// Lifecycle of a claimable. Every transition out of `Init` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClaimableStatus {
    #[default]
    Init,
    Claimed,
    Cancelled,
    Expired,
}

impl ClaimableStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Init)
    }
}

impl Write for ClaimableStatus {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Init => 0,
            Self::Claimed => 1,
            Self::Cancelled => 2,
            Self::Expired => 3,
        };
        tag.write(writer);
    }
}

impl Read for ClaimableStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Init),
            1 => Ok(Self::Claimed),
            2 => Ok(Self::Cancelled),
            3 => Ok(Self::Expired),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for ClaimableStatus {
    const SIZE: usize = u8::SIZE;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claimable {
    pub id: Digest,
    pub payer: Address,
    pub token: Token,
    pub amount: Natural,
    /// `sha256(preimage)` required to claim.
    pub hash_lock: Digest,
    pub recipient_hint: Digest,
    pub deadline: u64,
    pub created_at: u64,
    pub status: ClaimableStatus,
}

impl Write for Claimable {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.payer.write(writer);
        self.token.write(writer);
        write_natural(&self.amount, writer);
        self.hash_lock.write(writer);
        self.recipient_hint.write(writer);
        self.deadline.write(writer);
        self.created_at.write(writer);
        self.status.write(writer);
    }
}

impl Read for Claimable {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: Digest::read(reader)?,
            payer: Address::read(reader)?,
            token: Token::read(reader)?,
            amount: read_natural(reader)?,
            hash_lock: Digest::read(reader)?,
            recipient_hint: Digest::read(reader)?,
            deadline: u64::read(reader)?,
            created_at: u64::read(reader)?,
            status: ClaimableStatus::read(reader)?,
        })
    }
}

impl EncodeSize for Claimable {
    fn encode_size(&self) -> usize {
        Digest::SIZE * 3
            + Address::SIZE
            + Token::SIZE
            + natural_encode_size(&self.amount)
            + u64::SIZE * 2
            + ClaimableStatus::SIZE
    }
}
