//! Escrow and trade records.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::sha256::Digest;
use malachite::Natural;
use thiserror::Error as ThisError;

use crate::codec::{
    natural_encode_size, read_natural, read_string, string_encode_size, write_natural,
    write_string, MAX_STRING_LENGTH,
};
use crate::primitives::{Address, Token};
use crate::staking::BPS_DENOMINATOR;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum EscrowInvariantError {
    #[error("escrow nonce must be positive")]
    ZeroNonce,
    #[error("fee bps out of range (got={got}, max={max})")]
    FeeOutOfRange { got: u32, max: u64 },
    #[error("payer and payee must be set")]
    MissingParty,
    #[error("trade slippage out of range (got={got}, max={max})")]
    SlippageOutOfRange { got: u32, max: u64 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EscrowStatus {
    #[default]
    Init,
    Funded,
    Released,
    Refunded,
    Expired,
    Disputed,
}

impl Write for EscrowStatus {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Init => 0,
            Self::Funded => 1,
            Self::Released => 2,
            Self::Refunded => 3,
            Self::Expired => 4,
            Self::Disputed => 5,
        };
        tag.write(writer);
    }
}

impl Read for EscrowStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Init),
            1 => Ok(Self::Funded),
            2 => Ok(Self::Released),
            3 => Ok(Self::Refunded),
            4 => Ok(Self::Expired),
            5 => Ok(Self::Disputed),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for EscrowStatus {
    const SIZE: usize = u8::SIZE;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Escrow {
    pub id: Digest,
    pub payer: Address,
    pub payee: Address,
    pub mediator: Option<Address>,
    pub token: Token,
    pub amount: Natural,
    pub fee_bps: u32,
    pub deadline: u64,
    pub created_at: u64,
    pub nonce: u64,
    pub meta_hash: Digest,
    pub status: EscrowStatus,
    /// Realm whose arbitration policy was frozen at creation, if any.
    pub frozen_arb: Option<String>,
    pub resolution_hash: Option<Digest>,
}

impl Escrow {
    /// Checks the invariants every stored escrow must satisfy.
    pub fn sanitize(&self) -> Result<(), EscrowInvariantError> {
        if self.nonce == 0 {
            return Err(EscrowInvariantError::ZeroNonce);
        }
        if u64::from(self.fee_bps) > BPS_DENOMINATOR {
            return Err(EscrowInvariantError::FeeOutOfRange {
                got: self.fee_bps,
                max: BPS_DENOMINATOR,
            });
        }
        if self.payer.is_zero() || self.payee.is_zero() {
            return Err(EscrowInvariantError::MissingParty);
        }
        Ok(())
    }

    /// `amount * fee_bps / 10_000`, rounded down.
    pub fn fee(&self) -> Natural {
        &self.amount * Natural::from(self.fee_bps) / Natural::from(BPS_DENOMINATOR)
    }
}

impl Write for Escrow {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.payer.write(writer);
        self.payee.write(writer);
        self.mediator.write(writer);
        self.token.write(writer);
        write_natural(&self.amount, writer);
        self.fee_bps.write(writer);
        self.deadline.write(writer);
        self.created_at.write(writer);
        self.nonce.write(writer);
        self.meta_hash.write(writer);
        self.status.write(writer);
        match &self.frozen_arb {
            Some(realm) => {
                true.write(writer);
                write_string(realm, writer);
            }
            None => false.write(writer),
        }
        self.resolution_hash.write(writer);
    }
}

impl Read for Escrow {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = Digest::read(reader)?;
        let payer = Address::read(reader)?;
        let payee = Address::read(reader)?;
        let mediator = Option::<Address>::read(reader)?;
        let token = Token::read(reader)?;
        let amount = read_natural(reader)?;
        let fee_bps = u32::read(reader)?;
        let deadline = u64::read(reader)?;
        let created_at = u64::read(reader)?;
        let nonce = u64::read(reader)?;
        let meta_hash = Digest::read(reader)?;
        let status = EscrowStatus::read(reader)?;
        let frozen_arb = if bool::read(reader)? {
            Some(read_string(reader, MAX_STRING_LENGTH)?)
        } else {
            None
        };
        let resolution_hash = Option::<Digest>::read(reader)?;
        Ok(Self {
            id,
            payer,
            payee,
            mediator,
            token,
            amount,
            fee_bps,
            deadline,
            created_at,
            nonce,
            meta_hash,
            status,
            frozen_arb,
            resolution_hash,
        })
    }
}

impl EncodeSize for Escrow {
    fn encode_size(&self) -> usize {
        Digest::SIZE
            + Address::SIZE * 2
            + self.mediator.encode_size()
            + Token::SIZE
            + natural_encode_size(&self.amount)
            + u32::SIZE
            + u64::SIZE * 3
            + Digest::SIZE
            + EscrowStatus::SIZE
            + bool::SIZE
            + self.frozen_arb.as_deref().map_or(0, string_encode_size)
            + self.resolution_hash.encode_size()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TradeStatus {
    #[default]
    Init,
    PartialFunded,
    Funded,
    Disputed,
    Settled,
    Cancelled,
    Expired,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled | Self::Expired)
    }
}

impl Write for TradeStatus {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Init => 0,
            Self::PartialFunded => 1,
            Self::Funded => 2,
            Self::Disputed => 3,
            Self::Settled => 4,
            Self::Cancelled => 5,
            Self::Expired => 6,
        };
        tag.write(writer);
    }
}

impl Read for TradeStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Init),
            1 => Ok(Self::PartialFunded),
            2 => Ok(Self::Funded),
            3 => Ok(Self::Disputed),
            4 => Ok(Self::Settled),
            5 => Ok(Self::Cancelled),
            6 => Ok(Self::Expired),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for TradeStatus {
    const SIZE: usize = u8::SIZE;
}

/// Two-legged swap settled through a pair of escrows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trade {
    pub id: Digest,
    pub offer_id: String,
    pub buyer: Address,
    pub seller: Address,
    pub quote_token: Token,
    pub quote_amount: Natural,
    pub escrow_quote: Digest,
    pub base_token: Token,
    pub base_amount: Natural,
    pub escrow_base: Digest,
    pub deadline: u64,
    pub created_at: u64,
    pub funded_at: u64,
    pub slippage_bps: u32,
    pub status: TradeStatus,
}

impl Trade {
    pub fn sanitize(&self) -> Result<(), EscrowInvariantError> {
        if self.buyer.is_zero() || self.seller.is_zero() {
            return Err(EscrowInvariantError::MissingParty);
        }
        if u64::from(self.slippage_bps) > BPS_DENOMINATOR {
            return Err(EscrowInvariantError::SlippageOutOfRange {
                got: self.slippage_bps,
                max: BPS_DENOMINATOR,
            });
        }
        Ok(())
    }
}

impl Write for Trade {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.offer_id, writer);
        self.buyer.write(writer);
        self.seller.write(writer);
        self.quote_token.write(writer);
        write_natural(&self.quote_amount, writer);
        self.escrow_quote.write(writer);
        self.base_token.write(writer);
        write_natural(&self.base_amount, writer);
        self.escrow_base.write(writer);
        self.deadline.write(writer);
        self.created_at.write(writer);
        self.funded_at.write(writer);
        self.slippage_bps.write(writer);
        self.status.write(writer);
    }
}

impl Read for Trade {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: Digest::read(reader)?,
            offer_id: read_string(reader, MAX_STRING_LENGTH)?,
            buyer: Address::read(reader)?,
            seller: Address::read(reader)?,
            quote_token: Token::read(reader)?,
            quote_amount: read_natural(reader)?,
            escrow_quote: Digest::read(reader)?,
            base_token: Token::read(reader)?,
            base_amount: read_natural(reader)?,
            escrow_base: Digest::read(reader)?,
            deadline: u64::read(reader)?,
            created_at: u64::read(reader)?,
            funded_at: u64::read(reader)?,
            slippage_bps: u32::read(reader)?,
            status: TradeStatus::read(reader)?,
        })
    }
}

impl EncodeSize for Trade {
    fn encode_size(&self) -> usize {
        Digest::SIZE * 3
            + string_encode_size(&self.offer_id)
            + Address::SIZE * 2
            + Token::SIZE * 2
            + natural_encode_size(&self.quote_amount)
            + natural_encode_size(&self.base_amount)
            + u64::SIZE * 3
            + u32::SIZE
            + TradeStatus::SIZE
    }
}
