//! Refund threads linking refunds back to their origin payment.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::sha256::Digest;
use malachite::Natural;

use crate::codec::{natural_encode_size, read_natural, write_natural};

pub const MAX_REFUNDS_PER_THREAD: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundLink {
    pub tx_hash: Digest,
    pub amount: Natural,
    pub timestamp: u64,
}

/// Invariant: `cumulative_refunded <= origin_amount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundThread {
    pub origin_hash: Digest,
    pub origin_amount: Natural,
    pub origin_timestamp: u64,
    pub cumulative_refunded: Natural,
    pub refunds: Vec<RefundLink>,
}

impl RefundThread {
    /// Amount that may still be refunded.
    pub fn remaining(&self) -> Natural {
        if self.cumulative_refunded >= self.origin_amount {
            return Natural::default();
        }
        &self.origin_amount - &self.cumulative_refunded
    }
}

impl Write for RefundLink {
    fn write(&self, writer: &mut impl BufMut) {
        self.tx_hash.write(writer);
        write_natural(&self.amount, writer);
        self.timestamp.write(writer);
    }
}

impl Read for RefundLink {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            tx_hash: Digest::read(reader)?,
            amount: read_natural(reader)?,
            timestamp: u64::read(reader)?,
        })
    }
}

impl EncodeSize for RefundLink {
    fn encode_size(&self) -> usize {
        Digest::SIZE + natural_encode_size(&self.amount) + u64::SIZE
    }
}

impl Write for RefundThread {
    fn write(&self, writer: &mut impl BufMut) {
        self.origin_hash.write(writer);
        write_natural(&self.origin_amount, writer);
        self.origin_timestamp.write(writer);
        write_natural(&self.cumulative_refunded, writer);
        self.refunds.write(writer);
    }
}

impl Read for RefundThread {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let thread = Self {
            origin_hash: Digest::read(reader)?,
            origin_amount: read_natural(reader)?,
            origin_timestamp: u64::read(reader)?,
            cumulative_refunded: read_natural(reader)?,
            refunds: Vec::<RefundLink>::read_range(reader, 0..=MAX_REFUNDS_PER_THREAD)?,
        };
        if thread.cumulative_refunded > thread.origin_amount {
            return Err(Error::Invalid("RefundThread", "refunds exceed origin"));
        }
        Ok(thread)
    }
}

impl EncodeSize for RefundThread {
    fn encode_size(&self) -> usize {
        Digest::SIZE
            + natural_encode_size(&self.origin_amount)
            + u64::SIZE
            + natural_encode_size(&self.cumulative_refunded)
            + self.refunds.encode_size()
    }
}
