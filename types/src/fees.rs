//! Fee accounting buckets.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use malachite::Natural;

use crate::codec::{natural_encode_size, read_natural, write_natural};

/// Number of UTC day buckets kept in the rolling fee window.
pub const FEE_WINDOW_DAYS: usize = 7;

/// Net fees collected during one UTC day.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeDay {
    pub net_nhb: Natural,
    pub net_znhb: Natural,
}

/// Free-tier usage counter for one window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeCounter {
    pub count: u64,
    pub window_start: u64,
}

/// Lifetime fee totals for one payer and asset. `net = gross - fee`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeTotals {
    pub gross: Natural,
    pub fee: Natural,
    pub net: Natural,
}

impl Write for FeeDay {
    fn write(&self, writer: &mut impl BufMut) {
        write_natural(&self.net_nhb, writer);
        write_natural(&self.net_znhb, writer);
    }
}

impl Read for FeeDay {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            net_nhb: read_natural(reader)?,
            net_znhb: read_natural(reader)?,
        })
    }
}

impl EncodeSize for FeeDay {
    fn encode_size(&self) -> usize {
        natural_encode_size(&self.net_nhb) + natural_encode_size(&self.net_znhb)
    }
}

impl Write for FeeCounter {
    fn write(&self, writer: &mut impl BufMut) {
        self.count.write(writer);
        self.window_start.write(writer);
    }
}

impl Read for FeeCounter {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            count: u64::read(reader)?,
            window_start: u64::read(reader)?,
        })
    }
}

impl FixedSize for FeeCounter {
    const SIZE: usize = u64::SIZE * 2;
}

impl Write for FeeTotals {
    fn write(&self, writer: &mut impl BufMut) {
        write_natural(&self.gross, writer);
        write_natural(&self.fee, writer);
        write_natural(&self.net, writer);
    }
}

impl Read for FeeTotals {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let totals = Self {
            gross: read_natural(reader)?,
            fee: read_natural(reader)?,
            net: read_natural(reader)?,
        };
        if totals.fee > totals.gross {
            return Err(Error::Invalid("FeeTotals", "fee exceeds gross"));
        }
        Ok(totals)
    }
}

impl EncodeSize for FeeTotals {
    fn encode_size(&self) -> usize {
        natural_encode_size(&self.gross)
            + natural_encode_size(&self.fee)
            + natural_encode_size(&self.net)
    }
}
