//! Staking reward accumulator records.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use malachite::Natural;

use crate::codec::{natural_encode_size, read_natural, write_natural};
use crate::fixed::Uq128x128;

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;
pub const BPS_DENOMINATOR: u64 = 10_000;
pub const DEFAULT_APR_BPS: u64 = 1_250;
pub const DEFAULT_PAYOUT_PERIOD_DAYS: u64 = 30;

/// Global reward index, advanced over time and never decreasing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalIndex {
    pub accumulator: Uq128x128,
    pub last_update_unix: u64,
    pub ytd_emissions: Natural,
}

/// Per-account checkpoint against the global index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSnap {
    pub last_index: Uq128x128,
    pub accrued_znhb: Natural,
    pub last_payout_unix: u64,
}

impl Write for GlobalIndex {
    fn write(&self, writer: &mut impl BufMut) {
        self.accumulator.write(writer);
        self.last_update_unix.write(writer);
        write_natural(&self.ytd_emissions, writer);
    }
}

impl Read for GlobalIndex {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            accumulator: Uq128x128::read(reader)?,
            last_update_unix: u64::read(reader)?,
            ytd_emissions: read_natural(reader)?,
        })
    }
}

impl EncodeSize for GlobalIndex {
    fn encode_size(&self) -> usize {
        Uq128x128::SIZE + u64::SIZE + natural_encode_size(&self.ytd_emissions)
    }
}

impl Write for AccountSnap {
    fn write(&self, writer: &mut impl BufMut) {
        self.last_index.write(writer);
        write_natural(&self.accrued_znhb, writer);
        self.last_payout_unix.write(writer);
    }
}

impl Read for AccountSnap {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            last_index: Uq128x128::read(reader)?,
            accrued_znhb: read_natural(reader)?,
            last_payout_unix: u64::read(reader)?,
        })
    }
}

impl EncodeSize for AccountSnap {
    fn encode_size(&self) -> usize {
        Uq128x128::SIZE + natural_encode_size(&self.accrued_znhb) + u64::SIZE
    }
}
