//! Lending pool records.
//!
//! Amounts are wei-denominated; share and index values carry 1e18 scaling chosen by the lending
//! engine. The state layer stores them as given.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use malachite::Natural;

use crate::codec::{
    natural_encode_size, read_natural, read_string, string_encode_size, write_natural,
    write_string, MAX_STRING_LENGTH,
};
use crate::primitives::Address;

/// Pool-wide accounting for one lending market.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Market {
    pub pool_id: String,
    pub developer_owner: Address,
    /// Zero disables developer fees for the pool.
    pub developer_fee_collector: Address,
    pub developer_fee_bps: u64,
    pub total_nhb_supplied: Natural,
    pub total_supply_shares: Natural,
    pub total_nhb_borrowed: Natural,
    pub supply_index: Natural,
    pub borrow_index: Natural,
    pub last_update_block: u64,
    /// Share of interest routed to reserves, in basis points.
    pub reserve_factor: u64,
}

/// Protocol and developer fees accrued by a pool but not yet swept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeAccrual {
    pub protocol_fees_wei: Natural,
    pub developer_fees_wei: Natural,
}

/// One participant's position in a pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserAccount {
    pub address: Address,
    pub collateral_znhb: Natural,
    pub supply_shares: Natural,
    pub debt_nhb: Natural,
    /// Debt divided by the borrow index at the time it was taken.
    pub scaled_debt: Natural,
}

impl Write for Market {
    fn write(&self, writer: &mut impl BufMut) {
        write_string(&self.pool_id, writer);
        self.developer_owner.write(writer);
        self.developer_fee_collector.write(writer);
        self.developer_fee_bps.write(writer);
        write_natural(&self.total_nhb_supplied, writer);
        write_natural(&self.total_supply_shares, writer);
        write_natural(&self.total_nhb_borrowed, writer);
        write_natural(&self.supply_index, writer);
        write_natural(&self.borrow_index, writer);
        self.last_update_block.write(writer);
        self.reserve_factor.write(writer);
    }
}

impl Read for Market {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            pool_id: read_string(reader, MAX_STRING_LENGTH)?,
            developer_owner: Address::read(reader)?,
            developer_fee_collector: Address::read(reader)?,
            developer_fee_bps: u64::read(reader)?,
            total_nhb_supplied: read_natural(reader)?,
            total_supply_shares: read_natural(reader)?,
            total_nhb_borrowed: read_natural(reader)?,
            supply_index: read_natural(reader)?,
            borrow_index: read_natural(reader)?,
            last_update_block: u64::read(reader)?,
            reserve_factor: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Market {
    fn encode_size(&self) -> usize {
        string_encode_size(&self.pool_id)
            + Address::SIZE * 2
            + u64::SIZE * 3
            + natural_encode_size(&self.total_nhb_supplied)
            + natural_encode_size(&self.total_supply_shares)
            + natural_encode_size(&self.total_nhb_borrowed)
            + natural_encode_size(&self.supply_index)
            + natural_encode_size(&self.borrow_index)
    }
}

impl Write for FeeAccrual {
    fn write(&self, writer: &mut impl BufMut) {
        write_natural(&self.protocol_fees_wei, writer);
        write_natural(&self.developer_fees_wei, writer);
    }
}

impl Read for FeeAccrual {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            protocol_fees_wei: read_natural(reader)?,
            developer_fees_wei: read_natural(reader)?,
        })
    }
}

impl EncodeSize for FeeAccrual {
    fn encode_size(&self) -> usize {
        natural_encode_size(&self.protocol_fees_wei) + natural_encode_size(&self.developer_fees_wei)
    }
}

impl Write for UserAccount {
    fn write(&self, writer: &mut impl BufMut) {
        self.address.write(writer);
        write_natural(&self.collateral_znhb, writer);
        write_natural(&self.supply_shares, writer);
        write_natural(&self.debt_nhb, writer);
        write_natural(&self.scaled_debt, writer);
    }
}

impl Read for UserAccount {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            address: Address::read(reader)?,
            collateral_znhb: read_natural(reader)?,
            supply_shares: read_natural(reader)?,
            debt_nhb: read_natural(reader)?,
            scaled_debt: read_natural(reader)?,
        })
    }
}

impl EncodeSize for UserAccount {
    fn encode_size(&self) -> usize {
        Address::SIZE
            + natural_encode_size(&self.collateral_znhb)
            + natural_encode_size(&self.supply_shares)
            + natural_encode_size(&self.debt_nhb)
            + natural_encode_size(&self.scaled_debt)
    }
}
