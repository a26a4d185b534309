use super::*;

pub(super) mod accounts;
pub(super) mod claimable;
pub(super) mod escrow;
pub(super) mod fees;
mod governance;
mod lending;
mod loyalty;
mod params;
mod refund;
pub(super) mod rewards;
mod roles;
mod trade;
pub(super) mod transfer;

fn require_address(address: &nhbchain_types::Address) -> Result<(), Error> {
    if address.is_zero() {
        return Err(Error::InvalidAddress);
    }
    Ok(())
}

fn require_positive(amount: &Natural) -> Result<(), Error> {
    if *amount == 0u32 {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

fn parse_token(raw: &str) -> Result<nhbchain_types::Token, Error> {
    nhbchain_types::Token::parse(raw).ok_or_else(|| Error::InvalidToken(raw.trim().to_string()))
}
