//! Addresses, tokens and deterministic module accounts.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use commonware_utils::hex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ADDRESS_LENGTH: usize = 20;

/// Seed prefix of the vault account that pools escrowed and claimable funds.
pub const ESCROW_VAULT_SEED_PREFIX: &str = "module/escrow/vault/";

/// A 20-byte account address.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const ZERO: Self = Self([0u8; ADDRESS_LENGTH]);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ADDRESS_LENGTH] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lower-case hex without a prefix, as used inside composite keys.
    pub fn to_hex(&self) -> String {
        hex(&self.0)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < ADDRESS_LENGTH {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for Address {
    const SIZE: usize = ADDRESS_LENGTH;
}

/// Native assets that may be held, escrowed or paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Token {
    #[serde(rename = "NHB")]
    Nhb,
    #[serde(rename = "ZNHB")]
    Znhb,
}

impl Token {
    /// Parses a symbol after trimming whitespace, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NHB" => Some(Self::Nhb),
            "ZNHB" => Some(Self::Znhb),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Nhb => "NHB",
            Self::Znhb => "ZNHB",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Write for Token {
    fn write(&self, writer: &mut impl BufMut) {
        let tag: u8 = match self {
            Self::Nhb => 0,
            Self::Znhb => 1,
        };
        tag.write(writer);
    }
}

impl Read for Token {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::Nhb),
            1 => Ok(Self::Znhb),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Token {
    const SIZE: usize = u8::SIZE;
}

/// Derives a module account as the trailing 20 bytes of `sha256(seed)`.
///
/// Module accounts are pure functions of their seed and are recomputed on every use.
pub fn module_address(seed: &str) -> Address {
    let digest = Sha256::hash(seed.as_bytes());
    let mut bytes = [0u8; ADDRESS_LENGTH];
    bytes.copy_from_slice(&digest.as_ref()[Digest::SIZE - ADDRESS_LENGTH..]);
    Address(bytes)
}

/// Vault that pools escrowed and claimable funds for `token`.
pub fn vault_address(token: Token) -> Address {
    module_address(&format!("{ESCROW_VAULT_SEED_PREFIX}{}", token.symbol()))
}

/// Hashes the concatenation of `parts` into a 32-byte identifier.
pub fn hash_parts(parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn token_parse_normalizes_symbols() {
        assert_eq!(Token::parse(" nhb "), Some(Token::Nhb));
        assert_eq!(Token::parse("Znhb"), Some(Token::Znhb));
        assert_eq!(Token::parse("DOGE"), None);
        assert_eq!(Token::parse(""), None);
    }

    #[test]
    fn vault_addresses_are_stable_and_distinct() {
        let nhb = vault_address(Token::Nhb);
        assert_eq!(nhb, vault_address(Token::Nhb));
        assert_ne!(nhb, vault_address(Token::Znhb));
        assert_eq!(nhb, module_address("module/escrow/vault/NHB"));
        assert!(!nhb.is_zero());
    }

    #[test]
    fn address_codec_is_fixed_width() {
        let address = Address::new([7u8; ADDRESS_LENGTH]);
        let encoded = address.encode();
        assert_eq!(encoded.len(), ADDRESS_LENGTH);
        assert_eq!(Address::decode(encoded).unwrap(), address);
        assert!(Address::decode(&[1u8, 2, 3][..]).is_err());
    }

    #[test]
    fn hash_parts_matches_single_buffer() {
        let joined = Sha256::hash(b"payer-nonce");
        assert_eq!(hash_parts(&[b"payer", b"-", b"nonce"]), joined);
    }
}
