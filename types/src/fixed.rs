//! Unsigned 128.128 fixed-point values.
//!
//! A UQ128x128 is stored as a 32-byte big-endian integer where `2^128` represents `1.0`.
//! Absent or empty encodings decode to `1.0` and a zero value is written as `1.0`, so an
//! uninitialised accumulator always starts at unity.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use malachite::num::arithmetic::traits::PowerOf2;
use malachite::num::logic::traits::SignificantBits;
use malachite::Natural;
use thiserror::Error as ThisError;

use crate::codec::{natural_from_be_bytes, natural_to_be_bytes};

pub const FRACTIONAL_BITS: u64 = 128;
pub const ENCODED_LENGTH: usize = 32;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum FixedPointError {
    #[error("fixed-point value exceeds 256 bits")]
    Overflow,
    #[error("fixed-point encoding too long (len={0})")]
    EncodingTooLong(usize),
}

/// A non-negative UQ128x128 value no wider than 256 bits.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Uq128x128(Natural);

impl Uq128x128 {
    /// `2^128`.
    pub fn one() -> Self {
        Self(Natural::power_of_2(FRACTIONAL_BITS))
    }

    pub fn new(raw: Natural) -> Result<Self, FixedPointError> {
        if raw.significant_bits() > (ENCODED_LENGTH as u64) * 8 {
            return Err(FixedPointError::Overflow);
        }
        Ok(Self(raw))
    }

    pub fn raw(&self) -> &Natural {
        &self.0
    }

    /// Decodes a stored value; empty input is `1.0`.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FixedPointError> {
        if data.is_empty() {
            return Ok(Self::one());
        }
        if data.len() > ENCODED_LENGTH {
            return Err(FixedPointError::EncodingTooLong(data.len()));
        }
        Ok(Self(natural_from_be_bytes(data)))
    }

    /// Left-pads the magnitude to 32 bytes; zero is written as `1.0`.
    pub fn to_bytes(&self) -> [u8; ENCODED_LENGTH] {
        let magnitude = if self.0 == 0u32 {
            natural_to_be_bytes(Self::one().raw())
        } else {
            natural_to_be_bytes(&self.0)
        };
        let mut out = [0u8; ENCODED_LENGTH];
        out[ENCODED_LENGTH - magnitude.len()..].copy_from_slice(&magnitude);
        out
    }
}

impl Default for Uq128x128 {
    fn default() -> Self {
        Self::one()
    }
}

impl Write for Uq128x128 {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.to_bytes());
    }
}

impl Read for Uq128x128 {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < ENCODED_LENGTH {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; ENCODED_LENGTH];
        reader.copy_to_slice(&mut bytes);
        Self::from_bytes(&bytes).map_err(|_| Error::Invalid("Uq128x128", "too long"))
    }
}

impl FixedSize for Uq128x128 {
    const SIZE: usize = ENCODED_LENGTH;
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::DecodeExt;
    use proptest::prelude::*;

    #[test]
    fn empty_encoding_is_unity() {
        assert_eq!(Uq128x128::from_bytes(&[]).unwrap(), Uq128x128::one());
        assert_eq!(Uq128x128::default(), Uq128x128::one());
    }

    #[test]
    fn unity_layout_is_big_endian() {
        let bytes = Uq128x128::one().to_bytes();
        let mut expected = [0u8; ENCODED_LENGTH];
        expected[15] = 1;
        assert_eq!(bytes, expected);
    }

    #[test]
    fn zero_is_written_as_unity() {
        let zero = Uq128x128::new(Natural::from(0u32)).unwrap();
        assert_eq!(zero.to_bytes(), Uq128x128::one().to_bytes());
    }

    #[test]
    fn rejects_values_wider_than_256_bits() {
        assert_eq!(
            Uq128x128::new(Natural::power_of_2(256)),
            Err(FixedPointError::Overflow)
        );
        assert!(Uq128x128::new(Natural::power_of_2(256) - Natural::from(1u32)).is_ok());
        assert_eq!(
            Uq128x128::from_bytes(&[1u8; 33]),
            Err(FixedPointError::EncodingTooLong(33))
        );
    }

    #[test]
    fn decoder_reads_the_fixed_width_layout() {
        let mut half = [0u8; ENCODED_LENGTH];
        half[16] = 0x80;
        let value = Uq128x128::decode(&half[..]).unwrap();
        assert_eq!(value, Uq128x128::from_bytes(&half).unwrap());
        assert_eq!(value.raw(), &Natural::power_of_2(127));
        assert!(matches!(
            Uq128x128::decode(&half[..31]),
            Err(Error::EndOfBuffer)
        ));
    }

    proptest! {
        /// Property: for non-zero values the fixed-width encoding sorts the same way as the
        /// numbers it encodes, and decodes back to the same value.
        #[test]
        fn prop_encoding_preserves_order(
            a in prop::array::uniform32(any::<u8>()),
            b in prop::array::uniform32(any::<u8>()),
        ) {
            let x = Uq128x128::from_bytes(&a).unwrap();
            let y = Uq128x128::from_bytes(&b).unwrap();
            prop_assume!(*x.raw() != 0u32 && *y.raw() != 0u32);
            prop_assert_eq!(x.to_bytes().cmp(&y.to_bytes()), x.cmp(&y));
            prop_assert_eq!(Uq128x128::from_bytes(&x.to_bytes()).unwrap(), x);
        }
    }
}
