//! Length-prefixed helpers shared by the record codecs.
//!
//! `Natural` and raw byte strings are foreign to `commonware-codec`, so records encode them
//! through these helpers instead of `Write`/`Read` impls.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, ReadExt, Write};
use malachite::num::conversion::traits::PowerOf2Digits;
use malachite::num::logic::traits::SignificantBits;
use malachite::Natural;

/// Longest string accepted by record decoders.
pub const MAX_STRING_LENGTH: usize = 1024;

/// Longest big-endian magnitude accepted for a natural number (4096 bits).
pub const MAX_NATURAL_BYTES: usize = 512;

/// Longest opaque byte string accepted by record decoders.
pub const MAX_BYTES_LENGTH: usize = 64 * 1024;

/// Helper to write a string as length-prefixed UTF-8 bytes.
pub fn write_string(s: &str, writer: &mut impl BufMut) {
    write_bytes(s.as_bytes(), writer);
}

/// Helper to read a string from length-prefixed UTF-8 bytes.
pub fn read_string(reader: &mut impl Buf, max_len: usize) -> Result<String, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("String", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    if reader.chunk().len() >= len {
        let result = match std::str::from_utf8(&reader.chunk()[..len]) {
            Ok(s) => Ok(s.to_owned()),
            Err(_) => Err(Error::Invalid("String", "invalid UTF-8")),
        };
        reader.advance(len);
        return result;
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    String::from_utf8(bytes).map_err(|_| Error::Invalid("String", "invalid UTF-8"))
}

pub fn string_encode_size(s: &str) -> usize {
    bytes_encode_size(s.as_bytes())
}

pub fn write_bytes(bytes: &[u8], writer: &mut impl BufMut) {
    (bytes.len() as u32).write(writer);
    writer.put_slice(bytes);
}

pub fn read_bytes(reader: &mut impl Buf, max_len: usize) -> Result<Vec<u8>, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_len {
        return Err(Error::Invalid("Bytes", "too long"));
    }
    if reader.remaining() < len {
        return Err(Error::EndOfBuffer);
    }
    let mut bytes = vec![0u8; len];
    reader.copy_to_slice(&mut bytes);
    Ok(bytes)
}

pub fn bytes_encode_size(bytes: &[u8]) -> usize {
    4 + bytes.len()
}

/// Canonical big-endian magnitude of `value` (empty for zero).
pub fn natural_to_be_bytes(value: &Natural) -> Vec<u8> {
    PowerOf2Digits::<u8>::to_power_of_2_digits_desc(value, 8)
}

/// Parses a big-endian magnitude; leading zero bytes are accepted.
pub fn natural_from_be_bytes(bytes: &[u8]) -> Natural {
    <Natural as PowerOf2Digits<u8>>::from_power_of_2_digits_desc(8, bytes.iter().copied())
        .unwrap_or_default()
}

/// Writes a natural number as a length-prefixed big-endian magnitude.
pub fn write_natural(value: &Natural, writer: &mut impl BufMut) {
    write_bytes(&natural_to_be_bytes(value), writer);
}

/// Reads a natural number, rejecting non-canonical (zero-padded) magnitudes.
pub fn read_natural(reader: &mut impl Buf) -> Result<Natural, Error> {
    let bytes = read_bytes(reader, MAX_NATURAL_BYTES)
        .map_err(|_| Error::Invalid("Natural", "invalid magnitude"))?;
    if bytes.first() == Some(&0) {
        return Err(Error::Invalid("Natural", "leading zero"));
    }
    Ok(natural_from_be_bytes(&bytes))
}

pub fn natural_encode_size(value: &Natural) -> usize {
    // Bits rounded up to whole bytes, plus the length prefix.
    4 + value.significant_bits().div_ceil(8) as usize
}

/// Writes a list of opaque byte strings preceded by its length.
pub fn write_byte_list(items: &[Vec<u8>], writer: &mut impl BufMut) {
    (items.len() as u32).write(writer);
    for item in items {
        write_bytes(item, writer);
    }
}

pub fn read_byte_list(reader: &mut impl Buf, max_items: usize) -> Result<Vec<Vec<u8>>, Error> {
    let len = u32::read(reader)? as usize;
    if len > max_items {
        return Err(Error::Invalid("List", "too many items"));
    }
    let mut items = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        items.push(read_bytes(reader, MAX_BYTES_LENGTH)?);
    }
    Ok(items)
}

pub fn byte_list_encode_size(items: &[Vec<u8>]) -> usize {
    4 + items.iter().map(|item| bytes_encode_size(item)).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::str::FromStr;

    #[test]
    fn read_string_rejects_too_long() {
        let mut buf = BytesMut::new();
        (5u32).write(&mut buf);
        buf.extend_from_slice(b"hello");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 4).expect_err("should reject too-long string");
        assert!(matches!(err, Error::Invalid("String", "too long")));
    }

    #[test]
    fn read_string_rejects_truncated_buffers() {
        let mut buf = BytesMut::new();
        (3u32).write(&mut buf);
        buf.extend_from_slice(b"ab");

        let mut reader = buf.as_ref();
        let err = read_string(&mut reader, 10).expect_err("should reject truncated buffer");
        assert!(matches!(err, Error::EndOfBuffer));
    }

    #[test]
    fn natural_zero_is_empty_magnitude() {
        let mut buf = BytesMut::new();
        write_natural(&Natural::from(0u32), &mut buf);
        assert_eq!(buf.as_ref(), &[0, 0, 0, 0]);
        assert_eq!(natural_encode_size(&Natural::from(0u32)), 4);

        let mut reader = buf.as_ref();
        assert_eq!(read_natural(&mut reader).unwrap(), Natural::from(0u32));
    }

    #[test]
    fn natural_wider_than_u128_survives() {
        let value = Natural::from_str("340282366920938463463374607431768211456123").unwrap();
        let mut buf = BytesMut::new();
        write_natural(&value, &mut buf);
        assert_eq!(buf.len(), natural_encode_size(&value));

        let mut reader = buf.as_ref();
        assert_eq!(read_natural(&mut reader).unwrap(), value);
        assert!(reader.is_empty());
    }

    #[test]
    fn natural_rejects_zero_padding() {
        let mut buf = BytesMut::new();
        write_bytes(&[0, 1], &mut buf);

        let mut reader = buf.as_ref();
        let err = read_natural(&mut reader).expect_err("padded magnitude must be rejected");
        assert!(matches!(err, Error::Invalid("Natural", "leading zero")));
    }

    #[test]
    fn byte_list_respects_item_limit() {
        let items = vec![b"a".to_vec(), b"bc".to_vec(), b"def".to_vec()];
        let mut buf = BytesMut::new();
        write_byte_list(&items, &mut buf);
        assert_eq!(buf.len(), byte_list_encode_size(&items));

        let mut reader = buf.as_ref();
        assert!(read_byte_list(&mut reader, 2).is_err());
        let mut reader = buf.as_ref();
        assert_eq!(read_byte_list(&mut reader, 3).unwrap(), items);
    }
}
