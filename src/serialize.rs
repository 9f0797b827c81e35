//! Canonical serialization with symmetric read and write
//!
//! Deterministic byte layout for primitives, byte strings, sequences and
//! maps: fixed-width little-endian integers, one-byte booleans, and the
//! compact length prefix in front of every variable-length element.
//! `deserialize(serialize(x)) == x` and `serialize(x).len() ==
//! x.consensus_size()` hold for every implementing type.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::constants::MAX_ALLOC_CHUNK;
use crate::error::{Result, ScriptError};

pub trait Encodable {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize>;

    fn consensus_encode_to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.consensus_encode(&mut buf)?;
        Ok(buf)
    }

    /// Serialized length in bytes, computed without materializing the bytes.
    fn consensus_size(&self) -> usize {
        let mut counter = SizeCounter(0);
        self.consensus_encode(&mut counter)
            .expect("size counting cannot fail");
        counter.0
    }
}

pub trait Decodable: Sized {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self>;

    fn consensus_decode_from_slice(data: &[u8]) -> Result<Self> {
        let mut cursor = std::io::Cursor::new(data);
        Self::consensus_decode(&mut cursor)
    }
}

/// `io::Write` sink that only counts
struct SizeCounter(usize);

impl Write for SizeCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Bytes taken by the compact length prefix for `n`
pub fn compact_size_len(n: u64) -> usize {
    if n < 253 {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Write the minimal compact length prefix for `n`
pub fn write_compact_size<W: Write>(writer: &mut W, n: u64) -> Result<usize> {
    if n < 253 {
        writer.write_all(&[n as u8])?;
        Ok(1)
    } else if n <= 0xffff {
        writer.write_all(&[253])?;
        writer.write_all(&(n as u16).to_le_bytes())?;
        Ok(3)
    } else if n <= 0xffff_ffff {
        writer.write_all(&[254])?;
        writer.write_all(&(n as u32).to_le_bytes())?;
        Ok(5)
    } else {
        writer.write_all(&[255])?;
        writer.write_all(&n.to_le_bytes())?;
        Ok(9)
    }
}

pub fn read_compact_size<R: Read>(reader: &mut R) -> Result<u64> {
    let mut tag = [0u8; 1];
    reader.read_exact(&mut tag)?;
    match tag[0] {
        253 => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(u64::from(u16::from_le_bytes(buf)))
        }
        254 => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            Ok(u64::from(u32::from_le_bytes(buf)))
        }
        255 => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }
        n => Ok(u64::from(n)),
    }
}

/// Write a byte string as compact length plus raw bytes
pub fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<usize> {
    let mut written = write_compact_size(writer, bytes.len() as u64)?;
    writer.write_all(bytes)?;
    written += bytes.len();
    Ok(written)
}

/// Read a compact-length-prefixed byte string. The declared length is
/// attacker-controlled, so the buffer grows by at most [`MAX_ALLOC_CHUNK`]
/// per step and a short stream fails before the allocation completes.
pub fn read_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_compact_size(reader)? as usize;
    let mut buf = Vec::new();
    let mut filled = 0;
    while filled < len {
        let step = (len - filled).min(MAX_ALLOC_CHUNK);
        buf.resize(filled + step, 0);
        reader.read_exact(&mut buf[filled..])?;
        filled += step;
    }
    Ok(buf)
}

macro_rules! impl_int_codec {
    ($($ty:ty),*) => {
        $(
            impl Encodable for $ty {
                fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
                    writer.write_all(&self.to_le_bytes())?;
                    Ok(std::mem::size_of::<$ty>())
                }
            }

            impl Decodable for $ty {
                fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    reader.read_exact(&mut buf)?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

impl_int_codec!(u8, u16, u32, u64, i32, i64);

impl Encodable for bool {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        writer.write_all(&[*self as u8])?;
        Ok(1)
    }
}

impl Decodable for bool {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(buf[0] != 0)
    }
}

macro_rules! impl_array_codec {
    ($($len:expr),*) => {
        $(
            impl Encodable for [u8; $len] {
                fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
                    writer.write_all(self)?;
                    Ok($len)
                }
            }

            impl Decodable for [u8; $len] {
                fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
                    let mut buf = [0u8; $len];
                    reader.read_exact(&mut buf)?;
                    Ok(buf)
                }
            }
        )*
    };
}

impl_array_codec!(4, 20, 32);

impl<T: Encodable> Encodable for Vec<T> {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = write_compact_size(writer, self.len() as u64)?;
        for item in self {
            written += item.consensus_encode(writer)?;
        }
        Ok(written)
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_compact_size(reader)? as usize;
        // Grow with the data actually consumed rather than trusting the
        // declared count with one up-front allocation.
        let mut vec = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            vec.push(T::consensus_decode(reader)?);
        }
        Ok(vec)
    }
}

impl Encodable for String {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        write_bytes(writer, self.as_bytes())
    }
}

impl Decodable for String {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let bytes = read_bytes(reader)?;
        String::from_utf8(bytes).map_err(|e| ScriptError::Serialization(e.to_string()))
    }
}

impl<K: Encodable, V: Encodable> Encodable for (K, V) {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        Ok(self.0.consensus_encode(writer)? + self.1.consensus_encode(writer)?)
    }
}

impl<K: Decodable, V: Decodable> Decodable for (K, V) {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok((K::consensus_decode(reader)?, V::consensus_decode(reader)?))
    }
}

// BTreeMap iterates in key order, which keeps the layout deterministic
// across implementations.
impl<K: Encodable + Ord, V: Encodable> Encodable for BTreeMap<K, V> {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = write_compact_size(writer, self.len() as u64)?;
        for (key, value) in self {
            written += key.consensus_encode(writer)?;
            written += value.consensus_encode(writer)?;
        }
        Ok(written)
    }
}

impl<K: Decodable + Ord, V: Decodable> Decodable for BTreeMap<K, V> {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_compact_size(reader)? as usize;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let (key, value) = <(K, V)>::consensus_decode(reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

/// String stored as a fixed-length field: padded with zero bytes on write,
/// truncated at the declared length or the first zero byte on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedString<const LEN: usize>(pub String);

impl<const LEN: usize> Encodable for FixedString<LEN> {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut buf = [0u8; LEN];
        let bytes = self.0.as_bytes();
        let n = bytes.len().min(LEN);
        buf[..n].copy_from_slice(&bytes[..n]);
        writer.write_all(&buf)?;
        Ok(LEN)
    }
}

impl<const LEN: usize> Decodable for FixedString<LEN> {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buf = vec![0u8; LEN];
        reader.read_exact(&mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(LEN);
        buf.truncate(end);
        let s = String::from_utf8(buf).map_err(|e| ScriptError::Serialization(e.to_string()))?;
        Ok(FixedString(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compact_roundtrip(n: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_compact_size(&mut buf, n).unwrap();
        assert_eq!(buf.len(), compact_size_len(n));
        let mut cursor = std::io::Cursor::new(&buf[..]);
        assert_eq!(read_compact_size(&mut cursor).unwrap(), n);
        buf
    }

    #[test]
    fn test_compact_size_boundaries() {
        assert_eq!(compact_roundtrip(0), vec![0x00]);
        assert_eq!(compact_roundtrip(252), vec![0xfc]);
        assert_eq!(compact_roundtrip(253), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(compact_roundtrip(0xffff), vec![0xfd, 0xff, 0xff]);
        assert_eq!(compact_roundtrip(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(compact_roundtrip(0xffff_ffff), vec![0xfe, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            compact_roundtrip(0x1_0000_0000),
            vec![0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_int_roundtrip() {
        let mut buf = Vec::new();
        0x1234_5678u32.consensus_encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0x78, 0x56, 0x34, 0x12]);
        assert_eq!(u32::consensus_decode_from_slice(&buf).unwrap(), 0x1234_5678);

        let value = (-42i64).consensus_encode_to_vec().unwrap();
        assert_eq!(i64::consensus_decode_from_slice(&value).unwrap(), -42);
        assert_eq!(value.len(), (-42i64).consensus_size());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut buf = Vec::new();
        let written = write_bytes(&mut buf, &data).unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(buf[0], 5);
        let mut cursor = std::io::Cursor::new(&buf[..]);
        assert_eq!(read_bytes(&mut cursor).unwrap(), data);
    }

    #[test]
    fn test_bytes_short_stream_fails() {
        // Declares 100 bytes but supplies 3
        let mut buf = Vec::new();
        write_compact_size(&mut buf, 100).unwrap();
        buf.extend_from_slice(&[1, 2, 3]);
        let mut cursor = std::io::Cursor::new(&buf[..]);
        assert!(read_bytes(&mut cursor).is_err());
    }

    #[test]
    fn test_huge_declared_length_fails_before_allocation() {
        // A declared 2^32-byte string backed by nothing must fail cleanly.
        let mut buf = Vec::new();
        write_compact_size(&mut buf, u64::from(u32::MAX)).unwrap();
        let mut cursor = std::io::Cursor::new(&buf[..]);
        assert!(read_bytes(&mut cursor).is_err());
    }

    #[test]
    fn test_vec_of_structs_roundtrip() {
        let v: Vec<u32> = vec![1, 2, 3, 0xdead_beef];
        let buf = v.consensus_encode_to_vec().unwrap();
        assert_eq!(buf.len(), v.consensus_size());
        assert_eq!(Vec::<u32>::consensus_decode_from_slice(&buf).unwrap(), v);
    }

    #[test]
    fn test_map_roundtrip_is_ordered() {
        let mut map = BTreeMap::new();
        map.insert(3u32, 30u64);
        map.insert(1u32, 10u64);
        map.insert(2u32, 20u64);
        let buf = map.consensus_encode_to_vec().unwrap();
        // Count prefix, then keys in sorted order
        assert_eq!(buf[0], 3);
        assert_eq!(buf[1], 1);
        assert_eq!(BTreeMap::consensus_decode_from_slice(&buf).unwrap(), map);
    }

    #[test]
    fn test_string_roundtrip() {
        let s = "compact".to_string();
        let buf = s.consensus_encode_to_vec().unwrap();
        assert_eq!(String::consensus_decode_from_slice(&buf).unwrap(), s);
    }

    #[test]
    fn test_fixed_string_pads_and_truncates() {
        let s = FixedString::<8>("abc".to_string());
        let buf = s.consensus_encode_to_vec().unwrap();
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(FixedString::<8>::consensus_decode_from_slice(&buf).unwrap(), s);

        let long = FixedString::<4>("overflowing".to_string());
        let buf = long.consensus_encode_to_vec().unwrap();
        assert_eq!(buf, b"over".to_vec());
    }

    #[test]
    fn test_bool_roundtrip() {
        assert_eq!(true.consensus_encode_to_vec().unwrap(), vec![1]);
        assert_eq!(false.consensus_encode_to_vec().unwrap(), vec![0]);
        assert!(bool::consensus_decode_from_slice(&[1]).unwrap());
        assert!(!bool::consensus_decode_from_slice(&[0]).unwrap());
    }
}
