//! Base-58 and base-58-check codecs, plus the address form
//!
//! Base-58 drops `0`, `O`, `I` and `l` from the alphanumeric alphabet so an
//! address survives fonts, e-mail line breaks and double-click selection.
//! Encoding treats the payload as one big-endian integer; leading zero bytes
//! are carried separately as leading `1` characters.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::constants::ADDRESS_VERSION;
use crate::error::{Result, ScriptError};
use crate::hash::{hash160, sha256d};

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode a byte string as base-58
pub fn encode(data: &[u8]) -> String {
    let fifty_eight = BigUint::from(58u32);
    let mut bn = BigUint::from_bytes_be(data);
    let mut out = Vec::new();
    while !bn.is_zero() {
        let rem = &bn % &fifty_eight;
        bn = &bn / &fifty_eight;
        let digits = rem.to_u32_digits();
        let idx = if digits.is_empty() { 0 } else { digits[0] as usize };
        out.push(ALPHABET[idx]);
    }
    // Leading zero bytes encode as base-58 zeros
    for byte in data {
        if *byte != 0 {
            break;
        }
        out.push(ALPHABET[0]);
    }
    out.reverse();
    String::from_utf8(out).expect("alphabet is ASCII")
}

/// Decode a base-58 string. Leading and trailing whitespace is tolerated;
/// any other out-of-alphabet character is rejected.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    let trimmed = s.trim_start();
    let fifty_eight = BigUint::from(58u32);
    let mut bn = BigUint::zero();
    let mut body_len = trimmed.len();
    for (i, c) in trimmed.char_indices() {
        let digit = if c.is_ascii() {
            ALPHABET.iter().position(|&a| a == c as u8)
        } else {
            None
        };
        match digit {
            Some(idx) => {
                bn = bn * &fifty_eight + BigUint::from(idx);
            }
            None => {
                if !trimmed[i..].chars().all(char::is_whitespace) {
                    return Err(ScriptError::Serialization(format!(
                        "invalid base58 character {:?}",
                        c
                    )));
                }
                body_len = i;
                break;
            }
        }
    }

    let digits = bn.to_bytes_be();
    let digits = if digits == [0] { Vec::new() } else { digits };
    let leading_zeros = trimmed[..body_len]
        .bytes()
        .take_while(|&b| b == ALPHABET[0])
        .count();
    let mut out = vec![0u8; leading_zeros];
    out.extend_from_slice(&digits);
    Ok(out)
}

/// Base-58 with a 4-byte double-SHA-256 checksum appended
pub fn encode_check(data: &[u8]) -> String {
    let mut payload = data.to_vec();
    let checksum = sha256d(data);
    payload.extend_from_slice(&checksum[..4]);
    encode(&payload)
}

/// Decode base-58-check, verifying and stripping the checksum tail
pub fn decode_check(s: &str) -> Result<Vec<u8>> {
    let mut payload = decode(s)?;
    if payload.len() < 4 {
        return Err(ScriptError::Serialization("base58check payload too short".to_string()));
    }
    let body_len = payload.len() - 4;
    let checksum = sha256d(&payload[..body_len]);
    if checksum[..4] != payload[body_len..] {
        return Err(ScriptError::Serialization("base58check checksum mismatch".to_string()));
    }
    payload.truncate(body_len);
    Ok(payload)
}

/// Address string for a 20-byte public-key hash
pub fn hash160_to_address(hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(hash);
    encode_check(&payload)
}

/// Recover the public-key hash from an address, validating version and length
pub fn address_to_hash160(address: &str) -> Result<[u8; 20]> {
    let payload = decode_check(address)?;
    if payload.len() != 21 {
        return Err(ScriptError::Serialization("address payload must be 21 bytes".to_string()));
    }
    if payload[0] > ADDRESS_VERSION {
        return Err(ScriptError::Serialization(format!(
            "unknown address version {}",
            payload[0]
        )));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok(hash)
}

/// Address string for a serialized public key
pub fn pubkey_to_address(pubkey: &[u8]) -> String {
    hash160_to_address(&hash160(pubkey))
}

pub fn is_valid_address(address: &str) -> bool {
    address_to_hash160(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roundtrip() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_leading_zeros_preserved() {
        let data = [0x00, 0x00, 0x61, 0x62];
        let encoded = encode(&data);
        assert!(encoded.starts_with("11"));
        assert!(!encoded.starts_with("111"));
        assert_eq!(decode(&encoded).unwrap(), data.to_vec());
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let encoded = encode(&[0xde, 0xad, 0xbe, 0xef]);
        let spaced = format!("  {}\t\n", encoded);
        assert_eq!(decode(&spaced).unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_decode_rejects_bad_characters() {
        assert!(decode("0invalid").is_err());
        assert!(decode("2l1").is_err());
        assert!(decode("ab cd").is_err());
    }

    #[test]
    fn test_check_roundtrip_and_corruption() {
        let data = b"payload".to_vec();
        let encoded = encode_check(&data);
        assert_eq!(decode_check(&encoded).unwrap(), data);

        // Flipping any character breaks the checksum
        let mut chars: Vec<char> = encoded.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '1' { '2' } else { '1' };
        let corrupted: String = chars.into_iter().collect();
        assert!(decode_check(&corrupted).is_err());
    }

    #[test]
    fn test_known_address_vector() {
        let hash: [u8; 20] = hex::decode("010966776006953d5567439e5e39f86a0d273bee")
            .unwrap()
            .try_into()
            .unwrap();
        let address = hash160_to_address(&hash);
        assert_eq!(address, "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM");
        assert_eq!(address_to_hash160(&address).unwrap(), hash);
        assert!(is_valid_address(&address));
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let encoded = encode_check(&[0u8; 5]);
        assert!(address_to_hash160(&encoded).is_err());
    }

    #[test]
    fn test_address_rejects_unknown_version() {
        let mut payload = vec![5u8];
        payload.extend_from_slice(&[0u8; 20]);
        let encoded = encode_check(&payload);
        assert!(address_to_hash160(&encoded).is_err());
    }
}
