//! Hashing primitives used throughout the crate

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::types::Hash;

/// Single SHA-256
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Double SHA-256: `SHA256(SHA256(data))`
pub fn sha256d(data: &[u8]) -> Hash {
    Sha256::digest(Sha256::digest(data)).into()
}

/// `RIPEMD160(SHA256(data))`, the standard public-key hash
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Plain RIPEMD-160
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Plain SHA-1
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}
