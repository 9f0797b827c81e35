//! Key supplier interface between the script core and the wallet
//!
//! The core never holds keys. Signing walks through this trait, and the
//! wallet collaborator encapsulates storage and locking behind it.

use std::collections::HashMap;

use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::hash::hash160;
use crate::types::{ByteString, Hash};

pub trait KeyStore {
    /// Produce a DER signature over `digest` with the key behind `pubkey`,
    /// or `None` when the key is not held.
    fn sign(&self, pubkey: &[u8], digest: &Hash) -> Option<ByteString>;

    /// Whether the private key behind `pubkey` is held.
    fn has_key(&self, pubkey: &[u8]) -> bool;

    /// Resolve a public-key hash back to the full key, when held.
    fn pubkey_for_hash(&self, hash: &[u8; 20]) -> Option<ByteString>;
}

/// In-memory key store over uncompressed secp256k1 keys
pub struct MemoryKeyStore {
    secp: Secp256k1<All>,
    keys: HashMap<ByteString, SecretKey>,
    by_hash: HashMap<[u8; 20], ByteString>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        MemoryKeyStore {
            secp: Secp256k1::new(),
            keys: HashMap::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Add a key, returning its serialized public key.
    pub fn add_key(&mut self, secret: SecretKey) -> ByteString {
        let pubkey = PublicKey::from_secret_key(&self.secp, &secret)
            .serialize_uncompressed()
            .to_vec();
        self.by_hash.insert(hash160(&pubkey), pubkey.clone());
        self.keys.insert(pubkey.clone(), secret);
        pubkey
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    fn sign(&self, pubkey: &[u8], digest: &Hash) -> Option<ByteString> {
        let secret = self.keys.get(pubkey)?;
        let message = Message::from_digest_slice(digest).ok()?;
        let signature = self.secp.sign_ecdsa(&message, secret);
        Some(signature.serialize_der().to_vec())
    }

    fn has_key(&self, pubkey: &[u8]) -> bool {
        self.keys.contains_key(pubkey)
    }

    fn pubkey_for_hash(&self, hash: &[u8; 20]) -> Option<ByteString> {
        self.by_hash.get(hash).cloned()
    }
}
