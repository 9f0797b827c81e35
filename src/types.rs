//! Core transaction types for script verification

use serde::{Deserialize, Serialize};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Reference to a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        OutPoint { hash, index }
    }

    /// Coinbase-style null reference
    pub fn null() -> Self {
        OutPoint { hash: [0u8; 32], index: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        self.hash == [0u8; 32] && self.index == u32::MAX
    }
}

/// Transaction input: prevout reference, witness script, sequence number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(prevout: OutPoint, script_sig: ByteString) -> Self {
        TxIn { prevout, script_sig, sequence: u32::MAX }
    }
}

/// Transaction output: value in base units plus the spending predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: ByteString,
}

impl TxOut {
    pub fn new(value: i64, script_pubkey: ByteString) -> Self {
        TxOut { value, script_pubkey }
    }

    /// The sentinel used when masking outputs for SIGHASH_SINGLE
    pub fn null() -> Self {
        TxOut { value: -1, script_pubkey: Vec::new() }
    }

    pub fn set_null(&mut self) {
        self.value = -1;
        self.script_pubkey.clear();
    }

    pub fn is_null(&self) -> bool {
        self.value == -1 && self.script_pubkey.is_empty()
    }
}

/// Transaction: version, inputs, outputs, lock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn new() -> Self {
        Transaction { version: 1, inputs: Vec::new(), outputs: Vec::new(), lock_time: 0 }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
