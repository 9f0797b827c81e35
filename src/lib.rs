//! # txscript
//!
//! The consensus-critical core of a peer-to-peer electronic cash system:
//! the transaction script interpreter together with signature-hash
//! construction, canonical transaction serialization and the address codec.
//! Every node must compute `verify_signature` identically, bit for bit, or
//! the network forks.
//!
//! ## Design principles
//!
//! 1. **Pure functions**: evaluation is a deterministic function of its
//!    inputs with no shared mutable state, so independent verifications can
//!    run on parallel threads.
//! 2. **Explicit results**: deserialization and evaluation return typed
//!    errors internally; at the verification boundary every failure
//!    collapses to a single `false`.
//! 3. **Faithful byte layouts**: the compact length prefix, the number
//!    codec's sign byte, the base-58 checksum and the masked signature-hash
//!    serialization round-trip exactly.
//!
//! ## Usage
//!
//! ```rust
//! use txscript::ScriptEngine;
//! use txscript::script::Script;
//!
//! let engine = ScriptEngine::new();
//! // OP_1 OP_2 OP_ADD OP_3 OP_EQUAL
//! let script = Script::from_bytes(vec![0x51, 0x52, 0x93, 0x53, 0x87]);
//! let tx = txscript::types::Transaction::new();
//! assert!(engine.eval_script(&script, &tx, 0, 0, 0).unwrap());
//! ```

pub mod base58;
pub mod bignum;
pub mod constants;
pub mod error;
pub mod hash;
pub mod interpreter;
pub mod keystore;
pub mod script;
pub mod serialize;
pub mod sighash;
pub mod solver;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use constants::*;
pub use error::{Result, ScriptError};
pub use types::*;

use keystore::KeyStore;
use script::Script;

/// Facade over the verification core
///
/// # Examples
///
/// ```
/// use txscript::ScriptEngine;
/// use txscript::types::*;
///
/// let engine = ScriptEngine::new();
/// let tx = Transaction {
///     version: 1,
///     inputs: vec![TxIn {
///         prevout: OutPoint::new([0u8; 32], 0),
///         script_sig: vec![0x51], // OP_1
///         sequence: 0xffffffff,
///     }],
///     outputs: vec![TxOut {
///         value: 5_000_000_000,
///         script_pubkey: vec![0x51],
///     }],
///     lock_time: 0,
/// };
/// let digest = engine.signature_hash(
///     &txscript::script::Script::from_bytes(vec![0x51]),
///     &tx,
///     0,
///     txscript::SIGHASH_ALL,
/// );
/// assert_ne!(digest, [0u8; 32]);
/// ```
pub struct ScriptEngine;

impl ScriptEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a script in the context of the spending transaction
    ///
    /// # Examples
    ///
    /// ```
    /// use txscript::ScriptEngine;
    /// use txscript::script::Script;
    /// use txscript::types::Transaction;
    ///
    /// let engine = ScriptEngine::new();
    /// let script = Script::from_bytes(vec![0x51]); // OP_1
    /// assert!(engine.eval_script(&script, &Transaction::new(), 0, 0, 0).unwrap());
    /// ```
    pub fn eval_script(
        &self,
        script: &Script,
        tx_to: &Transaction,
        n_in: usize,
        hash_type: u8,
        flags: u32,
    ) -> Result<bool> {
        interpreter::eval_script(script, tx_to, n_in, hash_type, flags)
    }

    /// Verify that input `n_in` of `tx_to` spends its referenced output of
    /// `tx_from`. Every internal failure collapses to `false`.
    pub fn verify_signature(
        &self,
        tx_from: &Transaction,
        tx_to: &Transaction,
        n_in: usize,
        hash_type: u8,
        flags: u32,
    ) -> bool {
        interpreter::verify_signature(tx_from, tx_to, n_in, hash_type, flags)
    }

    /// Compile and install the scriptSig for input `n_in` of `tx_to`.
    pub fn sign_signature(
        &self,
        tx_from: &Transaction,
        tx_to: &mut Transaction,
        n_in: usize,
        hash_type: u8,
        keystore: &dyn KeyStore,
    ) -> Result<()> {
        interpreter::sign_signature(tx_from, tx_to, n_in, hash_type, keystore)
    }

    /// The digest a signature with `hash_type` commits to
    pub fn signature_hash(
        &self,
        script_code: &Script,
        tx_to: &Transaction,
        n_in: usize,
        hash_type: u8,
    ) -> Hash {
        sighash::signature_hash(script_code, tx_to, n_in, hash_type)
    }

    /// Recognize a standard scriptPubKey shape
    pub fn classify_script(&self, script_pubkey: &Script) -> Option<solver::Template> {
        solver::classify(script_pubkey)
    }

    /// Structural transaction validity (script validity is separate)
    pub fn check_transaction(&self, tx: &Transaction) -> Result<transaction::ValidationResult> {
        transaction::check_transaction(tx)
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{Decodable, Encodable};

    #[test]
    fn test_engine_eval_simple_script() {
        let engine = ScriptEngine::new();
        // OP_1 OP_1 OP_EQUAL
        let script = Script::from_bytes(vec![0x51, 0x51, 0x87]);
        assert!(engine.eval_script(&script, &Transaction::new(), 0, 0, 0).unwrap());
    }

    #[test]
    fn test_engine_verify_rejects_unresolved_prevout() {
        let engine = ScriptEngine::new();
        let tx_from = Transaction {
            version: 1,
            inputs: vec![TxIn::new(OutPoint::null(), vec![])],
            outputs: vec![TxOut::new(50, vec![0x51])],
            lock_time: 0,
        };
        // Points at output index 1, which does not exist
        let tx_to = Transaction {
            version: 1,
            inputs: vec![TxIn::new(OutPoint::new(tx_from.hash(), 1), vec![0x51])],
            outputs: vec![TxOut::new(50, vec![])],
            lock_time: 0,
        };
        assert!(!engine.verify_signature(&tx_from, &tx_to, 0, 0, 0));
    }

    #[test]
    fn test_engine_check_transaction() {
        let engine = ScriptEngine::new();
        let tx = Transaction {
            version: 1,
            inputs: vec![TxIn::new(OutPoint::new([1; 32], 0), vec![0x51])],
            outputs: vec![TxOut::new(1000, vec![0x51])],
            lock_time: 0,
        };
        assert_eq!(
            engine.check_transaction(&tx).unwrap(),
            transaction::ValidationResult::Valid
        );
    }

    #[test]
    fn test_reexported_roundtrip() {
        let tx = Transaction::new();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        assert_eq!(Transaction::consensus_decode_from_slice(&bytes).unwrap(), tx);
    }
}
