//! Signature-hash construction and ECDSA signature checking
//!
//! A signature commits to a masked copy of the spending transaction. The
//! hash-type byte appended to every signature selects the mask: the low five
//! bits pick ALL / NONE / SINGLE, bit 0x80 adds ANYONECANPAY. The masked
//! copy is serialized with the hash type appended as a little-endian 32-bit
//! trailer and double-SHA-256 hashed.

use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1};

use crate::constants::*;
use crate::hash::sha256d;
use crate::script::{Opcode, Script};
use crate::serialize::Encodable;
use crate::types::{Hash, Transaction};

/// The sentinel digest returned for out-of-range inputs: the number one in
/// little-endian 32 bytes. Signatures over this digest verify trivially;
/// a signer tricked into producing one signs a known-weak case. The behavior
/// is preserved for consensus compatibility.
pub fn one_hash() -> Hash {
    let mut hash = [0u8; 32];
    hash[0] = 1;
    hash
}

/// Compute the digest that a signature with `hash_type` commits to.
pub fn signature_hash(
    script_code: &Script,
    tx_to: &Transaction,
    n_in: usize,
    hash_type: u8,
) -> Hash {
    if n_in >= tx_to.inputs.len() {
        return one_hash();
    }
    let mut tx_tmp = tx_to.clone();

    // Concatenating scripts can leave stray separators in the code; they are
    // never part of the signed bytes.
    let mut script_code = script_code.clone();
    let mut separator = Script::new();
    separator.push_opcode(Opcode::OpCodeSeparator);
    script_code.find_and_delete(&separator);

    // Blank out other inputs' signatures
    for input in &mut tx_tmp.inputs {
        input.script_sig.clear();
    }
    tx_tmp.inputs[n_in].script_sig = script_code.into_bytes();

    match hash_type & SIGHASH_MODE_MASK {
        SIGHASH_NONE => {
            // Wildcard payee; other signers may update their inputs at will
            tx_tmp.outputs.clear();
            for (i, input) in tx_tmp.inputs.iter_mut().enumerate() {
                if i != n_in {
                    input.sequence = 0;
                }
            }
        }
        SIGHASH_SINGLE => {
            // Lock in only the output at the same index as this input
            if n_in >= tx_tmp.outputs.len() {
                return one_hash();
            }
            tx_tmp.outputs.truncate(n_in + 1);
            for output in &mut tx_tmp.outputs[..n_in] {
                output.set_null();
            }
            for (i, input) in tx_tmp.inputs.iter_mut().enumerate() {
                if i != n_in {
                    input.sequence = 0;
                }
            }
        }
        _ => {}
    }

    if hash_type & SIGHASH_ANYONECANPAY != 0 {
        tx_tmp.inputs.swap(0, n_in);
        tx_tmp.inputs.truncate(1);
    }

    let mut bytes = tx_tmp
        .consensus_encode_to_vec()
        .expect("in-memory serialization cannot fail");
    bytes.extend_from_slice(&u32::from(hash_type).to_le_bytes());
    sha256d(&bytes)
}

/// Verify one ECDSA signature against one public key.
///
/// The hash-type byte rides on the end of the signature: a zero
/// `declared_hash_type` adopts it, a nonzero one must match it. Every
/// malformed-input and crypto failure collapses to `false`.
pub fn check_sig(
    sig: &[u8],
    pubkey: &[u8],
    script_code: &Script,
    tx_to: &Transaction,
    n_in: usize,
    declared_hash_type: u8,
) -> bool {
    let pubkey = match PublicKey::from_slice(pubkey) {
        Ok(pk) => pk,
        Err(_) => return false,
    };

    let Some((&type_byte, der)) = sig.split_last() else {
        return false;
    };
    let hash_type = if declared_hash_type == 0 {
        type_byte
    } else if declared_hash_type != type_byte {
        return false;
    } else {
        declared_hash_type
    };

    let signature = match Signature::from_der(der) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    let digest = signature_hash(script_code, tx_to, n_in, hash_type);
    let message = Message::from_digest_slice(&digest).expect("digest is 32 bytes");

    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, TxIn, TxOut};
    use secp256k1::SecretKey;

    fn two_in_two_out() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![
                TxIn { prevout: OutPoint::new([1; 32], 0), script_sig: vec![0x51], sequence: 100 },
                TxIn { prevout: OutPoint::new([2; 32], 1), script_sig: vec![0x52], sequence: 200 },
            ],
            outputs: vec![TxOut::new(10, vec![0xac]), TxOut::new(20, vec![0xad])],
            lock_time: 0,
        }
    }

    fn code() -> Script {
        let mut s = Script::new();
        s.push_opcode(Opcode::OpDup);
        s
    }

    #[test]
    fn test_input_index_out_of_range_is_sentinel() {
        let tx = two_in_two_out();
        assert_eq!(signature_hash(&code(), &tx, 5, SIGHASH_ALL), one_hash());
    }

    #[test]
    fn test_single_out_of_range_is_sentinel() {
        let mut tx = two_in_two_out();
        tx.outputs.truncate(1);
        assert_eq!(signature_hash(&code(), &tx, 1, SIGHASH_SINGLE), one_hash());
        // In range the digest is real
        assert_ne!(signature_hash(&code(), &tx, 0, SIGHASH_SINGLE), one_hash());
    }

    #[test]
    fn test_all_commits_to_outputs() {
        let tx = two_in_two_out();
        let digest = signature_hash(&code(), &tx, 0, SIGHASH_ALL);
        let mut changed = tx.clone();
        changed.outputs[1].value = 21;
        assert_ne!(digest, signature_hash(&code(), &changed, 0, SIGHASH_ALL));
    }

    #[test]
    fn test_none_masks_outputs_and_other_sequences() {
        let tx = two_in_two_out();
        let digest = signature_hash(&code(), &tx, 0, SIGHASH_NONE);

        let mut changed_output = tx.clone();
        changed_output.outputs[0].value = 99;
        assert_eq!(digest, signature_hash(&code(), &changed_output, 0, SIGHASH_NONE));

        let mut changed_other_seq = tx.clone();
        changed_other_seq.inputs[1].sequence = 777;
        assert_eq!(digest, signature_hash(&code(), &changed_other_seq, 0, SIGHASH_NONE));

        // The signing input's own sequence is still committed
        let mut changed_own_seq = tx.clone();
        changed_own_seq.inputs[0].sequence = 777;
        assert_ne!(digest, signature_hash(&code(), &changed_own_seq, 0, SIGHASH_NONE));
    }

    #[test]
    fn test_single_masks_later_and_earlier_outputs() {
        let tx = two_in_two_out();
        let digest = signature_hash(&code(), &tx, 1, SIGHASH_SINGLE);

        // Output 0 is nulled, so its value is invisible
        let mut changed_earlier = tx.clone();
        changed_earlier.outputs[0].value = 99;
        assert_eq!(digest, signature_hash(&code(), &changed_earlier, 1, SIGHASH_SINGLE));

        // The paired output is committed
        let mut changed_paired = tx.clone();
        changed_paired.outputs[1].value = 99;
        assert_ne!(digest, signature_hash(&code(), &changed_paired, 1, SIGHASH_SINGLE));
    }

    #[test]
    fn test_anyonecanpay_masks_other_inputs() {
        let tx = two_in_two_out();
        let hash_type = SIGHASH_ALL | SIGHASH_ANYONECANPAY;
        let digest = signature_hash(&code(), &tx, 0, hash_type);

        let mut changed = tx.clone();
        changed.inputs[1].prevout = OutPoint::new([9; 32], 9);
        changed.inputs[1].sequence = 9;
        assert_eq!(digest, signature_hash(&code(), &changed, 0, hash_type));

        // Without the flag the other input is committed
        let plain = signature_hash(&code(), &tx, 0, SIGHASH_ALL);
        assert_ne!(plain, signature_hash(&code(), &changed, 0, SIGHASH_ALL));
    }

    #[test]
    fn test_code_separators_are_stripped() {
        let tx = two_in_two_out();
        let mut with_sep = Script::new();
        with_sep.push_opcode(Opcode::OpCodeSeparator).push_opcode(Opcode::OpDup);
        assert_eq!(
            signature_hash(&code(), &tx, 0, SIGHASH_ALL),
            signature_hash(&with_sep, &tx, 0, SIGHASH_ALL)
        );
    }

    #[test]
    fn test_check_sig_roundtrip() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let pubkey = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();

        let tx = two_in_two_out();
        let digest = signature_hash(&code(), &tx, 0, SIGHASH_ALL);
        let message = Message::from_digest_slice(&digest).unwrap();
        let mut sig = secp.sign_ecdsa(&message, &secret).serialize_der().to_vec();
        sig.push(SIGHASH_ALL);

        assert!(check_sig(&sig, &pubkey, &code(), &tx, 0, 0));
        assert!(check_sig(&sig, &pubkey, &code(), &tx, 0, SIGHASH_ALL));
        // Declared type must match the appended byte
        assert!(!check_sig(&sig, &pubkey, &code(), &tx, 0, SIGHASH_NONE));
        // Wrong input index hashes a different digest
        assert!(!check_sig(&sig, &pubkey, &code(), &tx, 1, 0));
    }

    #[test]
    fn test_check_sig_rejects_garbage() {
        let tx = two_in_two_out();
        assert!(!check_sig(&[], &[0x02; 33], &code(), &tx, 0, 0));
        assert!(!check_sig(&[0x01, 0x01], &[0x00], &code(), &tx, 0, 0));

        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let pubkey = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();
        let digest = signature_hash(&code(), &tx, 0, SIGHASH_ALL);
        let message = Message::from_digest_slice(&digest).unwrap();
        let mut sig = secp.sign_ecdsa(&message, &secret).serialize_der().to_vec();
        sig.push(SIGHASH_ALL);

        // Corrupt one DER byte
        let mid = sig.len() / 2;
        sig[mid] ^= 0x40;
        assert!(!check_sig(&sig, &pubkey, &code(), &tx, 0, 0));
    }
}
