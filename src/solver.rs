//! Standard script templates: recognition and scriptSig compilation
//!
//! Two output shapes are standard: pay-to-pubkey, where the sender supplies
//! the key and the spender a signature, and pay-to-pubkey-hash, where the
//! spender supplies both signature and key against a 20-byte hash.

use crate::error::{Result, ScriptError};
use crate::keystore::KeyStore;
use crate::script::{Opcode, Script};
use crate::types::{ByteString, Hash};

/// A recognized standard scriptPubKey with its variable slots bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    PayToPubkey { pubkey: ByteString },
    PayToPubkeyHash { hash160: [u8; 20] },
}

/// Pattern-match a scriptPubKey against the standard templates.
pub fn classify(script: &Script) -> Option<Template> {
    let records: Vec<(Opcode, Vec<u8>)> = script.ops().collect::<Result<_>>().ok()?;

    match records.as_slice() {
        // <pubkey> OP_CHECKSIG; a key is longer than a 32-byte hash
        [(push, pubkey), (Opcode::OpCheckSig, _)] if push.is_push() && pubkey.len() > 32 => {
            Some(Template::PayToPubkey { pubkey: pubkey.clone() })
        }
        // OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG
        [(Opcode::OpDup, _), (Opcode::OpHash160, _), (push, hash), (Opcode::OpEqualVerify, _), (Opcode::OpCheckSig, _)]
            if push.is_push() && hash.len() == 20 =>
        {
            let mut hash160 = [0u8; 20];
            hash160.copy_from_slice(hash);
            Some(Template::PayToPubkeyHash { hash160 })
        }
        _ => None,
    }
}

/// Build the scriptPubKey paying to a bare public key.
pub fn pay_to_pubkey(pubkey: &[u8]) -> Script {
    let mut script = Script::new();
    script.push_data(pubkey).push_opcode(Opcode::OpCheckSig);
    script
}

/// Build the scriptPubKey paying to a public-key hash.
pub fn pay_to_pubkey_hash(hash160: &[u8; 20]) -> Script {
    let mut script = Script::new();
    script
        .push_opcode(Opcode::OpDup)
        .push_opcode(Opcode::OpHash160)
        .push_data(hash160)
        .push_opcode(Opcode::OpEqualVerify)
        .push_opcode(Opcode::OpCheckSig);
    script
}

/// Compile the scriptSig satisfying `script_pubkey` with keys from the
/// store. With `digest` absent only key availability is checked, which is
/// how ownership queries run. The hash-type byte is appended to each
/// signature.
pub fn solve(
    script_pubkey: &Script,
    digest: Option<&Hash>,
    hash_type: u8,
    keystore: &dyn KeyStore,
) -> Result<Script> {
    let template = classify(script_pubkey).ok_or(ScriptError::TemplateMismatch)?;
    let mut script_sig = Script::new();

    match template {
        Template::PayToPubkey { pubkey } => {
            if !keystore.has_key(&pubkey) {
                return Err(ScriptError::TemplateMismatch);
            }
            if let Some(digest) = digest {
                let mut sig =
                    keystore.sign(&pubkey, digest).ok_or(ScriptError::TemplateMismatch)?;
                sig.push(hash_type);
                script_sig.push_data(&sig);
            }
        }
        Template::PayToPubkeyHash { hash160 } => {
            let pubkey =
                keystore.pubkey_for_hash(&hash160).ok_or(ScriptError::TemplateMismatch)?;
            if !keystore.has_key(&pubkey) {
                return Err(ScriptError::TemplateMismatch);
            }
            if let Some(digest) = digest {
                let mut sig =
                    keystore.sign(&pubkey, digest).ok_or(ScriptError::TemplateMismatch)?;
                sig.push(hash_type);
                script_sig.push_data(&sig);
                script_sig.push_data(&pubkey);
            }
        }
    }

    Ok(script_sig)
}

/// Whether the store can satisfy this scriptPubKey.
pub fn is_mine(script_pubkey: &Script, keystore: &dyn KeyStore) -> bool {
    solve(script_pubkey, None, 0, keystore).is_ok()
}

/// Recover the destination public key, resolving hashes through the store.
/// With `mine_only` set, keys the store cannot sign for are skipped.
pub fn extract_pubkey(
    script_pubkey: &Script,
    keystore: &dyn KeyStore,
    mine_only: bool,
) -> Option<ByteString> {
    let pubkey = match classify(script_pubkey)? {
        Template::PayToPubkey { pubkey } => pubkey,
        Template::PayToPubkeyHash { hash160 } => keystore.pubkey_for_hash(&hash160)?,
    };
    if mine_only && !keystore.has_key(&pubkey) {
        return None;
    }
    Some(pubkey)
}

/// Recover the destination hash160 from a pay-to-pubkey-hash output.
pub fn extract_hash160(script_pubkey: &Script) -> Option<[u8; 20]> {
    match classify(script_pubkey)? {
        Template::PayToPubkeyHash { hash160 } => Some(hash160),
        Template::PayToPubkey { .. } => None,
    }
}
