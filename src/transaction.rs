//! Transaction wire format, identity hash and structural checks
//!
//! Wire layout, little-endian throughout: `int32 version`, compact-size
//! input count and inputs (`prev-txid ‖ prev-index ‖ scriptSig ‖ sequence`),
//! compact-size output count and outputs (`int64 value ‖ scriptPubKey`),
//! `uint32 lockTime`. The transaction hash is the double SHA-256 of exactly
//! these bytes.

use std::io::{Read, Write};

use crate::constants::*;
use crate::error::Result;
use crate::hash::sha256d;
use crate::serialize::{read_bytes, write_bytes, Decodable, Encodable};
use crate::types::*;

impl Encodable for OutPoint {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.hash.consensus_encode(writer)?;
        written += self.index.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for OutPoint {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(OutPoint {
            hash: Hash::consensus_decode(reader)?,
            index: u32::consensus_decode(reader)?,
        })
    }
}

impl Encodable for TxIn {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.prevout.consensus_encode(writer)?;
        written += write_bytes(writer, &self.script_sig)?;
        written += self.sequence.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for TxIn {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(TxIn {
            prevout: OutPoint::consensus_decode(reader)?,
            script_sig: read_bytes(reader)?,
            sequence: u32::consensus_decode(reader)?,
        })
    }
}

impl Encodable for TxOut {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.value.consensus_encode(writer)?;
        written += write_bytes(writer, &self.script_pubkey)?;
        Ok(written)
    }
}

impl Decodable for TxOut {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(TxOut {
            value: i64::consensus_decode(reader)?,
            script_pubkey: read_bytes(reader)?,
        })
    }
}

impl Encodable for Transaction {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.version.consensus_encode(writer)?;
        written += self.inputs.consensus_encode(writer)?;
        written += self.outputs.consensus_encode(writer)?;
        written += self.lock_time.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for Transaction {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Transaction {
            version: i32::consensus_decode(reader)?,
            inputs: Vec::<TxIn>::consensus_decode(reader)?,
            outputs: Vec::<TxOut>::consensus_decode(reader)?,
            lock_time: u32::consensus_decode(reader)?,
        })
    }
}

impl Transaction {
    /// Transaction identity: double SHA-256 of the canonical serialization
    pub fn hash(&self) -> Hash {
        let bytes = self
            .consensus_encode_to_vec()
            .expect("in-memory serialization cannot fail");
        sha256d(&bytes)
    }
}

/// Structural validity: nonempty sides, bounded counts, sane values, bounded
/// serialized size. Script-level validity is the interpreter's concern.
pub fn check_transaction(tx: &Transaction) -> Result<ValidationResult> {
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Ok(ValidationResult::Invalid("empty inputs or outputs".to_string()));
    }

    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 || output.value > MAX_MONEY {
            return Ok(ValidationResult::Invalid(format!(
                "invalid output value {} at index {}",
                output.value, i
            )));
        }
    }

    if tx.inputs.len() > MAX_INPUTS {
        return Ok(ValidationResult::Invalid(format!("too many inputs: {}", tx.inputs.len())));
    }

    if tx.outputs.len() > MAX_OUTPUTS {
        return Ok(ValidationResult::Invalid(format!("too many outputs: {}", tx.outputs.len())));
    }

    let size = tx.consensus_size();
    if size > MAX_TX_SIZE {
        return Ok(ValidationResult::Invalid(format!("transaction too large: {} bytes", size)));
    }

    Ok(ValidationResult::Valid)
}

/// Whether the transaction spends the null prevout (a coinbase)
pub fn is_coinbase(tx: &Transaction) -> bool {
    tx.inputs.len() == 1 && tx.inputs[0].prevout.is_null()
}

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxIn {
                prevout: OutPoint::new([7; 32], 3),
                script_sig: vec![0x51, 0x52],
                sequence: 0xffff_ffff,
            }],
            outputs: vec![TxOut::new(1000, vec![0x51, 0x87])],
            lock_time: 17,
        }
    }

    #[test]
    fn test_serialize_roundtrip() {
        let tx = sample_tx();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        assert_eq!(bytes.len(), tx.consensus_size());
        assert_eq!(Transaction::consensus_decode_from_slice(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_wire_layout() {
        let tx = sample_tx();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        // version
        assert_eq!(&bytes[..4], &[1, 0, 0, 0]);
        // input count, then the 32-byte prev txid
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..37], &[7u8; 32][..]);
        // prev index
        assert_eq!(&bytes[37..41], &[3, 0, 0, 0]);
        // scriptSig length + body
        assert_eq!(&bytes[41..44], &[2, 0x51, 0x52]);
        // sequence
        assert_eq!(&bytes[44..48], &[0xff; 4][..]);
        // output count, value, script, lock time
        assert_eq!(bytes[48], 1);
        assert_eq!(&bytes[49..57], &1000i64.to_le_bytes()[..]);
        assert_eq!(&bytes[57..60], &[2, 0x51, 0x87]);
        assert_eq!(&bytes[60..], &17u32.to_le_bytes()[..]);
    }

    #[test]
    fn test_hash_is_double_sha_of_serialization() {
        let tx = sample_tx();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        assert_eq!(tx.hash(), sha256d(&bytes));
        // Any byte flip moves the hash
        let mut other = tx.clone();
        other.lock_time += 1;
        assert_ne!(tx.hash(), other.hash());
    }

    #[test]
    fn test_negative_value_output_roundtrip() {
        // The SIGHASH_SINGLE null sentinel must survive serialization
        let mut tx = sample_tx();
        tx.outputs[0].set_null();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        let decoded = Transaction::consensus_decode_from_slice(&bytes).unwrap();
        assert!(decoded.outputs[0].is_null());
    }

    #[test]
    fn test_decode_truncated_fails() {
        let tx = sample_tx();
        let bytes = tx.consensus_encode_to_vec().unwrap();
        for cut in [0, 4, 10, bytes.len() - 1] {
            assert!(Transaction::consensus_decode_from_slice(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn test_check_transaction_valid() {
        assert_eq!(check_transaction(&sample_tx()).unwrap(), ValidationResult::Valid);
    }

    #[test]
    fn test_check_transaction_empty_sides() {
        let mut tx = sample_tx();
        tx.inputs.clear();
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));

        let mut tx = sample_tx();
        tx.outputs.clear();
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_value_bounds() {
        let mut tx = sample_tx();
        tx.outputs[0].value = -1;
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));

        tx.outputs[0].value = MAX_MONEY;
        assert_eq!(check_transaction(&tx).unwrap(), ValidationResult::Valid);

        tx.outputs[0].value = MAX_MONEY + 1;
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_is_coinbase() {
        let mut tx = sample_tx();
        assert!(!is_coinbase(&tx));
        tx.inputs[0].prevout = OutPoint::null();
        assert!(is_coinbase(&tx));
        tx.inputs.push(tx.inputs[0].clone());
        assert!(!is_coinbase(&tx));
    }
}
