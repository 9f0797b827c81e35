//! Script byte model: opcode alphabet, push encoding, iteration, deletion
//!
//! A script is a plain byte vector read as a stream of `(opcode, payload)`
//! records. Opcodes `0x01..=0x4B` push that many literal bytes; the three
//! PUSHDATA forms carry an explicit little-endian length. Everything else is
//! an instruction byte for the interpreter.

use serde::{Deserialize, Serialize};

use crate::bignum::ScriptNum;
use crate::error::{Result, ScriptError};

/// The consensus opcode alphabet. Every byte value maps to exactly one
/// variant: direct pushes carry their length, unassigned bytes become
/// [`Opcode::OpUnknown`] so that skipped branches can contain them while
/// executed ones fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Push values
    Op0,
    OpPushBytes(u8),
    OpPushData1,
    OpPushData2,
    OpPushData4,
    Op1Negate,
    Op1,
    Op2,
    Op3,
    Op4,
    Op5,
    Op6,
    Op7,
    Op8,
    Op9,
    Op10,
    Op11,
    Op12,
    Op13,
    Op14,
    Op15,
    Op16,

    // Control
    OpNop,
    OpVer,
    OpIf,
    OpNotIf,
    OpVerIf,
    OpVerNotIf,
    OpElse,
    OpEndIf,
    OpVerify,
    OpReturn,

    // Stack ops
    OpToAltStack,
    OpFromAltStack,
    Op2Drop,
    Op2Dup,
    Op3Dup,
    Op2Over,
    Op2Rot,
    Op2Swap,
    OpIfDup,
    OpDepth,
    OpDrop,
    OpDup,
    OpNip,
    OpOver,
    OpPick,
    OpRoll,
    OpRot,
    OpSwap,
    OpTuck,

    // Splice ops
    OpCat,
    OpSubstr,
    OpLeft,
    OpRight,
    OpSize,

    // Bitwise logic
    OpInvert,
    OpAnd,
    OpOr,
    OpXor,
    OpEqual,
    OpEqualVerify,

    // Numeric
    Op1Add,
    Op1Sub,
    Op2Mul,
    Op2Div,
    OpNegate,
    OpAbs,
    OpNot,
    Op0NotEqual,
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpMod,
    OpLShift,
    OpRShift,
    OpBoolAnd,
    OpBoolOr,
    OpNumEqual,
    OpNumEqualVerify,
    OpNumNotEqual,
    OpLessThan,
    OpGreaterThan,
    OpLessThanOrEqual,
    OpGreaterThanOrEqual,
    OpMin,
    OpMax,
    OpWithin,

    // Crypto
    OpRipemd160,
    OpSha1,
    OpSha256,
    OpHash160,
    OpHash256,
    OpCodeSeparator,
    OpCheckSig,
    OpCheckSigVerify,
    OpCheckMultiSig,
    OpCheckMultiSigVerify,

    // Template matching placeholders, never valid in executed scripts
    OpPubKeyHash,
    OpPubKey,

    OpUnknown(u8),
}

impl Opcode {
    /// Total mapping from byte values; never fails.
    pub fn from_byte(byte: u8) -> Opcode {
        use Opcode::*;
        match byte {
            0x00 => Op0,
            0x01..=0x4b => OpPushBytes(byte),
            0x4c => OpPushData1,
            0x4d => OpPushData2,
            0x4e => OpPushData4,
            0x4f => Op1Negate,
            0x51 => Op1,
            0x52 => Op2,
            0x53 => Op3,
            0x54 => Op4,
            0x55 => Op5,
            0x56 => Op6,
            0x57 => Op7,
            0x58 => Op8,
            0x59 => Op9,
            0x5a => Op10,
            0x5b => Op11,
            0x5c => Op12,
            0x5d => Op13,
            0x5e => Op14,
            0x5f => Op15,
            0x60 => Op16,
            0x61 => OpNop,
            0x62 => OpVer,
            0x63 => OpIf,
            0x64 => OpNotIf,
            0x65 => OpVerIf,
            0x66 => OpVerNotIf,
            0x67 => OpElse,
            0x68 => OpEndIf,
            0x69 => OpVerify,
            0x6a => OpReturn,
            0x6b => OpToAltStack,
            0x6c => OpFromAltStack,
            0x6d => Op2Drop,
            0x6e => Op2Dup,
            0x6f => Op3Dup,
            0x70 => Op2Over,
            0x71 => Op2Rot,
            0x72 => Op2Swap,
            0x73 => OpIfDup,
            0x74 => OpDepth,
            0x75 => OpDrop,
            0x76 => OpDup,
            0x77 => OpNip,
            0x78 => OpOver,
            0x79 => OpPick,
            0x7a => OpRoll,
            0x7b => OpRot,
            0x7c => OpSwap,
            0x7d => OpTuck,
            0x7e => OpCat,
            0x7f => OpSubstr,
            0x80 => OpLeft,
            0x81 => OpRight,
            0x82 => OpSize,
            0x83 => OpInvert,
            0x84 => OpAnd,
            0x85 => OpOr,
            0x86 => OpXor,
            0x87 => OpEqual,
            0x88 => OpEqualVerify,
            0x8b => Op1Add,
            0x8c => Op1Sub,
            0x8d => Op2Mul,
            0x8e => Op2Div,
            0x8f => OpNegate,
            0x90 => OpAbs,
            0x91 => OpNot,
            0x92 => Op0NotEqual,
            0x93 => OpAdd,
            0x94 => OpSub,
            0x95 => OpMul,
            0x96 => OpDiv,
            0x97 => OpMod,
            0x98 => OpLShift,
            0x99 => OpRShift,
            0x9a => OpBoolAnd,
            0x9b => OpBoolOr,
            0x9c => OpNumEqual,
            0x9d => OpNumEqualVerify,
            0x9e => OpNumNotEqual,
            0x9f => OpLessThan,
            0xa0 => OpGreaterThan,
            0xa1 => OpLessThanOrEqual,
            0xa2 => OpGreaterThanOrEqual,
            0xa3 => OpMin,
            0xa4 => OpMax,
            0xa5 => OpWithin,
            0xa6 => OpRipemd160,
            0xa7 => OpSha1,
            0xa8 => OpSha256,
            0xa9 => OpHash160,
            0xaa => OpHash256,
            0xab => OpCodeSeparator,
            0xac => OpCheckSig,
            0xad => OpCheckSigVerify,
            0xae => OpCheckMultiSig,
            0xaf => OpCheckMultiSigVerify,
            0xfd => OpPubKeyHash,
            0xfe => OpPubKey,
            other => OpUnknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        use Opcode::*;
        match self {
            Op0 => 0x00,
            OpPushBytes(n) => n,
            OpPushData1 => 0x4c,
            OpPushData2 => 0x4d,
            OpPushData4 => 0x4e,
            Op1Negate => 0x4f,
            Op1 => 0x51,
            Op2 => 0x52,
            Op3 => 0x53,
            Op4 => 0x54,
            Op5 => 0x55,
            Op6 => 0x56,
            Op7 => 0x57,
            Op8 => 0x58,
            Op9 => 0x59,
            Op10 => 0x5a,
            Op11 => 0x5b,
            Op12 => 0x5c,
            Op13 => 0x5d,
            Op14 => 0x5e,
            Op15 => 0x5f,
            Op16 => 0x60,
            OpNop => 0x61,
            OpVer => 0x62,
            OpIf => 0x63,
            OpNotIf => 0x64,
            OpVerIf => 0x65,
            OpVerNotIf => 0x66,
            OpElse => 0x67,
            OpEndIf => 0x68,
            OpVerify => 0x69,
            OpReturn => 0x6a,
            OpToAltStack => 0x6b,
            OpFromAltStack => 0x6c,
            Op2Drop => 0x6d,
            Op2Dup => 0x6e,
            Op3Dup => 0x6f,
            Op2Over => 0x70,
            Op2Rot => 0x71,
            Op2Swap => 0x72,
            OpIfDup => 0x73,
            OpDepth => 0x74,
            OpDrop => 0x75,
            OpDup => 0x76,
            OpNip => 0x77,
            OpOver => 0x78,
            OpPick => 0x79,
            OpRoll => 0x7a,
            OpRot => 0x7b,
            OpSwap => 0x7c,
            OpTuck => 0x7d,
            OpCat => 0x7e,
            OpSubstr => 0x7f,
            OpLeft => 0x80,
            OpRight => 0x81,
            OpSize => 0x82,
            OpInvert => 0x83,
            OpAnd => 0x84,
            OpOr => 0x85,
            OpXor => 0x86,
            OpEqual => 0x87,
            OpEqualVerify => 0x88,
            Op1Add => 0x8b,
            Op1Sub => 0x8c,
            Op2Mul => 0x8d,
            Op2Div => 0x8e,
            OpNegate => 0x8f,
            OpAbs => 0x90,
            OpNot => 0x91,
            Op0NotEqual => 0x92,
            OpAdd => 0x93,
            OpSub => 0x94,
            OpMul => 0x95,
            OpDiv => 0x96,
            OpMod => 0x97,
            OpLShift => 0x98,
            OpRShift => 0x99,
            OpBoolAnd => 0x9a,
            OpBoolOr => 0x9b,
            OpNumEqual => 0x9c,
            OpNumEqualVerify => 0x9d,
            OpNumNotEqual => 0x9e,
            OpLessThan => 0x9f,
            OpGreaterThan => 0xa0,
            OpLessThanOrEqual => 0xa1,
            OpGreaterThanOrEqual => 0xa2,
            OpMin => 0xa3,
            OpMax => 0xa4,
            OpWithin => 0xa5,
            OpRipemd160 => 0xa6,
            OpSha1 => 0xa7,
            OpSha256 => 0xa8,
            OpHash160 => 0xa9,
            OpHash256 => 0xaa,
            OpCodeSeparator => 0xab,
            OpCheckSig => 0xac,
            OpCheckSigVerify => 0xad,
            OpCheckMultiSig => 0xae,
            OpCheckMultiSigVerify => 0xaf,
            OpPubKeyHash => 0xfd,
            OpPubKey => 0xfe,
            OpUnknown(b) => b,
        }
    }

    /// Literal data pushes: OP_0 through OP_PUSHDATA4
    pub fn is_push(self) -> bool {
        self.to_byte() <= Opcode::OpPushData4.to_byte()
    }

    /// The conditional family executed even inside a taken-false branch
    pub fn is_conditional(self) -> bool {
        let b = self.to_byte();
        (Opcode::OpIf.to_byte()..=Opcode::OpEndIf.to_byte()).contains(&b)
    }
}

/// A script program: raw bytes plus structured access
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push_opcode(&mut self, op: Opcode) -> &mut Self {
        self.0.push(op.to_byte());
        self
    }

    /// Push a byte string with the shortest push encoding for its length.
    pub fn push_data(&mut self, data: &[u8]) -> &mut Self {
        let len = data.len();
        if len < Opcode::OpPushData1.to_byte() as usize {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(Opcode::OpPushData1.to_byte());
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(Opcode::OpPushData2.to_byte());
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.0.push(Opcode::OpPushData4.to_byte());
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.0.extend_from_slice(data);
        self
    }

    /// Push an integer: -1 and 1..=16 as single opcodes, everything else as
    /// the canonical number encoding (zero becomes the empty push).
    pub fn push_int(&mut self, n: i64) -> &mut Self {
        if n == -1 || (1..=16).contains(&n) {
            let byte = (n + (Opcode::Op1.to_byte() as i64 - 1)) as u8;
            self.0.push(byte);
            self
        } else {
            self.push_num(&ScriptNum::from(n))
        }
    }

    pub fn push_num(&mut self, n: &ScriptNum) -> &mut Self {
        let bytes = n.to_bytes();
        self.push_data(&bytes)
    }

    pub fn concat(&self, other: &Script) -> Script {
        let mut bytes = self.0.clone();
        bytes.extend_from_slice(&other.0);
        Script(bytes)
    }

    /// Read the next opcode and, for push opcodes, its payload. `pc` is
    /// advanced past the record. A push whose declared payload overruns the
    /// script is a truncation error.
    pub fn get_op(&self, pc: &mut usize) -> Result<(Opcode, Vec<u8>)> {
        let bytes = &self.0;
        if *pc >= bytes.len() {
            return Err(ScriptError::TruncatedScript("read past end of script".to_string()));
        }
        let opcode = Opcode::from_byte(bytes[*pc]);
        *pc += 1;

        if !opcode.is_push() {
            return Ok((opcode, Vec::new()));
        }

        let size = match opcode {
            Opcode::OpPushData1 => {
                let n = *bytes.get(*pc).ok_or_else(|| {
                    ScriptError::TruncatedScript("PUSHDATA1 missing length".to_string())
                })?;
                *pc += 1;
                n as usize
            }
            Opcode::OpPushData2 => {
                if *pc + 2 > bytes.len() {
                    return Err(ScriptError::TruncatedScript("PUSHDATA2 missing length".to_string()));
                }
                let n = u16::from_le_bytes([bytes[*pc], bytes[*pc + 1]]);
                *pc += 2;
                n as usize
            }
            Opcode::OpPushData4 => {
                if *pc + 4 > bytes.len() {
                    return Err(ScriptError::TruncatedScript("PUSHDATA4 missing length".to_string()));
                }
                let n = u32::from_le_bytes([
                    bytes[*pc],
                    bytes[*pc + 1],
                    bytes[*pc + 2],
                    bytes[*pc + 3],
                ]);
                *pc += 4;
                n as usize
            }
            _ => opcode.to_byte() as usize,
        };

        if *pc + size > bytes.len() {
            return Err(ScriptError::TruncatedScript(format!(
                "push of {} bytes overruns script",
                size
            )));
        }
        let payload = bytes[*pc..*pc + size].to_vec();
        *pc += size;
        Ok((opcode, payload))
    }

    /// Iterate the `(opcode, payload)` records from the start
    pub fn ops(&self) -> ScriptOps<'_> {
        ScriptOps { script: self, pc: 0, failed: false }
    }

    /// Remove every non-overlapping occurrence of `sub` that starts on an
    /// opcode boundary. Returns the number of deletions.
    pub fn find_and_delete(&mut self, sub: &Script) -> usize {
        if sub.is_empty() {
            return 0;
        }
        let needle = sub.as_bytes();
        let mut kept = Vec::with_capacity(self.0.len());
        let mut found = 0;
        let mut pc = 0;
        while pc < self.0.len() {
            while self.0.len() - pc >= needle.len() && self.0[pc..pc + needle.len()] == *needle {
                pc += needle.len();
                found += 1;
            }
            if pc >= self.0.len() {
                break;
            }
            let start = pc;
            if self.get_op(&mut pc).is_err() {
                // A truncated tail holds no further opcode boundaries
                kept.extend_from_slice(&self.0[start..]);
                break;
            }
            kept.extend_from_slice(&self.0[start..pc]);
        }
        self.0 = kept;
        found
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

pub struct ScriptOps<'a> {
    script: &'a Script,
    pc: usize,
    failed: bool,
}

impl Iterator for ScriptOps<'_> {
    type Item = Result<(Opcode, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pc >= self.script.len() {
            return None;
        }
        match self.script.get_op(&mut self.pc) {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_byte_roundtrip() {
        for byte in 0..=255u8 {
            assert_eq!(Opcode::from_byte(byte).to_byte(), byte);
        }
    }

    #[test]
    fn test_push_data_encodings() {
        let mut s = Script::new();
        s.push_data(&[0xaa; 3]);
        assert_eq!(s.as_bytes()[0], 3);

        let mut s = Script::new();
        s.push_data(&[0xaa; 0x4c]);
        assert_eq!(s.as_bytes()[0], 0x4c);
        assert_eq!(s.as_bytes()[1], 0x4c);

        let mut s = Script::new();
        s.push_data(&[0xaa; 0x100]);
        assert_eq!(s.as_bytes()[0], 0x4d);
        assert_eq!(&s.as_bytes()[1..3], &[0x00, 0x01]);
    }

    #[test]
    fn test_push_int_small_values() {
        let mut s = Script::new();
        s.push_int(-1).push_int(0).push_int(1).push_int(16).push_int(17);
        assert_eq!(s.as_bytes(), &[0x4f, 0x00, 0x51, 0x60, 0x01, 0x11]);
    }

    #[test]
    fn test_get_op_reads_pushes() {
        let mut s = Script::new();
        s.push_data(b"abc").push_opcode(Opcode::OpDup).push_opcode(Opcode::Op0);
        let mut pc = 0;
        let (op, payload) = s.get_op(&mut pc).unwrap();
        assert_eq!(op, Opcode::OpPushBytes(3));
        assert_eq!(payload, b"abc");
        let (op, payload) = s.get_op(&mut pc).unwrap();
        assert_eq!(op, Opcode::OpDup);
        assert!(payload.is_empty());
        let (op, payload) = s.get_op(&mut pc).unwrap();
        assert_eq!(op, Opcode::Op0);
        assert!(payload.is_empty());
        assert_eq!(pc, s.len());
    }

    #[test]
    fn test_get_op_truncated_push_fails() {
        let s = Script::from_bytes(vec![0x05, 0x01, 0x02]); // declares 5, has 2
        let mut pc = 0;
        assert!(s.get_op(&mut pc).is_err());

        let s = Script::from_bytes(vec![0x4c]); // PUSHDATA1 with no length
        let mut pc = 0;
        assert!(s.get_op(&mut pc).is_err());
    }

    #[test]
    fn test_ops_iterator_covers_well_formed_script() {
        let mut s = Script::new();
        s.push_int(1).push_data(b"xy").push_opcode(Opcode::OpAdd);
        let records: Vec<_> = s.ops().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);

        let bad = Script::from_bytes(vec![0x51, 0x4d, 0xff]); // truncated PUSHDATA2
        assert!(bad.ops().collect::<Result<Vec<_>>>().is_err());
    }

    #[test]
    fn test_find_and_delete_on_boundaries() {
        // sig push appears twice and is removed both times
        let mut sig_push = Script::new();
        sig_push.push_data(b"sig");
        let mut s = Script::new();
        s.push_data(b"sig")
            .push_opcode(Opcode::OpDup)
            .push_data(b"sig")
            .push_opcode(Opcode::OpCheckSig);
        assert_eq!(s.find_and_delete(&sig_push), 2);
        assert_eq!(s.as_bytes(), &[Opcode::OpDup.to_byte(), Opcode::OpCheckSig.to_byte()]);
    }

    #[test]
    fn test_find_and_delete_ignores_mid_payload_match() {
        // The needle bytes occur inside a larger push payload and must stay.
        let mut needle = Script::new();
        needle.push_opcode(Opcode::OpDup);
        let mut s = Script::new();
        s.push_data(&[Opcode::OpDup.to_byte(), 0x01]);
        let before = s.clone();
        assert_eq!(s.find_and_delete(&needle), 0);
        assert_eq!(s, before);
    }

    #[test]
    fn test_find_and_delete_single_opcode() {
        let mut sep = Script::new();
        sep.push_opcode(Opcode::OpCodeSeparator);
        let mut s = Script::new();
        s.push_opcode(Opcode::OpCodeSeparator)
            .push_int(1)
            .push_opcode(Opcode::OpCodeSeparator);
        assert_eq!(s.find_and_delete(&sep), 2);
        assert_eq!(s.as_bytes(), &[0x51]);
    }
}
