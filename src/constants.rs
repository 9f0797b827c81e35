//! Consensus constants shared across the crate

/// Maximum money supply: 21,000,000 coins in base units
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Maximum serialized transaction size: 1MB
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 1000;

/// Maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 1000;

/// Maximum script length
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum combined stack + altstack depth during script execution
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of executed non-push operations in a script
pub const MAX_SCRIPT_OPS: usize = 201;

/// Largest accepted shift count for OP_LSHIFT / OP_RSHIFT, in bits
pub const MAX_SHIFT_BITS: usize = 65_536;

/// Largest single allocation step while deserializing attacker-sized data
pub const MAX_ALLOC_CHUNK: usize = 5_000_000;

/// Protocol version pushed by OP_VER and compared by OP_VERIF / OP_VERNOTIF
pub const PROTOCOL_VERSION: i64 = 106;

/// Version byte prefixed to the hash160 payload of an address
pub const ADDRESS_VERSION: u8 = 0;

/// Signature hash mode: sign all outputs
pub const SIGHASH_ALL: u8 = 1;

/// Signature hash mode: sign no outputs
pub const SIGHASH_NONE: u8 = 2;

/// Signature hash mode: sign only the output paired with the input
pub const SIGHASH_SINGLE: u8 = 3;

/// Signature hash modifier: commit to this input only
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Mask selecting the base signature hash mode from the flag byte
pub const SIGHASH_MODE_MASK: u8 = 0x1f;

/// Evaluation flag: treat OP_VER / OP_VERIF / OP_VERNOTIF as failures
pub const SCRIPT_REJECT_VER: u32 = 1 << 0;
