//! Error types for script verification

use thiserror::Error;

/// Internally distinguishable failure kinds. Outside the core every one of
/// these collapses to a `false` verification result; the variants exist for
/// diagnostics, not control flow.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Truncated script: {0}")]
    TruncatedScript(String),

    #[error("Stack underflow: {0}")]
    StackUnderflow(String),

    #[error("Disabled or unknown opcode: {0:#04x}")]
    DisabledOpcode(u8),

    #[error("Unbalanced conditional")]
    UnbalancedConditional,

    #[error("Arithmetic domain error: {0}")]
    ArithmeticDomain(String),

    #[error("Malformed signature: {0}")]
    SignatureMalformed(String),

    #[error("Signature verification failed")]
    SignatureVerifyFailed,

    #[error("Script does not match a standard template")]
    TemplateMismatch,

    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    #[error("Transaction validation failed: {0}")]
    TransactionValidation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ScriptError {
    fn from(e: std::io::Error) -> Self {
        ScriptError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
