use aa_intent_types::IntentError;
use thiserror::Error;

/// Rejections raised before any byte is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unsupported ABI type `{0}`")]
    UnsupportedType(String),
    #[error("expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("value at position {position} does not match declared type `{expected}`")]
    TypeMismatch { position: usize, expected: String },
    #[error("parameter position {0} is duplicated or out of range")]
    InvalidPosition(usize),
    #[error("session and selected network disagree on `{0}`")]
    ContextMismatch(&'static str),
}

/// Errors while turning values into bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("{field} does not fit in {width} bytes")]
    Overflow { field: String, width: usize },
    #[error("input truncated")]
    Truncated,
}

/// Key material and signature failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidKey,
    #[error("message must be 32 bytes, got {0}")]
    InvalidMessage(usize),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signing failed")]
    SigningFailed,
}

/// Rejection reported by the remote verifier, passed through unchanged by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote verifier rejected the operation: {message}")]
pub struct ProtocolError {
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<IntentError> for Error {
    fn from(err: IntentError) -> Self {
        match err {
            IntentError::MissingField(name) => ValidationError::MissingField(name).into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

pub(crate) fn malformed(msg: impl Into<String>) -> Error {
    EncodingError::MalformedInput(msg.into()).into()
}

pub(crate) fn overflow(field: impl Into<String>, width: usize) -> Error {
    EncodingError::Overflow {
        field: field.into(),
        width,
    }
    .into()
}
