use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A required input path does not exist or has the wrong kind.
    MissingInput,
    /// Input exists but cannot be parsed or violates a configuration rule.
    InvalidInput,
    /// An output location is occupied and may not be replaced.
    AlreadyExists,
    Io,
    /// The external assembly pipeline failed.
    External,
}

#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message}")]
pub struct PrepError {
    pub code: ErrorCode,
    pub message: String,
}

impl PrepError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingInput, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Io, message)
    }
}

pub type PrepResult<T> = Result<T, PrepError>;
