//! Error taxonomy shared by every call.
//!
//! Handlers return [`ServiceError`]; callers match on [`ServiceError::code`]
//! before trusting a payload. Store-level failures ([`StoreError`]) convert
//! into the taxonomy at the handler boundary.

use crate::store::StoreError;
use std::fmt::Display;
use thiserror::Error;

/// Status code attached to every failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    NotFound,
    InvalidArgument,
    AlreadyExists,
    TransportFailure,
    DeadlineExceeded,
    Cancelled,
    Unavailable,
    Internal,
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Code::NotFound => "NotFound",
            Code::InvalidArgument => "InvalidArgument",
            Code::AlreadyExists => "AlreadyExists",
            Code::TransportFailure => "TransportFailure",
            Code::DeadlineExceeded => "DeadlineExceeded",
            Code::Cancelled => "Cancelled",
            Code::Unavailable => "Unavailable",
            Code::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// One rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

/// Errors a call can terminate with.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Malformed input; `violations` lists the offending fields.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        violations: Vec<FieldViolation>,
    },

    #[error("Order already exists: {0}")]
    AlreadyExists(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
            violations,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportFailure(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn code(&self) -> Code {
        match self {
            Self::NotFound(_) => Code::NotFound,
            Self::InvalidArgument { .. } => Code::InvalidArgument,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::TransportFailure(_) => Code::TransportFailure,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Cancelled => Code::Cancelled,
            Self::Unavailable(_) => Code::Unavailable,
            Self::Internal(_) => Code::Internal,
        }
    }

    /// Reclassifies an error read off an inbound stream: whatever the peer
    /// failed with, the call sees a broken stream.
    pub fn into_transport(self) -> Self {
        match self {
            Self::TransportFailure(_) => self,
            other => Self::TransportFailure(other.to_string()),
        }
    }

    /// Field violations carried by an `InvalidArgument`, empty otherwise.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::InvalidArgument { violations, .. } => violations,
            _ => &[],
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id.to_string()),
            StoreError::AlreadyExists(id) => Self::AlreadyExists(id.to_string()),
            StoreError::Closed | StoreError::Dropped => Self::Internal(e.to_string()),
        }
    }
}
