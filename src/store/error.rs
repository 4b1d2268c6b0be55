//! Error types for the order store.

use crate::model::OrderId;
use thiserror::Error;

/// Errors reported by [`OrderStore`](super::OrderStore) operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The actor's mailbox is closed; the store task has exited.
    #[error("Store actor closed")]
    Closed,

    /// The actor dropped the reply channel without answering.
    #[error("Store actor dropped response channel")]
    Dropped,

    #[error("Order not found: {0}")]
    NotFound(OrderId),

    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),
}
