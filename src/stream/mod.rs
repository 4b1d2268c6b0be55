//! Message streams, independent of any wire format.
//!
//! Handlers only see the two traits defined here: a [`MessageSource`] they
//! receive from and a [`MessageSink`] they send to. The interceptor chain wraps
//! both, and [`channel`] provides the in-process transport built on bounded
//! Tokio channels.

pub mod channel;

pub use channel::*;

use crate::error::ServiceError;
use async_trait::async_trait;

/// Inbound half of a stream.
#[async_trait]
pub trait MessageSource<T>: Send {
    /// Next message, `Ok(None)` once the peer signalled end-of-input.
    ///
    /// Any `Err` is a transport failure distinct from end-of-input.
    async fn recv(&mut self) -> Result<Option<T>, ServiceError>;
}

/// Outbound half of a stream.
#[async_trait]
pub trait MessageSink<T>: Send {
    /// Waits until the peer accepts `message` or the transport fails.
    async fn send(&mut self, message: T) -> Result<(), ServiceError>;
}

