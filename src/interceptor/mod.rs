//! # Interceptors
//!
//! Cross-cutting hooks wrapped around every call.
//!
//! An [`Interceptor`] observes a call before the handler runs (`pre`, which may
//! reject the call), after it finishes (`post`, for every outcome), and, for
//! streaming calls, every single message crossing the stream (`on_recv`,
//! `on_send`). Interceptors never see mutable payloads, so they cannot change
//! what the handler receives or sends.
//!
//! [`InterceptorChain`] composes them in registration order: `pre` hooks run
//! first-registered first, `post` hooks in reverse, like nested wrappers.

pub mod chain;
pub mod logging;

pub use chain::*;
pub use logging::*;

use crate::context::CallContext;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::fmt::Debug;

/// Hooks invoked around every call. All methods default to doing nothing.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Runs before the handler. Returning an error short-circuits the call:
    /// the handler never runs and the error becomes the call's outcome.
    ///
    /// `request` is the single request of unary and server-streaming calls,
    /// `None` for calls whose requests arrive as a stream.
    async fn pre(
        &self,
        _ctx: &CallContext,
        _request: Option<&(dyn Debug + Sync)>,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Runs after the handler, whether it succeeded or failed. Also runs when
    /// this interceptor's own `pre` rejected the call.
    async fn post(
        &self,
        _ctx: &CallContext,
        _outcome: Result<&(dyn Debug + Sync), &ServiceError>,
    ) {
    }

    /// A message was received on a streaming call.
    fn on_recv(&self, _ctx: &CallContext, _message: &dyn Debug) {}

    /// A message is about to be sent on a streaming call.
    fn on_send(&self, _ctx: &CallContext, _message: &dyn Debug) {}
}
