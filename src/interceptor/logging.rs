use super::Interceptor;
use crate::context::CallContext;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Logs every call and, on streaming calls, every message.
///
/// Payloads are only logged at `debug` level; `info` shows the call flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn pre(
        &self,
        ctx: &CallContext,
        request: Option<&(dyn Debug + Sync)>,
    ) -> Result<(), ServiceError> {
        info!(method = ctx.method, kind = ?ctx.kind, call_id = ctx.call_id, "Call started");
        if let Some(request) = request {
            debug!(call_id = ctx.call_id, ?request, "Pre proc message");
        }
        Ok(())
    }

    async fn post(&self, ctx: &CallContext, outcome: Result<&(dyn Debug + Sync), &ServiceError>) {
        match outcome {
            Ok(response) => {
                info!(method = ctx.method, call_id = ctx.call_id, "Call finished");
                debug!(call_id = ctx.call_id, ?response, "Post proc message");
            }
            Err(e) => {
                warn!(
                    method = ctx.method,
                    call_id = ctx.call_id,
                    code = %e.code(),
                    error = %e,
                    "Call failed"
                );
            }
        }
    }

    fn on_recv(&self, ctx: &CallContext, message: &dyn Debug) {
        debug!(method = ctx.method, call_id = ctx.call_id, ?message, "Stream recv");
    }

    fn on_send(&self, ctx: &CallContext, message: &dyn Debug) {
        debug!(method = ctx.method, call_id = ctx.call_id, ?message, "Stream send");
    }
}
