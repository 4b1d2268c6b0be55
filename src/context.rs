//! Per-call context: identity, deadline and cancellation.

use crate::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Shape of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

/// Caller-supplied limits for one call.
///
/// A timeout and an absolute deadline may both be given; the earlier wins.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub deadline: Option<Instant>,
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Effective deadline measured from `now`.
    fn resolve_deadline(&self, now: Instant) -> Option<Instant> {
        let from_timeout = self.timeout.map(|t| now + t);
        match (from_timeout, self.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// What interceptors and handlers know about the call in flight.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub method: &'static str,
    pub kind: CallKind,
    pub call_id: u64,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(method: &'static str, kind: CallKind, call_id: u64, options: &CallOptions) -> Self {
        Self {
            method,
            kind,
            call_id,
            deadline: options.resolve_deadline(Instant::now()),
            cancellation: options.cancellation.clone().unwrap_or_default(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Runs `work` until it finishes, the deadline passes, or the call is
    /// cancelled. In the latter two cases `work` is dropped wherever it was
    /// suspended (store lookup, stream send) and nothing pending is kept.
    pub async fn guard<T, F>(&self, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ServiceError::Cancelled),
            _ = expiry => Err(ServiceError::DeadlineExceeded),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_reports_deadline() {
        let options = CallOptions::default().with_timeout(Duration::from_millis(10));
        let ctx = CallContext::new("Slow", CallKind::Unary, 1, &options);

        let result: Result<(), _> = ctx
            .guard(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(ServiceError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_guard_reports_cancellation_before_work() {
        let token = CancellationToken::new();
        token.cancel();
        let options = CallOptions::default().with_cancellation(token);
        let ctx = CallContext::new("Cancelled", CallKind::Unary, 1, &options);

        let result = ctx.guard(async { Ok(42) }).await;
        assert_eq!(result, Err(ServiceError::Cancelled));
    }

    #[test]
    fn test_earlier_of_timeout_and_deadline_wins() {
        let now = Instant::now();
        let options = CallOptions::default()
            .with_timeout(Duration::from_secs(10))
            .with_deadline(now + Duration::from_secs(1));
        assert_eq!(options.resolve_deadline(now), Some(now + Duration::from_secs(1)));
    }
}
