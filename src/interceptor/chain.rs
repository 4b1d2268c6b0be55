//! Composition of interceptors around unary and streaming handlers.

use super::Interceptor;
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::stream::{MessageSink, MessageSource};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// Ordered list of interceptors applied to every call of a service.
///
/// The handler itself runs under [`CallContext::guard`], so deadlines and
/// cancellation surface as ordinary outcomes that `post` hooks observe.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `interceptor`; it runs after every interceptor registered before it.
    pub fn with(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Appends an interceptor that is shared with other chains.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Wraps a unary handler.
    pub async fn unary<Req, Resp, F, Fut>(
        &self,
        ctx: &CallContext,
        request: Req,
        handler: F,
    ) -> Result<Resp, ServiceError>
    where
        Req: Debug + Sync,
        Resp: Debug + Sync,
        F: FnOnce(Req) -> Fut,
        Fut: Future<Output = Result<Resp, ServiceError>>,
    {
        let entered = match self.enter(ctx, Some(&request as &(dyn Debug + Sync))).await {
            Ok(entered) => entered,
            Err((entered, e)) => {
                self.exit(ctx, entered, Err(&e)).await;
                return Err(e);
            }
        };

        let result = ctx.guard(handler(request)).await;
        self.exit(ctx, entered, result.as_ref().map(|r| r as &(dyn Debug + Sync))).await;
        result
    }

    /// Wraps a streaming handler.
    ///
    /// The handler gets a [`StreamTap`] and wraps its source and/or sink with
    /// it, so every message is reported to the interceptors. `Out` is whatever
    /// the handler finishes with (a summary, a report) and is what `post` sees.
    pub async fn streaming<Out, F, Fut>(
        &self,
        ctx: &CallContext,
        request: Option<&(dyn Debug + Sync)>,
        handler: F,
    ) -> Result<Out, ServiceError>
    where
        Out: Debug + Sync,
        F: FnOnce(StreamTap) -> Fut,
        Fut: Future<Output = Result<Out, ServiceError>>,
    {
        let entered = match self.enter(ctx, request).await {
            Ok(entered) => entered,
            Err((entered, e)) => {
                self.exit(ctx, entered, Err(&e)).await;
                return Err(e);
            }
        };

        let tap = StreamTap {
            ctx: ctx.clone(),
            interceptors: self.interceptors.clone(),
        };
        let result = ctx.guard(handler(tap)).await;
        self.exit(ctx, entered, result.as_ref().map(|r| r as &(dyn Debug + Sync))).await;
        result
    }

    /// Runs `pre` hooks in order. On rejection, reports how many interceptors
    /// were entered, the rejecting one included.
    async fn enter(
        &self,
        ctx: &CallContext,
        request: Option<&(dyn Debug + Sync)>,
    ) -> Result<usize, (usize, ServiceError)> {
        for (i, interceptor) in self.interceptors.iter().enumerate() {
            if let Err(e) = interceptor.pre(ctx, request).await {
                return Err((i + 1, e));
            }
        }
        Ok(self.interceptors.len())
    }

    async fn exit(
        &self,
        ctx: &CallContext,
        entered: usize,
        outcome: Result<&(dyn Debug + Sync), &ServiceError>,
    ) {
        for interceptor in self.interceptors[..entered].iter().rev() {
            interceptor.post(ctx, outcome).await;
        }
    }
}

/// Handed to streaming handlers to wrap their streams.
#[derive(Clone)]
pub struct StreamTap {
    ctx: CallContext,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl StreamTap {
    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    pub fn source<S>(&self, inner: S) -> Intercepted<S> {
        Intercepted {
            inner,
            tap: self.clone(),
        }
    }

    pub fn sink<K>(&self, inner: K) -> Intercepted<K> {
        Intercepted {
            inner,
            tap: self.clone(),
        }
    }
}

/// A stream wrapped by the chain. It has the same contract as the stream it
/// wraps and delegates every call to it after notifying the interceptors.
pub struct Intercepted<S> {
    inner: S,
    tap: StreamTap,
}

#[async_trait]
impl<T, S> MessageSource<T> for Intercepted<S>
where
    T: Debug + Send + 'static,
    S: MessageSource<T>,
{
    async fn recv(&mut self) -> Result<Option<T>, ServiceError> {
        let message = self.inner.recv().await?;
        if let Some(message) = &message {
            for interceptor in &self.tap.interceptors {
                interceptor.on_recv(&self.tap.ctx, message);
            }
        }
        Ok(message)
    }
}

#[async_trait]
impl<T, K> MessageSink<T> for Intercepted<K>
where
    T: Debug + Send + 'static,
    K: MessageSink<T>,
{
    async fn send(&mut self, message: T) -> Result<(), ServiceError> {
        for interceptor in &self.tap.interceptors {
            interceptor.on_send(&self.tap.ctx, &message);
        }
        self.inner.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CallKind, CallOptions};
    use crate::stream;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        events: Events,
        reject: bool,
    }

    impl Recorder {
        fn new(name: &'static str, events: &Events) -> Self {
            Self {
                name,
                events: events.clone(),
                reject: false,
            }
        }

        fn log(&self, event: &str) {
            self.events.lock().unwrap().push(format!("{}.{}", self.name, event));
        }
    }

    #[async_trait]
    impl Interceptor for Recorder {
        async fn pre(
            &self,
            _ctx: &CallContext,
            _request: Option<&(dyn Debug + Sync)>,
        ) -> Result<(), ServiceError> {
            self.log("pre");
            if self.reject {
                return Err(ServiceError::invalid_argument("rejected", vec![]));
            }
            Ok(())
        }

        async fn post(
            &self,
            _ctx: &CallContext,
            outcome: Result<&(dyn Debug + Sync), &ServiceError>,
        ) {
            self.log(if outcome.is_ok() { "post.ok" } else { "post.err" });
        }

        fn on_recv(&self, _ctx: &CallContext, message: &dyn Debug) {
            self.log(&format!("recv {:?}", message));
        }

        fn on_send(&self, _ctx: &CallContext, message: &dyn Debug) {
            self.log(&format!("send {:?}", message));
        }
    }

    fn ctx(kind: CallKind) -> CallContext {
        CallContext::new("Test", kind, 1, &CallOptions::default())
    }

    fn take(events: &Events) -> Vec<String> {
        std::mem::take(&mut *events.lock().unwrap())
    }

    #[tokio::test]
    async fn test_unary_hooks_nest_in_registration_order() {
        let events: Events = Arc::default();
        let chain = InterceptorChain::new()
            .with(Recorder::new("a", &events))
            .with(Recorder::new("b", &events));

        let handler_events = events.clone();
        let result = chain
            .unary(&ctx(CallKind::Unary), 20, |n: u32| async move {
                handler_events.lock().unwrap().push("handler".to_string());
                Ok::<_, ServiceError>(n + 1)
            })
            .await;

        assert_eq!(result, Ok(21));
        assert_eq!(take(&events), vec!["a.pre", "b.pre", "handler", "b.post.ok", "a.post.ok"]);
    }

    #[tokio::test]
    async fn test_post_runs_once_for_failed_handler() {
        let events: Events = Arc::default();
        let chain = InterceptorChain::new().with(Recorder::new("a", &events));

        let result: Result<u32, _> = chain
            .unary(&ctx(CallKind::Unary), 1, |_| async { Err(ServiceError::not_found("1")) })
            .await;

        assert_eq!(result, Err(ServiceError::not_found("1")));
        assert_eq!(take(&events), vec!["a.pre", "a.post.err"]);
    }

    #[tokio::test]
    async fn test_rejecting_pre_short_circuits() {
        let events: Events = Arc::default();
        let mut rejecting = Recorder::new("b", &events);
        rejecting.reject = true;
        let chain = InterceptorChain::new()
            .with(Recorder::new("a", &events))
            .with(rejecting)
            .with(Recorder::new("c", &events));

        let handler_events = events.clone();
        let result = chain
            .unary(&ctx(CallKind::Unary), 1, |n: u32| async move {
                handler_events.lock().unwrap().push("handler".to_string());
                Ok::<_, ServiceError>(n)
            })
            .await;

        assert_eq!(result.unwrap_err().code(), crate::error::Code::InvalidArgument);
        assert_eq!(take(&events), vec!["a.pre", "b.pre", "b.post.err", "a.post.err"]);
    }

    #[tokio::test]
    async fn test_streaming_observes_each_message_without_altering_it() {
        let events: Events = Arc::default();
        let chain = InterceptorChain::new().with(Recorder::new("a", &events));

        let (mut in_tx, in_rx) = stream::channel::<u32>(4);
        let (out_tx, out_rx) = stream::channel::<u32>(4);
        in_tx.send(1).await.unwrap();
        in_tx.send(2).await.unwrap();
        in_tx.close();

        let result = chain
            .streaming(&ctx(CallKind::BidiStreaming), None, |tap| async move {
                assert_eq!(tap.context().kind, CallKind::BidiStreaming);
                let mut source = tap.source(in_rx);
                let mut sink = tap.sink(out_tx);
                let mut total = 0;
                while let Some(n) = source.recv().await? {
                    total += n;
                    sink.send(n * 10).await?;
                }
                Ok::<_, ServiceError>(total)
            })
            .await;

        assert_eq!(result, Ok(3));
        let (sent, status) = out_rx.into_stream().collect_all().await;
        assert_eq!(sent, vec![10, 20]);
        assert!(status.is_ok());
        assert_eq!(
            take(&events),
            vec!["a.pre", "a.recv 1", "a.send 10", "a.recv 2", "a.send 20", "a.post.ok"]
        );
    }

    #[tokio::test]
    async fn test_shared_interceptor_sees_calls_of_every_chain() {
        let events: Events = Arc::default();
        let shared: Arc<dyn Interceptor> = Arc::new(Recorder::new("shared", &events));

        let mut first = InterceptorChain::new();
        assert!(first.is_empty());
        first.push(shared.clone());
        let mut second = InterceptorChain::new().with(Recorder::new("own", &events));
        second.push(shared);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);

        first
            .unary(&ctx(CallKind::Unary), 1, |n: u32| async move { Ok::<_, ServiceError>(n) })
            .await
            .unwrap();
        second
            .unary(&ctx(CallKind::Unary), 2, |n: u32| async move { Ok::<_, ServiceError>(n) })
            .await
            .unwrap();

        assert_eq!(
            take(&events),
            vec![
                "shared.pre",
                "shared.post.ok",
                "own.pre",
                "shared.pre",
                "shared.post.ok",
                "own.post.ok",
            ]
        );
    }
}
