//! The order management service: five calls over a shared store.
//!
//! | Call           | Shape            | Handler                          |
//! |----------------|------------------|----------------------------------|
//! | `AddOrder`     | unary            | [`OrderService::add_order`]      |
//! | `GetOrder`     | unary            | [`OrderService::get_order`]      |
//! | `SearchOrders` | server streaming | [`OrderService::search_orders`]  |
//! | `UpdateOrders` | client streaming | [`OrderService::update_orders`]  |
//! | `ProcessOrders`| bidirectional    | [`OrderService::process_orders`] |
//!
//! Every call runs inside the service's [`InterceptorChain`] and under the
//! deadline and cancellation of its [`CallOptions`].

pub mod bulk_update;
pub mod consolidation;
pub mod search;
pub mod validation;

pub use consolidation::{ConsolidationEngine, ConsolidationReport, EngineState};

use crate::config::ServiceConfig;
use crate::context::{CallContext, CallKind, CallOptions};
use crate::error::ServiceError;
use crate::interceptor::InterceptorChain;
use crate::model::{CombinedShipment, Order, OrderId, UpdateSummary};
use crate::store::OrderStore;
use crate::stream::{MessageSink, MessageSource};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const ADD_ORDER: &str = "AddOrder";
pub const GET_ORDER: &str = "GetOrder";
pub const SEARCH_ORDERS: &str = "SearchOrders";
pub const UPDATE_ORDERS: &str = "UpdateOrders";
pub const PROCESS_ORDERS: &str = "ProcessOrders";

/// Server side of the order service. Cheap to clone; clones share the store,
/// the interceptor chain and the call counter.
#[derive(Clone)]
pub struct OrderService {
    store: OrderStore,
    chain: InterceptorChain,
    batch_size: usize,
    default_timeout: Option<Duration>,
    calls: Arc<AtomicU64>,
}

impl OrderService {
    pub fn new(store: OrderStore, chain: InterceptorChain, config: &ServiceConfig) -> Self {
        Self {
            store,
            chain,
            batch_size: config.batch_size,
            default_timeout: config.default_timeout(),
            calls: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    fn context(&self, method: &'static str, kind: CallKind, options: &CallOptions) -> CallContext {
        let call_id = self.calls.fetch_add(1, Ordering::Relaxed);
        match (options.timeout, self.default_timeout) {
            (None, Some(timeout)) => {
                let options = options.clone().with_timeout(timeout);
                CallContext::new(method, kind, call_id, &options)
            }
            _ => CallContext::new(method, kind, call_id, options),
        }
    }

    /// Stores a new order and returns its id, assigned when `order.id` is empty.
    pub async fn add_order(
        &self,
        order: Order,
        options: &CallOptions,
    ) -> Result<OrderId, ServiceError> {
        let ctx = self.context(ADD_ORDER, CallKind::Unary, options);
        self.chain
            .unary(&ctx, order, |order| async move {
                validation::validate_new_order(&order)?;
                let id = self.store.add(order).await?;
                info!(%id, "Order added");
                Ok::<_, ServiceError>(id)
            })
            .await
    }

    pub async fn get_order(
        &self,
        id: OrderId,
        options: &CallOptions,
    ) -> Result<Order, ServiceError> {
        let ctx = self.context(GET_ORDER, CallKind::Unary, options);
        self.chain
            .unary(&ctx, id, |id| async move {
                validation::validate_order_id(&id)?;
                let order = self.store.get(id).await?;
                debug!(id = %order.id, "Order retrieved");
                Ok::<_, ServiceError>(order)
            })
            .await
    }

    /// Streams matching orders into `sink`; returns how many were sent.
    pub async fn search_orders<K>(
        &self,
        query: String,
        sink: K,
        options: &CallOptions,
    ) -> Result<usize, ServiceError>
    where
        K: MessageSink<Order>,
    {
        let ctx = self.context(SEARCH_ORDERS, CallKind::ServerStreaming, options);
        let pattern = query.as_str();
        self.chain
            .streaming(&ctx, Some(&query as &(dyn Debug + Sync)), |tap| async move {
                search::search_orders(&self.store, pattern, tap.sink(sink)).await
            })
            .await
    }

    /// Upserts every order read from `source`; the summary is sent once input ends.
    pub async fn update_orders<S>(
        &self,
        source: S,
        options: &CallOptions,
    ) -> Result<UpdateSummary, ServiceError>
    where
        S: MessageSource<Order>,
    {
        let ctx = self.context(UPDATE_ORDERS, CallKind::ClientStreaming, options);
        self.chain
            .streaming(&ctx, None, |tap| async move {
                bulk_update::update_orders(&self.store, tap.source(source)).await
            })
            .await
    }

    /// Consolidates the order ids read from `source` into shipments sent to `sink`.
    pub async fn process_orders<S, K>(
        &self,
        source: S,
        sink: K,
        options: &CallOptions,
    ) -> Result<ConsolidationReport, ServiceError>
    where
        S: MessageSource<OrderId>,
        K: MessageSink<CombinedShipment>,
    {
        let ctx = self.context(PROCESS_ORDERS, CallKind::BidiStreaming, options);
        self.chain
            .streaming(&ctx, None, |tap| async move {
                let mut engine = ConsolidationEngine::new(self.store.clone(), self.batch_size)?;
                let report = engine.run(tap.source(source), tap.sink(sink)).await?;
                Ok::<_, ServiceError>(report)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use crate::stream;

    fn service() -> OrderService {
        let (actor, store) = store::new(16);
        tokio::spawn(actor.run());
        OrderService::new(store, InterceptorChain::new(), &ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_add_then_get_returns_same_order() {
        let service = service();
        let options = CallOptions::default();
        let order = Order::new("", ["Amazon Echo"], "San Jose, CA", 30.0);

        let id = service.add_order(order.clone(), &options).await.unwrap();
        let stored = service.get_order(id.clone(), &options).await.unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.items, order.items);
        assert_eq!(stored.destination, order.destination);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let service = service();
        let err = service.get_order("404".into(), &CallOptions::default()).await.unwrap_err();
        assert_eq!(err.code(), crate::error::Code::NotFound);
    }

    #[tokio::test]
    async fn test_search_streams_matches() {
        let service = service();
        let options = CallOptions::default();
        let pixel = Order::new("102", ["Google Pixel 3A"], "Mountain View, CA", 1800.0);
        service.add_order(pixel, &options).await.unwrap();
        service
            .add_order(Order::new("103", ["Apple Watch S4"], "San Jose, CA", 400.0), &options)
            .await
            .unwrap();

        let (sink, source) = stream::channel::<Order>(4);
        let sent = service.search_orders("Google".to_string(), sink, &options).await.unwrap();
        assert_eq!(sent, 1);

        let (orders, status) = source.into_stream().collect_all().await;
        assert!(status.is_ok());
        assert_eq!(orders[0].id, OrderId::from("102"));
    }
}
