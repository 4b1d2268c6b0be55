use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::interceptor::InterceptorChain;
use crate::model::Order;
use crate::service::OrderService;
use tracing::{error, info};

/// Runtime for one order service instance.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: spawning the store actor and stopping it
/// - **Wiring**: building the [`OrderService`] around the store handle and the interceptor chain
/// - **Seeding**: loading initial orders before clients connect
///
/// # Example
///
/// ```ignore
/// let config = ServiceConfig::default();
/// let chain = InterceptorChain::new().with(LoggingInterceptor);
/// let system = OrderSystem::start(&config, chain);
/// system.seed(OrderSystem::sample_orders()).await?;
///
/// let mut connector = InProcessConnector::new();
/// connector.register("localhost:50051", system.service.clone());
/// // ... connect clients, make calls, drop clients ...
///
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    pub service: OrderService,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl OrderSystem {
    /// Spawns the store actor and builds the service. Must be called inside a Tokio runtime.
    pub fn start(config: &ServiceConfig, chain: InterceptorChain) -> Self {
        let (store_actor, store) = crate::store::new(config.store_buffer);
        let store_handle = tokio::spawn(store_actor.run());

        info!(
            service = %config.service_name,
            batch_size = config.batch_size,
            interceptors = chain.len(),
            "Order system started"
        );
        Self {
            service: OrderService::new(store, chain, config),
            handles: vec![store_handle],
        }
    }

    /// Upserts `orders` straight into the store, bypassing interceptors.
    pub async fn seed(
        &self,
        orders: impl IntoIterator<Item = Order>,
    ) -> Result<usize, ServiceError> {
        let mut seeded = 0;
        for order in orders {
            self.service.store().upsert(order).await?;
            seeded += 1;
        }
        info!(seeded, "Store seeded");
        Ok(seeded)
    }

    /// The five orders the service traditionally boots with (ids `102`..`106`).
    pub fn sample_orders() -> Vec<Order> {
        vec![
            Order::new("102", ["Google Pixel 3A", "Mac Book Pro"], "Mountain View, CA", 1800.00),
            Order::new("103", ["Apple Watch S4"], "San Jose, CA", 400.00),
            Order::new("104", ["Google Home Mini", "Google Nest Hub"], "Mountain View, CA", 400.00),
            Order::new("105", ["Amazon Echo"], "San Jose, CA", 30.00),
            Order::new("106", ["Amazon Echo", "Apple iPhone XS"], "Mountain View, CA", 300.00),
        ]
    }

    /// Gracefully shuts down the system.
    ///
    /// Drops this system's service handle and waits for the store actor to
    /// exit. The actor only exits once every handle is gone, so clients and
    /// cloned services must be dropped first.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        info!("Shutting down order system...");
        drop(self.service);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(ServiceError::internal(format!("store task failed: {}", e)));
            }
        }

        info!("Order system shutdown complete.");
        Ok(())
    }
}
