use super::resolver::{Address, Balancer, BalancingPolicy, Connector, Resolver};
use crate::context::CallOptions;
use crate::error::ServiceError;
use crate::model::{CombinedShipment, Order, OrderId, UpdateSummary};
use crate::service::OrderService;
use crate::stream::{self, ChannelSink, MessageSink, ResponseStream};
use std::future::Future;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

const DEFAULT_STREAM_BUFFER: usize = 16;

/// Client for the order service.
///
/// Built from a service name, an injected [`Resolver`] and [`Connector`], and
/// a [`BalancingPolicy`]. Each call picks one endpoint and runs on its own
/// task: a call that panics comes back as `Internal` instead of taking the
/// caller down.
#[derive(Clone)]
pub struct OrderClient {
    endpoints: Arc<Vec<(Address, OrderService)>>,
    balancer: Arc<Balancer>,
    stream_buffer: usize,
}

impl OrderClient {
    /// Resolves `service_name` and connects to every address that answers.
    ///
    /// Fails with `Unavailable` when resolution is empty or nothing connects.
    #[instrument(skip(resolver, connector))]
    pub fn connect(
        service_name: &str,
        resolver: &dyn Resolver,
        policy: BalancingPolicy,
        connector: &dyn Connector,
    ) -> Result<Self, ServiceError> {
        let addresses = resolver.resolve(service_name);
        if addresses.is_empty() {
            return Err(ServiceError::Unavailable(format!(
                "no addresses resolved for {}",
                service_name
            )));
        }

        let mut endpoints = Vec::with_capacity(addresses.len());
        for address in addresses {
            match connector.connect(&address) {
                Some(service) => endpoints.push((address, service)),
                None => warn!(%address, "Endpoint unreachable"),
            }
        }
        if endpoints.is_empty() {
            return Err(ServiceError::Unavailable(format!(
                "no reachable endpoint for {}",
                service_name
            )));
        }

        info!(endpoints = endpoints.len(), "Client connected");
        Ok(Self {
            balancer: Arc::new(Balancer::new(policy, endpoints.len())),
            endpoints: Arc::new(endpoints),
            stream_buffer: DEFAULT_STREAM_BUFFER,
        })
    }

    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    /// Connected endpoints, in resolution order.
    pub fn addresses(&self) -> Vec<Address> {
        self.endpoints.iter().map(|(address, _)| address.clone()).collect()
    }

    fn endpoint(&self) -> (Address, OrderService) {
        let (address, service) = &self.endpoints[self.balancer.pick()];
        debug!(%address, "Endpoint picked");
        (address.clone(), service.clone())
    }

    #[instrument(skip(self, order, options))]
    pub async fn add_order(
        &self,
        order: Order,
        options: &CallOptions,
    ) -> Result<OrderId, ServiceError> {
        debug!(?order, "add_order called");
        let (address, service) = self.endpoint();
        info!(%address, "Sending AddOrder");

        let options = options.clone();
        joined(tokio::spawn(async move { service.add_order(order, &options).await }).await)
    }

    #[instrument(skip(self, options))]
    pub async fn get_order(
        &self,
        id: OrderId,
        options: &CallOptions,
    ) -> Result<Order, ServiceError> {
        let (address, service) = self.endpoint();
        info!(%address, "Sending GetOrder");

        let options = options.clone();
        joined(tokio::spawn(async move { service.get_order(id, &options).await }).await)
    }

    /// Starts a search; matches arrive on the returned stream as the service finds them.
    #[instrument(skip(self, query, options))]
    pub fn search_orders(
        &self,
        query: impl Into<String>,
        options: &CallOptions,
    ) -> ResponseStream<Order> {
        let query = query.into();
        let (address, service) = self.endpoint();
        info!(%address, %query, "Sending SearchOrders");

        let (sink, source) = stream::channel(self.stream_buffer);
        let failure = sink.clone();
        let options = options.clone();
        drive(failure, async move { service.search_orders(query, sink, &options).await });
        source.into_stream()
    }

    /// Opens a bulk update. Send orders on the returned call, then
    /// [`close_and_recv`](UpdateOrdersCall::close_and_recv) for the summary.
    #[instrument(skip(self, options))]
    pub fn update_orders(&self, options: &CallOptions) -> UpdateOrdersCall {
        let (address, service) = self.endpoint();
        info!(%address, "Opening UpdateOrders");

        let (requests, source) = stream::channel(self.stream_buffer);
        let options = options.clone();
        let response = tokio::spawn(async move { service.update_orders(source, &options).await });
        UpdateOrdersCall { requests, response }
    }

    /// Opens a consolidation call: ids go into the returned sink, shipments
    /// come back on the stream. Dropping or closing the sink ends the input.
    #[instrument(skip(self, options))]
    pub fn process_orders(
        &self,
        options: &CallOptions,
    ) -> (ChannelSink<OrderId>, ResponseStream<CombinedShipment>) {
        let (address, service) = self.endpoint();
        info!(%address, "Opening ProcessOrders");

        let (requests, inbound) = stream::channel(self.stream_buffer);
        let (outbound, responses) = stream::channel(self.stream_buffer);
        let failure = outbound.clone();
        let options = options.clone();
        drive(failure, async move {
            service.process_orders(inbound, outbound, &options).await
        });
        (requests, responses.into_stream())
    }
}

/// Client half of an `UpdateOrders` call.
pub struct UpdateOrdersCall {
    requests: ChannelSink<Order>,
    response: JoinHandle<Result<UpdateSummary, ServiceError>>,
}

impl UpdateOrdersCall {
    /// Fails with `TransportFailure` once the service has aborted the call;
    /// [`close_and_recv`](Self::close_and_recv) then reports why.
    pub async fn send(&mut self, order: Order) -> Result<(), ServiceError> {
        self.requests.send(order).await
    }

    /// Ends the input and waits for the summary.
    pub async fn close_and_recv(self) -> Result<UpdateSummary, ServiceError> {
        self.requests.close();
        joined(self.response.await)
    }

    /// Aborts the input with `error` and waits for the call to finish.
    pub async fn abort(self, error: ServiceError) -> Result<UpdateSummary, ServiceError> {
        if self.requests.fail(error).await.is_err() {
            debug!("Call already finished");
        }
        joined(self.response.await)
    }
}

fn joined<T>(result: Result<Result<T, ServiceError>, JoinError>) -> Result<T, ServiceError> {
    result.map_err(|e| ServiceError::internal(format!("call task failed: {}", e)))?
}

/// Runs a streaming call in the background. Its error, or a panic turned
/// into `Internal`, is delivered as the last frame of the response stream.
fn drive<T, Out, F>(failure: ChannelSink<T>, call: F)
where
    T: Send + 'static,
    Out: Send + 'static,
    F: Future<Output = Result<Out, ServiceError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = joined(tokio::spawn(call).await) {
            if failure.fail(e).await.is_err() {
                debug!("Response stream already dropped");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{InProcessConnector, StaticResolver};
    use crate::config::ServiceConfig;
    use crate::error::Code;
    use crate::interceptor::InterceptorChain;
    use crate::store;

    fn service() -> OrderService {
        let (actor, store) = store::new(16);
        tokio::spawn(actor.run());
        OrderService::new(store, InterceptorChain::new(), &ServiceConfig::default())
    }

    #[tokio::test]
    async fn test_empty_resolution_is_unavailable() {
        let resolver = StaticResolver::new();
        let connector = InProcessConnector::new();
        let result =
            OrderClient::connect("missing", &resolver, BalancingPolicy::PickFirst, &connector);
        assert_eq!(result.err().map(|e| e.code()), Some(Code::Unavailable));
    }

    #[tokio::test]
    async fn test_unreachable_addresses_are_skipped() {
        let resolver = StaticResolver::new().with("orders", ["localhost:1", "localhost:2"]);
        let mut connector = InProcessConnector::new();
        connector.register("localhost:2", service());

        let client =
            OrderClient::connect("orders", &resolver, BalancingPolicy::PickFirst, &connector)
                .unwrap();
        assert_eq!(client.addresses(), vec![Address::from("localhost:2")]);
    }

    #[tokio::test]
    async fn test_update_orders_returns_summary() {
        let resolver = StaticResolver::new().with("orders", ["localhost:50051"]);
        let mut connector = InProcessConnector::new();
        connector.register("localhost:50051", service());
        let client =
            OrderClient::connect("orders", &resolver, BalancingPolicy::PickFirst, &connector)
                .unwrap();

        let options = CallOptions::default();
        let mut call = client.update_orders(&options);
        call.send(Order::new("102", ["Google Pixel Book"], "Mountain View, CA", 1100.0))
            .await
            .unwrap();
        let items = ["Apple Watch S4", "Mac Book Pro", "iPad Pro"];
        call.send(Order::new("103", items, "San Jose, CA", 2800.0))
            .await
            .unwrap();
        let summary = call.close_and_recv().await.unwrap();

        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.to_string(), "Orders processed Updated Order IDs: 102, 103");
    }
}
