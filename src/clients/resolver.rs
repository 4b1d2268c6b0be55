//! Name resolution and endpoint selection for [`OrderClient`](super::OrderClient).

use crate::service::OrderService;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Network-style address of one service endpoint, e.g. `localhost:50051`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a service name to the addresses serving it.
pub trait Resolver: Send + Sync {
    fn resolve(&self, service_name: &str) -> Vec<Address>;
}

/// Fixed `service name -> addresses` table.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    table: HashMap<String, Vec<Address>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, A>(mut self, service_name: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.table
            .insert(service_name.into(), addresses.into_iter().map(Into::into).collect());
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, service_name: &str) -> Vec<Address> {
        self.table.get(service_name).cloned().unwrap_or_default()
    }
}

/// Turns a resolved address into a callable endpoint.
pub trait Connector: Send + Sync {
    /// `None` when nothing is listening at `address`.
    fn connect(&self, address: &Address) -> Option<OrderService>;
}

/// Connects to services living in the same process.
#[derive(Clone, Default)]
pub struct InProcessConnector {
    endpoints: HashMap<Address, OrderService>,
}

impl InProcessConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, address: impl Into<Address>, service: OrderService) {
        self.endpoints.insert(address.into(), service);
    }
}

impl Connector for InProcessConnector {
    fn connect(&self, address: &Address) -> Option<OrderService> {
        self.endpoints.get(address).cloned()
    }
}

/// How calls are spread over the connected endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalancingPolicy {
    /// Every call goes to the first endpoint that connected.
    #[default]
    PickFirst,
    /// Calls rotate through the endpoints in resolution order.
    RoundRobin,
}

/// Per-client picker state.
#[derive(Debug)]
pub(crate) struct Balancer {
    policy: BalancingPolicy,
    endpoints: usize,
    next: AtomicUsize,
}

impl Balancer {
    pub(crate) fn new(policy: BalancingPolicy, endpoints: usize) -> Self {
        Self {
            policy,
            endpoints,
            next: AtomicUsize::new(0),
        }
    }

    /// Index of the endpoint for the next call. `endpoints` is never zero.
    pub(crate) fn pick(&self) -> usize {
        match self.policy {
            BalancingPolicy::PickFirst => 0,
            BalancingPolicy::RoundRobin => {
                self.next.fetch_add(1, Ordering::Relaxed) % self.endpoints
            }
        }
    }
}
