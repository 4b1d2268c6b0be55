//! Client side of the order service: name resolution, balancing and the
//! [`OrderClient`] that drives calls over the in-process transport.

pub mod order_client;
pub mod resolver;

pub use order_client::*;
pub use resolver::{
    Address, BalancingPolicy, Connector, InProcessConnector, Resolver, StaticResolver,
};
