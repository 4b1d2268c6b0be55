//! The order store: an actor that exclusively owns the `id -> Order` map.
//!
//! - [`OrderStoreActor`] - the task holding the map and processing requests in order
//! - [`OrderStore`] - the cloneable handle every handler talks to
//! - [`mock`] - scripted store replies for testing handlers in isolation

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod mock;

pub use actor::*;
pub use client::*;
pub use error::*;
pub use message::UpsertOutcome;

use crate::model::OrderId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Creates a new store actor and its handle. Assigned ids look like `order_<n>`.
pub fn new(buffer_size: usize) -> (OrderStoreActor, OrderStore) {
    let order_id_counter = Arc::new(AtomicU64::new(1));
    let next_order_id = move || {
        let id = order_id_counter.fetch_add(1, Ordering::SeqCst);
        OrderId(format!("order_{}", id))
    };

    OrderStoreActor::new(buffer_size, next_order_id)
}
