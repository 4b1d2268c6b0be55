//! Messages understood by the store actor.

use super::StoreError;
use crate::model::{Order, OrderId};
use tokio::sync::oneshot;

/// One-shot reply channel carried by every request.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Whether an upsert created a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Requests processed sequentially by [`OrderStoreActor`](super::OrderStoreActor).
///
/// Every variant carries its own reply channel, so the caller awaits exactly
/// the answer to its request while the actor keeps the map to itself.
#[derive(Debug)]
pub enum StoreRequest {
    Add {
        order: Order,
        respond_to: Response<OrderId>,
    },
    Get {
        id: OrderId,
        respond_to: Response<Order>,
    },
    Upsert {
        order: Order,
        respond_to: Response<UpsertOutcome>,
    },
    Search {
        query: String,
        respond_to: Response<Vec<Order>>,
    },
    Len {
        respond_to: Response<usize>,
    },
}
