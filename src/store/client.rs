//! Cloneable handle to the store actor.

use super::message::{StoreRequest, UpsertOutcome};
use super::StoreError;
use crate::model::{Order, OrderId};
use tokio::sync::{mpsc, oneshot};

/// A type-safe handle for talking to an [`OrderStoreActor`](super::OrderStoreActor).
///
/// Cloning is cheap; every clone feeds the same mailbox. The actor exits once
/// the last handle is dropped.
#[derive(Clone)]
pub struct OrderStore {
    sender: mpsc::Sender<StoreRequest>,
}

impl OrderStore {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    /// Inserts a new order, assigning an id when `order.id` is empty.
    pub async fn add(&self, order: Order) -> Result<OrderId, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Add { order, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    pub async fn get(&self, id: OrderId) -> Result<Order, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Inserts or overwrites unconditionally.
    pub async fn upsert(&self, order: Order) -> Result<UpsertOutcome, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Upsert { order, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Orders with an item containing `query`, in first-insertion order.
    pub async fn search(&self, query: String) -> Result<Vec<Order>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Search { query, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    pub async fn len(&self) -> Result<usize, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Len { respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }
}
