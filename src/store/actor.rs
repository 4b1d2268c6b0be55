//! # Order Store Actor
//!
//! The `OrderStoreActor` is the only owner of the order map. It runs in its own
//! Tokio task and processes [`StoreRequest`]s one at a time, so every read and
//! write is linearized without a lock around the map.

use super::message::{StoreRequest, UpsertOutcome};
use super::{OrderStore, StoreError};
use crate::model::{Order, OrderId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Server half of the store: owns the orders and the mailbox receiver.
///
/// Besides the map, the actor keeps `sequence`, the ids in first-insertion
/// order. Scans walk `sequence`, which makes search output deterministic.
pub struct OrderStoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    orders: HashMap<OrderId, Order>,
    sequence: Vec<OrderId>,
    next_id_fn: Box<dyn Fn() -> OrderId + Send + Sync>,
}

impl OrderStoreActor {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> OrderId + Send + Sync + 'static,
    ) -> (Self, OrderStore) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            orders: HashMap::new(),
            sequence: Vec::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (actor, OrderStore::new(sender))
    }

    /// Runs the event loop until every [`OrderStore`] handle is dropped.
    pub async fn run(mut self) {
        info!("Order store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Add { order, respond_to } => {
                    debug!(?order, "Add");
                    let _ = respond_to.send(self.add(order));
                }
                StoreRequest::Get { id, respond_to } => {
                    let order = self.orders.get(&id).cloned();
                    debug!(%id, found = order.is_some(), "Get");
                    let _ = respond_to.send(order.ok_or(StoreError::NotFound(id)));
                }
                StoreRequest::Upsert { order, respond_to } => {
                    debug!(?order, "Upsert");
                    let outcome = self.upsert(order);
                    let _ = respond_to.send(Ok(outcome));
                }
                StoreRequest::Search { query, respond_to } => {
                    let found: Vec<Order> = self
                        .sequence
                        .iter()
                        .filter_map(|id| self.orders.get(id))
                        .filter(|order| order.matches(&query))
                        .cloned()
                        .collect();
                    debug!(%query, matches = found.len(), "Search");
                    let _ = respond_to.send(Ok(found));
                }
                StoreRequest::Len { respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.len()));
                }
            }
        }

        info!(size = self.orders.len(), "Order store shutdown");
    }

    fn add(&mut self, mut order: Order) -> Result<OrderId, StoreError> {
        if order.id.is_empty() {
            order.id = self.fresh_id();
        } else if self.orders.contains_key(&order.id) {
            warn!(id = %order.id, "Already exists");
            return Err(StoreError::AlreadyExists(order.id));
        }

        let id = order.id.clone();
        self.sequence.push(id.clone());
        self.orders.insert(id.clone(), order);
        info!(%id, size = self.orders.len(), "Added");
        Ok(id)
    }

    fn upsert(&mut self, order: Order) -> UpsertOutcome {
        let id = order.id.clone();
        match self.orders.insert(id.clone(), order) {
            Some(_) => {
                info!(%id, "Replaced");
                UpsertOutcome::Replaced
            }
            None => {
                self.sequence.push(id.clone());
                info!(%id, size = self.orders.len(), "Inserted");
                UpsertOutcome::Inserted
            }
        }
    }

    /// Generated ids may collide with ids callers chose themselves; skip those.
    fn fresh_id(&self) -> OrderId {
        loop {
            let id = (self.next_id_fn)();
            if !self.orders.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Order;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn spawn_store() -> OrderStore {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || OrderId(format!("order_{}", counter.fetch_add(1, Ordering::SeqCst)));
        let (actor, store) = OrderStoreActor::new(8, next_id);
        tokio::spawn(actor.run());
        store
    }

    #[tokio::test]
    async fn test_add_get_and_duplicate() {
        let store = spawn_store();

        let order = Order::new("101", ["iPhone XS", "Mac Book Pro"], "San Jose, CA", 2300.0);
        let id = store.add(order.clone()).await.unwrap();
        assert_eq!(id, OrderId::from("101"));
        assert_eq!(store.get(id.clone()).await.unwrap(), order);

        let again = store.add(order).await;
        assert_eq!(again, Err(StoreError::AlreadyExists(id)));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_assigns_id_skipping_taken_ones() {
        let store = spawn_store();

        store.add(Order::new("order_1", ["Amazon Echo"], "San Jose, CA", 30.0)).await.unwrap();
        let watch = Order::new("", ["Apple Watch S4"], "San Jose, CA", 400.0);
        let id = store.add(watch).await.unwrap();
        assert_eq!(id, OrderId::from("order_2"));

        let stored = store.get(id.clone()).await.unwrap();
        assert_eq!(stored.id, id);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = spawn_store();
        let result = store.get("404".into()).await;
        assert_eq!(result, Err(StoreError::NotFound("404".into())));
    }

    #[tokio::test]
    async fn test_upsert_reports_outcome_and_search_keeps_insertion_order() {
        let store = spawn_store();

        let order = |id: &str, item: &str, price: f64| {
            Order::new(id, [item], "Mountain View, CA", price)
        };
        let first = store.upsert(order("b", "Google Home Mini", 400.0)).await.unwrap();
        let second = store.upsert(order("a", "Google Pixel 3A", 1800.0)).await.unwrap();
        let replaced = store.upsert(order("b", "Google Nest Hub", 90.0)).await.unwrap();
        assert_eq!(first, UpsertOutcome::Inserted);
        assert_eq!(second, UpsertOutcome::Inserted);
        assert_eq!(replaced, UpsertOutcome::Replaced);

        let found = store.search("Google".to_string()).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(found[0].items, vec!["Google Nest Hub".to_string()]);
    }
}
