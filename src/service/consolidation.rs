//! Order consolidation for the bidirectional `ProcessOrders` call.
//!
//! Inbound order ids are looked up and grouped by destination into combined
//! shipments. Every `batch_size` accepted ids the pending shipments are flushed
//! downstream; end-of-input flushes whatever is left exactly once.
//!
//! ```text
//!   Open --(id)--> Open            accept, flush when the batch is full
//!   Open --(EOF)--> Draining       final flush
//!   Draining -----> Closed(Ok)
//!   Open|Draining --(error)--> Closed(Err)
//! ```

use crate::error::{Code, ServiceError};
use crate::model::{CombinedShipment, Order, OrderId};
use crate::store::OrderStore;
use crate::stream::{MessageSink, MessageSource};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Lifecycle of one consolidation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Open,
    Draining,
    Closed(Result<(), Code>),
}

/// What a finished call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Ids accepted (looked up and grouped).
    pub orders: usize,
    /// Flushes that emitted at least one shipment.
    pub flushes: usize,
    pub shipments: usize,
}

/// Pending shipments of the current batch, kept in first-seen destination order.
#[derive(Debug, Default)]
struct BatchState {
    counter: usize,
    pending: Vec<CombinedShipment>,
    by_destination: HashMap<String, usize>,
}

impl BatchState {
    fn add(&mut self, order: Order) {
        match self.by_destination.get(&order.destination) {
            Some(&slot) => self.pending[slot].order_list.push(order),
            None => {
                self.by_destination.insert(order.destination.clone(), self.pending.len());
                self.pending.push(CombinedShipment::start(order));
            }
        }
        self.counter += 1;
    }

    /// Empties the batch and resets the counter.
    fn take(&mut self) -> Vec<CombinedShipment> {
        self.counter = 0;
        self.by_destination.clear();
        std::mem::take(&mut self.pending)
    }
}

pub struct ConsolidationEngine {
    store: OrderStore,
    batch_size: usize,
    state: EngineState,
    batch: BatchState,
    report: ConsolidationReport,
}

impl ConsolidationEngine {
    pub fn new(store: OrderStore, batch_size: usize) -> Result<Self, ServiceError> {
        if batch_size == 0 {
            return Err(ServiceError::invalid_argument(
                "Batch size must be positive",
                vec![crate::error::FieldViolation::new("batch_size", "must be at least 1")],
            ));
        }
        Ok(Self {
            store,
            batch_size,
            state: EngineState::Open,
            batch: BatchState::default(),
            report: ConsolidationReport::default(),
        })
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn report(&self) -> ConsolidationReport {
        self.report
    }

    /// Drives the engine until the inbound stream ends or a step fails.
    ///
    /// Once closed the engine never reads from `source` again; a failure
    /// leaves pending shipments unsent.
    pub async fn run<S, K>(
        &mut self,
        mut source: S,
        mut sink: K,
    ) -> Result<ConsolidationReport, ServiceError>
    where
        S: MessageSource<OrderId>,
        K: MessageSink<CombinedShipment>,
    {
        loop {
            let step = match self.state {
                EngineState::Open => match source.recv().await {
                    Ok(Some(id)) => self.accept(id, &mut sink).await,
                    Ok(None) => {
                        debug!(pending = self.batch.pending.len(), "End of input");
                        self.transition(EngineState::Draining);
                        Ok(())
                    }
                    Err(e) => Err(e.into_transport()),
                },
                EngineState::Draining => match self.flush(&mut sink).await {
                    Ok(()) => {
                        self.transition(EngineState::Closed(Ok(())));
                        Ok(())
                    }
                    Err(e) => Err(e),
                },
                EngineState::Closed(Ok(())) => return Ok(self.report),
                EngineState::Closed(Err(code)) => {
                    let message = format!("engine already closed with {}", code);
                    return Err(ServiceError::internal(message));
                }
            };

            if let Err(e) = step {
                warn!(code = %e.code(), error = %e, "Consolidation aborted");
                self.transition(EngineState::Closed(Err(e.code())));
                return Err(e);
            }
        }
    }

    async fn accept<K>(&mut self, id: OrderId, sink: &mut K) -> Result<(), ServiceError>
    where
        K: MessageSink<CombinedShipment>,
    {
        let order = self.store.get(id).await?;
        debug!(id = %order.id, destination = %order.destination, "Order accepted");
        self.batch.add(order);
        self.report.orders += 1;

        if self.batch.counter == self.batch_size {
            self.flush(sink).await?;
        }
        Ok(())
    }

    async fn flush<K>(&mut self, sink: &mut K) -> Result<(), ServiceError>
    where
        K: MessageSink<CombinedShipment>,
    {
        let shipments = self.batch.take();
        if shipments.is_empty() {
            return Ok(());
        }

        self.report.flushes += 1;
        for shipment in shipments {
            info!(id = %shipment.id, orders = shipment.order_list.len(), "Shipping");
            sink.send(shipment).await?;
            self.report.shipments += 1;
        }
        Ok(())
    }

    fn transition(&mut self, next: EngineState) {
        debug!(from = ?self.state, to = ?next, "Engine state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use crate::store::StoreError;
    use crate::stream;

    fn order(id: &str, destination: &str) -> Order {
        Order::new(id, ["item"], destination, 10.0)
    }

    async fn feed(ids: &[&str]) -> stream::ChannelSource<OrderId> {
        let (mut sink, source) = stream::channel(ids.len() + 1);
        for id in ids {
            sink.send(OrderId::from(*id)).await.unwrap();
        }
        source
    }

    #[tokio::test]
    async fn test_full_batch_groups_by_destination() {
        let mut mock = MockStore::new();
        mock.expect_get("102".into()).return_ok(order("102", "D1"));
        mock.expect_get("103".into()).return_ok(order("103", "D1"));
        mock.expect_get("104".into()).return_ok(order("104", "D2"));

        let (out_sink, out_source) = stream::channel::<CombinedShipment>(8);
        let mut engine = ConsolidationEngine::new(mock.store(), 3).unwrap();
        let report = engine.run(feed(&["102", "103", "104"]).await, out_sink).await.unwrap();

        assert_eq!(
            report,
            ConsolidationReport {
                orders: 3,
                flushes: 1,
                shipments: 2
            }
        );
        assert_eq!(engine.state(), &EngineState::Closed(Ok(())));

        let (shipments, status) = out_source.into_stream().collect_all().await;
        assert!(status.is_ok());
        assert_eq!(shipments.len(), 2);
        assert_eq!(shipments[0].id, "cmb-D1");
        assert_eq!(shipments[0].order_list.len(), 2);
        assert_eq!(shipments[1].id, "cmb-D2");
        assert_eq!(shipments[1].order_list.len(), 1);
        mock.verify();
    }

    #[tokio::test]
    async fn test_partial_batch_flushed_once_at_end_of_input() {
        let mut mock = MockStore::new();
        mock.expect_get("102".into()).return_ok(order("102", "D1"));
        mock.expect_get("106".into()).return_ok(order("106", "D2"));

        let (out_sink, out_source) = stream::channel::<CombinedShipment>(8);
        let mut engine = ConsolidationEngine::new(mock.store(), 3).unwrap();
        let report = engine.run(feed(&["102", "106"]).await, out_sink).await.unwrap();

        assert_eq!(report.flushes, 1);
        let (shipments, _) = out_source.into_stream().collect_all().await;
        let ids: Vec<&str> = shipments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cmb-D1", "cmb-D2"]);
    }

    #[tokio::test]
    async fn test_missing_id_closes_with_not_found_and_drops_pending() {
        let mut mock = MockStore::new();
        mock.expect_get("102".into()).return_ok(order("102", "D1"));
        mock.expect_get("999".into()).return_err(StoreError::NotFound("999".into()));

        let (out_sink, out_source) = stream::channel::<CombinedShipment>(8);
        let mut engine = ConsolidationEngine::new(mock.store(), 3).unwrap();
        let err = engine.run(feed(&["102", "999", "103"]).await, out_sink).await.unwrap_err();

        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(engine.state(), &EngineState::Closed(Err(Code::NotFound)));
        let (shipments, _) = out_source.into_stream().collect_all().await;
        assert!(shipments.is_empty());
        mock.verify();
    }

    #[tokio::test]
    async fn test_inbound_error_is_transport_failure() {
        let mock = MockStore::new();
        let (in_sink, in_source) = stream::channel::<OrderId>(1);
        in_sink.fail(ServiceError::Cancelled).await.unwrap();

        let (out_sink, _out_source) = stream::channel::<CombinedShipment>(8);
        let mut engine = ConsolidationEngine::new(mock.store(), 3).unwrap();
        let err = engine.run(in_source, out_sink).await.unwrap_err();
        assert_eq!(err.code(), Code::TransportFailure);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let mock = MockStore::new();
        let err = ConsolidationEngine::new(mock.store(), 0).err().unwrap();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_batch_size_one_flushes_every_order() {
        let mut mock = MockStore::new();
        mock.expect_get("102".into()).return_ok(order("102", "D1"));
        mock.expect_get("103".into()).return_ok(order("103", "D1"));

        let (out_sink, out_source) = stream::channel::<CombinedShipment>(8);
        let mut engine = ConsolidationEngine::new(mock.store(), 1).unwrap();
        let report = engine.run(feed(&["102", "103"]).await, out_sink).await.unwrap();

        assert_eq!(report.flushes, 2);
        let (shipments, _) = out_source.into_stream().collect_all().await;
        assert!(shipments.iter().all(|s| s.order_list.len() == 1 && s.id == "cmb-D1"));
    }
}
