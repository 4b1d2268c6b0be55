//! Client-streaming bulk update.

use super::validation::validate_upsert;
use crate::error::ServiceError;
use crate::model::{Order, UpdateSummary};
use crate::store::{OrderStore, UpsertOutcome};
use crate::stream::MessageSource;
use tracing::info;

/// Upserts every inbound order until end-of-input, then returns the summary.
///
/// There is no rollback: when receiving, validation or the store fails, the
/// call aborts without a summary and the orders upserted so far stay. A
/// receive failure is always reported as `TransportFailure`.
pub async fn update_orders<S>(
    store: &OrderStore,
    mut source: S,
) -> Result<UpdateSummary, ServiceError>
where
    S: MessageSource<Order>,
{
    let mut summary = UpdateSummary::default();

    while let Some(order) = source.recv().await.map_err(ServiceError::into_transport)? {
        validate_upsert(&order)?;
        let id = order.id.clone();
        if store.upsert(order).await? == UpsertOutcome::Inserted {
            summary.inserted += 1;
        }
        info!(%id, "Order updated");
        summary.ids.push(id);
    }

    Ok(summary)
}
