//! Server-streaming search over the store.

use crate::error::ServiceError;
use crate::model::Order;
use crate::store::OrderStore;
use crate::stream::MessageSink;
use tracing::debug;

/// Streams every stored order with an item containing `query`.
///
/// The scan is one linearized store operation that collects every match into
/// memory before the first send. Only delivery is incremental: matches go out
/// one by one in the store's insertion order, each send waiting for the
/// consumer. Returns how many orders were sent. No match is an empty stream,
/// not an error; only a failing send aborts.
pub async fn search_orders<K>(
    store: &OrderStore,
    query: &str,
    mut sink: K,
) -> Result<usize, ServiceError>
where
    K: MessageSink<Order>,
{
    let matches = store.search(query.to_string()).await?;

    let mut sent = 0;
    for order in matches {
        let id = order.id.clone();
        sink.send(order).await?;
        debug!(%id, "Matching order found");
        sent += 1;
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;
    use crate::stream;

    #[tokio::test]
    async fn test_send_failure_aborts_search() {
        let mut mock = MockStore::new();
        mock.expect_search().return_ok(vec![
            Order::new("102", ["Google Pixel 3A"], "Mountain View, CA", 1800.0),
            Order::new("104", ["Google Home Mini"], "Mountain View, CA", 400.0),
        ]);

        let (sink, source) = stream::channel::<Order>(1);
        drop(source);

        let err = search_orders(&mock.store(), "Google", sink).await.unwrap_err();
        assert_eq!(err.code(), crate::error::Code::TransportFailure);
        mock.verify();
    }
}
