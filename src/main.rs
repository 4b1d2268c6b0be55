//! Demo: two service instances behind a static resolver, driven through
//! every call by a pick-first client, then by a round-robin one.

use order_service::clients::{BalancingPolicy, InProcessConnector, OrderClient, StaticResolver};
use order_service::config::ServiceConfig;
use order_service::context::CallOptions;
use order_service::interceptor::{InterceptorChain, LoggingInterceptor};
use order_service::lifecycle::{setup_tracing, OrderSystem};
use order_service::model::{Order, OrderId};
use order_service::stream::MessageSink;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = ServiceConfig::load(Some(Path::new("orders.toml"))).map_err(|e| e.to_string())?;
    info!(
        service = %config.service_name,
        addresses = ?config.addresses,
        "Starting order service demo"
    );

    let mut systems = Vec::new();
    let mut connector = InProcessConnector::new();
    for address in &config.addresses {
        let system = OrderSystem::start(&config, InterceptorChain::new().with(LoggingInterceptor));
        system
            .seed(OrderSystem::sample_orders())
            .await
            .map_err(|e| e.to_string())?;
        connector.register(address.as_str(), system.service.clone());
        systems.push(system);
    }
    let resolver = StaticResolver::new().with(
        config.service_name.clone(),
        config.addresses.iter().map(String::as_str),
    );

    let client = OrderClient::connect(
        &config.service_name,
        &resolver,
        BalancingPolicy::PickFirst,
        &connector,
    )
    .map_err(|e| e.to_string())?
        .with_stream_buffer(config.stream_buffer);
    let options = CallOptions::default().with_timeout(Duration::from_secs(2));

    // Unary calls
    let span = tracing::info_span!("unary");
    async {
        let order = Order::new("101", ["iPhone XS", "Mac Book Pro"], "San Jose, CA", 2300.00);
        match client.add_order(order, &options).await {
            Ok(id) => info!(%id, "AddOrder response"),
            Err(e) => error!(error = %e, "AddOrder failed"),
        }

        match client.get_order(OrderId::from("106"), &options).await {
            Ok(order) => info!(?order, "GetOrder response"),
            Err(e) => error!(error = %e, "GetOrder failed"),
        }

        let invalid = Order::new("-1", ["iPhone XS", "Mac Book Pro"], "San Jose, CA", 2300.00);
        if let Err(e) = client.add_order(invalid, &options).await {
            for violation in e.violations() {
                info!(
                    code = %e.code(),
                    field = %violation.field,
                    description = %violation.description,
                    "Request field invalid"
                );
            }
        }

        let token = CancellationToken::new();
        token.cancel();
        if let Err(e) = client
            .get_order(OrderId::from("102"), &options.clone().with_cancellation(token))
            .await
        {
            info!(code = %e.code(), "Cancelled call ended");
        }
    }
    .instrument(span)
    .await;

    // Server streaming
    let mut matches = client.search_orders("Google", &options);
    loop {
        match matches.message().await {
            Ok(Some(order)) => info!(id = %order.id, items = ?order.items, "Search result"),
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "SearchOrders failed");
                break;
            }
        }
    }

    // Client streaming
    let mut update = client.update_orders(&options);
    let updates = [
        Order::new("102", ["Google Pixel 3A", "Google Pixel Book"], "Mountain View, CA", 1100.00),
        Order::new("103", ["Apple Watch S4", "Mac Book Pro", "iPad Pro"], "San Jose, CA", 2800.00),
        Order::new(
            "104",
            ["Google Home Mini", "Google Nest Hub", "iPad Mini"],
            "Mountain View, CA",
            2200.00,
        ),
    ];
    for order in updates {
        if let Err(e) = update.send(order).await {
            error!(error = %e, "UpdateOrders send failed");
            break;
        }
    }
    match update.close_and_recv().await {
        Ok(summary) => info!(%summary, inserted = summary.inserted, "UpdateOrders response"),
        Err(e) => error!(error = %e, "UpdateOrders failed"),
    }

    // Bidirectional streaming
    let (mut ids, shipments) = client.process_orders(&options);
    let consumer = tokio::spawn(async move { shipments.collect_all().await });
    for id in ["102", "103", "104", "101"] {
        if let Err(e) = ids.send(OrderId::from(id)).await {
            error!(error = %e, "ProcessOrders send failed");
            break;
        }
    }
    ids.close();
    match consumer.await {
        Ok((shipped, status)) => {
            for shipment in &shipped {
                info!(
                    id = %shipment.id,
                    status = %shipment.status,
                    orders = shipment.order_list.len(),
                    "Combined shipment"
                );
            }
            if let Err(e) = status {
                error!(error = %e, "ProcessOrders failed");
            }
        }
        Err(e) => error!(error = %e, "Shipment consumer failed"),
    }

    // Round robin across both instances
    let balanced = OrderClient::connect(
        &config.service_name,
        &resolver,
        BalancingPolicy::RoundRobin,
        &connector,
    )
    .map_err(|e| e.to_string())?;
    for _ in 0..4 {
        match balanced.get_order(OrderId::from("105"), &options).await {
            Ok(order) => info!(id = %order.id, "Round robin response"),
            Err(e) => error!(error = %e, "Round robin call failed"),
        }
    }

    drop(client);
    drop(balanced);
    drop(connector);
    for system in systems {
        system.shutdown().await.map_err(|e| e.to_string())?;
    }

    info!("Demo completed successfully");
    Ok(())
}
