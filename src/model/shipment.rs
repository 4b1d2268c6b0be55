use crate::model::Order;
use serde::{Deserialize, Serialize};

/// Status attached to every shipment produced by consolidation.
pub const SHIPMENT_PROCESSED: &str = "Processed";

/// Orders bound for one destination, grouped within a single batch window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedShipment {
    pub id: String,
    pub status: String,
    pub order_list: Vec<Order>,
}

impl CombinedShipment {
    /// Shipment ids are a pure function of the destination.
    pub fn id_for(destination: &str) -> String {
        format!("cmb-{}", destination)
    }

    /// Opens a shipment for `order.destination` holding just `order`.
    pub fn start(order: Order) -> Self {
        Self {
            id: Self::id_for(&order.destination),
            status: SHIPMENT_PROCESSED.to_string(),
            order_list: vec![order],
        }
    }
}
