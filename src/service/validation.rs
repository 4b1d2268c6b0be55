//! Request validation producing per-field violations.

use crate::error::{FieldViolation, ServiceError};
use crate::model::{Order, OrderId};

fn order_violations(order: &Order) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    if order.id.as_str().parse::<i64>().is_ok_and(|n| n < 0) {
        violations.push(FieldViolation::new(
            "id",
            format!("Order ID received is not valid {}", order.id),
        ));
    }
    if !order.price.is_finite() || order.price < 0.0 {
        violations.push(FieldViolation::new("price", "Price must be a non-negative amount"));
    }
    violations
}

fn reject(what: &str, violations: Vec<FieldViolation>) -> Result<(), ServiceError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::invalid_argument(format!("Invalid {}", what), violations))
    }
}

/// Checks an order submitted to `AddOrder`. An empty id is allowed: the store assigns one.
pub fn validate_new_order(order: &Order) -> Result<(), ServiceError> {
    reject("order", order_violations(order))
}

/// Checks an order submitted to `UpdateOrders`, which needs an explicit id.
pub fn validate_upsert(order: &Order) -> Result<(), ServiceError> {
    let mut violations = order_violations(order);
    if order.id.is_empty() {
        violations.push(FieldViolation::new("id", "Order ID is required"));
    }
    reject("order", violations)
}

pub fn validate_order_id(id: &OrderId) -> Result<(), ServiceError> {
    if id.is_empty() {
        return reject("order id", vec![FieldViolation::new("id", "Order ID is required")]);
    }
    Ok(())
}
