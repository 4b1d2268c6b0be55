use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Identifier of an [`Order`]. Orders are keyed by this value in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty id asks the store to assign one on `Add`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A customer order.
///
/// Identity is the `id`; two orders with the same id are the same record in
/// the store, and `Upsert` replaces the whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<String>,
    pub destination: String,
    pub price: f64,
}

impl Order {
    /// Creates a new Order instance.
    ///
    /// # Arguments
    /// * `id` - Unique identifier; pass `""` to let the store assign one
    /// * `items` - Item names, in the order they were listed
    /// * `destination` - Shipping destination, used to consolidate shipments
    /// * `price` - Total order price
    pub fn new<I, S>(
        id: impl Into<OrderId>,
        items: I,
        destination: impl Into<String>,
        price: f64,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            items: items.into_iter().map(Into::into).collect(),
            destination: destination.into(),
            price,
        }
    }

    /// True when any item contains `query` as a case-sensitive substring.
    pub fn matches(&self, query: &str) -> bool {
        self.items.iter().any(|item| item.contains(query))
    }
}

/// Completion message of a bulk update: every processed id in arrival order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub ids: Vec<OrderId>,
    /// How many of `ids` were not in the store before the update.
    pub inserted: usize,
}

impl Display for UpdateSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Orders processed Updated Order IDs: ")?;
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_case_sensitive_substring() {
        let order = Order::new(
            "102",
            ["Google Pixel 3A", "Mac Book Pro"],
            "Mountain View, CA",
            1800.0,
        );
        assert!(order.matches("Google"));
        assert!(order.matches("Book"));
        assert!(!order.matches("google"));
        assert!(!order.matches("iPhone"));
    }

    #[test]
    fn test_summary_display() {
        let summary = UpdateSummary {
            ids: vec!["102".into(), "103".into()],
            inserted: 0,
        };
        assert_eq!(summary.to_string(), "Orders processed Updated Order IDs: 102, 103");
    }
}
