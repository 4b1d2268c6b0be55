//! Pure data structures exchanged by the order-management calls.

pub mod order;
pub mod shipment;

pub use order::*;
pub use shipment::*;
