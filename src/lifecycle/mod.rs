//! Runtime orchestration and lifecycle management.
//!
//! - [`OrderSystem`] - starts the store actor and the service, seeds data, shuts down
//! - [`setup_tracing`] - initializes the logging subscriber

pub mod order_system;
pub mod tracing;

pub use order_system::*;
pub use self::tracing::*;
