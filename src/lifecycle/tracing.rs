//! # Logging setup
//!
//! [`setup_tracing`] installs a `tracing-subscriber` formatter filtered by
//! `RUST_LOG`. The output is compact and omits module paths; calls are told
//! apart by the `method` and `call_id` fields the interceptors attach.
//!
//! ```bash
//! # Call flow only
//! RUST_LOG=info cargo run
//!
//! # Plus payloads and every streamed message
//! RUST_LOG=debug cargo run
//!
//! # Only the consolidation engine
//! RUST_LOG=order_service::service::consolidation=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` a consolidation call looks like:
//!
//! ```text
//! INFO Call started method="ProcessOrders" kind=BidiStreaming call_id=4
//! INFO Shipping id="cmb-Mountain View, CA" orders=2
//! INFO Shipping id="cmb-San Jose, CA" orders=1
//! INFO Call finished method="ProcessOrders" call_id=4
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
