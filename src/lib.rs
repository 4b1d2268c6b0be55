//! # Order Service
//!
//! > **An order management RPC service on Tokio actors.**
//!
//! The service exposes five calls over one in-memory order store:
//!
//! | Call            | Shape            | What it does                                        |
//! |-----------------|------------------|-----------------------------------------------------|
//! | `AddOrder`      | unary            | stores an order, assigning an id when none is given |
//! | `GetOrder`      | unary            | fetches an order by id                              |
//! | `SearchOrders`  | server streaming | streams orders with an item matching a query        |
//! | `UpdateOrders`  | client streaming | upserts a stream of orders, then reports their ids  |
//! | `ProcessOrders` | bidirectional    | consolidates order ids into shipments per destination |
//!
//! ## Architecture Notes
//!
//! ### 1. One actor owns the store
//! The `id -> Order` map lives inside [`OrderStoreActor`](store::OrderStoreActor), a single
//! Tokio task. Handlers talk to it through the cloneable [`OrderStore`](store::OrderStore)
//! handle, so every read and write is linearized through its mailbox with no locks.
//!
//! ### 2. Streams are traits
//! Handlers read from a [`MessageSource`](stream::MessageSource) and write to a
//! [`MessageSink`](stream::MessageSink). The crate ships a bounded channel transport
//! ([`stream::channel`]); `send` waits for the consumer, which is the only backpressure.
//!
//! ### 3. Interceptors wrap every call
//! An [`InterceptorChain`](interceptor::InterceptorChain) runs `pre` hooks in order before the
//! handler and `post` hooks in reverse after it, whatever the outcome. On streaming calls it
//! also sees every message sent and received, without altering them.
//!
//! ### 4. Typed errors
//! Every call ends with a [`ServiceError`](error::ServiceError) carrying a [`Code`](error::Code).
//! Deadlines and cancellation come from [`CallOptions`](context::CallOptions) and abort the
//! call wherever it is suspended.
//!
//! ## Module Tour
//!
//! - [`model`] - orders, shipments, update summaries
//! - [`store`] - the store actor, its handle and [`MockStore`](store::mock::MockStore) for tests
//! - [`stream`] - stream traits and the channel transport
//! - [`context`] / [`interceptor`] - per-call context and the interceptor chain
//! - [`service`] - the five handlers and the consolidation engine
//! - [`clients`] - resolver, balancing and [`OrderClient`](clients::OrderClient)
//! - [`lifecycle`] / [`config`] - startup, seeding, shutdown, logging and configuration
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

pub mod clients;
pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
pub mod stream;
