//! # Mock Store
//!
//! Utilities for testing handlers without spawning the real store actor.
//!
//! [`MockStore`] hands out a real [`OrderStore`] handle whose mailbox is served
//! by a background task replaying queued expectations in order. Handlers under
//! test cannot tell the difference, which makes failure paths (a store that
//! errors mid-stream, a missing id) easy to script.

use super::message::{StoreRequest, UpsertOutcome};
use super::{OrderStore, StoreError};
use crate::model::{Order, OrderId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// An expected request and the reply to give it.
enum Expectation {
    Add {
        response: Result<OrderId, StoreError>,
    },
    Get {
        id: OrderId,
        response: Result<Order, StoreError>,
    },
    Upsert {
        response: Result<UpsertOutcome, StoreError>,
    },
    Search {
        response: Result<Vec<Order>, StoreError>,
    },
}

type Expectations = Arc<Mutex<VecDeque<Expectation>>>;

fn lock(expectations: &Expectations) -> MutexGuard<'_, VecDeque<Expectation>> {
    expectations.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A store handle with expectation tracking.
///
/// # Example
/// ```ignore
/// let mut mock = MockStore::new();
/// mock.expect_get("102".into()).return_ok(order);
/// mock.expect_get("404".into()).return_err(StoreError::NotFound("404".into()));
///
/// let store = mock.store();
/// // drive a handler with `store`...
/// mock.verify();
/// ```
pub struct MockStore {
    store: OrderStore,
    expectations: Expectations,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockStore {
    /// Creates a mock with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<StoreRequest>(100);
        let expectations: Expectations = Arc::new(Mutex::new(VecDeque::new()));
        let queued = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&queued).pop_front();

                match (request, expectation) {
                    (StoreRequest::Add { respond_to, .. }, Some(Expectation::Add { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        StoreRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "unexpected id in Get");
                        let _ = respond_to.send(response);
                    }
                    (
                        StoreRequest::Upsert { respond_to, .. },
                        Some(Expectation::Upsert { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        StoreRequest::Search { respond_to, .. },
                        Some(Expectation::Search { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        panic!("Unexpected request or expectation mismatch: {:?}", request);
                    }
                }
            }
        });

        Self {
            store: OrderStore::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the handle for use in tests.
    pub fn store(&self) -> OrderStore {
        self.store.clone()
    }

    pub fn expect_add(&mut self) -> ReplyBuilder<OrderId> {
        ReplyBuilder::new(self.expectations.clone(), |response| Expectation::Add { response })
    }

    pub fn expect_get(&mut self, id: OrderId) -> ReplyBuilder<Order> {
        ReplyBuilder::new(self.expectations.clone(), move |response| {
            Expectation::Get { id, response }
        })
    }

    pub fn expect_upsert(&mut self) -> ReplyBuilder<UpsertOutcome> {
        ReplyBuilder::new(self.expectations.clone(), |response| Expectation::Upsert { response })
    }

    pub fn expect_search(&mut self) -> ReplyBuilder<Vec<Order>> {
        ReplyBuilder::new(self.expectations.clone(), |response| Expectation::Search { response })
    }

    /// Number of expectations not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.expectations).len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self.remaining();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder finishing one expectation with its reply.
pub struct ReplyBuilder<T> {
    expectations: Expectations,
    make: Box<dyn FnOnce(Result<T, StoreError>) -> Expectation + Send>,
}

impl<T> ReplyBuilder<T> {
    fn new(
        expectations: Expectations,
        make: impl FnOnce(Result<T, StoreError>) -> Expectation + Send + 'static,
    ) -> Self {
        Self {
            expectations,
            make: Box::new(make),
        }
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: T) {
        lock(&self.expectations).push_back((self.make)(Ok(value)));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: StoreError) {
        lock(&self.expectations).push_back((self.make)(Err(error)));
    }
}
