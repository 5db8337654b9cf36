//! # Search Commands
//!
//! Debounced medicine and customer search running on Tokio tasks.
//!
//! ## Task Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One keystroke                                        │
//! │                                                                         │
//! │  input("dolo") ──► tracker.keystroke() ──► token 7                     │
//! │                                              │                          │
//! │                                    tokio::spawn                         │
//! │                                              │                          │
//! │                                  sleep(debounce)                        │
//! │                                              │                          │
//! │                       tracker.timer_fired(7) ── stale? ──► exit        │
//! │                                              │                          │
//! │                   fetch(query) [+ timeout for medicines]                │
//! │                                              │                          │
//! │           Ok ──► tracker.response(7, …)      Err/timeout ──► failed(7)  │
//! │                  (dropped if a newer keystroke happened)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tracker lock is only taken between awaits.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rxpos_client::{BillingApi, ClientError, ClientResult};
use rxpos_core::{Customer, Product, SearchPhase, SearchPolicy, SearchTracker};

/// Runs one search request: `(query, limit)`.
pub type SearchFn<T> = Arc<dyn Fn(String, usize) -> BoxFuture<'static, ClientResult<Vec<T>>> + Send + Sync>;

/// What the search box shows right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot<T> {
    pub phase: SearchPhase,
    pub query: String,
    pub results: Vec<T>,
}

/// One search box.
///
/// Dropping the controller tears the search down; responses still on the
/// wire are discarded.
pub struct SearchController<T> {
    label: &'static str,
    tracker: Arc<Mutex<SearchTracker<T>>>,
    fetch: SearchFn<T>,
}

fn lock<T>(tracker: &Mutex<SearchTracker<T>>) -> MutexGuard<'_, SearchTracker<T>> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SearchController<Product> {
    /// Medicine search against the backend catalog.
    pub fn medicines(api: Arc<dyn BillingApi>, policy: SearchPolicy) -> Self {
        SearchController::new(
            "medicine",
            policy,
            Arc::new(move |query: String, limit: usize| {
                let api = api.clone();
                async move { api.search_medicines(&query, limit).await }.boxed()
            }),
        )
    }
}

impl SearchController<Customer> {
    /// Customer lookup by name or phone.
    pub fn customers(api: Arc<dyn BillingApi>, policy: SearchPolicy) -> Self {
        SearchController::new(
            "customer",
            policy,
            Arc::new(move |query: String, limit: usize| {
                let api = api.clone();
                async move { api.search_customers(&query, limit).await }.boxed()
            }),
        )
    }
}

impl<T: Clone + Send + 'static> SearchController<T> {
    pub fn new(label: &'static str, policy: SearchPolicy, fetch: SearchFn<T>) -> Self {
        SearchController {
            label,
            tracker: Arc::new(Mutex::new(SearchTracker::new(policy))),
            fetch,
        }
    }

    /// Takes a new value of the search box.
    ///
    /// Returns the handle of the spawned debounce task, or `None` when the
    /// query is too short to search.
    pub fn input(&self, text: &str) -> Option<JoinHandle<()>> {
        let (token, policy) = {
            let mut tracker = lock(&self.tracker);
            let token = tracker.keystroke(text)?;
            (token, *tracker.policy())
        };

        let label = self.label;
        let tracker = Arc::clone(&self.tracker);
        let fetch = Arc::clone(&self.fetch);

        Some(tokio::spawn(async move {
            tokio::time::sleep(policy.debounce).await;

            let Some(query) = lock(&tracker).timer_fired(token) else {
                return;
            };
            debug!(search = label, query = %query, token = token.value(), "Dispatching search");

            let request = fetch(query, policy.max_results);
            let outcome = match policy.request_timeout {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .unwrap_or(Err(ClientError::Timeout)),
                None => request.await,
            };

            let mut tracker = lock(&tracker);
            match outcome {
                Ok(results) => {
                    if !tracker.response(token, results) {
                        debug!(search = label, token = token.value(), "Dropped stale search response");
                    }
                }
                Err(e) => {
                    warn!(search = label, error = %e, "Search failed");
                    tracker.failed(token);
                }
            }
        }))
    }

    /// Empties the search box.
    pub fn clear(&self) {
        lock(&self.tracker).clear();
    }

    pub fn phase(&self) -> SearchPhase {
        lock(&self.tracker).phase()
    }

    /// Current results, at most the policy's limit.
    pub fn results(&self) -> Vec<T> {
        lock(&self.tracker).results().to_vec()
    }

    pub fn snapshot(&self) -> SearchSnapshot<T> {
        let tracker = lock(&self.tracker);
        SearchSnapshot {
            phase: tracker.phase(),
            query: tracker.query().to_string(),
            results: tracker.results().to_vec(),
        }
    }
}

impl<T> Drop for SearchController<T> {
    fn drop(&mut self) {
        lock(&self.tracker).teardown();
    }
}
