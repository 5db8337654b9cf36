//! # Search State Machine
//!
//! Debounced search-as-you-type without the races.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │          keystroke (too short)                                          │
//! │      ┌──────────────────────────┐                                       │
//! │      ▼                          │                                       │
//! │   ┌──────┐  keystroke   ┌─────────┐  timer_fired  ┌──────────┐        │
//! │   │ Idle │ ───────────► │ Pending │ ────────────► │ InFlight │        │
//! │   └──────┘              └─────────┘               └────┬─────┘        │
//! │                           ▲     │ keystroke            │              │
//! │                           └─────┘ (new token)          │              │
//! │                                           response ────┤── failed     │
//! │                                               ▼        ▼              │
//! │                                         ┌──────────┐ ┌─────────┐      │
//! │                                         │ Resolved │ │ Aborted │      │
//! │                                         └──────────┘ └─────────┘      │
//! │                                                                         │
//! │  teardown: any phase ──► Aborted, token bumped                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tokens
//! Every keystroke mints a new [`RequestToken`]. Timers and responses carry
//! the token they were started with; anything carrying an older token is
//! ignored. A slow response for "par" can therefore never overwrite results
//! for "paracetamol".
//!
//! The tracker owns no clock and does no I/O. The caller runs the debounce
//! timer and the request and reports back.
//!
//! ```rust
//! use rxpos_core::search::{SearchPhase, SearchPolicy, SearchTracker};
//!
//! let mut search: SearchTracker<&str> = SearchTracker::new(SearchPolicy::customer());
//! let first = search.keystroke("me").unwrap();
//! let second = search.keystroke("mee").unwrap();
//!
//! assert_eq!(search.timer_fired(first), None);
//! assert_eq!(search.timer_fired(second).as_deref(), Some("mee"));
//!
//! assert!(!search.response(first, vec!["stale"]));
//! assert!(search.response(second, vec!["Meera Nair"]));
//! assert_eq!(search.phase(), SearchPhase::Resolved);
//! assert_eq!(search.results(), ["Meera Nair"]);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

use crate::validation::normalize_search_query;
use crate::CUSTOMER_SEARCH_LIMIT;

// =============================================================================
// Policy
// =============================================================================

/// Tunables for one search box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Queries shorter than this (after trimming) do not search.
    pub min_chars: usize,
    /// Quiet period after the last keystroke before the request goes out.
    pub debounce: Duration,
    /// Results kept from a response.
    pub max_results: usize,
    /// Abandon the request after this long.
    pub request_timeout: Option<Duration>,
}

impl SearchPolicy {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Customer picker: 2 characters, 300 ms, top 5.
    pub fn customer() -> Self {
        SearchPolicy {
            min_chars: 2,
            debounce: Self::DEFAULT_DEBOUNCE,
            max_results: CUSTOMER_SEARCH_LIMIT,
            request_timeout: None,
        }
    }

    /// Medicine lookup: same debounce, 10 s request timeout.
    pub fn medicine() -> Self {
        SearchPolicy {
            min_chars: 2,
            debounce: Self::DEFAULT_DEBOUNCE,
            max_results: 20,
            request_timeout: Some(Self::DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

// =============================================================================
// Phase / Token
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    /// Nothing to search for.
    #[default]
    Idle,
    /// Debounce timer running.
    Pending,
    /// Request dispatched, waiting for the response.
    InFlight,
    /// Results for the current query are in.
    Resolved,
    /// Request failed, timed out, or the search box was torn down.
    Aborted,
}

impl SearchPhase {
    /// Shows a spinner.
    pub fn is_busy(&self) -> bool {
        matches!(self, SearchPhase::Pending | SearchPhase::InFlight)
    }
}

/// Identifies one keystroke's worth of search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// State of one search box.
#[derive(Debug, Clone)]
pub struct SearchTracker<T> {
    policy: SearchPolicy,
    phase: SearchPhase,
    current: u64,
    query: String,
    results: Vec<T>,
}

impl<T> SearchTracker<T> {
    pub fn new(policy: SearchPolicy) -> Self {
        SearchTracker {
            policy,
            phase: SearchPhase::Idle,
            current: 0,
            query: String::new(),
            results: Vec::new(),
        }
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// The query as last typed (trimmed).
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    /// Checks whether `token` belongs to the latest keystroke.
    #[inline]
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.current
    }

    /// Takes a new value of the search box.
    ///
    /// Returns the token to start the debounce timer with, or `None` when the
    /// query is too short (the tracker goes idle and drops its results).
    /// Earlier timers and requests are invalidated either way.
    pub fn keystroke(&mut self, text: &str) -> Option<RequestToken> {
        self.current += 1;
        self.query = normalize_search_query(text);

        if self.query.chars().count() < self.policy.min_chars {
            self.phase = SearchPhase::Idle;
            self.results.clear();
            return None;
        }

        self.phase = SearchPhase::Pending;
        Some(RequestToken(self.current))
    }

    /// The debounce timer for `token` ran out.
    ///
    /// Returns the query to dispatch if `token` is still current and pending.
    pub fn timer_fired(&mut self, token: RequestToken) -> Option<String> {
        if !self.is_current(token) || self.phase != SearchPhase::Pending {
            return None;
        }
        self.phase = SearchPhase::InFlight;
        Some(self.query.clone())
    }

    /// Applies the response to `token`'s request.
    ///
    /// Returns `false` (and changes nothing) for stale or unexpected
    /// responses.
    pub fn response(&mut self, token: RequestToken, mut results: Vec<T>) -> bool {
        if !self.is_current(token) || self.phase != SearchPhase::InFlight {
            return false;
        }
        results.truncate(self.policy.max_results);
        self.results = results;
        self.phase = SearchPhase::Resolved;
        true
    }

    /// `token`'s request failed or timed out. Previous results are kept.
    pub fn failed(&mut self, token: RequestToken) -> bool {
        if !self.is_current(token) || !self.phase.is_busy() {
            return false;
        }
        self.phase = SearchPhase::Aborted;
        true
    }

    /// The search box went away. Everything in flight is orphaned.
    pub fn teardown(&mut self) {
        self.current += 1;
        self.phase = SearchPhase::Aborted;
    }

    /// Empties the box as if the cashier cleared it.
    pub fn clear(&mut self) {
        self.current += 1;
        self.query.clear();
        self.results.clear();
        self.phase = SearchPhase::Idle;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SearchTracker<String> {
        SearchTracker::new(SearchPolicy::customer())
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Customer {}", i)).collect()
    }

    #[test]
    fn test_short_query_goes_idle() {
        let mut search = tracker();
        assert_eq!(search.keystroke("m"), None);
        assert_eq!(search.phase(), SearchPhase::Idle);
        assert_eq!(search.keystroke("  m  "), None);
    }

    #[test]
    fn test_happy_path() {
        let mut search = tracker();
        let token = search.keystroke("ra").unwrap();
        assert_eq!(search.phase(), SearchPhase::Pending);
        assert_eq!(search.timer_fired(token).as_deref(), Some("ra"));
        assert_eq!(search.phase(), SearchPhase::InFlight);
        assert!(search.response(token, names(2)));
        assert_eq!(search.phase(), SearchPhase::Resolved);
        assert_eq!(search.results().len(), 2);
    }

    #[test]
    fn test_results_are_truncated() {
        let mut search = tracker();
        let token = search.keystroke("ra").unwrap();
        search.timer_fired(token);
        search.response(token, names(12));
        assert_eq!(search.results().len(), 5);
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut search = tracker();
        let old = search.keystroke("ra").unwrap();
        search.timer_fired(old);

        let new = search.keystroke("raj").unwrap();
        search.timer_fired(new);
        assert!(search.response(new, vec!["Rajesh".to_string()]));

        assert!(!search.response(old, names(3)));
        assert_eq!(search.results(), ["Rajesh".to_string()]);
    }

    #[test]
    fn test_superseded_timer_does_nothing() {
        let mut search = tracker();
        let old = search.keystroke("ra").unwrap();
        let new = search.keystroke("raj").unwrap();
        assert_eq!(search.timer_fired(old), None);
        assert_eq!(search.phase(), SearchPhase::Pending);
        assert!(search.timer_fired(new).is_some());
    }

    #[test]
    fn test_shortening_the_query_clears_results() {
        let mut search = tracker();
        let token = search.keystroke("ra").unwrap();
        search.timer_fired(token);
        search.response(token, names(2));

        assert_eq!(search.keystroke("r"), None);
        assert!(search.results().is_empty());
        assert!(!search.response(token, names(2)));
    }

    #[test]
    fn test_failure_keeps_previous_results() {
        let mut search = tracker();
        let first = search.keystroke("ra").unwrap();
        search.timer_fired(first);
        search.response(first, names(2));

        let second = search.keystroke("rav").unwrap();
        search.timer_fired(second);
        assert!(search.failed(second));
        assert_eq!(search.phase(), SearchPhase::Aborted);
        assert_eq!(search.results().len(), 2);
        assert!(!search.response(second, names(1)));
    }

    #[test]
    fn test_teardown_orphans_in_flight_request() {
        let mut search = tracker();
        let token = search.keystroke("ra").unwrap();
        search.timer_fired(token);
        search.teardown();

        assert_eq!(search.phase(), SearchPhase::Aborted);
        assert!(!search.response(token, names(1)));
        assert!(!search.failed(token));
    }

    #[test]
    fn test_clear() {
        let mut search = tracker();
        let token = search.keystroke("ra").unwrap();
        search.clear();
        assert_eq!(search.query(), "");
        assert_eq!(search.phase(), SearchPhase::Idle);
        assert_eq!(search.timer_fired(token), None);
    }

    #[test]
    fn test_overlong_query_is_cut() {
        let mut search = tracker();
        search.keystroke(&format!("  {}", "x".repeat(250)));
        assert_eq!(search.query(), "x".repeat(crate::MAX_SEARCH_QUERY_LEN));
    }

    #[test]
    fn test_policies() {
        assert_eq!(SearchPolicy::customer().max_results, 5);
        assert_eq!(SearchPolicy::customer().debounce, Duration::from_millis(300));
        assert_eq!(
            SearchPolicy::medicine().request_timeout,
            Some(Duration::from_secs(10))
        );
    }
}
