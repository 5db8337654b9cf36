//! # Billing Session State
//!
//! The one bill the counter is working on.
//!
//! ## Thread Safety
//! The draft is wrapped in `Mutex<T>` because keystroke commands and a
//! running checkout can touch it at the same time. Locks are held only for
//! the synchronous part of a command, never across an `.await`.
//!
//! ## Submission Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Submission                                  │
//! │                                                                         │
//! │  checkout ──► try_begin_submit() ──► Some(guard) ──► POST /invoices    │
//! │                      │                                    │             │
//! │                      │ flag already set                   ▼             │
//! │                      ▼                              guard dropped       │
//! │               None: "checkout already               flag cleared        │
//! │                      in progress"                                       │
//! │                                                                         │
//! │  The flag is cleared on every exit path, including errors and panics.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use rxpos_core::{CheckoutDraft, TaxRate};
use tracing::warn;
use uuid::Uuid;

/// Shared billing session.
#[derive(Debug)]
pub struct SessionState {
    id: Uuid,
    draft: Mutex<CheckoutDraft>,
    submitting: AtomicBool,
}

impl SessionState {
    /// Creates a session with an empty bill.
    pub fn new(default_tax_rate: TaxRate) -> Self {
        SessionState {
            id: Uuid::new_v4(),
            draft: Mutex::new(CheckoutDraft::with_default_tax_rate(default_tax_rate)),
            submitting: AtomicBool::new(false),
        }
    }

    /// Session id, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, CheckoutDraft> {
        // A panic mid-command leaves the draft as it was at the panic; keep
        // billing rather than wedging the counter.
        self.draft.lock().unwrap_or_else(|poisoned| {
            warn!(session = %self.id, "Draft mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Executes a function with read access to the draft.
    ///
    /// ## Usage
    /// ```rust
    /// use rxpos_core::TaxRate;
    /// use rxpos_counter::state::SessionState;
    ///
    /// let session = SessionState::new(TaxRate::standard());
    /// assert!(session.with_draft(|draft| draft.cart().is_empty()));
    /// ```
    pub fn with_draft<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CheckoutDraft) -> R,
    {
        let draft = self.lock();
        f(&draft)
    }

    /// Executes a function with write access to the draft.
    pub fn with_draft_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CheckoutDraft) -> R,
    {
        let mut draft = self.lock();
        f(&mut draft)
    }

    /// Claims the submission slot.
    ///
    /// Returns `None` while another checkout holds it.
    pub fn try_begin_submit(&self) -> Option<SubmitGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitGuard {
                flag: &self.submitting,
            })
    }

    /// Checks whether a checkout is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }
}

/// Holds the submission slot until dropped.
#[derive(Debug)]
pub struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
