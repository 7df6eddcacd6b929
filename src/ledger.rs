//! History ledger: every verification attempt of the session, newest first.
//!
//! Append-only. Nothing is removed or edited, and nothing outlives the
//! session.

use std::collections::VecDeque;

use crate::model::ScanAttempt;

#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    attempts: VecDeque<ScanAttempt>,
}

impl HistoryLedger {
    /// Record an attempt ahead of everything recorded before it.
    pub fn record(&mut self, attempt: ScanAttempt) {
        self.attempts.push_front(attempt);
    }

    /// All attempts, most recent first.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &ScanAttempt> {
        self.attempts.iter()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }
}
