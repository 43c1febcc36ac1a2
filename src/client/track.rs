//! Stale-response protection for in-flight generation requests.
//!
//! Each request gets an explicit generation number; when a response lands,
//! the caller compares its token against the tracker's current one and drops
//! the response on mismatch. The comparison decides staleness, not a shared
//! mutable counter at the call site.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug, Default)]
pub struct RequestTracker {
    current: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request generation, superseding any in-flight one.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `token` still identifies the latest request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}
