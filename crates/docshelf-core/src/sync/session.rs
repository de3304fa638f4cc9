//! Search session tokens
//!
//! Every remote search takes a token when it is issued. A result is
//! authoritative only while its token is still the latest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Token identifying one issued search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic source of session tokens
#[derive(Debug, Default)]
pub struct SessionCounter {
    latest: AtomicU64,
}

impl SessionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new token, superseding all earlier ones
    pub fn issue(&self) -> SessionToken {
        SessionToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Check whether `token` is still the latest issued
    pub fn is_current(&self, token: SessionToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Most recently issued token value, 0 before the first issue
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}
