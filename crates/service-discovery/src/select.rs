use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::service::ServiceEndpoint;

/// Picks one endpoint out of the usable instances a lookup returned.
///
/// `candidates` is never empty and keeps the backend's order.
pub trait SelectionStrategy: Send + Sync + fmt::Debug {
    fn select<'a>(&self, candidates: &'a [ServiceEndpoint]) -> Option<&'a ServiceEndpoint>;
}

/// First usable instance in backend order. Deterministic for a given
/// backend response.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstUsable;

impl SelectionStrategy for FirstUsable {
    fn select<'a>(&self, candidates: &'a [ServiceEndpoint]) -> Option<&'a ServiceEndpoint> {
        candidates.first()
    }
}

/// Rotates through the usable instances on successive lookups.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for RoundRobin {
    fn select<'a>(&self, candidates: &'a [ServiceEndpoint]) -> Option<&'a ServiceEndpoint> {
        if candidates.is_empty() {
            return None;
        }
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        candidates.get(n % candidates.len())
    }
}
