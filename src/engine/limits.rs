//! Connection limits
//!
//! Counts open control connections, in total and per source address. A slot is
//! held for the lifetime of a session and released when dropped.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitExceeded {
    Total,
    PerSource,
}

impl fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitExceeded::Total => write!(f, "Too many connections. Service temporarily unavailable."),
            LimitExceeded::PerSource => write!(f, "Too many connections from the same IP address."),
        }
    }
}

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    per_source: HashMap<IpAddr, usize>,
}

/// Tracks open connections; zero disables a limit
#[derive(Debug, Clone)]
pub struct ConnectionLimiter {
    counts: Arc<Mutex<Counts>>,
    max_total: usize,
    max_per_source: usize,
}

impl ConnectionLimiter {
    pub fn new(max_total: usize, max_per_source: usize) -> Self {
        Self {
            counts: Arc::new(Mutex::new(Counts::default())),
            max_total,
            max_per_source,
        }
    }

    fn counts(&self) -> MutexGuard<'_, Counts> {
        // The counters stay consistent even if a holder panicked.
        self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserves a slot for a connection from `source`.
    pub fn try_acquire(&self, source: IpAddr) -> Result<ConnectionSlot, LimitExceeded> {
        let mut counts = self.counts();

        if self.max_total > 0 && counts.total >= self.max_total {
            return Err(LimitExceeded::Total);
        }
        let from_source = counts.per_source.get(&source).copied().unwrap_or(0);
        if self.max_per_source > 0 && from_source >= self.max_per_source {
            return Err(LimitExceeded::PerSource);
        }

        counts.total += 1;
        *counts.per_source.entry(source).or_insert(0) += 1;

        Ok(ConnectionSlot {
            limiter: self.clone(),
            source,
        })
    }

    pub fn active(&self) -> usize {
        self.counts().total
    }

    pub fn active_from(&self, source: IpAddr) -> usize {
        self.counts().per_source.get(&source).copied().unwrap_or(0)
    }

    fn release(&self, source: IpAddr) {
        let mut counts = self.counts();
        counts.total = counts.total.saturating_sub(1);
        if let Some(n) = counts.per_source.get_mut(&source) {
            *n -= 1;
            if *n == 0 {
                counts.per_source.remove(&source);
            }
        }
    }
}

/// An admitted connection
#[derive(Debug)]
pub struct ConnectionSlot {
    limiter: ConnectionLimiter,
    source: IpAddr,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.limiter.release(self.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_per_source_limit() {
        let limiter = ConnectionLimiter::new(10, 2);
        let _a = limiter.try_acquire(ip(1)).unwrap();
        let _b = limiter.try_acquire(ip(1)).unwrap();
        assert_eq!(limiter.try_acquire(ip(1)).unwrap_err(), LimitExceeded::PerSource);
        assert!(limiter.try_acquire(ip(2)).is_ok());
    }

    #[test]
    fn test_total_limit() {
        let limiter = ConnectionLimiter::new(2, 5);
        let _a = limiter.try_acquire(ip(1)).unwrap();
        let _b = limiter.try_acquire(ip(2)).unwrap();
        assert_eq!(limiter.try_acquire(ip(3)).unwrap_err(), LimitExceeded::Total);
    }

    #[test]
    fn test_slot_released_on_drop() {
        let limiter = ConnectionLimiter::new(1, 1);
        let slot = limiter.try_acquire(ip(1)).unwrap();
        assert_eq!(limiter.active(), 1);
        assert_eq!(limiter.active_from(ip(1)), 1);
        drop(slot);
        assert_eq!(limiter.active(), 0);
        assert_eq!(limiter.active_from(ip(1)), 0);
        assert!(limiter.try_acquire(ip(1)).is_ok());
    }

    #[test]
    fn test_zero_means_unlimited() {
        let limiter = ConnectionLimiter::new(0, 0);
        let slots: Vec<_> = (0..100).map(|_| limiter.try_acquire(ip(1)).unwrap()).collect();
        assert_eq!(limiter.active(), slots.len());
    }
}
