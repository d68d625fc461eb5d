//! Time sources for signing and verification.
//!
//! Every expiry in this crate is a Unix timestamp in whole seconds. The
//! [`Clock`] trait lets callers swap the system clock for a controllable one
//! so that expiry can be exercised without sleeping.

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current Unix time in seconds.
pub trait Clock: Debug + Send + Sync {
    /// Seconds elapsed since the Unix epoch.
    fn now(&self) -> u64;
}

/// The wall clock of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        // Hosts set before 1970 read as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "helpers"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "helpers"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::Clock;

    /// A clock that only moves when told to.
    ///
    /// Clones share the same underlying instant, so a test can hand one clone
    /// to a [`Signer`](crate::Signer) and advance another.
    #[derive(Debug, Clone)]
    pub struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        /// Create a clock frozen at `now` (Unix seconds).
        pub fn new(now: u64) -> Self {
            Self(Arc::new(AtomicU64::new(now)))
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            self.0.fetch_add(by.as_secs(), Ordering::SeqCst);
        }

        /// Jump to an absolute instant.
        pub fn set(&self, now: u64) {
            self.0.store(now, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn it_reads_a_plausible_system_time() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[test]
    fn it_shares_manual_time_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();

        clock.advance(Duration::from_secs(90));
        assert_eq!(other.now(), 1_090);

        other.set(5);
        assert_eq!(clock.now(), 5);
    }
}
