//! Bounded retry with doubling delay for transient store failures.

use crate::error::Result;
use crate::{Datapoint, SeriesMetadata, TimeSeriesStore};
use log::{info, warn};
use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

/// How often and how patiently a [`RetryingStore`] retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Decorator retrying [`StoreError::Transient`](crate::StoreError::Transient)
/// failures of the wrapped store. Other errors propagate immediately.
pub struct RetryingStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: TimeSeriesStore> RetryingStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        RetryingStore { inner, policy }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn with_retry<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        F: Fn(&S) -> Result<T>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delay = self.policy.initial_delay;
        let mut attempt = 1;
        loop {
            match f(&self.inner) {
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Attempt {}/{}: {} failed: {}",
                        attempt, max_attempts, operation, e
                    );
                    info!("Sleeping for {} milliseconds before retry", delay.as_millis());
                    sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl<S: TimeSeriesStore> TimeSeriesStore for RetryingStore<S> {
    fn retrieve_range(
        &self,
        ids: &[String],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BTreeMap<String, Vec<Datapoint>>> {
        self.with_retry("retrieve_range", |store| {
            store.retrieve_range(ids, start_ms, end_ms)
        })
    }

    fn retrieve_latest(&self, ids: &[String], before_ms: i64) -> Result<BTreeMap<String, Datapoint>> {
        self.with_retry("retrieve_latest", |store| store.retrieve_latest(ids, before_ms))
    }

    fn retrieve_metadata(&self, ids: &[String]) -> Result<BTreeMap<String, SeriesMetadata>> {
        self.with_retry("retrieve_metadata", |store| store.retrieve_metadata(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use std::cell::Cell;

    /// Fails with a timeout the first `failures` calls, then succeeds.
    struct FlakyStore {
        failures: u32,
        calls: Cell<u32>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            FlakyStore {
                failures,
                calls: Cell::new(0),
            }
        }

        fn call(&self) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() <= self.failures {
                Err(StoreError::Transient("read timed out".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl TimeSeriesStore for FlakyStore {
        fn retrieve_range(
            &self,
            _ids: &[String],
            _start_ms: i64,
            _end_ms: i64,
        ) -> Result<BTreeMap<String, Vec<Datapoint>>> {
            self.call().map(|_| BTreeMap::new())
        }

        fn retrieve_latest(&self, _ids: &[String], _before_ms: i64) -> Result<BTreeMap<String, Datapoint>> {
            self.call().map(|_| BTreeMap::new())
        }

        fn retrieve_metadata(&self, _ids: &[String]) -> Result<BTreeMap<String, SeriesMetadata>> {
            Err(StoreError::InvalidRecord("metadata unavailable".to_string()))
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(0),
        }
    }

    #[test]
    fn test_recovers_from_transient_failures() {
        let store = RetryingStore::new(FlakyStore::new(2), policy(3));
        assert!(store.retrieve_range(&[], 0, 1).is_ok());
        assert_eq!(store.inner().calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let store = RetryingStore::new(FlakyStore::new(5), policy(3));
        let err = store.retrieve_latest(&[], 0).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.inner().calls.get(), 3);
    }

    #[test]
    fn test_does_not_retry_permanent_errors() {
        let store = RetryingStore::new(FlakyStore::new(0), policy(3));
        assert!(store.retrieve_metadata(&[]).is_err());
        assert_eq!(store.inner().calls.get(), 0);
    }
}
