use crate::pool::shared::SharedPool;
use crate::pool::Pool;
use crate::{Dialer, Error};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct PoolOptions {
    pub(crate) max_idle: usize,
    pub(crate) max_active: usize,
    pub(crate) acquire_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolOptions {
    /// Create a new `PoolOptions` with some arbitrary, but sane, default values.
    ///
    /// See the source of this method for the current values.
    pub fn new() -> Self {
        Self { max_idle: 5, max_active: 5, acquire_timeout: None }
    }

    /// Set the maximum number of idle connections kept for reuse.
    ///
    /// A released connection that would push the idle queue past this is
    /// handed back to the caller instead. `0` disables reuse entirely.
    pub fn max_idle(mut self, max: usize) -> Self {
        self.max_idle = max;
        self
    }

    /// Set the ceiling on idle plus checked-out connections. Must be at least 1.
    pub fn max_active(mut self, max: usize) -> Self {
        self.max_active = max;
        self
    }

    /// Set how long [`Pool::acquire`] waits for a connection before failing
    /// with [`Error::Timeout`].
    ///
    /// Defaults to `None`, waiting indefinitely. A timeout requires a Tokio
    /// runtime with the time driver enabled.
    pub fn acquire_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.acquire_timeout = timeout.into();
        self
    }

    pub fn get_max_idle(&self) -> usize {
        self.max_idle
    }

    pub fn get_max_active(&self) -> usize {
        self.max_active
    }

    pub fn get_acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Creates a new pool from this configuration.
    ///
    /// Note that **this does not dial anything**; the first connection is
    /// established on the first call to [`Pool::acquire()`].
    ///
    /// Fails only if the configuration is invalid.
    pub fn build<D: Dialer>(self, dialer: D) -> Result<Pool<D>, Error> {
        if self.max_active == 0 {
            return Err(Error::Config("max_active must be at least 1".into()));
        }

        if self.max_idle > self.max_active {
            tracing::warn!(
                max_idle = self.max_idle,
                max_active = self.max_active,
                "max_idle exceeds max_active; idle connections are capped by max_active"
            );
        }

        Ok(Pool { shared: Arc::new(SharedPool::new(self, dialer)) })
    }
}

impl Debug for PoolOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("max_idle", &self.max_idle)
            .field("max_active", &self.max_active)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dial_fn;
    use std::io;

    fn dialer() -> impl Dialer<Connection = (), Error = io::Error> {
        dial_fn(|| async { Ok::<_, io::Error>(()) })
    }

    #[test]
    fn defaults() {
        let options = PoolOptions::default();
        assert_eq!(options.get_max_idle(), 5);
        assert_eq!(options.get_max_active(), 5);
        assert_eq!(options.get_acquire_timeout(), None);
    }

    #[test]
    fn builder_chains() {
        let options =
            PoolOptions::new().max_idle(2).max_active(3).acquire_timeout(Duration::from_secs(1));
        assert_eq!(options.get_max_idle(), 2);
        assert_eq!(options.get_max_active(), 3);
        assert_eq!(options.get_acquire_timeout(), Some(Duration::from_secs(1)));

        let options = options.acquire_timeout(None);
        assert_eq!(options.get_acquire_timeout(), None);
    }

    #[test]
    fn rejects_zero_max_active() {
        let err = PoolOptions::new().max_active(0).build(dialer()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn allows_zero_max_idle() {
        let pool = PoolOptions::new().max_idle(0).max_active(1).build(dialer()).unwrap();
        assert_eq!(pool.stats().total(), 0);
    }
}
