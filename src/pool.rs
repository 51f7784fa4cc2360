use crate::pool::shared::SharedPool;
use crate::{Dialer, Error, Result};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

mod connection;
mod options;
mod shared;
mod stats;
mod wait_list;

pub use connection::{ConnId, Pooled, RejectReason, Release};
pub use options::PoolOptions;
pub use stats::PoolStats;

/// A bounded pool of connections produced by a [`Dialer`].
///
/// Cloning a `Pool` is cheap and yields another handle to the same pool.
pub struct Pool<D: Dialer> {
    shared: Arc<SharedPool<D>>,
}

impl<D: Dialer> Pool<D> {
    /// Creates a pool with default [`PoolOptions`].
    pub fn new(dialer: D) -> Self {
        Self { shared: Arc::new(SharedPool::new(PoolOptions::new(), dialer)) }
    }

    /// Checks out a connection.
    ///
    /// Reuses an idle connection if there is one. Otherwise dials a new one
    /// while the pool is below `max_active`, or waits for another caller to
    /// release a connection. Waiters are served in arrival order.
    ///
    /// Fails with [`Error::Dial`] if the dialer fails, leaving the pool
    /// unchanged, and with [`Error::Timeout`] if an
    /// [`acquire_timeout`](PoolOptions::acquire_timeout) is configured and
    /// elapses. Dropping the returned future early is safe.
    pub async fn acquire(&self) -> Result<Pooled<D>> {
        match self.shared.options.acquire_timeout {
            Some(timeout) => self.acquire_timeout(timeout).await,
            None => self.shared.acquire(true).await,
        }
    }

    /// Like [`acquire`](Self::acquire), with a deadline that overrides the
    /// configured one.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<Pooled<D>> {
        tokio::time::timeout(timeout, self.shared.acquire(true))
            .await
            .map_err(|_| Error::Timeout(timeout))?
    }

    /// Checks out a connection without waiting for one to be released.
    ///
    /// May still dial. Fails with [`Error::Exhausted`] if the pool is at
    /// `max_active` with nothing idle.
    pub async fn try_acquire(&self) -> Result<Pooled<D>> {
        self.shared.acquire(false).await
    }

    /// Returns a connection to the pool for reuse.
    ///
    /// The active registration is dropped first. The connection then goes to
    /// the oldest waiter or into the idle queue if the queue is below
    /// `max_idle`, and the result [`is_idle`](Release::is_idle).
    ///
    /// Otherwise the connection is handed back in [`Release::Rejected`]:
    /// with [`RejectReason::IdleFull`] the pool has stopped tracking it and
    /// **the caller now owns closing it**; with [`RejectReason::NotActive`]
    /// the handle was not checked out of this pool.
    pub fn release(&self, conn: Pooled<D>) -> Release<D> {
        self.shared.release(conn)
    }

    /// Stops tracking a checked-out connection that must not be reused.
    ///
    /// Returns `false` if the pool was not tracking it. The connection is left
    /// with the caller, who is responsible for closing it.
    pub fn discard(&self, conn: &Pooled<D>) -> bool {
        self.shared.discard(conn)
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats()
    }

    pub fn options(&self) -> &PoolOptions {
        &self.shared.options
    }
}

impl<D: Dialer> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<D: Dialer> Debug for Pool<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("options", &self.shared.options)
            .field("stats", &self.stats())
            .finish()
    }
}
