use crate::pool::shared::SharedPool;
use crate::Dialer;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Stable identity of a pooled connection.
///
/// Issued once when the connection is dialed and kept for as long as the pool
/// tracks it, across any number of idle round-trips. Identities are unique
/// across every pool in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ConnId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for ConnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connection sitting in the idle queue.
pub(crate) struct Idle<C> {
    pub(crate) id: ConnId,
    pub(crate) conn: C,
}

/// A connection checked out of a [`Pool`](crate::Pool).
///
/// Hand it back with [`Pool::release`](crate::Pool::release) when it can be
/// reused, or mark it broken with [`Pool::discard`](crate::Pool::discard).
/// Dropping a handle the pool still tracks counts as a discard: the slot is
/// freed and the connection itself is dropped along with the handle.
pub struct Pooled<D: Dialer> {
    id: ConnId,
    // `None` only once the connection has been moved back into the pool
    conn: Option<D::Connection>,
    pool: Weak<SharedPool<D>>,
}

impl<D: Dialer> Pooled<D> {
    pub(crate) fn new(idle: Idle<D::Connection>, pool: &Arc<SharedPool<D>>) -> Self {
        Self { id: idle.id, conn: Some(idle.conn), pool: Arc::downgrade(pool) }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Detaches the connection from the pool and returns it.
    ///
    /// If the pool still counts this connection as active it stops doing so,
    /// exactly as [`Pool::discard`](crate::Pool::discard) would.
    pub fn into_inner(mut self) -> D::Connection {
        self.untrack();
        self.conn.take().expect("Pooled: connection already returned to the pool")
    }

    pub(crate) fn belongs_to(&self, pool: &SharedPool<D>) -> bool {
        std::ptr::eq(self.pool.as_ptr(), pool)
    }

    /// Moves the connection out so it can re-enter the idle queue.
    pub(crate) fn take_idle(&mut self) -> Option<Idle<D::Connection>> {
        self.conn.take().map(|conn| Idle { id: self.id, conn })
    }

    fn untrack(&self) -> bool {
        match self.pool.upgrade() {
            Some(pool) => pool.untrack(self.id),
            None => false,
        }
    }
}

impl<D: Dialer> Deref for Pooled<D> {
    type Target = D::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("Pooled: connection already returned to the pool")
    }
}

impl<D: Dialer> DerefMut for Pooled<D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("Pooled: connection already returned to the pool")
    }
}

impl<D: Dialer> Drop for Pooled<D> {
    fn drop(&mut self) {
        if self.conn.is_some() && self.untrack() {
            tracing::debug!(conn_id = %self.id, "connection dropped while checked out; discarded");
        }
    }
}

impl<D: Dialer> Debug for Pooled<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Why [`Pool::release`](crate::Pool::release) refused a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The pool does not track this handle as active: it was already
    /// released or discarded, or it came from another pool.
    NotActive,

    /// The idle queue was at `max_idle`. The pool no longer tracks the
    /// connection and the caller is responsible for closing it.
    IdleFull,
}

/// Outcome of [`Pool::release`](crate::Pool::release).
///
/// [`is_idle`](Release::is_idle) is the boolean view: `true` when the pool
/// took the connection back for reuse.
///
/// A rejected connection is never closed by the pool. The one connection the
/// pool drops on its own is a released connection it handed to a waiting
/// caller who gave up before taking it, when the idle queue has meanwhile
/// filled up and nobody else can receive it.
#[must_use = "a rejected connection is handed back and must be closed by the caller"]
pub enum Release<D: Dialer> {
    /// The connection is idle in the pool again, or was handed straight to a
    /// waiting caller.
    Idle,

    Rejected(Pooled<D>, RejectReason),
}

impl<D: Dialer> Release<D> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Release::Idle)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Release::Idle => None,
            Release::Rejected(_, reason) => Some(*reason),
        }
    }

    /// Returns the handed-back connection, if the release was rejected.
    pub fn into_rejected(self) -> Option<Pooled<D>> {
        match self {
            Release::Idle => None,
            Release::Rejected(conn, _) => Some(conn),
        }
    }
}

impl<D: Dialer> Debug for Release<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Release::Idle => f.write_str("Idle"),
            Release::Rejected(conn, reason) => {
                f.debug_tuple("Rejected").field(&conn.id).field(reason).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnId;

    #[test]
    fn conn_ids_are_unique_and_increasing() {
        let a = ConnId::next();
        let b = ConnId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn conn_id_display() {
        let id = ConnId(42);
        assert_eq!(id.to_string(), "#42");
        assert_eq!(id.get(), 42);
    }
}
