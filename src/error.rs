use std::time::Duration;

/// A type-erased error, used to carry whatever the dialer failed with.
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by [`Pool`](crate::Pool) and
/// [`PoolOptions`](crate::PoolOptions).
///
/// Releasing or discarding a connection the pool does not track is not an
/// error; those calls report it through their return value instead.
///
/// Nor is the pool dropping a connection: when a waiting caller gives up
/// after being handed a released connection and the idle queue is full, the
/// pool drops that connection silently, since nobody is left to return it to.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The dialer could not produce a connection. The pool is left exactly
    /// as it was before the call.
    #[error("failed to dial a new connection")]
    Dial(#[source] BoxDynError),

    /// No connection became available before the acquire deadline.
    #[error("timed out after {0:?} waiting for a connection")]
    Timeout(Duration),

    /// `try_acquire` found no idle connection and no room to dial one.
    #[error("pool is exhausted")]
    Exhausted,

    #[error("invalid pool configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn dial<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Dial(Box::new(err))
    }

    /// Returns `true` if this error came from the dialer.
    pub fn is_dial(&self) -> bool {
        matches!(self, Error::Dial(_))
    }
}
