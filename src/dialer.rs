use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;

/// Produces new connections for a [`Pool`](crate::Pool).
///
/// The pool calls [`dial`](Dialer::dial) only when it has no idle connection
/// to hand out and is below its `max_active` ceiling. Dials may run
/// concurrently with each other and with every other pool operation, so
/// implementations must not keep their own cache of connections.
pub trait Dialer: Send + Sync + 'static {
    type Connection: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn dial(&self) -> BoxFuture<'_, Result<Self::Connection, Self::Error>>;
}

/// A [`Dialer`] built from a closure. See [`dial_fn`].
pub struct DialFn<F> {
    f: F,
}

/// Wraps `f` as a [`Dialer`]; each dial calls `f` and awaits the future it
/// returns.
pub fn dial_fn<F, Fut, C, E>(f: F) -> DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
    C: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    DialFn { f }
}

impl<F, Fut, C, E> Dialer for DialFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C, E>> + Send + 'static,
    C: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Connection = C;
    type Error = E;

    fn dial(&self) -> BoxFuture<'_, Result<C, E>> {
        (self.f)().boxed()
    }
}

impl<F> Debug for DialFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialFn").finish_non_exhaustive()
    }
}
