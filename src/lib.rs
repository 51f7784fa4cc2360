//! A generic pool of reusable connections.
//!
//! [`Pool`] bounds the number of live connections to an external resource,
//! keeps up to `max_idle` of them around for reuse and hands them out to
//! callers with [`Pool::acquire`]. New connections are produced by an injected
//! [`Dialer`] only when no idle connection is available and the pool is below
//! its `max_active` ceiling; otherwise callers queue up and are served in the
//! order they arrived.
//!
//! Every successful acquire should be paired with exactly one of
//! [`Pool::release`] (the connection can be reused) or [`Pool::discard`] (the
//! connection is broken). The pool tracks custody only. It never closes a
//! connection itself: a release that is rejected hands the connection back to
//! the caller, who then owns closing it.
//!
//! ```ignore
//! use connpool::{dial_fn, PoolOptions};
//!
//! let pool = PoolOptions::new()
//!     .max_idle(2)
//!     .max_active(8)
//!     .build(dial_fn(|| async { TcpStream::connect("127.0.0.1:6379").await }))?;
//!
//! let conn = pool.acquire().await?;
//! // ... use the connection ...
//! if let Some(rejected) = pool.release(conn).into_rejected() {
//!     rejected.into_inner().shutdown().await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

mod dialer;
mod error;
mod pool;

pub use dialer::{dial_fn, DialFn, Dialer};
pub use error::{BoxDynError, Error, Result};
pub use pool::{ConnId, Pool, PoolOptions, PoolStats, Pooled, RejectReason, Release};
