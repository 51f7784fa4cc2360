use crate::pool::connection::{ConnId, Idle, Pooled, RejectReason, Release};
use crate::pool::options::PoolOptions;
use crate::pool::stats::PoolStats;
use crate::pool::wait_list::{WaitList, Waiter, Wakeup};
use crate::{Dialer, Error, Result};
use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use std::cmp;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Custody bookkeeping. Every check-and-mutate of these fields, and every push
/// or pop of the idle queue, happens under the one lock that guards them.
struct State<C> {
    active: HashSet<ConnId>,
    // slots reserved by acquirers that are dialing right now
    pending: usize,
    waiters: WaitList<C>,
}

pub(crate) struct SharedPool<D: Dialer> {
    pub(crate) options: PoolOptions,
    dialer: D,
    // `None` when `max_idle` is zero
    idle: Option<ArrayQueue<Idle<D::Connection>>>,
    state: Mutex<State<D::Connection>>,
}

enum Next<C> {
    Ready(Idle<C>),
    Wait(tokio::sync::oneshot::Receiver<Wakeup<C>>),
    Dial,
    Exhausted,
}

impl<D: Dialer> SharedPool<D> {
    pub(crate) fn new(options: PoolOptions, dialer: D) -> Self {
        let capacity = cmp::min(options.max_idle, options.max_active);
        let idle = (capacity > 0).then(|| ArrayQueue::new(capacity));

        Self {
            options,
            dialer,
            idle,
            state: Mutex::new(State {
                active: HashSet::new(),
                pending: 0,
                waiters: WaitList::new(),
            }),
        }
    }

    fn idle_len(&self) -> usize {
        self.idle.as_ref().map_or(0, ArrayQueue::len)
    }

    fn has_idle_room(&self) -> bool {
        self.idle.as_ref().map_or(false, |idle| !idle.is_full())
    }

    fn at_capacity(&self, state: &State<D::Connection>) -> bool {
        self.idle_len() + state.active.len() + state.pending >= self.options.max_active
    }

    /// Takes a connection from the idle queue, dials a new one, or parks
    /// until one is released. With `wait == false` a full pool fails with
    /// [`Error::Exhausted`] instead of parking.
    pub(crate) async fn acquire(self: &Arc<Self>, wait: bool) -> Result<Pooled<D>> {
        loop {
            let next = {
                let mut state = self.state.lock();

                if let Some(idle) = self.idle.as_ref().and_then(ArrayQueue::pop) {
                    state.active.insert(idle.id);
                    Next::Ready(idle)
                } else if !self.at_capacity(&state) {
                    state.pending += 1;
                    Next::Dial
                } else if wait {
                    trace!(
                        active = state.active.len(),
                        "pool at capacity; waiting for a connection"
                    );
                    Next::Wait(state.waiters.push())
                } else {
                    Next::Exhausted
                }
            };

            let wakeup = match next {
                Next::Ready(idle) => return Ok(self.checkout(idle)),
                Next::Dial => return self.dial().await,
                Next::Exhausted => return Err(Error::Exhausted),
                Next::Wait(rx) => Waiter::new(rx, self).await,
            };

            match wakeup {
                Some(Wakeup::Ready(idle)) => return Ok(self.checkout(idle)),
                Some(Wakeup::Dial) => match self.claim_idle_for_slot() {
                    Some(idle) => return Ok(self.checkout(idle)),
                    None => return self.dial().await,
                },
                // woken by nobody; decide again
                None => continue,
            }
        }
    }

    /// A waiter woken to dial may find that a connection went idle in the
    /// meantime. Takes it instead and gives the reserved slot back.
    fn claim_idle_for_slot(&self) -> Option<Idle<D::Connection>> {
        let mut state = self.state.lock();
        let idle = self.idle.as_ref().and_then(ArrayQueue::pop)?;

        state.pending -= 1;
        state.active.insert(idle.id);
        Some(idle)
    }

    fn checkout(self: &Arc<Self>, idle: Idle<D::Connection>) -> Pooled<D> {
        debug!(conn_id = %idle.id, "reusing idle connection");
        Pooled::new(idle, self)
    }

    /// Dials into a slot already reserved in `pending`.
    async fn dial(self: &Arc<Self>) -> Result<Pooled<D>> {
        let slot = DialSlot { pool: self, committed: false };

        match self.dialer.dial().await {
            Ok(conn) => Ok(slot.commit(conn)),
            Err(err) => {
                warn!(error = %err, "failed to dial a new connection");
                Err(Error::dial(err))
            }
        }
    }

    pub(crate) fn release(self: &Arc<Self>, mut conn: Pooled<D>) -> Release<D> {
        if !conn.belongs_to(self) {
            return Release::Rejected(conn, RejectReason::NotActive);
        }

        let mut state = self.state.lock();

        // drop the active registration before deciding where the connection goes
        if !state.active.remove(&conn.id()) {
            return Release::Rejected(conn, RejectReason::NotActive);
        }

        if !self.has_idle_room() {
            self.offer_slot(&mut state);
            drop(state);

            warn!(conn_id = %conn.id(), "idle queue full; connection handed back to the caller");
            return Release::Rejected(conn, RejectReason::IdleFull);
        }

        match conn.take_idle() {
            Some(idle) => {
                self.recycle(&mut state, idle);
                Release::Idle
            }
            None => Release::Rejected(conn, RejectReason::NotActive),
        }
    }

    pub(crate) fn discard(&self, conn: &Pooled<D>) -> bool {
        if !conn.belongs_to(self) {
            return false;
        }

        let discarded = self.untrack(conn.id());
        if discarded {
            debug!(conn_id = %conn.id(), "connection discarded");
        }
        discarded
    }

    /// Stops tracking an active connection without recycling it.
    pub(crate) fn untrack(&self, id: ConnId) -> bool {
        let mut state = self.state.lock();

        if !state.active.remove(&id) {
            return false;
        }

        self.offer_slot(&mut state);
        true
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let mut state = self.state.lock();
        PoolStats::new(self.idle_len(), state.active.len(), state.waiters.len())
    }

    /// Drops wait-list entries of callers that stopped waiting.
    pub(crate) fn prune_waiters(&self) {
        self.state.lock().waiters.prune();
    }

    /// Passes on a wakeup whose waiter went away before consuming it.
    ///
    /// A handed-off connection goes back to the idle queue. If that queue
    /// filled up in the meantime nobody is left to take the connection, so
    /// it is dropped here; this is the one place the pool closes a
    /// connection itself.
    pub(crate) fn forward(&self, wakeup: Wakeup<D::Connection>) {
        let mut state = self.state.lock();

        match wakeup {
            Wakeup::Ready(idle) => {
                state.active.remove(&idle.id);

                if self.has_idle_room() {
                    self.recycle(&mut state, idle);
                } else {
                    self.offer_slot(&mut state);
                    drop(state);
                    debug!(
                        conn_id = %idle.id,
                        "no room for abandoned handoff; dropping connection"
                    );
                }
            }
            Wakeup::Dial => {
                state.pending -= 1;
                self.offer_slot(&mut state);
            }
        }
    }

    /// Hands an inactive connection to the oldest waiter, or queues it as
    /// idle. The caller must have checked that the idle queue has room.
    fn recycle(&self, state: &mut State<D::Connection>, idle: Idle<D::Connection>) {
        let id = idle.id;
        state.active.insert(id);

        let idle = match state.waiters.hand_off(idle) {
            Ok(()) => {
                debug!(conn_id = %id, "handed released connection to a waiter");
                return;
            }
            Err(idle) => idle,
        };

        state.active.remove(&id);

        let pushed = match &self.idle {
            Some(queue) => queue.push(idle),
            None => Err(idle),
        };

        match pushed {
            Ok(()) => {
                debug!(conn_id = %id, idle = self.idle_len(), "connection returned to idle queue")
            }
            Err(_) => {
                self.offer_slot(state);
                warn!(conn_id = %id, "idle queue unexpectedly full; dropping connection");
            }
        }
    }

    /// A slot under `max_active` just opened up: reserve it for the oldest
    /// waiter, who will dial into it.
    fn offer_slot(&self, state: &mut State<D::Connection>) {
        if state.waiters.wake_one(Wakeup::Dial).is_ok() {
            state.pending += 1;
            trace!("reserved a freed slot for a waiter");
        }
    }
}

/// A slot reserved in `pending`. Given back unless the dial succeeds.
struct DialSlot<'a, D: Dialer> {
    pool: &'a Arc<SharedPool<D>>,
    committed: bool,
}

impl<D: Dialer> DialSlot<'_, D> {
    fn commit(mut self, conn: D::Connection) -> Pooled<D> {
        let id = ConnId::next();
        {
            let mut state = self.pool.state.lock();
            state.pending -= 1;
            state.active.insert(id);
        }
        self.committed = true;

        debug!(conn_id = %id, "dialed new connection");
        Pooled::new(Idle { id, conn }, self.pool)
    }
}

impl<D: Dialer> Drop for DialSlot<'_, D> {
    fn drop(&mut self) {
        if !self.committed {
            let mut state = self.pool.state.lock();
            state.pending -= 1;
            self.pool.offer_slot(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{dial_fn, PoolOptions};
    use std::io;
    use std::time::Duration;

    #[tokio::test]
    async fn abandoned_waiters_leave_no_entries_behind() {
        let pool = PoolOptions::new()
            .max_idle(1)
            .max_active(1)
            .build(dial_fn(|| async { Ok::<_, io::Error>(()) }))
            .unwrap();

        let _held = pool.acquire().await.unwrap();
        for _ in 0..1000 {
            let res = pool.acquire_timeout(Duration::from_micros(1)).await;
            assert!(res.is_err());
        }

        assert_eq!(pool.shared.state.lock().waiters.queued(), 0);
    }
}
