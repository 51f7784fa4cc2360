use crate::pool::connection::Idle;
use crate::pool::shared::SharedPool;
use crate::Dialer;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// What a parked acquirer is woken up with.
pub(crate) enum Wakeup<C> {
    /// A released connection, already registered as active for the waiter.
    Ready(Idle<C>),

    /// A slot under `max_active` was reserved for the waiter, who must dial.
    Dial,
}

/// Callers parked on an empty idle queue, oldest first.
pub(crate) struct WaitList<C> {
    queue: VecDeque<oneshot::Sender<Wakeup<C>>>,
}

impl<C> WaitList<C> {
    pub(crate) fn new() -> Self {
        Self { queue: VecDeque::new() }
    }

    pub(crate) fn push(&mut self) -> oneshot::Receiver<Wakeup<C>> {
        let (tx, rx) = oneshot::channel();
        self.prune();
        self.queue.push_back(tx);
        rx
    }

    /// Delivers `wakeup` to the oldest waiter that is still listening.
    ///
    /// Hands `wakeup` back if there is nobody to deliver it to.
    pub(crate) fn wake_one(&mut self, mut wakeup: Wakeup<C>) -> Result<(), Wakeup<C>> {
        while let Some(tx) = self.queue.pop_front() {
            match tx.send(wakeup) {
                Ok(()) => return Ok(()),
                Err(returned) => wakeup = returned,
            }
        }

        Err(wakeup)
    }

    /// Gives a released connection straight to the oldest waiter.
    pub(crate) fn hand_off(&mut self, idle: Idle<C>) -> Result<(), Idle<C>> {
        match self.wake_one(Wakeup::Ready(idle)) {
            Ok(()) => Ok(()),
            Err(Wakeup::Ready(idle)) => Err(idle),
            Err(Wakeup::Dial) => unreachable!("wake_one returns the wakeup it was given"),
        }
    }

    /// Removes entries whose waiter has gone away.
    pub(crate) fn prune(&mut self) {
        self.queue.retain(|tx| !tx.is_closed());
    }

    /// Number of live waiters. Abandoned entries are pruned as a side effect.
    pub(crate) fn len(&mut self) -> usize {
        self.prune();
        self.queue.len()
    }

    /// Entries currently queued, abandoned or not.
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// A parked acquire.
///
/// If it is dropped after a wakeup was already sent to it, the wakeup is
/// passed on so the connection or the reserved slot is not lost. A passed-on
/// connection that no longer fits in the idle queue is dropped by the pool.
/// Otherwise dropping it removes its wait-list entry.
pub(crate) struct Waiter<'a, D: Dialer> {
    rx: oneshot::Receiver<Wakeup<D::Connection>>,
    pool: &'a Arc<SharedPool<D>>,
}

impl<'a, D: Dialer> Waiter<'a, D> {
    pub(crate) fn new(
        rx: oneshot::Receiver<Wakeup<D::Connection>>,
        pool: &'a Arc<SharedPool<D>>,
    ) -> Self {
        Self { rx, pool }
    }
}

impl<D: Dialer> Future for Waiter<'_, D> {
    // `None` if the sender went away without waking us
    type Output = Option<Wakeup<D::Connection>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

impl<D: Dialer> Drop for Waiter<'_, D> {
    fn drop(&mut self) {
        self.rx.close();

        match self.rx.try_recv() {
            Ok(wakeup) => self.pool.forward(wakeup),
            Err(_) => self.pool.prune_waiters(),
        }
    }
}
