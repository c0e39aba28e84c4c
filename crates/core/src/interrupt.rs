//! Background I/O-completion interrupt manager.
//!
//! One state (`queue` + `outstanding` counter) guarded by a single
//! [`Mutex`]: the shared FIFO and the outstanding counter live behind one
//! lock rather than two, so a poll can never observe one updated without
//! the other. One background task is spawned per dispatched I/O, feeding
//! completions into the FIFO once their simulated duration elapses.
//!
//! The FIFO carries a PCB's `pid` rather than the `Pcb` itself: a `PcbStore`
//! assigns pids densely from zero in build order, so `pid` already doubles as
//! the `PcbStore` index the driver loop needs to resume the completed
//! process. Handing the background thread an owned `Pcb` would mean the
//! store either tolerates a hole at that index for the duration of the I/O,
//! or clones the whole PCB — the pid is all the completion event needs to
//! carry.

use crate::timer::sleep_ms;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use tracing::debug;

#[derive(Debug)]
struct Inner {
    queue: VecDeque<u32>,
    outstanding: u32,
}

/// A FIFO of completed PCB pids, fed by real timed background tasks.
///
/// The shared state lives behind `Arc`s rather than borrowed references so
/// `dispatch` can hand each spawned thread an owned, `'static` handle instead
/// of reasoning about the manager's lifetime across a detached thread.
#[derive(Debug)]
pub struct InterruptManager {
    inner: Arc<Mutex<Inner>>,
    idle: Arc<Condvar>,
}

impl Default for InterruptManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptManager {
    /// Creates an empty manager with no outstanding completions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                queue: VecDeque::new(),
                outstanding: 0,
            })),
            idle: Arc::new(Condvar::new()),
        }
    }

    /// Schedules `pid` to complete after `duration_ms`. Returns immediately;
    /// the completion is appended to the FIFO from a spawned background
    /// thread once the duration elapses. The outstanding counter is bumped
    /// before the thread is spawned and decremented only after the push, so
    /// a drained FIFO plus `outstanding()==false` is a reliable termination
    /// signal.
    pub fn dispatch(&self, pid: u32, duration_ms: u64) {
        {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.outstanding += 1;
        }
        debug!(pid, duration_ms, "dispatching interrupt completion thread");
        let inner = Arc::clone(&self.inner);
        let idle = Arc::clone(&self.idle);
        thread::spawn(move || {
            sleep_ms(duration_ms);
            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.queue.push_back(pid);
            guard.outstanding -= 1;
            idle.notify_all();
            debug!(pid, "interrupt completion delivered");
        });
    }

    /// Removes and returns the pid at the head of the completion FIFO, or
    /// `None`.
    pub fn poll(&self) -> Option<u32> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).queue.pop_front()
    }

    /// Whether the completion FIFO is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).queue.is_empty()
    }

    /// Whether any dispatched I/O has not yet completed.
    #[must_use]
    pub fn outstanding(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).outstanding > 0
    }

    /// Blocks until the FIFO is empty and no task remains outstanding.
    pub fn shutdown(&self) {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .idle
            .wait_while(guard, |inner| inner.outstanding > 0 || !inner.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn dispatch_returns_immediately_and_completes_later() {
        let mgr = InterruptManager::new();
        assert!(mgr.is_empty());
        mgr.dispatch(0, 20);
        assert!(mgr.outstanding());
        assert!(mgr.poll().is_none());
        thread::sleep(Duration::from_millis(80));
        assert!(!mgr.outstanding());
        assert!(!mgr.is_empty());
        assert_eq!(mgr.poll(), Some(0));
    }

    #[test]
    fn shutdown_waits_for_outstanding_work() {
        let mgr = Arc::new(InterruptManager::new());
        mgr.dispatch(0, 30);
        let start = std::time::Instant::now();
        mgr.shutdown();
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(!mgr.outstanding());
    }

    #[test]
    fn fifo_orders_completions_by_arrival() {
        let mgr = InterruptManager::new();
        mgr.dispatch(7, 10);
        thread::sleep(Duration::from_millis(40));
        mgr.dispatch(9, 10);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(mgr.poll(), Some(7));
        assert_eq!(mgr.poll(), Some(9));
        assert!(mgr.poll().is_none());
    }
}
