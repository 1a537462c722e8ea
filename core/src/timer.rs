//! Injectable one-shot timers.
//!
//! # Design
//! A [`TimerHandle`] owns the callback of one deadline. Whoever gets to the
//! handle first wins: `fire` runs the callback, `cancel` drops it, and
//! either makes the other a no-op. A [`Timer`] only has to arrange for
//! `fire` to be called after a delay, which keeps backends tiny:
//!
//! - [`TokioTimer`] sleeps on a tokio runtime and aborts the sleep on cancel.
//! - [`ManualTimer`] is a virtual clock that tests advance by hand.
//! - Embedding hosts implement the trait over their own `setTimeout`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::AdapterError;

type Callback = Box<dyn FnOnce() + Send>;

struct Entry {
    id: u64,
    callback: Mutex<Option<Callback>>,
    disarm: Mutex<Option<Callback>>,
}

/// Handle to one scheduled deadline.
#[derive(Clone)]
pub struct TimerHandle {
    entry: Arc<Entry>,
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.entry.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl TimerHandle {
    pub fn new(callback: impl FnOnce() + Send + 'static) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            entry: Arc::new(Entry {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                callback: Mutex::new(Some(Box::new(callback))),
                disarm: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.entry.id
    }

    /// True until the deadline fires or is cancelled.
    pub fn is_pending(&self) -> bool {
        self.entry.callback.lock().is_some()
    }

    /// Run the callback if the deadline is still armed.
    pub fn fire(&self) -> bool {
        let callback = self.entry.callback.lock().take();
        let Some(callback) = callback else {
            return false;
        };
        self.entry.disarm.lock().take();
        callback();
        true
    }

    /// Disarm the deadline. Safe to call repeatedly or after firing.
    pub fn cancel(&self) -> bool {
        let callback = self.entry.callback.lock().take();
        if callback.is_none() {
            return false;
        }
        drop(callback);
        let disarm = self.entry.disarm.lock().take();
        if let Some(disarm) = disarm {
            disarm();
        }
        true
    }

    /// Register backend cleanup to run when the deadline is cancelled.
    pub fn on_cancel(&self, disarm: impl FnOnce() + Send + 'static) {
        if self.is_pending() {
            *self.entry.disarm.lock() = Some(Box::new(disarm));
        }
    }
}

/// A scheduler of one-shot deadlines.
pub trait Timer: Send + Sync + 'static {
    /// Arrange for `handle.fire()` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, handle: TimerHandle);
}

/// Timer backed by `tokio::time::sleep` on a runtime handle.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: tokio::runtime::Handle,
}

impl TokioTimer {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime of the calling context.
    pub fn current() -> Result<Self, AdapterError> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| AdapterError::Timer(e.to_string()))
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, handle: TimerHandle) {
        let firing = handle.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            firing.fire();
        });
        let abort = task.abort_handle();
        handle.on_cancel(move || abort.abort());
    }
}

struct Scheduled {
    deadline: Duration,
    seq: u64,
    handle: TimerHandle,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    queue: Vec<Scheduled>,
}

/// Virtual-time timer: deadlines fire only when [`ManualTimer::advance`]
/// moves the clock past them, in deadline order.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since construction.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Total number of deadlines ever scheduled.
    pub fn scheduled_total(&self) -> u64 {
        self.state.lock().seq
    }

    /// Deadlines still armed.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .queue
            .iter()
            .filter(|s| s.handle.is_pending())
            .count()
    }

    /// Move the clock forward, firing every deadline that falls inside the
    /// window. Callbacks run without the clock locked, so they may schedule
    /// further deadlines. Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;
        loop {
            let next = {
                let mut state = self.state.lock();
                state.queue.retain(|s| s.handle.is_pending());
                let due = state
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.deadline <= target)
                    .min_by_key(|(_, s)| (s.deadline, s.seq))
                    .map(|(idx, _)| idx);
                match due {
                    Some(idx) => {
                        let scheduled = state.queue.swap_remove(idx);
                        state.now = state.now.max(scheduled.deadline);
                        Some(scheduled.handle)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };
            match next {
                Some(handle) => {
                    if handle.fire() {
                        fired += 1;
                    }
                }
                None => return fired,
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, handle: TimerHandle) {
        let mut state = self.state.lock();
        state.seq += 1;
        let scheduled = Scheduled {
            deadline: state.now + delay,
            seq: state.seq,
            handle,
        };
        state.queue.push(scheduled);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn counting_handle(counter: &Arc<AtomicUsize>) -> TimerHandle {
        let counter = Arc::clone(counter);
        TimerHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn fire_runs_callback_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = counting_handle(&count);
        assert!(handle.fire());
        assert!(!handle.fire());
        assert!(!handle.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_is_idempotent_and_runs_disarm() {
        let count = Arc::new(AtomicUsize::new(0));
        let disarmed = Arc::new(AtomicUsize::new(0));
        let handle = counting_handle(&count);
        let d = Arc::clone(&disarmed);
        handle.on_cancel(move || {
            d.fetch_add(1, Ordering::SeqCst);
        });
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.fire());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(disarmed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_timer_fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (label, ms) in [("late", 30u64), ("early", 10), ("mid", 20)] {
            let order = Arc::clone(&order);
            timer.schedule(
                Duration::from_millis(ms),
                TimerHandle::new(move || order.lock().push(label)),
            );
        }
        assert_eq!(timer.advance(Duration::from_millis(15)), 1);
        assert_eq!(timer.pending(), 2);
        assert_eq!(timer.advance(Duration::from_millis(100)), 2);
        assert_eq!(*order.lock(), vec!["early", "mid", "late"]);
        assert_eq!(timer.now(), Duration::from_millis(115));
    }

    #[test]
    fn manual_timer_skips_cancelled_deadlines() {
        let timer = ManualTimer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = counting_handle(&count);
        timer.schedule(Duration::from_millis(5), handle.clone());
        handle.cancel();
        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.advance(Duration::from_millis(10)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(timer.scheduled_total(), 1);
    }

    #[test]
    fn manual_timer_allows_rescheduling_from_callback() {
        let timer = ManualTimer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let inner_timer = timer.clone();
        let inner_count = Arc::clone(&count);
        timer.schedule(
            Duration::from_millis(10),
            TimerHandle::new(move || {
                inner_timer.schedule(Duration::from_millis(10), counting_handle(&inner_count));
            }),
        );
        assert_eq!(timer.advance(Duration::from_millis(25)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay() {
        let timer = TokioTimer::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = counting_handle(&count);
        timer.schedule(Duration::from_millis(50), handle.clone());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!handle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_cancel_prevents_firing() {
        let timer = TokioTimer::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = counting_handle(&count);
        timer.schedule(Duration::from_millis(50), handle.clone());
        handle.cancel();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tokio_timer_requires_runtime() {
        assert!(matches!(TokioTimer::current(), Err(AdapterError::Timer(_))));
    }
}
