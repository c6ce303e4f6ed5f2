//! Cancellable one-shot timers.
//!
//! The preview scheduler never sleeps itself; it hands a task and a delay
//! to a [`Timer`] and keeps the returned [`TimerHandle`] so the wake-up can
//! be cancelled. Two implementations are provided:
//!
//! - [`TokioTimer`]: spawns a task on a tokio runtime and sleeps
//! - [`ManualTimer`]: a controllable clock that only fires on `advance()`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::AbortHandle;

/// Work run when a timer fires.
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Source of cancellable delayed wake-ups.
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`, unless the handle is cancelled first.
    ///
    /// A due task may run on the calling thread before this returns.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

#[derive(Debug, Default)]
struct TimerFlags {
    cancelled: AtomicBool,
    fired: AtomicBool,
}

impl TimerFlags {
    /// Claim the right to run the task. Fails if cancelled or already run.
    fn claim(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        !self.fired.swap(true, Ordering::SeqCst)
    }

    fn is_pending(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.fired.load(Ordering::SeqCst)
    }
}

/// Handle to one scheduled wake-up.
///
/// Cancelling is idempotent and is a no-op once the timer has fired.
#[derive(Debug)]
pub struct TimerHandle {
    flags: Arc<TimerFlags>,
    abort: Option<AbortHandle>,
}

impl TimerHandle {
    fn new() -> (Self, Arc<TimerFlags>) {
        let flags = Arc::new(TimerFlags::default());
        (
            Self {
                flags: Arc::clone(&flags),
                abort: None,
            },
            flags,
        )
    }

    /// Cancel the wake-up if it has not run yet.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::SeqCst);
        if let Some(ref abort) = self.abort {
            abort.abort();
        }
    }

    /// Whether the task is still waiting to run.
    pub fn is_pending(&self) -> bool {
        self.flags.is_pending()
    }

    /// Whether the task has run.
    pub fn has_fired(&self) -> bool {
        self.flags.fired.load(Ordering::SeqCst)
    }
}

fn guarded(flags: Arc<TimerFlags>, task: TimerTask) -> impl FnOnce() + Send + 'static {
    move || {
        if flags.claim() {
            task();
        }
    }
}

/// Timer backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Create a timer that spawns onto the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Create a timer on the runtime of the calling context.
    pub fn current() -> Result<Self, TryCurrentError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let (mut handle, flags) = TimerHandle::new();
        let run = guarded(flags, task);
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            run();
        });
        handle.abort = Some(join.abort_handle());
        handle
    }
}

struct ManualEntry {
    due: Duration,
    seq: u64,
    flags: Arc<TimerFlags>,
    task: TimerTask,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_seq: u64,
    entries: Vec<ManualEntry>,
}

/// Controllable clock for tests and deterministic drivers.
///
/// Time only moves when [`ManualTimer::advance`] is called. Due tasks run
/// in deadline order (then scheduling order) on the calling thread, with
/// the clock set to each task's deadline while it runs.
#[derive(Clone, Default)]
pub struct ManualTimer {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the timer was created.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of scheduled tasks that are neither cancelled nor run.
    pub fn pending_count(&self) -> usize {
        self.clock
            .lock()
            .entries
            .iter()
            .filter(|e| e.flags.is_pending())
            .count()
    }

    /// Move the clock forward, running every task that falls due.
    ///
    /// Tasks may schedule new timers; those also run if they fall due
    /// before the target time.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;

        loop {
            let next = {
                let mut clock = self.clock.lock();
                clock.entries.retain(|e| e.flags.is_pending());

                let idx = clock
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| (e.due, e.seq))
                    .map(|(i, _)| i);

                match idx {
                    Some(i) => {
                        let entry = clock.entries.remove(i);
                        clock.now = entry.due;
                        entry
                    }
                    None => {
                        clock.now = target;
                        break;
                    }
                }
            };

            // Lock released: the task may schedule again
            guarded(next.flags, next.task)();
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let (handle, flags) = TimerHandle::new();
        let mut clock = self.clock.lock();
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let due = clock.now + delay;
        clock.entries.push(ManualEntry {
            due,
            seq,
            flags,
            task,
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>) -> TimerTask {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_timer_fires_only_when_due() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule(Duration::from_millis(100), counter_task(&fired));

        timer.advance(Duration::from_millis(99));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(handle.is_pending());

        timer.advance(Duration::from_millis(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
        assert_eq!(timer.now(), Duration::from_millis(100));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule(Duration::from_millis(10), counter_task(&fired));

        handle.cancel();
        handle.cancel();
        timer.advance(Duration::from_secs(1));

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timer.pending_count(), 0);
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule(Duration::ZERO, counter_task(&fired));

        timer.advance(Duration::ZERO);
        handle.cancel();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
        assert!(!handle.is_pending());
    }

    #[test]
    fn tasks_run_in_deadline_order() {
        let timer = ManualTimer::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (name, ms) in [("late", 30u64), ("early", 10), ("mid", 20)] {
            let order = Arc::clone(&order);
            timer.schedule(
                Duration::from_millis(ms),
                Box::new(move || order.lock().push(name)),
            );
        }

        timer.advance(Duration::from_millis(50));
        assert_eq!(*order.lock(), vec!["early", "mid", "late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay() {
        let timer = TokioTimer::current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule(Duration::from_millis(200), counter_task(&fired));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_cancel_aborts_task() {
        let timer = TokioTimer::current().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let handle = timer.schedule(Duration::from_millis(50), counter_task(&fired));

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!handle.is_pending());
    }
}
