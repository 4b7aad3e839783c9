//! Frame-budget timing and keyed debouncing.
//!
//! Timestamps are `Duration`s since an arbitrary clock origin so hosts
//! without `std::time::Instant` (wasm) can supply their own [`Clock`].

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cell::Cell;
use core::time::Duration;
use std::time::Instant;

/// Per-pass budget; one 60Hz frame.
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(16);
/// Default quiet period for coalescing bursts.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(200);

/// Monotonic time source.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// `Instant`-backed clock.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-advanced clock for tests and replay.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Outcome of one guarded call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Guarded<R> {
    pub value: R,
    pub elapsed: Duration,
    pub over_budget: bool,
}

/// Times a unit of work against a budget and warns on overrun.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameGuard {
    label: &'static str,
    budget: Duration,
}

impl FrameGuard {
    pub fn new(label: &'static str, budget: Duration) -> Self {
        Self { label, budget }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Check an externally measured duration. Logs and returns `true` on overrun.
    pub fn observe(&self, elapsed: Duration) -> bool {
        if elapsed <= self.budget {
            return false;
        }
        log::warn!(
            "[keratovision] {} took {:.2}ms (budget {}ms)",
            self.label,
            elapsed.as_secs_f64() * 1000.0,
            self.budget.as_millis()
        );
        true
    }

    /// Run `f`, measuring it with `clock`.
    pub fn run<C, R, F>(&self, clock: &C, f: F) -> Guarded<R>
    where
        C: Clock + ?Sized,
        F: FnOnce() -> R,
    {
        let started = clock.now();
        let value = f();
        let elapsed = clock.now().saturating_sub(started);
        let over_budget = self.observe(elapsed);
        Guarded {
            value,
            elapsed,
            over_budget,
        }
    }
}

/// Keyed trailing-edge debouncer.
///
/// A call for a key cancels that key's pending value and restarts its
/// timer; only the last value of a burst is released by [`poll`](Self::poll).
#[derive(Clone, Debug)]
pub struct Debouncer<K: Ord, T> {
    delay: Duration,
    pending: BTreeMap<K, (Duration, T)>,
}

impl<K: Ord + Clone, T> Debouncer<K, T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: BTreeMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value` under `key`, replacing anything pending for it.
    pub fn call(&mut self, key: K, value: T, now: Duration) {
        let due = now.saturating_add(self.delay);
        self.pending.insert(key, (due, value));
    }

    /// Drop the pending value for `key`.
    pub fn cancel(&mut self, key: &K) -> Option<T> {
        self.pending.remove(key).map(|(_, value)| value)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.values().map(|(due, _)| *due).min()
    }

    /// Take every entry whose quiet period has elapsed.
    pub fn poll(&mut self, now: Duration) -> Vec<(K, T)> {
        let ready: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (due, _))| *due <= now)
            .map(|(key, _)| key.clone())
            .collect();
        let mut out = Vec::with_capacity(ready.len());
        for key in ready {
            if let Some((_, value)) = self.pending.remove(&key) {
                out.push((key, value));
            }
        }
        out
    }
}

/// Single-key debounced callback.
pub struct Debounced<T, F: FnMut(T)> {
    inner: Debouncer<(), T>,
    sink: F,
}

impl<T, F: FnMut(T)> Debounced<T, F> {
    pub fn new(delay: Duration, sink: F) -> Self {
        Self {
            inner: Debouncer::new(delay),
            sink,
        }
    }

    pub fn call(&mut self, value: T, now: Duration) {
        self.inner.call((), value, now);
    }

    /// Fire the sink if the quiet period elapsed. Returns whether it fired.
    pub fn poll(&mut self, now: Duration) -> bool {
        let mut fired = false;
        for ((), value) in self.inner.poll(now) {
            (self.sink)(value);
            fired = true;
        }
        fired
    }

    pub fn is_pending(&self) -> bool {
        self.inner.is_pending(&())
    }
}
