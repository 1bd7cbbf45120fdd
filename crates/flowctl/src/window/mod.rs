//! Source-side flow-control counter.
//!
//! [`WindowCounter`] packs a message count and a suspended flag into a
//! single machine word so that every operation on the hottest path — one
//! increment per downstream acknowledgement — is a single lock-free atomic
//! RMW instead of a mutex acquisition.

use std::sync::atomic::{AtomicUsize, Ordering};

const BITS: u32 = usize::BITS;
/// All bits except the topmost one; the counter's usable range.
const COUNTER_MASK: usize = (1usize << (BITS - 1)) - 1;
/// Just the topmost bit, used as the suspended flag.
const SUSPEND_BIT: usize = !COUNTER_MASK;

/// Upper bound of a single [`WindowCounter`] value.
#[must_use]
pub const fn counter_max() -> usize {
    COUNTER_MASK
}

fn is_suspended(raw: usize) -> bool {
    raw == 0 || (raw & SUSPEND_BIT) == SUSPEND_BIT
}

/// A lock-free `{counter, suspended}` pair packed into one [`AtomicUsize`].
///
/// The suspended flag and the counter are independent: suspending does not
/// touch the counter value, and a suspended counter with a positive count
/// still reports [`WindowCounter::free_to_send`] as `false`. A counter that
/// has dropped to zero is always reported as suspended even if the
/// suspended bit itself is clear — mirroring the legacy C implementation's
/// `_is_suspended(v) = (v == 0) || (v & SUSPEND_MASK)`.
#[derive(Debug, Default)]
pub struct WindowCounter {
    raw: AtomicUsize,
}

impl WindowCounter {
    /// Creates a counter initialized to `0`, not suspended.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: AtomicUsize::new(0),
        }
    }

    /// Sets the counter to `value` and clears the suspended flag.
    ///
    /// `value` is masked to the counter's usable range; callers should pass
    /// values within [`counter_max`].
    pub fn set(&self, value: usize) {
        self.raw.store(value & COUNTER_MASK, Ordering::SeqCst);
    }

    /// Returns the current counter value and whether the counter is
    /// suspended.
    #[must_use]
    pub fn get(&self) -> (usize, bool) {
        let raw = self.raw.load(Ordering::SeqCst);
        (raw & COUNTER_MASK, is_suspended(raw))
    }

    /// Increments the counter by `value`, e.g. when a downstream
    /// acknowledges a message. Returns the value observed before the
    /// increment and whether the counter was suspended at that point.
    ///
    /// # Panics
    ///
    /// Panics (debug-checked) if the addition would overflow the counter's
    /// usable range — this mirrors the `g_assert` in the original
    /// implementation and indicates a source posted more messages than it
    /// ever subtracted from the window.
    pub fn add(&self, value: usize) -> (usize, bool) {
        let raw = self.raw.fetch_add(value, Ordering::SeqCst);
        let old = raw & COUNTER_MASK;
        debug_assert!(
            old.checked_add(value).is_some_and(|v| v <= COUNTER_MASK),
            "window counter overflow: {old} + {value} > {COUNTER_MASK}"
        );
        (old, is_suspended(raw))
    }

    /// Decrements the counter by `value` before posting a message. Returns
    /// the value observed before the decrement and whether the counter was
    /// suspended at that point.
    ///
    /// # Panics
    ///
    /// Panics (debug-checked) if `value` exceeds the counter observed
    /// before the subtraction — the counter must never go negative.
    pub fn sub(&self, value: usize) -> (usize, bool) {
        let raw = self.raw.fetch_sub(value, Ordering::SeqCst);
        let old = raw & COUNTER_MASK;
        debug_assert!(old >= value, "window counter underflow: {old} - {value}");
        (old, is_suspended(raw))
    }

    /// Sets the suspended flag without touching the counter value.
    pub fn suspend(&self) {
        self.raw.fetch_or(SUSPEND_BIT, Ordering::SeqCst);
    }

    /// Clears the suspended flag without touching the counter value.
    pub fn resume(&self) {
        self.raw.fetch_and(COUNTER_MASK, Ordering::SeqCst);
    }

    /// Forcibly suspends the counter as part of a cooperative shutdown
    /// sequence, regardless of the current count. Equivalent to
    /// [`WindowCounter::suspend`]; kept as a distinct entry point so call
    /// sites document *why* they are suspending.
    pub fn force_suspend(&self) {
        self.suspend();
    }

    /// Returns whether the current state is suspended.
    #[must_use]
    pub fn suspended(&self) -> bool {
        is_suspended(self.raw.load(Ordering::SeqCst))
    }

    /// Returns `true` if a source using this counter may post another
    /// message: the counter is positive and not suspended.
    #[must_use]
    pub fn free_to_send(&self) -> bool {
        let raw = self.raw.load(Ordering::SeqCst);
        (raw & COUNTER_MASK) > 0 && !is_suspended(raw)
    }
}
