//! Destination-side exponential backoff.
//!
//! Mirrors the pacing-state-machine idiom used for bandwidth throttling
//! elsewhere in this workspace: a small `Options` struct validated once at
//! construction, and a stateful driver that hands out the next wait and
//! advances its internal state.

use std::time::Duration;

/// Backoff configuration. All three fields must satisfy
/// `0 <= initial_seconds <= maximum_seconds` and `multiplier >= 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffOptions {
    pub initial_seconds: f64,
    pub maximum_seconds: f64,
    pub multiplier: f64,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            initial_seconds: 0.1,
            maximum_seconds: 1.0,
            multiplier: 2.0,
        }
    }
}

/// An invalid [`BackoffOptions`] combination.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BackoffOptionsError {
    #[error("backoff initial_seconds must be non-negative, got {0}")]
    NegativeInitial(f64),
    #[error("backoff maximum_seconds must be non-negative, got {0}")]
    NegativeMaximum(f64),
    #[error("backoff initial_seconds ({initial}) must not exceed maximum_seconds ({maximum})")]
    InitialExceedsMaximum { initial: f64, maximum: f64 },
    #[error("backoff multiplier must be >= 1, got {0}")]
    MultiplierBelowOne(f64),
}

impl BackoffOptions {
    /// Validates the combination: negative timings, a shrinking or
    /// non-positive multiplier, and a maximum below the initial are all
    /// rejected rather than silently clamped.
    pub fn validate(&self) -> Result<(), BackoffOptionsError> {
        if self.initial_seconds < 0.0 {
            return Err(BackoffOptionsError::NegativeInitial(self.initial_seconds));
        }
        if self.maximum_seconds < 0.0 {
            return Err(BackoffOptionsError::NegativeMaximum(self.maximum_seconds));
        }
        if self.initial_seconds > self.maximum_seconds {
            return Err(BackoffOptionsError::InitialExceedsMaximum {
                initial: self.initial_seconds,
                maximum: self.maximum_seconds,
            });
        }
        if self.multiplier < 1.0 {
            return Err(BackoffOptionsError::MultiplierBelowOne(self.multiplier));
        }
        Ok(())
    }
}

/// Stateful exponential-backoff driver for a single destination worker.
///
/// `next_wait()` always returns the *current* pending wait and advances the
/// internal state to `clamp(current * multiplier, initial, maximum)` — so
/// the very first call after a [`ExponentialBackoff::reset`] returns `0`,
/// the second returns `initial_seconds`, and so on.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    options: BackoffOptions,
    next_wait_seconds: f64,
}

impl ExponentialBackoff {
    /// Builds a driver from validated options.
    pub fn new(options: BackoffOptions) -> Result<Self, BackoffOptionsError> {
        options.validate()?;
        Ok(Self {
            options,
            next_wait_seconds: 0.0,
        })
    }

    /// Returns the pending wait without advancing the state.
    #[must_use]
    pub fn peek_next_wait(&self) -> Duration {
        Duration::from_secs_f64(self.next_wait_seconds.max(0.0))
    }

    /// Returns the pending wait and advances the internal state.
    pub fn next_wait(&mut self) -> Duration {
        let wait_seconds = self.next_wait_seconds;
        self.next_wait_seconds = (wait_seconds * self.options.multiplier)
            .clamp(self.options.initial_seconds, self.options.maximum_seconds);
        Duration::from_secs_f64(wait_seconds.max(0.0))
    }

    /// Resets the pending wait to zero, e.g. after a successful delivery.
    pub fn reset(&mut self) {
        self.next_wait_seconds = 0.0;
    }

    #[must_use]
    pub const fn options(&self) -> &BackoffOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests;
