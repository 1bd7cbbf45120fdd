//! Ack-record aggregation.
//!
//! A message read off a source fans out through filters and a multiplexer
//! into possibly several destinations. Each clone shares one [`AckRecord`];
//! the source only finds out the message is fully handled, and how, once
//! every clone has been acknowledged exactly once.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How a single path through the pipeline finished with a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckOutcome {
    Processed,
    Suspended,
    Aborted,
}

impl AckOutcome {
    const fn priority(self) -> u8 {
        match self {
            Self::Processed => 0,
            Self::Suspended => 1,
            Self::Aborted => 2,
        }
    }

    fn from_priority(priority: u8) -> Self {
        match priority {
            0 => Self::Processed,
            1 => Self::Suspended,
            _ => Self::Aborted,
        }
    }
}

/// Per-path delivery options carried alongside a clone's ack reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathOptions {
    /// Whether this path's completion is required before the aggregated
    /// callback may fire. A path created with `ack_needed = false` (e.g. a
    /// fire-and-forget filter branch) still holds a reference but never
    /// blocks completion waiting on an ack it will never send — it drops
    /// its reference immediately.
    pub ack_needed: bool,
}

type Callback = Box<dyn FnOnce(AckOutcome) + Send>;

struct Inner {
    pending: AtomicUsize,
    aggregated: AtomicU8,
    on_complete: Mutex<Option<Callback>>,
}

/// Reference-counted completion tracker shared by every clone of one
/// message.
///
/// Each clone born from the same read holds one [`AckRecord`] handle.
/// [`AckRecord::ack`] records that clone's outcome and decrements the
/// pending count; when the count reaches zero the registered callback
/// fires exactly once with the worst outcome seen across all clones,
/// ranked `Aborted > Suspended > Processed`. Cloning an [`AckRecord`] (via
/// [`AckRecord::fork`]) bumps the pending count so a filter that splits one
/// message into several downstream paths keeps the source from being
/// credited early.
#[derive(Clone)]
pub struct AckRecord {
    inner: Arc<Inner>,
}

impl AckRecord {
    /// Creates a fresh record with one pending path and registers the
    /// callback to run when every path has acked.
    pub fn new(on_complete: impl FnOnce(AckOutcome) + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: AtomicUsize::new(1),
                aggregated: AtomicU8::new(AckOutcome::Processed.priority()),
                on_complete: Mutex::new(Some(Box::new(on_complete))),
            }),
        }
    }

    /// Registers one more pending path sharing this record, e.g. because a
    /// multiplexer is fanning the owning message out to several
    /// destinations.
    #[must_use]
    pub fn fork(&self) -> Self {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        self.clone()
    }

    /// Records this path's outcome. Fires the completion callback exactly
    /// once, when the last outstanding path acks.
    pub fn ack(self, outcome: AckOutcome) {
        self.inner
            .aggregated
            .fetch_max(outcome.priority(), Ordering::AcqRel);

        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            let aggregated = AckOutcome::from_priority(self.inner.aggregated.load(Ordering::Acquire));
            if let Some(callback) = self.inner.on_complete.lock().unwrap().take() {
                callback(aggregated);
            }
        }
    }

    /// Number of paths that have not yet acked. Exposed for diagnostics and
    /// tests; not meant to drive control flow since it can change
    /// concurrently.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize as StdAtomicUsize, Ordering as StdOrdering};

    #[test]
    fn normal_ack_fires_once() {
        let fired = Arc::new(StdAtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        let fired_clone = Arc::clone(&fired);
        let seen_clone = Arc::clone(&seen);
        let record = AckRecord::new(move |outcome| {
            fired_clone.fetch_add(1, StdOrdering::SeqCst);
            *seen_clone.lock().unwrap() = Some(outcome);
        });
        record.ack(AckOutcome::Processed);
        assert_eq!(fired.load(StdOrdering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), Some(AckOutcome::Processed));
    }

    #[test]
    fn clone_ack_waits_for_all_forks() {
        let fired = Arc::new(StdAtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let record = AckRecord::new(move |_| {
            fired_clone.fetch_add(1, StdOrdering::SeqCst);
        });
        let forked = record.fork();
        assert_eq!(record.pending_count(), 2);

        record.ack(AckOutcome::Processed);
        assert_eq!(fired.load(StdOrdering::SeqCst), 0);

        forked.ack(AckOutcome::Processed);
        assert_eq!(fired.load(StdOrdering::SeqCst), 1);
    }

    #[test]
    fn nested_clone_chain_aggregates_worst_outcome() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let record = AckRecord::new(move |outcome| {
            *seen_clone.lock().unwrap() = Some(outcome);
        });
        let first_fork = record.fork();
        let second_fork = first_fork.fork();

        record.ack(AckOutcome::Processed);
        first_fork.ack(AckOutcome::Suspended);
        second_fork.ack(AckOutcome::Aborted);

        assert_eq!(*seen.lock().unwrap(), Some(AckOutcome::Aborted));
    }

    #[test]
    fn suspended_outranks_processed_but_not_aborted() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let record = AckRecord::new(move |outcome| {
            *seen_clone.lock().unwrap() = Some(outcome);
        });
        let forked = record.fork();
        record.ack(AckOutcome::Suspended);
        forked.ack(AckOutcome::Processed);
        assert_eq!(*seen.lock().unwrap(), Some(AckOutcome::Suspended));
    }
}
