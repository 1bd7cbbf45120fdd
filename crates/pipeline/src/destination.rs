//! The destination worker loop: pop, format, deliver, ack-or-retry.

use crate::queue::Queue;
use crate::transport::{DeliveryOutcome, Transport};
use flowctl::backoff::{BackoffOptions, BackoffOptionsError, ExponentialBackoff};
use flowcore::FlowError;
use logging::{log_surfaced_error, SurfacedError};
use logmsg::{AckOutcome, LogMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Formats a message into the bytes handed to a [`Transport`]. Boxed
/// rather than generic since a destination's template is chosen at
/// configuration time, not known at the call site's type.
pub type Formatter = Box<dyn Fn(&LogMessage) -> Vec<u8> + Send>;

/// One destination: a queue, a transport, and the backoff schedule that
/// paces retries and reconnects on it.
pub struct Destination<T: Transport> {
    name: String,
    queue: Arc<Queue>,
    transport: T,
    backoff: ExponentialBackoff,
    max_retry_window: Duration,
    format: Formatter,
}

impl<T: Transport> Destination<T> {
    pub fn new(
        name: impl Into<String>,
        queue: Arc<Queue>,
        transport: T,
        backoff_options: BackoffOptions,
        max_retry_window: Duration,
        format: Formatter,
    ) -> Result<Self, BackoffOptionsError> {
        Ok(Self {
            name: name.into(),
            queue,
            transport,
            backoff: ExponentialBackoff::new(backoff_options)?,
            max_retry_window,
            format,
        })
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    /// Runs until `shutdown` has been requested and the queue has drained.
    /// Does not abandon in-flight work at the first sight of the shutdown
    /// flag — it finishes whatever is already queued.
    pub async fn run(&mut self, shutdown: &AtomicBool) {
        loop {
            if shutdown.load(Ordering::Acquire) && self.queue.is_empty() {
                return;
            }
            let msg = self.queue.pop_front().await;
            self.deliver(msg).await;
        }
    }

    /// Delivers one message to completion: success, an intentional drop,
    /// or exhaustion of `max_retry_window`. A `Retry`/`Disconnect` outcome
    /// loops in place rather than round-tripping the message back through
    /// `self.queue` — nothing else can be popped ahead of it in a
    /// single-consumer FIFO, so the observable order is identical to
    /// literally requeueing at the head.
    async fn deliver(&mut self, mut msg: LogMessage) {
        let mut retrying_since: Option<Instant> = None;
        loop {
            let payload = (self.format)(&msg);
            match self.transport.send(&payload).await {
                DeliveryOutcome::Success | DeliveryOutcome::Drop => {
                    self.backoff.reset();
                    msg.ack(AckOutcome::Processed);
                    return;
                }
                DeliveryOutcome::Retry(_) => {
                    if self.retry_window_exhausted(&mut retrying_since) {
                        msg.ack(AckOutcome::Suspended);
                        return;
                    }
                    tokio::time::sleep(self.backoff.next_wait()).await;
                }
                DeliveryOutcome::Disconnect => {
                    if self.retry_window_exhausted(&mut retrying_since) {
                        msg.ack(AckOutcome::Suspended);
                        return;
                    }
                    tokio::time::sleep(self.backoff.next_wait()).await;
                    if let Err(error) = self.transport.reconnect().await {
                        self.log_error(&error);
                    }
                }
            }
        }
    }

    /// Returns whether this message has been retrying longer than
    /// `max_retry_window`, starting the clock on the first retry.
    fn retry_window_exhausted(&self, retrying_since: &mut Option<Instant>) -> bool {
        let started = *retrying_since.get_or_insert_with(Instant::now);
        let elapsed = started.elapsed();
        if elapsed >= self.max_retry_window {
            let timeout = FlowError::DeliveryTimeout { elapsed };
            self.log_error(&timeout);
            true
        } else {
            false
        }
    }

    fn log_error(&self, error: &FlowError) {
        log_surfaced_error(&SurfacedError {
            source: &self.name,
            error_kind: error.error_kind(),
            detail: &error.to_string(),
            fd: None,
            bytes_processed: None,
        });
    }
}
