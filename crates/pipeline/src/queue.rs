//! The bounded FIFO queue a [`crate::destination::Destination`] worker
//! pops from.

use crate::pipe::{Pipe, PipeEvent, PipeResult};
use flowcore::{FlowError, RuntimeContext};
use logmsg::ack::PathOptions;
use logmsg::LogMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// An in-memory bounded FIFO. `push_front` is a separate entry point from
/// `try_push_back` because a retried delivery must go back to the head
/// without being subject to the capacity check a fresh admission pays.
pub struct Queue {
    capacity: usize,
    items: Mutex<VecDeque<LogMessage>>,
    not_empty: Notify,
}

impl Queue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::new()),
            not_empty: Notify::new(),
        }
    }

    /// Admits a freshly arrived message. Returns [`FlowError::QueueFull`]
    /// rather than blocking — the caller's source-side flow control is what
    /// reacts to backpressure, not the queue itself.
    pub fn try_push_back(&self, msg: LogMessage) -> Result<(), FlowError> {
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            return Err(FlowError::QueueFull);
        }
        items.push_back(msg);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Returns a message to the head of the queue ahead of anything
    /// already waiting. Used by a destination worker on `Retry`.
    pub fn push_front(&self, msg: LogMessage) {
        let mut items = self.items.lock().unwrap();
        items.push_front(msg);
        drop(items);
        self.not_empty.notify_one();
    }

    /// Pops the head, waiting cooperatively until one is available.
    pub async fn pop_front(&self) -> LogMessage {
        loop {
            let notified = self.not_empty.notified();
            if let Some(msg) = self.items.lock().unwrap().pop_front() {
                return msg;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The `Pipe` end of a [`Queue`]: the graph's terminal node for one
/// destination, handing each message to `try_push_back` so the
/// [`crate::destination::Destination`] worker draining the same `Arc<Queue>`
/// picks it up. Exists so a [`crate::graph::Pipeline`]/[`crate::multiplex::Multiplexer`]
/// can address a destination's queue as just another pipe in the DAG.
pub struct QueuePipe {
    name: String,
    queue: Arc<Queue>,
}

impl QueuePipe {
    #[must_use]
    pub fn new(name: impl Into<String>, queue: Arc<Queue>) -> Self {
        Self { name: name.into(), queue }
    }
}

impl Pipe for QueuePipe {
    fn init(&mut self, _ctx: &RuntimeContext) -> PipeResult<()> {
        Ok(())
    }

    fn deinit(&mut self) -> PipeResult<()> {
        Ok(())
    }

    fn queue(&mut self, msg: LogMessage, _path_options: PathOptions) -> PipeResult<()> {
        self.queue.try_push_back(msg)
    }

    fn notify(&mut self, _event: PipeEvent) {}

    fn clone_pipe(&self) -> Box<dyn Pipe> {
        Box::new(Self {
            name: self.name.clone(),
            queue: Arc::clone(&self.queue),
        })
    }
}

#[cfg(test)]
mod tests;
