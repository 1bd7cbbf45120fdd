//! Arena-indexed pipe graph, replacing cyclic owner/child back-references
//! with a flat `Vec` and small integer handles.

use crate::pipe::{Pipe, PipeEvent};
use flowcore::{FlowError, RuntimeContext};
use std::collections::VecDeque;

/// Index into a [`Pipeline`]'s arena. Stable for the lifetime of the
/// pipeline; never reused after a pipe is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipeId(usize);

struct PipeSlot {
    pipe: Box<dyn Pipe>,
    downstream: Vec<PipeId>,
}

/// Owns every pipe in one worker's graph and the edges between them.
///
/// Pipes are addressed by [`PipeId`] rather than holding references to
/// each other, so the graph can be walked, reordered, or torn down
/// without the pipes themselves knowing their position in it.
#[derive(Default)]
pub struct Pipeline {
    slots: Vec<Option<PipeSlot>>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Adds a pipe with no downstream edges yet. Returns its id.
    pub fn add_pipe(&mut self, pipe: Box<dyn Pipe>) -> PipeId {
        let id = PipeId(self.slots.len());
        self.slots.push(Some(PipeSlot {
            pipe,
            downstream: Vec::new(),
        }));
        id
    }

    /// Links `from` to `to`: a message queued into `from` may be forwarded
    /// to `to` by `from`'s own logic (a multiplexer pipe reads this edge
    /// list to fan out).
    pub fn connect(&mut self, from: PipeId, to: PipeId) {
        self.slot_mut(from).downstream.push(to);
    }

    #[must_use]
    pub fn downstream_of(&self, id: PipeId) -> &[PipeId] {
        &self.slot(id).downstream
    }

    pub fn pipe_mut(&mut self, id: PipeId) -> &mut dyn Pipe {
        &mut *self.slot_mut(id).pipe
    }

    fn slot(&self, id: PipeId) -> &PipeSlot {
        self.slots[id.0].as_ref().expect("pipe id still live")
    }

    fn slot_mut(&mut self, id: PipeId) -> &mut PipeSlot {
        self.slots[id.0].as_mut().expect("pipe id still live")
    }

    /// Kahn's algorithm over the downstream edges, breaking ties by
    /// ascending `PipeId` so ordering is deterministic across runs.
    fn topo_order(&self) -> Vec<PipeId> {
        let n = self.slots.len();
        let mut in_degree = vec![0usize; n];
        for slot in self.slots.iter().flatten() {
            for &to in &slot.downstream {
                in_degree[to.0] += 1;
            }
        }

        let mut ready: VecDeque<PipeId> = (0..n)
            .filter(|&i| self.slots[i].is_some() && in_degree[i] == 0)
            .map(PipeId)
            .collect();
        let mut ready_sorted: Vec<_> = ready.drain(..).collect();
        ready_sorted.sort();
        let mut ready: VecDeque<PipeId> = ready_sorted.into();

        let mut order = Vec::with_capacity(n);
        while let Some(id) = ready.pop_front() {
            order.push(id);
            let mut newly_ready = Vec::new();
            for &to in &self.slot(id).downstream {
                in_degree[to.0] -= 1;
                if in_degree[to.0] == 0 {
                    newly_ready.push(to);
                }
            }
            newly_ready.sort();
            for id in newly_ready {
                ready.push_back(id);
            }
        }

        order
    }

    /// Initializes every pipe in dependency order (upstream before
    /// downstream), so a pipe's `init` can assume anything it depends on
    /// is already live.
    pub fn init_all(&mut self, ctx: &RuntimeContext) -> Result<(), FlowError> {
        for id in self.topo_order() {
            self.pipe_mut(id).init(ctx)?;
        }
        Ok(())
    }

    /// Tears down every pipe in reverse dependency order, so a pipe's
    /// `deinit` can still reach anything downstream of it while draining.
    pub fn deinit_all(&mut self) -> Result<(), FlowError> {
        for id in self.topo_order().into_iter().rev() {
            self.pipe_mut(id).deinit()?;
        }
        Ok(())
    }

    /// Broadcasts a control-plane event to every pipe, in topological
    /// order.
    pub fn notify_all(&mut self, event: PipeEvent) {
        for id in self.topo_order() {
            self.pipe_mut(id).notify(event);
        }
    }
}
