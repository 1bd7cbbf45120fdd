//! Fan-out to several downstream pipes.

use crate::pipe::{Pipe, PipeEvent, PipeResult};
use flowcore::RuntimeContext;
use logmsg::ack::PathOptions;
use logmsg::LogMessage;

/// A pipe with `N` downstream branches. `queue` forks the message once per
/// extra branch and write-protects it first, so every branch observes the
/// same pre-fan-out snapshot regardless of what another branch later does
/// to its own copy via `make_writable`.
pub struct Multiplexer {
    branches: Vec<Box<dyn Pipe>>,
}

impl Multiplexer {
    #[must_use]
    pub fn new(branches: Vec<Box<dyn Pipe>>) -> Self {
        Self { branches }
    }

    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }
}

impl Pipe for Multiplexer {
    fn init(&mut self, ctx: &RuntimeContext) -> PipeResult<()> {
        for branch in &mut self.branches {
            branch.init(ctx)?;
        }
        Ok(())
    }

    fn deinit(&mut self) -> PipeResult<()> {
        for branch in &mut self.branches {
            branch.deinit()?;
        }
        Ok(())
    }

    fn queue(&mut self, msg: LogMessage, path_options: PathOptions) -> PipeResult<()> {
        match self.branches.len() {
            0 => Ok(()),
            1 => self.branches[0].queue(msg, path_options),
            n => {
                let mut msg = msg;
                msg.write_protect();
                for branch in &mut self.branches[..n - 1] {
                    branch.queue(msg.fork(), path_options)?;
                }
                self.branches[n - 1].queue(msg, path_options)
            }
        }
    }

    fn notify(&mut self, event: PipeEvent) {
        for branch in &mut self.branches {
            branch.notify(event);
        }
    }

    fn clone_pipe(&self) -> Box<dyn Pipe> {
        Box::new(Self {
            branches: self.branches.iter().map(|branch| branch.clone_pipe()).collect(),
        })
    }
}

#[cfg(test)]
mod tests;
