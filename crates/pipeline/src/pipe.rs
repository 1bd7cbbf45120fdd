//! The `Pipe` trait, replacing a struct-of-function-pointers vtable with
//! one explicit, object-safe interface.

use flowcore::{FlowError, RuntimeContext};
use logmsg::ack::PathOptions;
use logmsg::LogMessage;

pub type PipeResult<T> = Result<T, FlowError>;

/// Control-plane signals a pipe may receive outside the data path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipeEvent {
    TransportEof,
    FileDeleted,
    LastMessageSent,
    ConfigChanged,
    ReopenFiles,
}

/// One stage in the pipeline graph.
///
/// `queue`/`notify` run to completion before the event loop moves on —
/// there is no preemption within a single call. Anything
/// that needs to wait on I/O belongs in a [`crate::source::Source`] or
/// [`crate::destination::Destination`] worker task driving the pipe from
/// outside, not inside these methods.
pub trait Pipe: Send {
    /// Allocates resources, validates configuration, and subscribes to
    /// whatever events this pipe needs. Called once, in dependency order,
    /// when the pipeline starts or is reloaded.
    fn init(&mut self, ctx: &RuntimeContext) -> PipeResult<()>;

    /// Releases resources. Called once, in reverse dependency order, on
    /// shutdown or before a pipe is replaced during a config reload.
    fn deinit(&mut self) -> PipeResult<()>;

    /// Synchronous handoff of one message. The callee owns the reference
    /// it was given; if it needs to keep processing, it must queue it
    /// onward (or fork it, for a fan-out pipe) rather than hold it open
    /// past this call.
    fn queue(&mut self, msg: LogMessage, path_options: PathOptions) -> PipeResult<()>;

    /// Delivers a control-plane signal.
    fn notify(&mut self, event: PipeEvent);

    /// Materializes a fresh instance of this pipe's configuration and
    /// state, used when a branch needs independent per-instance state
    /// after a config reload. Named `clone_pipe` to keep `Pipe` distinct
    /// from `std::clone::Clone`, since `Box<dyn Pipe>` can't derive it.
    fn clone_pipe(&self) -> Box<dyn Pipe>;
}
