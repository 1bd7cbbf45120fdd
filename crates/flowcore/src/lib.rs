#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `flowcore` is the non-pipe-specific core every component shares: the
//! error taxonomy ([`error::FlowError`]), the runtime context every pipe
//! is `init`ed with ([`runtime::RuntimeContext`]), a typed
//! already-validated configuration surface ([`config::PipelineDescription`]),
//! and the [`supervisor::Supervisor`] that spawns and watches the
//! per-source/per-destination worker tasks built on top of it.
//!
//! Nothing here runs a pipe; `pipeline` depends on this crate, not the
//! other way around.

pub mod config;
pub mod error;
pub mod exit;
pub mod runtime;
pub mod supervisor;

pub use config::{DestinationConfig, PipelineDescription, SourceConfig};
pub use error::{FlowError, RuntimePhase};
pub use exit::{exit_code_for, ExitCode};
pub use runtime::RuntimeContext;
pub use supervisor::{Supervisor, SupervisorOutcome};
