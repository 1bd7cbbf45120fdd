#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Verbosity-flag logging, bridged to `tracing`.
//!
//! Every surfaced error in the pipeline is logged as a
//! structured line carrying `{source, error_kind, detail, fd?,
//! bytes_processed?}`. This crate owns turning a simple verbosity flag
//! into a `tracing_subscriber` filter and owns the shape of that
//! structured line so every pipe logs errors the same way.

use std::fmt;
use tracing_subscriber::EnvFilter;

/// Coarse verbosity level, set once at startup from the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingOptions {
    pub verbosity: Verbosity,
    pub ansi: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("a tracing subscriber is already installed for this process")]
    AlreadyInstalled,
}

/// Installs a process-wide `tracing` subscriber at the given verbosity.
/// Must be called at most once; subsequent calls return
/// [`LoggingError::AlreadyInstalled`] rather than panicking, so a worker
/// that races another test in the same process fails softly.
pub fn init_tracing(options: LoggingOptions) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(options.verbosity.directive())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(options.ansi)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)
}

/// The structured shape every surfaced error is logged with.
#[derive(Clone, Debug)]
pub struct SurfacedError<'a> {
    pub source: &'a str,
    pub error_kind: &'a str,
    pub detail: &'a str,
    pub fd: Option<i32>,
    pub bytes_processed: Option<u64>,
}

impl fmt::Display for SurfacedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.source, self.error_kind, self.detail)
    }
}

/// Emits one [`SurfacedError`] on the `tracing` bus at `error` level.
pub fn log_surfaced_error(error: &SurfacedError<'_>) {
    tracing::error!(
        source = error.source,
        error_kind = error.error_kind,
        detail = error.detail,
        fd = error.fd,
        bytes_processed = error.bytes_processed,
        "{error}"
    );
}
