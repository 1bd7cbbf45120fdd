//! Process exit codes for the `logflowd` binary: `0` success, `1`
//! configuration error (fatal at startup), `2` any other
//! fatal runtime error.

use crate::error::FlowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl ExitCode {
    #[must_use]
    pub fn as_process_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }
}

/// Maps a fatal [`FlowError`] to the exit code `logflowd` should return.
#[must_use]
pub fn exit_code_for(error: &FlowError) -> ExitCode {
    match error {
        FlowError::Config { .. } => ExitCode::ConfigError,
        _ => ExitCode::RuntimeError,
    }
}
