//! The error taxonomy shared across every crate in the pipeline.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("message failed to parse: {detail}")]
    Parse { detail: String },

    #[error("transport i/o failed: {detail}")]
    Transport {
        detail: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("backpressure window is closed")]
    BackpressureSuspended,

    #[error("destination queue is full")]
    QueueFull,

    #[error("persist store error: {0}")]
    Persist(#[from] persist::PersistError),

    #[error("configuration error: {detail}")]
    Config { detail: String },

    #[error("delivery timed out after {elapsed:?} of retrying")]
    DeliveryTimeout { elapsed: Duration },
}

/// Where in the pipeline's lifecycle an error surfaced. Some kinds are
/// fatal only at one phase — a corrupt persist file refuses to start the
/// daemon, but a mid-run entry-level write failure just logs and retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimePhase {
    Startup,
    Running,
}

impl FlowError {
    /// The taxonomy name used in the structured `error_kind` log field.
    #[must_use]
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "ParseError",
            Self::Transport { .. } => "TransportError",
            Self::BackpressureSuspended => "BackpressureSuspended",
            Self::QueueFull => "QueueFull",
            Self::Persist(_) => "PersistError",
            Self::Config { .. } => "ConfigError",
            Self::DeliveryTimeout { .. } => "DeliveryTimeout",
        }
    }

    /// Whether this error should trigger a reconfigure/shutdown rather
    /// than being handled locally at its component boundary.
    #[must_use]
    pub fn is_fatal(&self, phase: RuntimePhase) -> bool {
        match self {
            Self::Config { .. } => true,
            Self::Persist(_) => phase == RuntimePhase::Startup,
            Self::Parse { .. }
            | Self::Transport { .. }
            | Self::BackpressureSuspended
            | Self::QueueFull
            | Self::DeliveryTimeout { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_is_always_fatal() {
        let error = FlowError::Config {
            detail: "missing bind address".into(),
        };
        assert!(error.is_fatal(RuntimePhase::Startup));
        assert!(error.is_fatal(RuntimePhase::Running));
    }

    #[test]
    fn persist_error_is_fatal_only_at_startup() {
        let error = FlowError::Persist(persist::PersistError::NotFound);
        assert!(error.is_fatal(RuntimePhase::Startup));
        assert!(!error.is_fatal(RuntimePhase::Running));
    }

    #[test]
    fn transport_error_is_never_fatal() {
        let error = FlowError::Transport {
            detail: "reset".into(),
            source: None,
        };
        assert!(!error.is_fatal(RuntimePhase::Startup));
        assert!(!error.is_fatal(RuntimePhase::Running));
    }

    #[test]
    fn error_kind_matches_taxonomy_name() {
        assert_eq!(FlowError::QueueFull.error_kind(), "QueueFull");
        assert_eq!(
            FlowError::DeliveryTimeout {
                elapsed: Duration::from_secs(5)
            }
            .error_kind(),
            "DeliveryTimeout"
        );
    }
}
