//! A typed, already-validated configuration surface. Parsing a
//! configuration *language* is out of scope; callers construct these
//! structs directly in Rust, the way `daemon`'s CLI entry point does
//! from a handful of flags.

use crate::error::FlowError;
use flowctl::backoff::BackoffOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub name: String,
    pub bind_address: SocketAddr,
    pub max_msg_size: usize,
    pub trim_large_messages: bool,
    pub initial_window: usize,
}

#[derive(Clone, Debug)]
pub struct DestinationConfig {
    pub name: String,
    pub address: SocketAddr,
    pub queue_capacity: usize,
    pub backoff: BackoffOptions,
    /// A destination that has been retrying longer than this aborts the
    /// in-flight message as `Suspended` rather than retrying forever.
    pub max_retry_window: Duration,
}

#[derive(Clone, Debug)]
pub struct PipelineDescription {
    pub sources: Vec<SourceConfig>,
    pub destinations: Vec<DestinationConfig>,
    pub persist_path: PathBuf,
    pub worker_count: usize,
}

impl PipelineDescription {
    /// Validates cross-field invariants this type alone can't enforce at
    /// construction (non-empty source/destination lists, sane backoff
    /// parameters, at least one worker). Surfaces as
    /// [`FlowError::Config`], fatal at startup.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.sources.is_empty() {
            return Err(FlowError::Config {
                detail: "pipeline must declare at least one source".into(),
            });
        }
        if self.destinations.is_empty() {
            return Err(FlowError::Config {
                detail: "pipeline must declare at least one destination".into(),
            });
        }
        if self.worker_count == 0 {
            return Err(FlowError::Config {
                detail: "worker_count must be at least 1".into(),
            });
        }
        for destination in &self.destinations {
            destination.backoff.validate().map_err(|source| FlowError::Config {
                detail: format!("destination {:?}: {source}", destination.name),
            })?;
            if destination.queue_capacity == 0 {
                return Err(FlowError::Config {
                    detail: format!("destination {:?}: queue_capacity must be at least 1", destination.name),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceConfig {
        SourceConfig {
            name: "syslog-tcp".into(),
            bind_address: "0.0.0.0:5514".parse().unwrap(),
            max_msg_size: 64 * 1024,
            trim_large_messages: true,
            initial_window: 1000,
        }
    }

    fn destination() -> DestinationConfig {
        DestinationConfig {
            name: "primary".into(),
            address: "10.0.0.1:601".parse().unwrap(),
            queue_capacity: 1000,
            backoff: BackoffOptions::default(),
            max_retry_window: Duration::from_secs(300),
        }
    }

    #[test]
    fn rejects_pipeline_with_no_sources() {
        let description = PipelineDescription {
            sources: vec![],
            destinations: vec![destination()],
            persist_path: "/tmp/state.persist".into(),
            worker_count: 1,
        };
        assert!(description.validate().is_err());
    }

    #[test]
    fn rejects_invalid_backoff_options() {
        let mut destination = destination();
        destination.backoff.multiplier = 0.5;
        let description = PipelineDescription {
            sources: vec![source()],
            destinations: vec![destination],
            persist_path: "/tmp/state.persist".into(),
            worker_count: 1,
        };
        assert!(description.validate().is_err());
    }

    #[test]
    fn accepts_a_minimal_valid_pipeline() {
        let description = PipelineDescription {
            sources: vec![source()],
            destinations: vec![destination()],
            persist_path: "/tmp/state.persist".into(),
            worker_count: 2,
        };
        assert!(description.validate().is_ok());
    }
}
