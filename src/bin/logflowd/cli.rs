//! Command-line surface for `logflowd`.
//!
//! There is no configuration-file grammar here, on purpose: every knob a
//! running pipeline needs is a flag, and the `*_source_configs`/
//! `*_destination_configs` accessors turn those flags directly into the
//! typed [`flowcore`] configuration structs `wiring` wires up. Anything
//! finer-grained (per-destination rewrite rules, filters, a template
//! language) is out of scope for this entry point.

use clap::Parser;
use flowcore::{DestinationConfig, FlowError, PipelineDescription, SourceConfig};
use flowctl::backoff::BackoffOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "logflowd", version, about = "Syslog message pipeline daemon")]
pub struct Cli {
    /// Bind a TCP source (RFC 6587 octet-counted framing). Repeatable.
    #[arg(long = "tcp-listen", value_name = "ADDR")]
    pub tcp_listen: Vec<SocketAddr>,

    /// Bind a UDP source (RFC 5426, one message per datagram). Repeatable.
    #[arg(long = "udp-listen", value_name = "ADDR")]
    pub udp_listen: Vec<SocketAddr>,

    /// Forward accepted messages to a TCP destination. Repeatable.
    #[arg(long = "forward-tcp", value_name = "ADDR")]
    pub forward_tcp: Vec<SocketAddr>,

    /// Forward accepted messages to a UDP destination. Repeatable.
    #[arg(long = "forward-udp", value_name = "ADDR")]
    pub forward_udp: Vec<SocketAddr>,

    /// Also write every accepted message to stdout, one line apiece.
    #[arg(long)]
    pub console: bool,

    /// Where the crash-consistent window/ack state is persisted.
    #[arg(long = "persist-file", value_name = "PATH", default_value = "logflowd.persist")]
    pub persist_file: PathBuf,

    /// OS threads the daemon's async runtime runs worker tasks on.
    #[arg(long, default_value_t = 2)]
    pub workers: usize,

    /// Per-destination queue capacity before backpressure engages.
    #[arg(long = "queue-capacity", default_value_t = 10_000)]
    pub queue_capacity: usize,

    /// Largest accepted message body, in bytes.
    #[arg(long = "max-msg-size", default_value_t = 64 * 1024)]
    pub max_msg_size: usize,

    /// Trim (rather than reject) a frame over `max-msg-size`.
    #[arg(long = "trim-large-messages", default_value_t = true)]
    pub trim_large_messages: bool,

    /// Initial source-side window-counter credit.
    #[arg(long = "initial-window", default_value_t = 1000)]
    pub initial_window: usize,

    /// Backoff floor, in seconds, after a destination failure.
    #[arg(long = "backoff-initial-seconds", default_value_t = BackoffOptions::default().initial_seconds)]
    pub backoff_initial_seconds: f64,

    /// Backoff ceiling, in seconds, a retrying destination never exceeds.
    #[arg(long = "backoff-max-seconds", default_value_t = BackoffOptions::default().maximum_seconds)]
    pub backoff_max_seconds: f64,

    /// Growth factor applied to the wait after each failed attempt.
    #[arg(long = "backoff-multiplier", default_value_t = BackoffOptions::default().multiplier)]
    pub backoff_multiplier: f64,

    /// How long a destination retries one message before suspending it.
    #[arg(long = "max-retry-window-seconds", default_value_t = 300)]
    pub max_retry_window_seconds: u64,

    /// Optional `/etc/hosts`-style file of static address-to-hostname
    /// entries, loaded into every source's DNS cache at startup.
    #[arg(long = "static-hosts-file", value_name = "PATH")]
    pub static_hosts_file: Option<PathBuf>,

    /// Increase log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log only errors.
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> logging::Verbosity {
        if self.quiet {
            return logging::Verbosity::Quiet;
        }
        match self.verbose {
            0 => logging::Verbosity::Normal,
            1 => logging::Verbosity::Verbose,
            _ => logging::Verbosity::Debug,
        }
    }

    fn backoff(&self) -> BackoffOptions {
        BackoffOptions {
            initial_seconds: self.backoff_initial_seconds,
            maximum_seconds: self.backoff_max_seconds,
            multiplier: self.backoff_multiplier,
        }
    }

    #[must_use]
    pub fn tcp_source_configs(&self) -> Vec<SourceConfig> {
        self.tcp_listen.iter().map(|address| self.source_config(format!("tcp:{address}"), *address)).collect()
    }

    #[must_use]
    pub fn udp_source_configs(&self) -> Vec<SourceConfig> {
        self.udp_listen.iter().map(|address| self.source_config(format!("udp:{address}"), *address)).collect()
    }

    #[must_use]
    pub fn tcp_destination_configs(&self) -> Vec<DestinationConfig> {
        let backoff = self.backoff();
        self.forward_tcp.iter().map(|address| self.destination_config(format!("tcp:{address}"), *address, backoff)).collect()
    }

    #[must_use]
    pub fn udp_destination_configs(&self) -> Vec<DestinationConfig> {
        let backoff = self.backoff();
        self.forward_udp.iter().map(|address| self.destination_config(format!("udp:{address}"), *address, backoff)).collect()
    }

    /// Builds the validated [`PipelineDescription`] this invocation
    /// describes, purely to run its cross-field checks (non-empty source
    /// list, sane backoff parameters, at least one worker) before
    /// anything is bound. `--console` has no `SocketAddr` and so never
    /// appears in the returned description; a console-only invocation
    /// (no `--forward-tcp`/`--forward-udp`) is accepted here and checked
    /// separately below, since `PipelineDescription::validate` has no way
    /// to know a destination-less description is still valid when the
    /// console sink covers that role.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.tcp_listen.is_empty() && self.udp_listen.is_empty() {
            return Err(FlowError::Config {
                detail: "at least one --tcp-listen or --udp-listen source is required".into(),
            });
        }
        if self.forward_tcp.is_empty() && self.forward_udp.is_empty() && !self.console {
            return Err(FlowError::Config {
                detail: "at least one --forward-tcp, --forward-udp, or --console destination is required".into(),
            });
        }
        if self.workers == 0 {
            return Err(FlowError::Config {
                detail: "workers must be at least 1".into(),
            });
        }

        let mut sources = self.tcp_source_configs();
        sources.extend(self.udp_source_configs());
        let mut destinations = self.tcp_destination_configs();
        destinations.extend(self.udp_destination_configs());
        if destinations.is_empty() {
            // PipelineDescription::validate rejects an empty destination
            // list unconditionally; a console-only run is still valid, so
            // the per-destination checks it would otherwise run (backoff
            // sanity, non-zero queue capacity) are run here instead.
            self.backoff().validate().map_err(|source| FlowError::Config {
                detail: source.to_string(),
            })?;
            if self.queue_capacity == 0 {
                return Err(FlowError::Config {
                    detail: "queue-capacity must be at least 1".into(),
                });
            }
            return Ok(());
        }

        let description = PipelineDescription {
            sources,
            destinations,
            persist_path: self.persist_file.clone(),
            worker_count: self.workers,
        };
        description.validate()
    }

    fn source_config(&self, name: String, bind_address: SocketAddr) -> SourceConfig {
        SourceConfig {
            name,
            bind_address,
            max_msg_size: self.max_msg_size,
            trim_large_messages: self.trim_large_messages,
            initial_window: self.initial_window,
        }
    }

    fn destination_config(&self, name: String, address: SocketAddr, backoff: BackoffOptions) -> DestinationConfig {
        DestinationConfig {
            name,
            address,
            queue_capacity: self.queue_capacity,
            backoff,
            max_retry_window: Duration::from_secs(self.max_retry_window_seconds),
        }
    }
}
