//! Turns a validated [`Cli`] into a running [`Supervisor`] of source and
//! destination workers, sharing one [`RuntimeContext`].

use crate::cli::Cli;
use crate::console::ConsoleEgress;
use crate::format::{render_framed, render_unframed};
use dnscache::DnsCache;
use flowcore::{FlowError, RuntimeContext, Supervisor};
use pipeline::destination::Formatter;
use pipeline::multiplex::Multiplexer;
use pipeline::pipe::Pipe;
use pipeline::queue::{Queue, QueuePipe};
use pipeline::source::Source;
use pipeline::{Destination, Transport};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds the fan-out root every source's downstream ultimately feeds:
/// one [`QueuePipe`] per configured destination, wrapped in a
/// [`Multiplexer`] when there's more than one, and spawns the
/// [`Destination`] worker draining each queue.
fn build_destinations(cli: &Cli, supervisor: &mut Supervisor, shutdown: &Arc<AtomicBool>) -> Result<Box<dyn Pipe>, FlowError> {
    let mut branches: Vec<Box<dyn Pipe>> = Vec::new();

    #[cfg(feature = "tcp")]
    for config in cli.tcp_destination_configs() {
        let queue = Arc::new(Queue::new(config.queue_capacity));
        branches.push(Box::new(QueuePipe::new(config.name.clone(), Arc::clone(&queue))));
        let transport = daemon::tcp::TcpEgress::new(config.address);
        spawn_destination(supervisor, Arc::clone(shutdown), config.name, queue, transport, config.backoff, config.max_retry_window, Box::new(render_framed))?;
    }
    #[cfg(not(feature = "tcp"))]
    if !cli.tcp_destination_configs().is_empty() {
        return Err(FlowError::Config {
            detail: "--forward-tcp requires the \"tcp\" feature".into(),
        });
    }

    #[cfg(feature = "udp")]
    for config in cli.udp_destination_configs() {
        let queue = Arc::new(Queue::new(config.queue_capacity));
        branches.push(Box::new(QueuePipe::new(config.name.clone(), Arc::clone(&queue))));
        let transport = daemon::udp::UdpEgress::new(config.address);
        spawn_destination(supervisor, Arc::clone(shutdown), config.name, queue, transport, config.backoff, config.max_retry_window, Box::new(render_unframed))?;
    }
    #[cfg(not(feature = "udp"))]
    if !cli.udp_destination_configs().is_empty() {
        return Err(FlowError::Config {
            detail: "--forward-udp requires the \"udp\" feature".into(),
        });
    }

    if cli.console {
        let queue = Arc::new(Queue::new(cli.queue_capacity));
        branches.push(Box::new(QueuePipe::new("console", Arc::clone(&queue))));
        let transport = ConsoleEgress::new(Arc::new(logging_sink::ConsoleSink::new()));
        let backoff = flowctl::backoff::BackoffOptions {
            initial_seconds: cli.backoff_initial_seconds,
            maximum_seconds: cli.backoff_max_seconds,
            multiplier: cli.backoff_multiplier,
        };
        let max_retry_window = Duration::from_secs(cli.max_retry_window_seconds);
        spawn_destination(supervisor, Arc::clone(shutdown), "console".to_owned(), queue, transport, backoff, max_retry_window, Box::new(render_unframed))?;
    }

    Ok(match branches.len() {
        1 => branches.into_iter().next().expect("checked len == 1"),
        _ => Box::new(Multiplexer::new(branches)),
    })
}

#[allow(clippy::too_many_arguments)]
fn spawn_destination<T>(
    supervisor: &mut Supervisor,
    shutdown: Arc<AtomicBool>,
    name: String,
    queue: Arc<Queue>,
    transport: T,
    backoff: flowctl::backoff::BackoffOptions,
    max_retry_window: Duration,
    format: Formatter,
) -> Result<(), FlowError>
where
    T: Transport + Send + 'static,
{
    let mut destination = Destination::new(name.clone(), queue, transport, backoff, max_retry_window, format).map_err(|source| FlowError::Config {
        detail: format!("destination {name:?}: {source}"),
    })?;
    supervisor.spawn(name, async move {
        destination.run(shutdown.as_ref()).await;
        Ok(())
    });
    Ok(())
}

fn build_dns_cache(ctx: &RuntimeContext, static_hosts: Option<&str>) -> Result<Arc<Mutex<DnsCache>>, FlowError> {
    let mut cache = DnsCache::new(ctx.dns_cache_options());
    if let Some(contents) = static_hosts {
        cache.load_static_hosts(contents).map_err(|source| FlowError::Config {
            detail: source.to_string(),
        })?;
    }
    Ok(Arc::new(Mutex::new(cache)))
}

/// Spawns one worker task per configured source, registered on
/// `supervisor`. A TCP source needs a fresh downstream pipe per accepted
/// connection, not just per source, so `root` is handed to
/// [`daemon::tcp::accept_loop`] behind a mutex it clones through on every
/// accept rather than being cloned once up front.
///
/// Each TCP acceptor owns a private `Supervisor` for its per-connection
/// `Source` tasks; when `accept_loop` returns (shutdown observed, no new
/// connections), that private supervisor is dropped without joining,
/// which aborts any still-open connections rather than draining them.
/// Only already-enqueued messages past that point are guaranteed to
/// reach a destination — a connection mid-read when shutdown lands can
/// lose its tail. Threading a single shared supervisor through here
/// instead would need `&mut Supervisor` borrowed into a task already
/// spawned from that same supervisor, which doesn't work.
async fn spawn_sources(
    cli: &Cli,
    ctx: &RuntimeContext,
    root: &dyn Pipe,
    static_hosts: Option<&str>,
    supervisor: &mut Supervisor,
    shutdown: &Arc<AtomicBool>,
) -> Result<(), FlowError> {
    #[cfg(feature = "tcp")]
    for config in cli.tcp_source_configs() {
        let listener = daemon::tcp::bind(config.bind_address)?;
        let dns_cache = build_dns_cache(ctx, static_hosts)?;
        let options = daemon::tcp::AcceptOptions {
            max_msg_size: config.max_msg_size,
            trim_large_messages: config.trim_large_messages,
            initial_window: config.initial_window,
        };
        let template: Arc<Mutex<Box<dyn Pipe>>> = Arc::new(Mutex::new(root.clone_pipe()));
        let make_downstream: Arc<dyn Fn() -> Box<dyn Pipe> + Send + Sync> = Arc::new(move || template.lock().unwrap().clone_pipe());
        let name = config.name.clone();
        let accept_shutdown = Arc::clone(shutdown);
        supervisor.spawn(name.clone(), async move {
            let mut acceptor_supervisor = Supervisor::new();
            daemon::tcp::accept_loop(listener, name, options, make_downstream, dns_cache, &mut acceptor_supervisor, accept_shutdown).await
        });
    }
    #[cfg(not(feature = "tcp"))]
    if !cli.tcp_source_configs().is_empty() {
        return Err(FlowError::Config {
            detail: "--tcp-listen requires the \"tcp\" feature".into(),
        });
    }

    #[cfg(feature = "udp")]
    for config in cli.udp_source_configs() {
        let socket = tokio::net::UdpSocket::bind(config.bind_address).await.map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })?;
        let ingress = daemon::udp::UdpIngress::new(socket);
        let mut source = Source::new(config.name.clone(), ingress, config.max_msg_size, config.trim_large_messages, config.initial_window);
        let mut downstream = root.clone_pipe();
        let name = config.name.clone();
        let source_shutdown = Arc::clone(shutdown);
        supervisor.spawn(name, async move { source.run(downstream.as_mut(), source_shutdown.as_ref()).await });
    }
    #[cfg(not(feature = "udp"))]
    if !cli.udp_source_configs().is_empty() {
        return Err(FlowError::Config {
            detail: "--udp-listen requires the \"udp\" feature".into(),
        });
    }

    Ok(())
}

/// Builds every source and destination worker described by `cli` and
/// registers them on a fresh [`Supervisor`].
pub async fn build(cli: &Cli, ctx: &RuntimeContext) -> Result<Supervisor, FlowError> {
    let mut supervisor = Supervisor::new();
    let shutdown = ctx.shutdown_handle();

    let mut root = build_destinations(cli, &mut supervisor, &shutdown)?;
    root.init(ctx)?;

    let static_hosts = cli
        .static_hosts_file
        .as_deref()
        .map(std::fs::read_to_string)
        .transpose()
        .map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })?;

    spawn_sources(cli, ctx, root.as_ref(), static_hosts.as_deref(), &mut supervisor, &shutdown).await?;

    Ok(supervisor)
}
