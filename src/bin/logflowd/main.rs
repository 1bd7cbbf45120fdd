//! `logflowd`: accepts syslog traffic, applies window-counter
//! backpressure and crash-consistent ack tracking, and forwards it to one
//! or more destinations with exponential-backoff retry.
//!
//! There is no configuration language; every knob is a [`cli::Cli`] flag.
//! See the crate-level docs on [`daemon`] and [`pipeline`] for how a
//! source/destination pair is actually driven once built.

mod cli;
mod console;
mod format;
mod wiring;

use clap::Parser;
use cli::Cli;
use flowcore::{exit_code_for, ExitCode, FlowError, RuntimeContext, SupervisorOutcome};
use std::io::IsTerminal;
use std::process::ExitCode as ProcessExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ProcessExitCode {
    let cli = Cli::parse();

    let logging_options = logging::LoggingOptions {
        verbosity: cli.verbosity(),
        ansi: std::io::stdout().is_terminal(),
    };
    if logging::init_tracing(logging_options).is_err() {
        eprintln!("a tracing subscriber is already installed for this process");
    }

    if let Err(error) = cli.validate() {
        tracing::error!(detail = %error, "invalid configuration");
        return exit_code_for(&error).as_process_exit_code();
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().worker_threads(cli.workers.max(1)).enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(detail = %error, "failed to start the async runtime");
            return ExitCode::RuntimeError.as_process_exit_code();
        }
    };

    let exit_code = runtime.block_on(run(cli));
    exit_code.as_process_exit_code()
}

async fn run(cli: Cli) -> ExitCode {
    match try_run(cli).await {
        Ok(outcome) => match outcome {
            SupervisorOutcome::AllExited | SupervisorOutcome::ShutdownRequested => ExitCode::Success,
            SupervisorOutcome::Fatal(error) => exit_code_for(&error),
        },
        Err(error) => exit_code_for(&error),
    }
}

async fn try_run(cli: Cli) -> Result<SupervisorOutcome, FlowError> {
    let store = persist::PersistStore::open_or_create(&cli.persist_file)?;
    let ctx = RuntimeContext::new(store, dnscache::DnsCacheOptions::default());

    let supervisor = wiring::build(&cli, &ctx).await?;
    spawn_shutdown_signals(&ctx);

    #[cfg(feature = "sd-notify")]
    daemon::notify::notify_ready();

    tracing::info!(sources = cli.tcp_listen.len() + cli.udp_listen.len(), "logflowd running");
    let outcome = supervisor.run_to_completion(&ctx).await;

    #[cfg(feature = "sd-notify")]
    daemon::notify::notify_stopping();

    Ok(outcome)
}

/// Requests cooperative shutdown on Ctrl-C, and on `SIGTERM` where the
/// platform has one.
fn spawn_shutdown_signals(ctx: &RuntimeContext) {
    let ctrl_c_ctx = ctx.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_ctx.store(true, std::sync::atomic::Ordering::Release);
        }
    });

    #[cfg(unix)]
    {
        let term_ctx = ctx.shutdown_handle();
        tokio::spawn(async move {
            let Ok(mut term) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
                return;
            };
            if term.recv().await.is_some() {
                term_ctx.store(true, std::sync::atomic::Ordering::Release);
            }
        });
    }
}
