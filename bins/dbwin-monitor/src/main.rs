use anyhow::{Context, Result};
use clap::Parser;
use dbwin_config::MonitorConfig;
use dbwin_events::DebugMessage;
use dbwin_receiver::ReceiverHandle;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Print every string written to the system debug channel.
#[derive(Parser, Debug)]
#[command(name = "dbwin-monitor", version)]
struct Args {
    /// TOML config file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds instead of running until interrupted.
    #[arg(short, long)]
    duration_secs: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => MonitorConfig::load(path.display().to_string())
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(&config, args.duration_secs.map(Duration::from_secs))
}

#[cfg(windows)]
fn run(config: &MonitorConfig, duration: Option<Duration>) -> Result<()> {
    use dbwin_mmap::win32::FileMappingView;
    use dbwin_receiver::{Receiver, ReceiverConfig};
    use dbwin_signal::win32::NamedEvent;

    let view = FileMappingView::create(&config.buffer_name, config.buffer_size)
        .with_context(|| format!("mapping {}", config.buffer_name))?;
    // Starts signaled so the first writer may proceed.
    let buffer_ready = NamedEvent::create(&config.buffer_ready_name, true)
        .with_context(|| format!("creating {}", config.buffer_ready_name))?;
    let data_ready = NamedEvent::create(&config.data_ready_name, false)
        .with_context(|| format!("creating {}", config.data_ready_name))?;

    let receiver_config = ReceiverConfig::default()
        .with_poll_interval(config.poll_interval())
        .with_channel_capacity(config.channel_capacity);

    let handle = Receiver::new(view, buffer_ready, data_ready, receiver_config)?.start()?;
    tracing::info!(buffer = %config.buffer_name, "monitoring debug output");

    let printed = print_messages(&handle, duration)?;
    let stats = handle.stop()?;
    tracing::info!(
        printed,
        delivered = stats.delivered,
        discarded = stats.discarded,
        "monitor stopped"
    );
    Ok(())
}

#[cfg(not(windows))]
fn run(_config: &MonitorConfig, _duration: Option<Duration>) -> Result<()> {
    anyhow::bail!("the system debug channel is only available on Windows")
}

/// Prints messages until the deadline passes or the receiver stops.
#[cfg_attr(not(windows), allow(dead_code))]
fn print_messages(handle: &ReceiverHandle, duration: Option<Duration>) -> Result<u64> {
    let deadline = duration.map(|d| Instant::now() + d);
    let stdout = std::io::stdout();
    let mut printed = 0u64;

    loop {
        let next = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                // Timed out or disconnected.
                match handle.messages().recv_timeout(remaining) {
                    Ok(msg) => msg,
                    Err(_) => break,
                }
            }
            None => match handle.messages().recv() {
                Ok(msg) => msg,
                Err(_) => break,
            },
        };
        write_line(&mut stdout.lock(), &next)?;
        printed += 1;
    }

    if let Some(err) = handle.last_error() {
        tracing::warn!(error = %err, "receiver ended early");
    }
    Ok(printed)
}

#[cfg_attr(not(windows), allow(dead_code))]
fn write_line(out: &mut impl Write, msg: &DebugMessage) -> std::io::Result<()> {
    writeln!(out, "[{}] {}", msg.process_id, msg.message.trim_end_matches(['\r', '\n']))
}
