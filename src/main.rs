//! Burrow - interactive iterative DNS lookup.
//!
//! Loads configuration, binds the process-wide UDP socket and hands control
//! to the interactive shell. The root server can be overridden with a single
//! positional argument.

use std::borrow::Cow;
use std::net::IpAddr;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, reload};

use burrow::cache::RecordCache;
use burrow::config::Config;
use burrow::error::ConfigError;
use burrow::resolver::Resolver;
use burrow::shell::Shell;
use burrow::transport::UdpTransport;

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the subscriber with a reloadable filter so the shell's
/// `trace on|off` can flip resolution verbosity at runtime.
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time(),
        )
        .init();

    handle
}

fn trace_toggle(handle: FilterHandle) -> burrow::shell::TraceToggle {
    Box::new(move |enabled| {
        let directive = if enabled { "burrow=debug" } else { "info" };
        if let Err(err) = handle.reload(EnvFilter::new(directive)) {
            eprintln!("Failed to update tracing filter: {err}");
        }
    })
}

async fn run(trace_handle: FilterHandle) -> Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("config.toml"));
    let config = if std::fs::metadata(config_path.as_ref()).is_ok() {
        Config::load(config_path.as_ref()).context("Failed to load configuration")?
    } else {
        Config::default()
    };

    // Metrics must come up before the first counter is touched
    burrow::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    let root: IpAddr = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse()
            .map_err(|err| burrow::Error::Config(ConfigError::InvalidRootServer(err)))?,
        None => config.root_server,
    };

    // The one socket every query goes through; not being able to bind it is
    // the only startup failure worth dying for.
    let transport = UdpTransport::bind(config.dns_port, config.query_timeout())
        .await
        .context("Failed to open UDP socket")?;

    let resolver = Resolver::new(transport, RecordCache::new(), root);

    println!("Root DNS server is: {root}");

    let shell = Shell::new(resolver, trace_toggle(trace_handle));
    shell.run(BufReader::new(tokio::io::stdin())).await?;

    println!("Goodbye!");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let trace_handle = init_tracing();
    run(trace_handle).await
}
