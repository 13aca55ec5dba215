//! Pool Hotplug Daemon
//!
//! Reads device events as newline-delimited JSON and hands each one to the
//! hotplug agent. Pools come from a simulated inventory file, which makes
//! the daemon usable for replaying captured event streams.
//!
//! ```text
//! {"class":"EC_dev_add","subclass":"disk","payload":{"devid":"ata-X","phys_path":"pci-0000:04:00.0-sas-0x4433221106000000-lun-0","dev_name":"/dev/sdq"}}
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pool_hotplug::hotplug::DEV_BYPATH_PATH;
use pool_hotplug::{
    AgentConfig, AgentMetrics, Error, EventRecord, HotplugAgent, MemoryPoolManager,
    MetricsSnapshot, Result,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pool Hotplug Daemon - online, label and replace vdevs on device arrival
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pool inventory (YAML, or JSON with a .json extension)
    #[arg(long, env = "HOTPLUG_POOLS")]
    pools: PathBuf,

    /// Newline-delimited JSON event file (default: stdin)
    #[arg(long, env = "HOTPLUG_EVENTS")]
    events: Option<PathBuf>,

    /// Directory of by-path symlinks used to resolve physical paths
    #[arg(long, env = "HOTPLUG_BY_PATH_DIR", default_value = DEV_BYPATH_PATH)]
    by_path_dir: PathBuf,

    /// Metrics server bind address (disabled when unset)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting Pool Hotplug Daemon");
    info!("  Version: {}", pool_hotplug::VERSION);
    info!("  Pools: {}", args.pools.display());
    info!("  By-path dir: {}", args.by_path_dir.display());

    let manager = MemoryPoolManager::from_file(&args.pools).map_err(|e| {
        Error::Configuration(format!("cannot load {}: {}", args.pools.display(), e))
    })?;

    let config = AgentConfig {
        by_path_dir: args.by_path_dir.clone(),
    };
    let runtime = tokio::runtime::Handle::current();
    let agent = HotplugAgent::init(Arc::new(manager), config, runtime)?;

    if let Some(addr) = args.metrics_addr.clone() {
        let metrics = agent.metrics();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(&addr, metrics).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let delivered = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            pump(BufReader::new(file), &agent).await?
        }
        None => pump(BufReader::new(tokio::io::stdin()), &agent).await?,
    };
    info!("{} event(s) delivered", delivered);

    let summary = tokio::task::block_in_place(move || agent.shutdown());
    info!(
        "Daemon shutdown complete ({} task(s) joined, {} handle(s) closed, {} pending label(s) dropped)",
        summary.tasks_joined, summary.handles_closed, summary.pending_discarded
    );
    Ok(())
}

/// Feed every event line to the agent until EOF or Ctrl-C
async fn pump<R>(reader: R, agent: &HotplugAgent) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                let record: EventRecord = match serde_json::from_str(line) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("skipping unparseable event: {}", e);
                        continue;
                    }
                };

                // Delivery blocks on the agent lock and on pool calls
                let delivery = tokio::task::block_in_place(|| {
                    agent.deliver(&record.class, &record.subclass, &record.payload)
                });
                debug!("{}.{} -> {:?}", record.class, record.subclass, delivery);
                delivered += 1;
            }
            _ = &mut interrupt => {
                info!("Interrupt received, shutting down");
                break;
            }
        }
    }
    Ok(delivered)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let hyper_directive = "hyper=warn"
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|e| Error::Configuration(format!("invalid log directive: {}", e)))?;
    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive(hyper_directive);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}

// =============================================================================
// Metrics Server
// =============================================================================

async fn run_metrics_server(addr: &str, metrics: Arc<AgentMetrics>) -> Result<()> {
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Server};

    let make_svc = make_service_fn(move |_conn| {
        let metrics = Arc::clone(&metrics);
        async move {
            Ok::<_, std::convert::Infallible>(service_fn(move |req: Request<Body>| {
                let metrics = Arc::clone(&metrics);
                async move {
                    Ok::<_, std::convert::Infallible>(respond(req.uri().path(), &metrics))
                }
            }))
        }
    });

    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Configuration(format!("Invalid metrics server address: {}", e)))?;

    info!("Metrics server listening on {}", addr);
    Server::bind(&addr)
        .serve(make_svc)
        .await
        .map_err(|e| Error::Configuration(format!("Metrics server error: {}", e)))?;

    Ok(())
}

fn respond(path: &str, metrics: &AgentMetrics) -> hyper::Response<hyper::Body> {
    use hyper::header::{HeaderValue, CONTENT_TYPE};
    use hyper::{Body, Response, StatusCode};

    match path {
        "/metrics" => match render_metrics(&metrics.snapshot()) {
            Ok((buffer, content_type)) => {
                let mut response = Response::new(Body::from(buffer));
                if let Ok(value) = HeaderValue::from_str(&content_type) {
                    response.headers_mut().insert(CONTENT_TYPE, value);
                }
                response
            }
            Err(e) => {
                error!("cannot render metrics: {}", e);
                let mut response = Response::new(Body::from("metrics unavailable"));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        },
        "/healthz" | "/livez" => Response::new(Body::from("ok")),
        _ => {
            let mut response = Response::new(Body::from("not found"));
            *response.status_mut() = StatusCode::NOT_FOUND;
            response
        }
    }
}

/// Render a snapshot in the Prometheus text format
fn render_metrics(snapshot: &MetricsSnapshot) -> Result<(Vec<u8>, String)> {
    use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

    let registry = Registry::new();
    for (name, help, value) in snapshot.counters() {
        let counter = IntCounter::new(name, help)?;
        counter.inc_by(value);
        registry.register(Box::new(counter))?;
    }

    let gauges = [
        ("hotplug_in_flight", "Events inside the critical section", snapshot.in_flight),
        ("hotplug_in_flight_peak", "High-water mark of in-flight events", snapshot.peak_in_flight),
    ];
    for (name, help, value) in gauges {
        let gauge = IntGauge::new(name, help)?;
        gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
        registry.register(Box::new(gauge))?;
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok((buffer, encoder.format_type().to_string()))
}
