use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use clap::Parser;
use nextservice::components::{
    CronComponent, HealthzComponent, HttpComponent, MetriczComponent, Provider, ScheduledJob,
};
use nextservice::{Orchestrator, ServiceConfig};
use prometheus::{IntCounter, Registry};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "nextservice")]
#[command(about = "Runs a set of service components under one managed lifecycle")]
#[command(version)]
#[command(long_about = "Starts the HTTP, health, metrics and scheduler components in order, \
runs them concurrently, and shuts all of them down within a fixed budget when any one of \
them exits or the process receives SIGINT, SIGTERM or SIGQUIT.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "nextservice.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the service")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily rotated file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let guard = init_logging(&args);

    info!("Starting nextservice v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = ServiceConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let orchestrator = build_orchestrator(&config)?;
    info!("Hosting components: {:?}", orchestrator.component_names());

    let exit_code = match orchestrator.launch().await {
        Ok(()) => {
            info!("nextservice stopped cleanly");
            0
        }
        Err(e) => {
            error!("nextservice stopped with error ({}): {}", e.as_label(), e);
            1
        }
    };

    // process::exit skips destructors; flush the file writer first.
    drop(guard);
    std::process::exit(exit_code);
}

fn build_orchestrator(config: &ServiceConfig) -> Result<Orchestrator> {
    let registry = Registry::new();
    let uptime = IntCounter::new(
        "nextservice_uptime_seconds_total",
        "Seconds the service has been running",
    )?;
    registry.register(Box::new(uptime.clone()))?;

    let router = Router::new().route("/", get(|| async { "Hello from nextservice" }));
    let http = HttpComponent::new(router, &config.server).context("building http component")?;

    let healthz = HealthzComponent::new(
        vec![Provider::from_fn("process", || async { Ok(()) })],
        &config.healthz,
    );

    let metricz =
        MetriczComponent::new(registry, &config.metricz).context("building metricz component")?;

    let cron = CronComponent::new(vec![ScheduledJob::new(
        "uptime",
        Duration::from_secs(1),
        move || {
            let uptime = uptime.clone();
            async move {
                uptime.inc();
                Ok(())
            }
        },
    )]);

    Ok(Orchestrator::builder()
        .component(http)
        .component(healthz)
        .component(metricz)
        .component(cron)
        .shutdown_timeout(config.lifecycle.shutdown_timeout())
        .build())
}

fn init_logging(args: &Args) -> Option<WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("nextservice={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "nextservice.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .init();

    guard
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# nextservice configuration file");
    println!("# Every key can be overridden with NEXTSERVICE_<SECTION>__<KEY>");
    println!();

    let rendered = toml::to_string_pretty(&ServiceConfig::default())
        .context("rendering default configuration")?;
    println!("{}", rendered);

    Ok(())
}
