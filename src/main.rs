use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spark_watch::client::{BarkNotifier, DirectFeedClient, FallbackFeed, FeedSource, FileFeed};
use spark_watch::config::Config;
use spark_watch::transport::{run_notifier, AlertBus};
use spark_watch::util::display;
use spark_watch::{Monitor, MonitorSettings, TokenRecordParser};

/// Spark pulse token monitor
#[derive(Parser)]
#[command(name = "sparkwatch", about = "Watch the Spark pulse feed for newly launched tokens")]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true, env = "SPARKWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Minutes between polls
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// First-run "newly created" window in minutes
    #[arg(long, global = true)]
    threshold: Option<i64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll continuously until Ctrl+C (default)
    Watch,
    /// Run a single check and exit
    Once,
    /// Feed a saved API response through the monitor twice
    Replay {
        /// JSON file shaped like the API response: {"data": [...]}
        file: PathBuf,
    },
    /// Call the API once and print the first few tokens
    Probe,
}

fn init_tracing(debug: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all("logs").context("creating logs directory")?;

    let file_appender = tracing_appender::rolling::daily("logs", "sparkwatch.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json()
        .with_current_span(false)
        .with_span_list(true);

    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(interval) = cli.interval {
        config.check_interval_minutes = interval;
    }
    if let Some(threshold) = cli.threshold {
        config.new_token_threshold_minutes = threshold;
    }
    config.validate()?;
    Ok(config)
}

async fn watch(config: Config) -> Result<()> {
    display::print_banner(&config.api_url, config.check_interval_minutes);

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let alert_bus = AlertBus::new();
    let mut tasks = Vec::new();

    if config.bark_enabled() {
        let notifier = BarkNotifier::new(&config.bark_endpoint)?;
        let alerts = alert_bus.subscribe();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(run_notifier(notifier, alerts, shutdown)));
    } else {
        info!("📱 Bark push not configured");
    }

    let feed = FallbackFeed::from_config(&config)?;
    let monitor = Monitor::new(Box::new(feed), alert_bus, MonitorSettings::from_config(&config));
    let monitor_shutdown = shutdown_tx.subscribe();
    tasks.push(tokio::spawn(async move { monitor.run(monitor_shutdown).await }));

    info!("👂 Watching the pulse feed, press Ctrl+C to exit");
    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    let _ = shutdown_tx.send(());
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Task failed during shutdown: {}", e);
        }
    }

    info!("👋 Spark monitor stopped");
    Ok(())
}

async fn once(config: Config) -> Result<()> {
    let alert_bus = AlertBus::new();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let worker = if config.bark_enabled() {
        let notifier = BarkNotifier::new(&config.bark_endpoint)?;
        Some(tokio::spawn(run_notifier(
            notifier,
            alert_bus.subscribe(),
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    let feed = FallbackFeed::from_config(&config)?;
    let monitor = Monitor::new(Box::new(feed), alert_bus, MonitorSettings::from_config(&config));
    let report = monitor.run_once().await;

    // Dropping the monitor closes the bus; the worker drains what is queued and exits
    drop(monitor);
    if let Some(worker) = worker {
        worker.await?;
    }

    report.map(|_| ()).context("could not fetch the pulse feed")
}

async fn replay(config: Config, file: PathBuf) -> Result<()> {
    let mut settings = MonitorSettings::from_config(&config);
    settings.push_enabled = false;
    let monitor = Monitor::new(Box::new(FileFeed::new(file.clone())), AlertBus::new(), settings);

    println!("{}", "🧪 Replaying saved feed".bright_magenta().bold());
    println!("📁 {}", file.display());

    let first = monitor.run_once().await.context("reading saved feed")?;
    println!(
        "First pass: {} tokens, {} reported, {} rejected",
        first.total,
        first.reported.len(),
        first.rejected
    );

    let second = monitor.run_once().await.context("reading saved feed")?;
    println!(
        "Second pass: {} tokens, {} reported",
        second.total,
        second.reported.len()
    );
    println!("{}", "✅ Replay finished, repeated tokens were not reported again".green());
    Ok(())
}

async fn probe(config: Config) -> Result<()> {
    println!("🧪 Probing {}", config.api_url.cyan());
    let client = DirectFeedClient::new(&config)?;
    let items = client.fetch().await.context("pulse API call failed")?;
    println!("{} {} items", "✅ API reachable,".green(), items.len());

    let offset = display::display_offset(config.timezone_offset_hours);
    let parsed = TokenRecordParser::parse_batch(&items[..items.len().min(3)]);
    display::print_token_list("First tokens:", &parsed.tokens, 3, offset);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.debug)?;
    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Command::Watch) => watch(config).await,
        Some(Command::Once) => once(config).await,
        Some(Command::Replay { file }) => replay(config, file).await,
        Some(Command::Probe) => probe(config).await,
    }
}
