//! Position Sentinel - Main Entry Point
//!
//! Polls the tracked position set, derives risk metrics, and dispatches
//! threshold alerts across the configured channels.

use anyhow::Result;
use clap::{Parser, Subcommand};
use position_sentinel::alerts::CooldownTracker;
use position_sentinel::config::Config;
use position_sentinel::metrics;
use position_sentinel::monitor::Monitor;
use position_sentinel::notify::NotificationDispatcher;
use position_sentinel::position::{PortfolioFile, PositionSource};
use position_sentinel::prices::PriceService;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Position Sentinel CLI
#[derive(Parser)]
#[command(name = "position-sentinel")]
#[command(version, about = "Risk metrics and threshold alerting for leveraged positions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single evaluation cycle and exit
    Check,

    /// Print portfolio aggregate totals from the portfolio file
    Totals {
        /// Path to the JSON portfolio document (default from config)
        #[arg(short, long)]
        portfolio: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;

    match cli.command {
        Some(Commands::Check) => return run_check(&config).await,
        Some(Commands::Totals { portfolio }) => {
            let path = portfolio.unwrap_or_else(|| config.monitor.portfolio_path.clone());
            return show_totals(&path).await;
        }
        None => {}
    }

    info!(
        "🛰️  Position Sentinel v{} - position risk monitor",
        env!("CARGO_PKG_VERSION")
    );
    log_config(&config);

    let monitor = build_monitor(&config);

    // Shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Shutdown signal received");
        shutdown_tx.send(true).ok();
    });

    monitor.run(shutdown_rx).await;

    info!("👋 Position Sentinel shutdown complete");
    Ok(())
}

/// Wire the monitor from configuration.
fn build_monitor(config: &Config) -> Monitor {
    let source = Box::new(PortfolioFile::new(&config.monitor.portfolio_path));
    let prices = PriceService::from_config(&config.prices);
    let cooldown = CooldownTracker::new(config.monitor.cooldown_secs);
    let dispatcher = NotificationDispatcher::from_config(&config.notification);

    Monitor::new(config, source, prices, cooldown, dispatcher)
}

/// Run exactly one evaluation cycle (the "check alerts now" action).
async fn run_check(config: &Config) -> Result<()> {
    let monitor = build_monitor(config);
    match monitor.tick().await {
        Ok(summary) => {
            if !summary.evaluated {
                warn!("Alert monitoring is disabled in configuration; nothing checked");
                return Ok(());
            }
            println!(
                "Checked {} positions ({} failed): {} alerts dispatched, {} suppressed by cooldown",
                summary.positions_checked,
                summary.positions_failed,
                summary.alerts_dispatched,
                summary.alerts_suppressed
            );
            Ok(())
        }
        Err(e) => {
            error!("Check failed: {e:#}");
            Err(e)
        }
    }
}

/// Print portfolio aggregate totals.
async fn show_totals(path: &str) -> Result<()> {
    let source = PortfolioFile::new(path);
    let positions = source.read_all().await?;

    let enriched: Vec<_> = positions
        .into_iter()
        .map(|pos| {
            let derived = metrics::compute(&pos);
            (pos, derived)
        })
        .collect();

    println!("Portfolio: {} positions", enriched.len());
    println!();
    println!(
        "{:<12} {:<6} {:>12} {:>10} {:>9} {:>10} {:>10}",
        "ID", "ASSET", "VALUE", "LEVERAGE", "TRAVEL%", "LIQ DIST", "HEAT"
    );
    for (pos, derived) in &enriched {
        println!(
            "{:<12} {:<6} {:>12.2} {:>10} {:>9.2} {:>10.2} {:>10}",
            pos.id,
            pos.asset,
            derived.value,
            derived
                .leverage
                .map(|l| format!("{l:.2}"))
                .unwrap_or_else(|| "-".to_string()),
            derived.travel_percent,
            derived.liquidation_distance,
            derived
                .heat_index
                .map(|h| format!("{h:.2}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    let totals = metrics::aggregate_totals(&enriched);
    println!();
    println!("Total size:        {:.2}", totals.total_size);
    println!("Total value:       {:.2}", totals.total_value);
    println!("Total collateral:  {:.2}", totals.total_collateral);
    println!("Avg leverage:      {:.2}", totals.avg_leverage);
    println!("Avg travel %:      {:.2}", totals.avg_travel_percent);
    println!("Avg heat index:    {:.2}", totals.avg_heat_index);

    Ok(())
}

/// Initialize comprehensive logging with file output.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "position-sentinel.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Leak the guard to keep it alive for the program duration
    Box::leak(Box::new(_guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("position_sentinel=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

/// Log effective configuration on startup.
fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!("   Monitoring Enabled: {}", config.monitor.enabled);
    info!(
        "   Poll Interval: {}s",
        config.monitor.poll_interval_secs
    );
    info!("   Alert Cooldown: {}s", config.monitor.cooldown_secs);
    info!("   Portfolio File: {}", config.monitor.portfolio_path);
    info!(
        "   Price Feeds: coingecko={} binance={} (timeout {}s)",
        config.prices.coingecko_enabled,
        config.prices.binance_enabled,
        config.prices.fetch_timeout_secs
    );
    info!("   Tracked Assets: {}", config.prices.assets.join(", "));
    info!(
        "   Email Notifications: {}",
        if config.notification.email.is_some() {
            "configured"
        } else {
            "disabled"
        }
    );
    info!(
        "   SMS Notifications: {}",
        if config.notification.sms.is_some() {
            "configured"
        } else {
            "disabled"
        }
    );
}
