//! Sumi-Sentinel main entry point
//!
//! This is the command-line interface for the Sumi-Sentinel URL scanner.

use anyhow::Context;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use sumi_sentinel::config::{load_config_with_hash, validate, Config};
use sumi_sentinel::output::{print_statistics, write_json_report, write_json_report_to_path, ScanStatistics};
use sumi_sentinel::ScanOrchestrator;
use tracing_subscriber::EnvFilter;

/// Sumi-Sentinel: A polite, resilient URL scanner
///
/// Sumi-Sentinel fetches a fixed list of URLs while respecting robots.txt
/// and a global rate limit, rotating proxies when blocked and escalating to
/// a headless browser when plain fetching is refused. Only scan resources
/// you own or are authorized to test.
#[derive(Parser, Debug)]
#[command(name = "sumi-sentinel")]
#[command(version = "1.0.0")]
#[command(about = "A polite, resilient URL scanner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write the JSON report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Validate config and show what would be scanned without making requests
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_json);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_scan(config, cli.output).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs always go to stderr so that stdout carries only the report.
fn setup_logging(verbose: u8, quiet: bool, json: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sentinel=info,warn"),
            1 => EnvFilter::new("sumi_sentinel=debug,info"),
            2 => EnvFilter::new("sumi_sentinel=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Handles the --dry-run mode: validates config and shows what would be scanned
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    if !config.disclaimer_acknowledged {
        anyhow::bail!(sumi_sentinel::ScanError::DisclaimerNotAcknowledged);
    }
    validate(config)?;

    println!("=== Sumi-Sentinel Dry Run ===\n");

    println!("Scan Configuration:");
    println!("  Concurrency: {}", config.concurrency);
    println!("  Requests per second: {}", config.requests_per_second);
    println!("  Timeout: {}s", config.timeout_seconds);
    println!("  Obey robots.txt: {}", config.obey_robots_txt);
    println!("  Browser fallback: {}", config.use_browser_fallback);
    if let Some(selector) = &config.browser_wait_selector {
        println!("  Browser wait selector: {}", selector);
    }
    if let Some(secs) = config.run_timeout_seconds {
        println!("  Run timeout: {}s", secs);
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}s base, {}s max",
        config.retry.base_backoff_seconds, config.retry.max_backoff_seconds
    );

    println!("\nProxies ({}):", config.proxies.len());
    for proxy in &config.proxies {
        println!("  - {}", proxy);
    }

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        println!("  - {}", target);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would scan {} targets", config.targets.len());

    Ok(())
}

/// Handles the main scan operation
async fn handle_scan(config: Config, output: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!(
        "Targets: {}, Proxies: {}, Concurrency: {}",
        config.targets.len(),
        config.proxies.len(),
        config.concurrency
    );

    let orchestrator = build_orchestrator(config);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling remaining targets");
            token.cancel();
        }
    });

    let results = match orchestrator.run().await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Scan failed: {}", e);
            return Err(e.into());
        }
    };

    match &output {
        Some(path) => {
            write_json_report_to_path(&results, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            tracing::info!("Report written to: {}", path.display());
        }
        None => write_json_report(&results, io::stdout().lock())?,
    }

    print_statistics(&ScanStatistics::from_results(&results));

    Ok(())
}

#[cfg(feature = "browser")]
fn build_orchestrator(config: Config) -> ScanOrchestrator {
    use std::sync::Arc;
    use sumi_sentinel::escalation::ChromiumRenderer;

    let use_browser = config.use_browser_fallback;
    let wait_selector = config.browser_wait_selector.clone();
    let wait_timeout = sumi_sentinel::config::duration_from_secs(config.timeout_seconds);
    let orchestrator = ScanOrchestrator::new(config);

    if !use_browser {
        return orchestrator;
    }

    let renderer = ChromiumRenderer::new(orchestrator.session().clone(), wait_selector, wait_timeout);
    orchestrator.with_renderer(Arc::new(renderer))
}

#[cfg(not(feature = "browser"))]
fn build_orchestrator(config: Config) -> ScanOrchestrator {
    if config.use_browser_fallback {
        tracing::warn!("Browser fallback enabled but this build has no renderer (enable the `browser` feature)");
    }
    ScanOrchestrator::new(config)
}
