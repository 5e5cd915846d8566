use charon_billing::{
    config::BillingConfig,
    processor::BatchProcessor,
    provider::SimulatedPaymentProvider,
    scheduler::BillingScheduler,
    store::MemoryInvoiceStore,
    throttle::ThrottleController,
};

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::{path::PathBuf, sync::Arc};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "charon-billing")]
#[command(about = "Charon Billing Service - recurring invoice charging")]
struct Args {
    #[arg(short, long, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Generate sample configuration file")]
    gen_config: bool,

    #[arg(long, help = "Dry run mode (validate config without starting)")]
    dry_run: bool,

    #[arg(long, help = "Run a single billing cycle immediately and exit")]
    demo: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    charon_common::logging::init_logging(&args.verbosity, "charon_billing=info")?;

    if args.gen_config {
        let config = BillingConfig::default();
        let toml = toml::to_string_pretty(&config)?;
        println!("{}", toml);
        return Ok(());
    }

    let cfg = BillingConfig::load(args.config).context("Failed to load configuration")?;
    cfg.validate().context("Configuration validation failed")?;
    let tz = cfg.timezone().context("Failed to resolve timezone")?;

    if args.dry_run {
        info!("Configuration loaded successfully (dry-run mode)");
        info!("Billing timezone: {}", tz);
        info!(
            "Throttle: multiplier {}ms, max level {}",
            cfg.throttle.multiplier_ms, cfg.throttle.max_level
        );
        info!(
            "Processor: max retries {}, max in flight {}",
            cfg.processor.max_retries, cfg.processor.max_in_flight
        );
        return Ok(());
    }

    info!("Starting charon-billing service");
    info!("Billing timezone: {}", tz);

    // Demo wiring: seeded in-memory store and simulated provider.
    // Real provider and store integrations plug in behind the same
    // traits.
    let store = Arc::new(MemoryInvoiceStore::seeded(cfg.simulation.invoice_count));
    let provider = Arc::new(SimulatedPaymentProvider::from_config(&cfg.simulation));
    let throttle = Arc::new(ThrottleController::new(
        cfg.throttle.max_level,
        cfg.throttle.multiplier_ms,
    ));
    let processor = Arc::new(BatchProcessor::new(
        provider,
        store,
        throttle,
        &cfg.processor,
    ));

    if args.demo {
        info!(
            "Demo mode: processing {} seeded invoices now",
            cfg.simulation.invoice_count
        );
        let outcome = processor.run_pending().await?;
        info!(
            processed = outcome.processed,
            failed = outcome.failed,
            "demo billing cycle complete"
        );
        return Ok(());
    }

    let scheduler = BillingScheduler::new(processor, tz);

    tokio::select! {
        r = scheduler.run() => {
            r.context("Billing scheduler failed")?;
        },
        _ = shutdown_signal() => {
            warn!("Received shutdown signal");
        }
    }

    info!("Charon billing service shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
