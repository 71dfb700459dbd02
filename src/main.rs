//! instafetch - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use instafetch::{
    api::{Endpoints, HttpFetcher},
    cli::Args,
    config::{validate_config, Config},
    download::Orchestrator,
    error::{exit_codes, Error, Result},
    output::{print_banner, print_config_summary, print_error, print_run_stats, print_warning},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    let debug = args.debug;

    // Load configuration
    let mut config = Config::load_or_default(&args.config)?;
    args.merge_into_config(&mut config);

    // Set up logging once `quiet` is known from both sources
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level(debug)));

    fmt().with_env_filter(filter).with_target(false).init();

    validate_config(&config)?;

    let quiet = config.options.quiet;
    let plan = config.run_plan();

    if !quiet {
        print_banner();
        print_config_summary(
            &plan.accounts,
            &config.options.mode.to_string(),
            &plan.output_root.display().to_string(),
            plan.pool.workers,
        );
    }

    // Ctrl-C stops producers and workers after their current step
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            print_warning("Interrupted, finishing in-flight work...");
            on_interrupt.cancel();
        }
    });

    let fetcher = Arc::new(HttpFetcher::new(config.request_timeout(), cancel.clone())?);
    let orchestrator = Orchestrator::new(fetcher, Endpoints::default(), cancel);

    let report = orchestrator.run(plan).await?;

    if !quiet {
        print_run_stats(&report);
    }

    report.into_result().map(|_| ())
}
