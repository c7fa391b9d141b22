//! tcping - measure TCP handshake latency to a single destination

use clap::Parser;
use std::process;
use std::sync::Arc;
use tcping::{
    cli::PingCli,
    config::{load_config, validate_config, CliOverrides, EnvManager, ValidationLevel},
    dns::{DnsAddressResolver, SharedResolver},
    error::{AppError, ErrorReporter, Result},
    executor::{cancel_on_interrupt, TargetSession},
    logging::LoggerFactory,
    output::OutputFormatterFactory,
    probe::build_prober,
    types::OutputLevel,
    long_version, PKG_NAME,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = PingCli::parse();

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return;
    }

    if let Err(e) = run_application(&cli).await {
        ErrorReporter::new(cli.use_colors(), cli.verbose).report_error(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: &PingCli) -> Result<()> {
    let config = load_config(CliOverrides::from(cli))?;
    let destination = cli
        .destination
        .clone()
        .ok_or_else(|| AppError::validation("A destination is required"))?;
    let use_color = config.enable_color && cli.use_colors();
    let level = config.output()?;

    if config.debug {
        eprintln!("{} {}", PKG_NAME, long_version());
    }

    let formatter = OutputFormatterFactory::create_formatter(use_color);
    for warning in validate_config(&config, 1)? {
        if warning.level == ValidationLevel::Warning || config.verbose {
            eprintln!("{}", warning.format(use_color));
        }
    }

    let logger = LoggerFactory::new(config.clone()).create_probe_logger().await;
    let prober = build_prober(&config)?;
    let resolver: SharedResolver = Arc::new(DnsAddressResolver::from_system());
    let mut session = TargetSession::new(destination, config.port, config.use_ipv6, resolver, prober)
        .with_logger(logger);

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());

    let outcome = session
        .run(config.probe_count(), config.delay(), &cancel, |record| {
            if level.shows_probes() {
                println!("{}", formatter.format_probe(record));
            }
        })
        .await;
    interrupt.abort();

    // Probes taken before a mid-run failure are still summarized
    if level.shows_summary() && !session.history().is_empty() {
        if level == OutputLevel::All {
            println!();
        }
        println!("{}", formatter.format_summary(&session.summary()?));
    }

    outcome.map(|_| ())
}
