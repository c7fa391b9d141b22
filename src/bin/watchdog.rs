//! tcping-watchdog - watch TCP reachability of several destinations

use clap::Parser;
use std::process;
use std::sync::Arc;
use tcping::{
    cli::WatchdogCli,
    config::{load_config, validate_config, CliOverrides, EnvManager, ValidationLevel},
    dns::{DnsAddressResolver, SharedResolver},
    error::{AppError, ErrorReporter, Result},
    executor::{cancel_on_interrupt, parse_destinations, WatchdogScheduler},
    logging::LoggerFactory,
    output::{OutputFormatterFactory, Screen},
    probe::build_prober,
    long_version, PKG_NAME,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = WatchdogCli::parse();

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
async fn run_application(cli: &WatchdogCli) -> Result<()> {
    let config = load_config(CliOverrides::from(cli))?;
    let destinations = parse_destinations(cli.destinations.as_slice())?;
    let use_color = config.enable_color && cli.use_colors();
    let level = config.output()?;

    if config.debug {
        eprintln!("{} {}", PKG_NAME, long_version());
        eprintln!("Watching {} destinations", destinations.len());
    }

    let formatter = OutputFormatterFactory::create_formatter(use_color);
    for warning in validate_config(&config, destinations.len())? {
        if warning.level == ValidationLevel::Warning || config.verbose {
            eprintln!("{}", warning.format(use_color));
        }
    }

    let logger = LoggerFactory::new(config.clone()).create_probe_logger().await;
    let prober = build_prober(&config)?;
    let resolver: SharedResolver = Arc::new(DnsAddressResolver::from_system());
    let mut scheduler =
        WatchdogScheduler::from_destinations(&destinations, &config, resolver, prober, logger.clone())?;

    let screen = Screen::stdout();
    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancel.clone());
    let mut display_error: Option<AppError> = None;

    let outcome = scheduler
        .run(config.rounds, &cancel, |report| {
            if !level.shows_probes() || display_error.is_some() {
                return;
            }
            if let Err(e) = formatter.format_round(report).and_then(|table| screen.show(&table)) {
                display_error = Some(e);
            }
        })
        .await;
    interrupt.abort();

    // Whatever was recorded is reported even when the run stopped on an error
    let summaries = scheduler.summaries();
    if level.shows_summary() && !summaries.is_empty() {
        if level.shows_probes() {
            println!();
        }
        println!("{}", formatter.format_summaries(&summaries)?);
    }

    if let Err(e) = outcome {
        logger.log_error(&e, Some("watchdog")).await;
        return Err(e);
    }

    if let Some(e) = display_error {
        return Err(e);
    }

    if scheduler.all_fatal() {
        let reasons: Vec<String> = scheduler
            .sessions()
            .iter()
            .map(|session| match session.fatal_reason() {
                Some(reason) => format!("{} ({})", session.destination(), reason),
                None => session.destination().to_string(),
            })
            .collect();
        return Err(AppError::invalid_destination(format!(
            "No destination could be resolved: {}",
            reasons.join(", ")
        )));
    }

    Ok(())
}
