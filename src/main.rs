use dbset::core::config::load_config;
use dbset::core::db::Session;
use dbset::sync::{format_report, synchronize};
use std::process::ExitCode;
use tracing::{error, info};

fn run(config_path: &str) -> dbset::Result<String> {
    let config = load_config(config_path)?;
    let schemas = config.schemas()?;
    let mut session = Session::new(config.session_config());

    let mut reports = Vec::with_capacity(schemas.len());
    for schema in &schemas {
        reports.push(synchronize(&mut session, schema)?);
    }

    Ok(format_report(
        &reports,
        &config.database.path.display().to_string(),
    ))
}

fn main() -> ExitCode {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let Some(config_path) = args.get(1) else {
        eprintln!("Usage: dbset <config.toml>");
        return ExitCode::from(2);
    };

    info!("Synchronizing schemas from {}", config_path);
    match run(config_path) {
        Ok(report) => {
            print!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Synchronization failed: {}", e);
            eprintln!("Synchronization failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
