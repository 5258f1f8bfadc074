use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use docwatch::config::load_config;
use docwatch::error::{ConfigError, DocwatchError};
use docwatch::{logging, HttpExtractionService, WatchController};

const CONFIG_ENV: &str = "DOCWATCH_CONFIG";

/// First CLI argument, then `DOCWATCH_CONFIG`, then the user config directory.
fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args_os().nth(1) {
        return Some(PathBuf::from(arg));
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("docwatch").join("config.json"))
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), DocwatchError> {
    let Some(path) = config_path() else {
        return Err(ConfigError::Validation {
            message: format!("no config file given; pass a path or set {CONFIG_ENV}"),
        }
        .into());
    };

    let config = load_config(&path)?;
    logging::init(&config.logging)?;
    info!(
        "Starting docwatch v{} with {}",
        env!("CARGO_PKG_VERSION"),
        path.display()
    );

    let api_key = config.extraction.resolve_api_key()?;
    let service = HttpExtractionService::new(&config.extraction, api_key)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        error!("Failed to install Ctrl+C handler: {}", e);
    }

    let controller = WatchController::from_config(&config, Arc::new(service))?;

    println!(
        "Monitoring {} for new PDF files. Press Ctrl+C to stop.",
        controller.watch_directory().display()
    );

    let stats = controller.run(shutdown)?;

    info!(
        "Processed {} files ({} stored, {} skipped, {} failed)",
        stats.total(),
        stats.stored,
        stats.skipped,
        stats.failed
    );
    println!("Monitoring stopped.");
    Ok(())
}
