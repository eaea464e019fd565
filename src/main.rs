//! Anthropic API smoke test
//!
//! Sends one Messages API request using proxy and credential settings from
//! the environment, then prints the response content or a detailed failure
//! report. The process always exits with status 0.

mod core;
mod models;

use crate::core::config::Config;
use crate::core::constants::defaults;
use crate::core::logging::init_logging;
use crate::core::runner::{SmokeOutcome, report, run};
use tracing::error;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return;
    }

    let outcome = match Config::from_env() {
        Ok(config) => {
            init_logging(&config.log_level);
            run(&config).await
        }
        Err(e) => {
            init_logging(defaults::LOG_LEVEL);
            error!("Configuration error: {:#}", e);
            SmokeOutcome::configuration_failure(e)
        }
    };

    report(&outcome);
}

/// Print help message
fn print_help() {
    println!("Anthropic API smoke test v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: anthropic-smoke [OPTIONS]");
    println!();
    println!("Sends one request to the Messages API and prints the response content,");
    println!("or a detailed error report. Always exits with status 0.");
    println!();
    println!("Options:");
    println!("  -h, --help    Display this help message");
    println!();
    println!("Environment variables (also read from .env):");
    println!("  ANTHROPIC_API_KEY  - API key (default: placeholder, which the API rejects)");
    println!("  ANTHROPIC_BASE_URL - API base URL (default: {})", defaults::BASE_URL);
    println!(
        "  HTTP_PROXY         - Proxy for http:// traffic (default: {}, \"direct\" disables)",
        defaults::HTTP_PROXY
    );
    println!(
        "  HTTPS_PROXY        - Proxy for https:// traffic (default: {}, \"direct\" disables)",
        defaults::HTTPS_PROXY
    );
    println!("  SMOKE_MODEL        - Model identifier (default: {})", defaults::MODEL);
    println!("  SMOKE_MAX_TOKENS   - Token ceiling (default: {})", defaults::MAX_TOKENS);
    println!("  SMOKE_PROMPT       - User message (default: {})", defaults::PROMPT);
    println!(
        "  REQUEST_TIMEOUT    - Request timeout in seconds (default: {})",
        defaults::REQUEST_TIMEOUT
    );
    println!("  LOG_LEVEL          - Logging level (default: {})", defaults::LOG_LEVEL);
    println!(
        "  CONFIG_PATH        - TOML config file (default: {}, if present)",
        defaults::CONFIG_PATH
    );
}
