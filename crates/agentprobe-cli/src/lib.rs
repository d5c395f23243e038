//! Agentprobe CLI: runs the Agents UI end-to-end suite
//!
//! ## Usage
//!
//! ```bash
//! agentprobe list                          # Show scenarios and tags
//! agentprobe run                           # Run everything
//! agentprobe run --filter delete --headed  # Watch the delete scenarios
//! agentprobe run --json > results.json     # Machine-readable results
//! ```
//!
//! Credentials come from `USER_EMAIL` and `USER_PASSWORD`.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ListArgs, RunArgs};
pub use config::{browser_config, suite_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{format_duration, format_listing, Reporter, ScenarioEntry};
pub use runner::{list, prepare, run, selected_suite};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the verbosity flags when set.
pub fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.color.should_color()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
