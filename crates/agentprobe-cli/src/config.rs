//! CLI configuration

use crate::commands::{Cli, RunArgs};
use crate::error::{CliError, CliResult};
use agentprobe::{BrowserConfig, SuiteConfig};
use serde::{Deserialize, Serialize};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Map `-q` and the `-v` count to a level
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "agentprobe=warn",
            Self::Normal => "agentprobe=info",
            Self::Verbose => "agentprobe=debug",
            Self::Debug => "agentprobe=trace,chromiumoxide=debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// JSON log lines
    pub log_json: bool,
}

impl CliConfig {
    /// Build from parsed global flags
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
            color: cli.color.into(),
            log_json: cli.log_json,
        }
    }
}

/// Resolve the suite configuration for `run`.
///
/// Layers, lowest first: defaults, the YAML file, the environment, then
/// command-line flags.
pub fn suite_config<F>(args: &RunArgs, lookup: F) -> CliResult<SuiteConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match args.config {
        Some(ref path) => SuiteConfig::from_yaml_file(path).map_err(|e| {
            CliError::config(format!("cannot load {}: {e}", path.display()))
        })?,
        None => SuiteConfig::default(),
    };
    let mut config = base.merge_env(lookup);

    if let Some(ref url) = args.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CliError::invalid_argument(format!(
                "--base-url must be an http(s) URL, got {url}"
            )));
        }
        config.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::invalid_argument("--workers must be at least 1"));
        }
        config.workers = workers;
    }
    if args.headed {
        config.headless = false;
    }
    if let Some(ref dir) = args.artifacts {
        config.artifacts_dir = dir.clone();
    }
    Ok(config)
}

/// Browser launch settings for a resolved suite configuration
#[must_use]
pub fn browser_config(args: &RunArgs, suite: &SuiteConfig) -> BrowserConfig {
    let mut config = BrowserConfig::from(suite);
    if let Some(ref path) = args.chromium_path {
        config = config.with_chromium_path(path);
    }
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    config
}
