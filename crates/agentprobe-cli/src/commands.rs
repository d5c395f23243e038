//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Agentprobe: end-to-end checks for the Agents UI
#[derive(Parser, Debug)]
#[command(name = "agentprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario suite against a live deployment
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Only run scenarios whose name or tag contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Retries per failing scenario
    #[arg(long)]
    pub retries: Option<u32>,

    /// Scenarios run in parallel
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Application base URL (overrides BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for failure screenshots (overrides ARTIFACTS_DIR)
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Disable the chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list scenarios whose name or tag contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_run_flags() {
            let cli = Cli::try_parse_from([
                "agentprobe",
                "run",
                "--filter",
                "delete",
                "--retries",
                "0",
                "-j",
                "4",
                "--headed",
                "--base-url",
                "https://staging.example.com",
                "--json",
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.filter.as_deref(), Some("delete"));
            assert_eq!(args.retries, Some(0));
            assert_eq!(args.workers, Some(4));
            assert!(args.headed && args.json);
            assert_eq!(args.base_url.as_deref(), Some("https://staging.example.com"));
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from(["agentprobe", "list", "-vv", "--log-json"]).unwrap();
            assert_eq!(cli.verbose, 2);
            assert!(cli.log_json);
            assert!(matches!(cli.command, Commands::List(_)));
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["agentprobe"]).is_err());
        }

        #[test]
        fn test_color_arg() {
            let cli = Cli::try_parse_from(["agentprobe", "--color", "never", "list"]).unwrap();
            assert!(matches!(cli.color, ColorArg::Never));
        }
    }
}
