//! Command execution

use crate::commands::{ListArgs, RunArgs};
use crate::config::{suite_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::{format_listing, Reporter, ScenarioEntry};
use agentprobe::scenarios;
use agentprobe::{Suite, SuiteConfig, SuiteResults};
use tracing::info;

/// Scenarios selected by an optional filter
#[must_use]
pub fn selected_suite(filter: Option<&str>) -> Suite {
    scenarios::suite().filter(filter)
}

/// Print the scenario catalog
pub fn list(args: &ListArgs) -> CliResult<String> {
    let suite = selected_suite(args.filter.as_deref());
    let entries: Vec<ScenarioEntry> = suite.scenarios().iter().map(ScenarioEntry::from).collect();
    if args.json {
        Ok(serde_json::to_string_pretty(&entries)?)
    } else {
        Ok(format_listing(&entries))
    }
}

/// Check everything that can fail before a browser is launched
pub fn prepare(args: &RunArgs) -> CliResult<(SuiteConfig, Suite)> {
    let config = suite_config(args, |key| std::env::var(key).ok())?;
    config.credentials.validate()?;

    let suite = selected_suite(args.filter.as_deref());
    if suite.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenario matches filter {:?}",
            args.filter.as_deref().unwrap_or_default()
        )));
    }
    Ok((config, suite))
}

/// Run the selected scenarios and report them.
///
/// Returns an error when any scenario failed, so the process exits non-zero.
pub async fn run(cli: &CliConfig, args: &RunArgs) -> CliResult<SuiteResults> {
    let (config, suite) = prepare(args)?;
    let reporter = Reporter::new(cli.color.should_color(), cli.verbosity.is_quiet());

    tokio::fs::create_dir_all(&config.artifacts_dir).await?;
    reporter.header(&format!("agentprobe: {} scenarios against {}", suite.len(), config.base_url));
    info!(
        base_url = %config.base_url,
        workers = config.workers,
        retries = config.retries,
        headless = config.headless,
        "starting run"
    );

    let results = execute(args, config, &suite).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        reporter.report(&results);
    }

    if results.all_passed() {
        Ok(results)
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} scenarios failed",
            results.failed_count(),
            results.total()
        )))
    }
}

#[cfg(feature = "browser")]
async fn execute(args: &RunArgs, config: SuiteConfig, suite: &Suite) -> CliResult<SuiteResults> {
    use crate::config::browser_config;
    use agentprobe::{Browser, PageFactory, SuiteRunner};
    use std::sync::Arc;
    use tracing::warn;

    let browser = Arc::new(Browser::launch(browser_config(args, &config)).await?);
    let factory: Arc<dyn PageFactory> = browser.clone();
    let runner = SuiteRunner::new(factory, Arc::new(config));
    let results = runner.run(suite).await;

    let leftovers = runner.tracker().tracked();
    if !leftovers.is_empty() {
        warn!(agents = ?leftovers, "agents created during the run may need manual cleanup");
    }
    if let Err(e) = browser.close().await {
        warn!(error = %e, "browser did not close cleanly");
    }
    Ok(results)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn execute(_args: &RunArgs, _config: SuiteConfig, _suite: &Suite) -> CliResult<SuiteResults> {
    Err(CliError::config("agentprobe was built without the `browser` feature"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod list_tests {
        use super::*;

        #[test]
        fn test_list_all() {
            let listing = list(&ListArgs::default()).unwrap();
            assert_eq!(listing.lines().count(), scenarios::suite().len());
            assert!(listing.contains("[smoke"));
        }

        #[test]
        fn test_list_filtered_json() {
            let listing = list(&ListArgs {
                filter: Some("delete".into()),
                json: true,
            })
            .unwrap();
            let entries: Vec<serde_json::Value> = serde_json::from_str(&listing).unwrap();
            assert!(!entries.is_empty());
            assert!(entries.len() < scenarios::suite().len());
        }

        #[test]
        fn test_unknown_filter_selects_nothing() {
            assert!(selected_suite(Some("no-such-scenario")).is_empty());
        }
    }
}
