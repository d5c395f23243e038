//! Output formatting for suite results

use agentprobe::{Scenario, ScenarioResult, SuiteResults};
use console::{style, Style, Term};
use serde::Serialize;
use std::time::Duration;

/// Writes run progress and summaries to the terminal
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a reporter writing to stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one line per scenario followed by the totals
    pub fn report(&self, results: &SuiteResults) {
        for result in &results.results {
            if result.passed && self.quiet {
                continue;
            }
            let _ = self.term.write_line(&self.result_line(result));
        }
        if self.quiet && results.all_passed() {
            return;
        }
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&self.summary_line(results));
    }

    /// Format a single scenario result
    #[must_use]
    pub fn result_line(&self, result: &ScenarioResult) -> String {
        let (mark, plain) = match (result.passed, result.is_flaky()) {
            (true, false) => (style("✓").green().bold(), "PASS"),
            (true, true) => (style("✓").yellow().bold(), "FLAKY"),
            (false, _) => (style("✗").red().bold(), "FAIL"),
        };
        let prefix = if self.use_color {
            mark.to_string()
        } else {
            plain.to_string()
        };
        let mut line = format!(
            "{prefix} {} ({}, {} attempt{})",
            result.name,
            format_duration(result.duration),
            result.attempts,
            if result.attempts == 1 { "" } else { "s" }
        );
        if let Some(ref error) = result.error {
            if !result.passed {
                line.push_str(&format!("\n    {error}"));
            }
        }
        if let Some(ref shot) = result.screenshot {
            line.push_str(&format!("\n    screenshot: {}", shot.display()));
        }
        line
    }

    /// Format the totals line
    #[must_use]
    pub fn summary_line(&self, results: &SuiteResults) -> String {
        let passed = results.passed_count();
        let failed = results.failed_count();
        let flaky = results.flaky_count();
        let total = results.total();
        let secs = results.duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let flaky_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            format!(
                "{status} {total} scenarios in {secs:.2}s ({} passed, {} failed, {} flaky)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                flaky_style.apply_to(flaky)
            )
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed, {flaky} flaky)"
            )
        }
    }
}

/// Scenario entry printed by `list`
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioEntry {
    /// Scenario name
    pub name: String,
    /// Tags
    pub tags: Vec<String>,
}

impl From<&Scenario> for ScenarioEntry {
    fn from(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name().to_string(),
            tags: scenario.tags().to_vec(),
        }
    }
}

/// Plain listing, one scenario per line
#[must_use]
pub fn format_listing(entries: &[ScenarioEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            if e.tags.is_empty() {
                e.name.clone()
            } else {
                format!("{} [{}]", e.name, e.tags.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a duration for display
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
