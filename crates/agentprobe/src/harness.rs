//! Scenario harness.
//!
//! A [`Scenario`] is a named async body over a [`ScenarioContext`]. The
//! [`SuiteRunner`] gives every attempt a fresh page from its
//! [`PageFactory`], keeps at most `workers` scenarios in flight, retries
//! failures, and bounds each attempt with the per-test ceiling.

use crate::config::SuiteConfig;
use crate::data::TestDataTracker;
use crate::driver::SharedPage;
use crate::fixture::PageObjects;
use crate::pages::{AgentsPage, LoginPage};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Source of fresh pages, one per scenario attempt
#[async_trait]
pub trait PageFactory: Send + Sync {
    /// Open a new page in a fresh context
    async fn new_page(&self) -> ProbeResult<SharedPage>;
}

/// Everything a scenario body can reach
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pages: PageObjects,
    tracker: Arc<TestDataTracker>,
    attempt: u32,
}

impl ScenarioContext {
    /// Context over `page`
    #[must_use]
    pub fn new(page: SharedPage, config: Arc<SuiteConfig>, tracker: Arc<TestDataTracker>, attempt: u32) -> Self {
        Self {
            pages: PageObjects::new(page, config),
            tracker,
            attempt,
        }
    }

    /// Suite configuration
    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        self.pages.config()
    }

    /// Page object factory
    #[must_use]
    pub const fn pages(&self) -> &PageObjects {
        &self.pages
    }

    /// Login form
    #[must_use]
    pub fn login_page(&self) -> LoginPage {
        self.pages.login_page()
    }

    /// Signed-in agents list
    pub async fn authenticated_agents_page(&self) -> ProbeResult<AgentsPage> {
        self.pages.authenticated_agents_page().await
    }

    /// Agents created during the run
    #[must_use]
    pub fn tracker(&self) -> &TestDataTracker {
        &self.tracker
    }

    /// 1-based attempt number
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

type ScenarioBody = Arc<dyn Fn(ScenarioContext) -> BoxFuture<'static, ProbeResult<()>> + Send + Sync>;

/// A named end-to-end check
#[derive(Clone)]
pub struct Scenario {
    name: String,
    tags: Vec<String>,
    body: ScenarioBody,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Scenario running `body`
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            tags: Vec::new(),
            body: Arc::new(move |ctx| Box::pin(body(ctx))),
        }
    }

    /// Add a tag
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Name or a tag contains `filter`, case-insensitively
    #[must_use]
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.to_lowercase();
        self.name.to_lowercase().contains(&filter)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&filter))
    }

    /// File-name-safe form of the name
    #[must_use]
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_matches('-').to_string()
    }
}

/// Ordered scenario collection
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    scenarios: Vec<Scenario>,
}

impl Suite {
    /// Empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenarios: Vec::new(),
        }
    }

    /// Append a scenario
    #[must_use]
    pub fn with(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Keep only scenarios matching `filter`
    #[must_use]
    pub fn filter(mut self, filter: Option<&str>) -> Self {
        if let Some(filter) = filter {
            self.scenarios.retain(|s| s.matches(filter));
        }
        self
    }

    /// Suite name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scenarios in declaration order
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// No scenarios
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Outcome of one scenario across its attempts
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Last attempt passed
    pub passed: bool,
    /// Attempts made
    pub attempts: u32,
    /// Error of the last failed attempt
    pub error: Option<String>,
    /// Wall time across all attempts
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Screenshot taken on the last failure
    pub screenshot: Option<std::path::PathBuf>,
}

impl ScenarioResult {
    /// Passed, but only after a retry
    #[must_use]
    pub const fn is_flaky(&self) -> bool {
        self.passed && self.attempts > 1
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Results of a suite run, in declaration order
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Per-scenario results
    pub results: Vec<ScenarioResult>,
    /// Total wall time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SuiteResults {
    /// Every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Scenarios that needed a retry to pass
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_flaky()).count()
    }

    /// Scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Failed results
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// Runs suites against pages from a [`PageFactory`]
pub struct SuiteRunner {
    factory: Arc<dyn PageFactory>,
    config: Arc<SuiteConfig>,
    tracker: Arc<TestDataTracker>,
}

impl fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("workers", &self.config.workers)
            .field("retries", &self.config.retries)
            .finish_non_exhaustive()
    }
}

impl SuiteRunner {
    /// Runner over `factory`
    #[must_use]
    pub fn new(factory: Arc<dyn PageFactory>, config: Arc<SuiteConfig>) -> Self {
        Self {
            factory,
            config,
            tracker: Arc::new(TestDataTracker::new()),
        }
    }

    /// Agents created by scenarios run so far
    #[must_use]
    pub fn tracker(&self) -> &TestDataTracker {
        &self.tracker
    }

    /// Run every scenario, at most `workers` at a time
    pub async fn run(&self, suite: &Suite) -> SuiteResults {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        info!(suite = suite.name(), scenarios = suite.len(), workers, "running suite");

        let mut indexed: Vec<(usize, ScenarioResult)> = stream::iter(suite.scenarios().iter().enumerate())
            .map(|(i, scenario)| async move { (i, self.run_scenario(scenario).await) })
            .buffer_unordered(workers)
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);

        let results = SuiteResults {
            suite_name: suite.name().to_string(),
            results: indexed.into_iter().map(|(_, r)| r).collect(),
            duration: started.elapsed(),
        };
        info!(
            passed = results.passed_count(),
            failed = results.failed_count(),
            flaky = results.flaky_count(),
            "suite finished"
        );
        results
    }

    /// Run one scenario with retries
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let started = Instant::now();
        let max_attempts = self.config.retries.saturating_add(1);
        let mut last_error = None;
        let mut screenshot = None;

        for attempt in 1..=max_attempts {
            info!(scenario = scenario.name(), attempt, "starting");
            match self.attempt(scenario, attempt).await {
                Ok(()) => {
                    info!(scenario = scenario.name(), attempt, "passed");
                    return ScenarioResult {
                        name: scenario.name().to_string(),
                        passed: true,
                        attempts: attempt,
                        error: None,
                        duration: started.elapsed(),
                        screenshot: None,
                    };
                }
                Err((e, shot)) => {
                    warn!(scenario = scenario.name(), attempt, error = %e, "attempt failed");
                    last_error = Some(e.to_string());
                    screenshot = shot;
                }
            }
        }

        error!(scenario = scenario.name(), "failed");
        ScenarioResult {
            name: scenario.name().to_string(),
            passed: false,
            attempts: max_attempts,
            error: last_error,
            duration: started.elapsed(),
            screenshot,
        }
    }

    async fn attempt(
        &self,
        scenario: &Scenario,
        attempt: u32,
    ) -> Result<(), (ProbeError, Option<std::path::PathBuf>)> {
        let page = self.factory.new_page().await.map_err(|e| (e, None))?;
        let ctx = ScenarioContext::new(page.clone(), self.config.clone(), self.tracker.clone(), attempt);
        let ceiling = self.config.timeouts.test;

        let outcome = match tokio::time::timeout(ceiling, (scenario.body)(ctx.clone())).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::timeout(ceiling, format!("scenario \"{}\"", scenario.name()))),
        };

        let result = match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                let name = format!("{}-attempt{attempt}.png", scenario.slug());
                let shot = ctx.pages().base_page().capture_screenshot(&name).await;
                Err((e, shot))
            }
        };
        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    struct MockFactory {
        opened: AtomicUsize,
    }

    #[async_trait]
    impl PageFactory for MockFactory {
        async fn new_page(&self) -> ProbeResult<SharedPage> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(MockDriver::shared())
        }
    }

    fn runner(retries: u32, workers: usize) -> (SuiteRunner, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory {
            opened: AtomicUsize::new(0),
        });
        let config = SuiteConfig {
            retries,
            workers,
            artifacts_dir: std::env::temp_dir().join("agentprobe-harness-tests"),
            ..SuiteConfig::default()
        };
        (SuiteRunner::new(factory.clone(), Arc::new(config)), factory)
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_filter_by_name_and_tag() {
            let suite = Suite::new("agents")
                .with(Scenario::new("Create agent", |_| async { Ok(()) }).tag("smoke"))
                .with(Scenario::new("Delete agent", |_| async { Ok(()) }));
            assert_eq!(suite.clone().filter(Some("delete")).len(), 1);
            assert_eq!(suite.clone().filter(Some("SMOKE")).len(), 1);
            assert_eq!(suite.clone().filter(None).len(), 2);
            assert!(suite.filter(Some("nothing")).is_empty());
        }

        #[test]
        fn test_slug() {
            let s = Scenario::new("TC-05: Edit agent context!", |_| async { Ok(()) });
            assert_eq!(s.slug(), "tc-05-edit-agent-context");
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_retry_on_fresh_page() {
            let (runner, factory) = runner(2, 1);
            let scenario = Scenario::new("flaky", |ctx: ScenarioContext| async move {
                crate::result::ensure(ctx.attempt() >= 2, "first attempt fails")
            });

            let result = runner.run_scenario(&scenario).await;
            assert!(result.passed);
            assert!(result.is_flaky());
            assert_eq!(result.attempts, 2);
            assert_eq!(factory.opened.load(Ordering::SeqCst), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_retry_budget_saturates() {
            let (runner, factory) = runner(u32::MAX, 1);
            let scenario = Scenario::new("passes", |_| async { Ok(()) });

            let result = runner.run_scenario(&scenario).await;
            assert!(result.passed);
            assert_eq!(result.attempts, 1);
            assert_eq!(factory.opened.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_failure_keeps_last_error_and_screenshot() {
            let (runner, _) = runner(1, 1);
            let scenario = Scenario::new("always fails", |_| async {
                Err(ProbeError::assertion("agent should be listed"))
            });

            let result = runner.run_scenario(&scenario).await;
            assert!(!result.passed);
            assert_eq!(result.attempts, 2);
            assert!(result.error.unwrap().contains("agent should be listed"));
            let shot = result.screenshot.unwrap();
            assert!(shot.ends_with("always-fails-attempt2.png"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_ceiling_bounds_attempt() {
            let (runner, _) = runner(0, 1);
            let scenario = Scenario::new("hangs", |_| async {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            });
            let result = runner.run_scenario(&scenario).await;
            assert!(!result.passed);
            assert!(result.error.unwrap().contains("Timed out after 240000ms"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_bounded_parallelism_and_order() {
            let (runner, _) = runner(0, 2);
            let running = Arc::new(AtomicU32::new(0));
            let peak = Arc::new(AtomicU32::new(0));

            let mut suite = Suite::new("parallel");
            for i in 0..5u64 {
                let running = running.clone();
                let peak = peak.clone();
                suite = suite.with(Scenario::new(format!("s{i}"), move |_| {
                    let running = running.clone();
                    let peak = peak.clone();
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100 * (5 - i))).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                }));
            }

            let results = runner.run(&suite).await;
            assert!(results.all_passed());
            assert_eq!(peak.load(Ordering::SeqCst), 2);
            let names: Vec<&str> = results.results.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, ["s0", "s1", "s2", "s3", "s4"]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_results_serialize() {
            let (runner, _) = runner(0, 1);
            let suite = Suite::new("json")
                .with(Scenario::new("ok", |_| async { Ok(()) }))
                .with(Scenario::new("bad", |_| async { Err(ProbeError::assertion("x")) }));
            let results = runner.run(&suite).await;
            assert_eq!(results.passed_count(), 1);
            assert_eq!(results.failures().count(), 1);

            let json = serde_json::to_value(&results).unwrap();
            assert_eq!(json["suite_name"], "json");
            assert_eq!(json["results"][1]["passed"], false);
            assert!(json["results"][0]["duration_ms"].is_u64());
        }
    }
}
