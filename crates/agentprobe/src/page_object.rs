//! Base page shared by every page object.
//!
//! Operations come in two tiers. Advisory operations (`wait_for_stable`,
//! `capture_screenshot`, `exists`, `safe_click`, `safe_fill`) log failures
//! and return a plain value. Mandatory operations return [`ProbeResult`] and
//! their errors fail the scenario.

use crate::driver::{PageDriver, SharedPage};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::timeouts::TimeoutPolicy;
use crate::wait::{self, LoadState};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A page or view of the application
pub trait PageObject {
    /// URL fragment identifying the page
    fn url_pattern(&self) -> &str;

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Primitives every page object is built from
#[derive(Clone)]
pub struct BasePage {
    page: SharedPage,
    timeouts: TimeoutPolicy,
    artifacts_dir: PathBuf,
}

impl std::fmt::Debug for BasePage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasePage")
            .field("timeouts", &self.timeouts)
            .field("artifacts_dir", &self.artifacts_dir)
            .finish_non_exhaustive()
    }
}

impl BasePage {
    /// Wrap a page
    #[must_use]
    pub fn new(page: SharedPage, timeouts: TimeoutPolicy) -> Self {
        Self {
            page,
            timeouts,
            artifacts_dir: PathBuf::from("test-results"),
        }
    }

    /// Set the screenshot directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    /// Shared handle to the underlying driver
    #[must_use]
    pub fn shared(&self) -> SharedPage {
        SharedPage::clone(&self.page)
    }

    /// Timeout policy
    #[must_use]
    pub const fn timeouts(&self) -> &TimeoutPolicy {
        &self.timeouts
    }

    /// Screenshot directory
    #[must_use]
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Navigate to `url`, bounded by the page-load timeout
    pub async fn goto(&self, url: &str) -> ProbeResult<()> {
        debug!(url, "navigating");
        match tokio::time::timeout(self.timeouts.page_load, self.page.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(ProbeError::timeout(
                self.timeouts.page_load,
                format!("navigation to {url}"),
            )),
        }
    }

    /// Current URL, empty when the page cannot report one
    pub async fn url(&self) -> String {
        self.page.current_url().await.unwrap_or_default()
    }

    /// Sleep for a fixed settle time
    pub async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Wait for network quiescence (bounded by page load), then settle.
    ///
    /// Advisory: a page that never goes idle only costs time.
    pub async fn wait_for_stable(&self, settle: Duration) {
        if let Err(e) =
            wait::wait_for_load_state(self.driver(), LoadState::NetworkIdle, self.timeouts.page_load).await
        {
            debug!(error = %e, "page did not reach network idle");
        }
        self.pause(settle).await;
    }

    /// Best-effort wait for a load state
    pub async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) {
        if let Err(e) = wait::wait_for_load_state(self.driver(), state, timeout).await {
            debug!(error = %e, %state, "load state not reached");
        }
    }

    /// Write a full-page screenshot to `<artifacts>/<name>`.
    ///
    /// Advisory: returns the path written, or `None` after logging.
    pub async fn capture_screenshot(&self, name: &str) -> Option<PathBuf> {
        let path = self.artifacts_dir.join(name);
        let result = async {
            let png = self.page.screenshot().await?;
            tokio::fs::create_dir_all(&self.artifacts_dir).await?;
            tokio::fs::write(&path, png).await?;
            Ok::<_, ProbeError>(())
        }
        .await;
        match result {
            Ok(()) => {
                debug!(path = %path.display(), "screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(name, error = %e, "could not capture screenshot");
                None
            }
        }
    }

    /// At least one element matches; says nothing about visibility
    pub async fn exists(&self, locator: &Locator) -> bool {
        self.page.count(locator).await.is_ok_and(|n| n > 0)
    }

    /// Element is visible right now
    pub async fn is_visible(&self, locator: &Locator) -> bool {
        self.page.is_visible(locator).await.unwrap_or(false)
    }

    /// Element becomes visible within `timeout`
    pub async fn is_visible_within(&self, locator: &Locator, timeout: Duration) -> bool {
        wait::wait_for_visible(self.driver(), locator, timeout)
            .await
            .is_ok()
    }

    /// Wait for visibility, then act, all within `bound`
    async fn act<'a, F, Fut>(&'a self, locator: &'a Locator, bound: Duration, action: F) -> ProbeResult<()>
    where
        F: FnOnce(&'a dyn PageDriver) -> Fut,
        Fut: std::future::Future<Output = ProbeResult<()>>,
    {
        let driver = self.driver();
        let attempt = async {
            wait::wait_for_visible(driver, locator, bound).await?;
            action(driver).await
        };
        match tokio::time::timeout(bound, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::timeout(bound, locator.label())),
        }
    }

    /// Click, bounded by the page-load timeout. Advisory.
    pub async fn safe_click(&self, locator: &Locator, description: &str) -> bool {
        let bound = self.timeouts.page_load;
        match self.act(locator, bound, |d| d.click(locator)).await {
            Ok(()) => {
                info!("{description}");
                true
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "{description} failed");
                false
            }
        }
    }

    /// Fill, bounded by the page-load timeout. Advisory.
    pub async fn safe_fill(&self, locator: &Locator, value: &str, description: &str) -> bool {
        let bound = self.timeouts.page_load;
        match self.act(locator, bound, |d| d.fill(locator, value)).await {
            Ok(()) => {
                info!("{description}");
                true
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "{description} failed");
                false
            }
        }
    }

    /// Wait until visible
    pub async fn wait_for_visible(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        wait::wait_for_visible(self.driver(), locator, timeout).await
    }

    /// Click once visible, bounded by the action timeout
    pub async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        let bound = self.timeouts.action;
        self.act(locator, bound, |d| d.click(locator)).await
    }

    /// Fill once visible, bounded by the action timeout
    pub async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        let bound = self.timeouts.action;
        self.act(locator, bound, |d| d.fill(locator, value)).await
    }

    /// Require the element to become visible
    pub async fn expect_visible(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        wait::wait_for_visible(self.driver(), locator, timeout)
            .await
            .map_err(|_| {
                ProbeError::assertion(format!(
                    "expected {} to be visible within {}ms",
                    locator.label(),
                    timeout.as_millis()
                ))
            })
    }

    /// Require the element to become enabled
    pub async fn expect_enabled(&self, locator: &Locator, timeout: Duration) -> ProbeResult<()> {
        wait::wait_for_enabled(self.driver(), locator, timeout)
            .await
            .map_err(|_| {
                ProbeError::assertion(format!(
                    "expected {} to be enabled within {}ms",
                    locator.label(),
                    timeout.as_millis()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement};
    use crate::locator::Selector;
    use std::sync::Arc;

    fn base(mock: &Arc<MockDriver>) -> BasePage {
        BasePage::new(mock.clone(), TimeoutPolicy::default())
    }

    mod advisory_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_safe_click_missing_returns_false() {
            let mock = MockDriver::shared();
            assert!(!base(&mock).safe_click(&Locator::css("#nope"), "Clicked nothing").await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_safe_click_waits_for_visibility() {
            let mock = MockDriver::shared();
            let btn = Selector::css("#late");
            mock.add(btn.clone(), MockElement::hidden());
            let bg = mock.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                PageDriver::click(bg.as_ref(), &Locator::css("#trigger")).await.ok();
            });
            mock.add(
                Selector::css("#trigger"),
                MockElement::visible().on_click(MockEffect::Show(btn.clone())),
            );

            assert!(base(&mock).safe_click(&Locator::new(btn), "Clicked late button").await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_safe_fill() {
            let mock = MockDriver::shared();
            mock.add(Selector::css("input"), MockElement::visible());
            assert!(base(&mock).safe_fill(&Locator::css("input"), "abc", "Filled").await);
            assert_eq!(mock.value_of(&Locator::css("input")).as_deref(), Some("abc"));

            mock.add(Selector::css("ro"), MockElement::visible().disabled());
            assert!(!base(&mock).safe_fill(&Locator::css("ro"), "abc", "Filled").await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_exists_ignores_visibility() {
            let mock = MockDriver::shared();
            mock.add(Selector::css("input"), MockElement::hidden());
            let page = base(&mock);
            assert!(page.exists(&Locator::css("input")).await);
            assert!(!page.is_visible(&Locator::css("input")).await);
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_stable_never_fails() {
            let mock = MockDriver::shared();
            mock.set_document(crate::driver::DocumentState {
                ready_state: "loading".into(),
                resource_count: 0,
            });
            base(&mock).wait_for_stable(Duration::from_millis(500)).await;
        }
    }

    mod screenshot_tests {
        use super::*;

        #[tokio::test]
        async fn test_capture_writes_file() {
            let dir = tempfile::tempdir().unwrap();
            let mock = MockDriver::shared();
            let page = base(&mock).with_artifacts_dir(dir.path().join("shots"));

            let path = page.capture_screenshot("form.png").await.unwrap();
            assert!(path.ends_with("shots/form.png"));
            assert!(std::fs::read(path).unwrap().starts_with(&[0x89, b'P']));
        }

        #[tokio::test]
        async fn test_capture_failure_is_swallowed() {
            let dir = tempfile::tempdir().unwrap();
            let mock = MockDriver::shared();
            mock.fail_screenshots();
            let page = base(&mock).with_artifacts_dir(dir.path());
            assert!(page.capture_screenshot("x.png").await.is_none());
        }
    }

    mod mandatory_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_expect_visible_is_assertion() {
            let mock = MockDriver::shared();
            let err = base(&mock)
                .expect_visible(&Locator::css("#menu").describe("menu button"), Duration::from_secs(1))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
            assert!(err.to_string().contains("menu button"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_expect_enabled() {
            let mock = MockDriver::shared();
            let btn = Selector::css("button");
            mock.add(btn.clone(), MockElement::visible().disabled());
            let page = base(&mock);
            assert!(page
                .expect_enabled(&Locator::new(btn.clone()), Duration::from_secs(1))
                .await
                .is_err());
            mock.remove(&btn);
            mock.add(btn.clone(), MockElement::visible());
            page.expect_enabled(&Locator::new(btn), Duration::from_secs(1))
                .await
                .unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_goto_and_url() {
            let mock = MockDriver::shared();
            let page = base(&mock);
            page.goto("https://app.test/list").await.unwrap();
            assert_eq!(page.url().await, "https://app.test/list");
        }
    }
}
