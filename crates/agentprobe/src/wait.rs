//! Bounded waits over a [`PageDriver`].
//!
//! Every wait polls the page at [`DEFAULT_POLL_INTERVAL_MS`] and gives up
//! with [`ProbeError::Timeout`] once its bound elapses. Driver errors while
//! polling count as "not yet": a page in the middle of navigating routinely
//! fails queries for a moment.

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Polling interval for all waits (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without new resources)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadState {
    /// The `load` event fired
    #[default]
    Load,
    /// `DOMContentLoaded` fired
    DomContentLoaded,
    /// Loaded and no new resources for 500ms
    NetworkIdle,
}

impl LoadState {
    /// Browser event name
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl From<crate::timeouts::NetworkWait> for LoadState {
    fn from(wait: crate::timeouts::NetworkWait) -> Self {
        match wait {
            crate::timeouts::NetworkWait::Idle => Self::NetworkIdle,
            crate::timeouts::NetworkWait::Load => Self::Load,
            crate::timeouts::NetworkWait::DomLoaded => Self::DomContentLoaded,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// URL PATTERNS
// =============================================================================

/// Shape of a URL to wait for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL
    Exact(String),
    /// Substring
    Contains(String),
    /// Regular expression (unanchored)
    Regex(String),
    /// Any URL
    Any,
}

impl UrlPattern {
    /// Check a URL against the pattern; an invalid regex matches nothing
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Regex(pattern) => Regex::new(pattern).is_ok_and(|re| re.is_match(url)),
            Self::Any => true,
        }
    }

    /// Detail view of an agent: `/agents/all/{id}`
    #[must_use]
    pub fn agent_detail() -> Self {
        Self::Regex(r"/agents/all/\d+".to_string())
    }

    /// A specific version of an agent: `/agents/all/{id}/{versionId}`
    #[must_use]
    pub fn agent_version() -> Self {
        Self::Regex(r"/agents/all/\d+/\d+".to_string())
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p}"),
            Self::Contains(p) => write!(f, "url containing {p}"),
            Self::Regex(p) => write!(f, "url matching /{p}/"),
            Self::Any => write!(f, "any url"),
        }
    }
}

/// Named route shapes of the application
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    routes: Vec<(String, UrlPattern)>,
}

impl Default for UrlMatcher {
    fn default() -> Self {
        Self::new()
            .route("version", UrlPattern::agent_version())
            .route("detail", UrlPattern::agent_detail())
            .route("list", UrlPattern::Contains("/agents/all".to_string()))
    }
}

impl UrlMatcher {
    /// Empty matcher
    #[must_use]
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route; earlier routes win
    #[must_use]
    pub fn route(mut self, name: impl Into<String>, pattern: UrlPattern) -> Self {
        self.routes.push((name.into(), pattern));
        self
    }

    /// Name of the first route matching `url`
    #[must_use]
    pub fn classify(&self, url: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|(_, p)| p.matches(url))
            .map(|(name, _)| name.as_str())
    }
}

/// Agent and version identifiers carried in a version URL.
///
/// Both are opaque; they are compared, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    /// Agent id
    pub agent_id: String,
    /// Version id
    pub version_id: String,
}

impl VersionRef {
    /// Extract from `.../agents/all/{id}/{versionId}`
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let re = Regex::new(r"/agents/all/(\d+)/(\d+)").ok()?;
        let caps = re.captures(url)?;
        Some(Self {
            agent_id: caps.get(1)?.as_str().to_string(),
            version_id: caps.get(2)?.as_str().to_string(),
        })
    }

    /// Version id as an integer, when it is one
    #[must_use]
    pub fn version_number(&self) -> Option<u64> {
        self.version_id.parse().ok()
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `probe` until it yields `Some`, or fail after `timeout`
pub async fn poll_until<T, F, Fut>(timeout: Duration, waited_for: &str, mut probe: F) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    let interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ProbeError::timeout(timeout, waited_for));
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Wait until the element is visible
pub async fn wait_for_visible(
    page: &dyn PageDriver,
    locator: &Locator,
    timeout: Duration,
) -> ProbeResult<()> {
    let what = format!("{} to be visible", locator.label());
    poll_until(timeout, &what, move || async move {
        page.is_visible(locator).await.ok().filter(|v| *v).map(|_| ())
    })
    .await
}

/// Wait until the element is enabled
pub async fn wait_for_enabled(
    page: &dyn PageDriver,
    locator: &Locator,
    timeout: Duration,
) -> ProbeResult<()> {
    let what = format!("{} to be enabled", locator.label());
    poll_until(timeout, &what, move || async move {
        page.is_enabled(locator).await.ok().filter(|v| *v).map(|_| ())
    })
    .await
}

/// Wait until at least one element matches
pub async fn wait_for_attached(
    page: &dyn PageDriver,
    locator: &Locator,
    timeout: Duration,
) -> ProbeResult<()> {
    let what = format!("{} to be attached", locator.label());
    poll_until(timeout, &what, move || async move {
        page.count(locator).await.ok().filter(|n| *n > 0).map(|_| ())
    })
    .await
}

/// Wait until the URL satisfies `predicate`; returns the matching URL
pub async fn wait_for_url<P>(
    page: &dyn PageDriver,
    predicate: P,
    timeout: Duration,
    waited_for: &str,
) -> ProbeResult<String>
where
    P: Fn(&str) -> bool + Send + Sync,
{
    let predicate = &predicate;
    poll_until(timeout, waited_for, move || async move {
        page.current_url().await.ok().filter(|url| predicate(url))
    })
    .await
}

/// Wait until the URL matches `pattern`
pub async fn wait_for_url_pattern(
    page: &dyn PageDriver,
    pattern: &UrlPattern,
    timeout: Duration,
) -> ProbeResult<String> {
    let what = pattern.to_string();
    wait_for_url(page, |url| pattern.matches(url), timeout, &what).await
}

/// Wait until the URL differs from `from`
pub async fn wait_for_url_change(
    page: &dyn PageDriver,
    from: &str,
    timeout: Duration,
) -> ProbeResult<String> {
    let what = format!("url to change from {from}");
    wait_for_url(page, |url| url != from, timeout, &what).await
}

/// Wait for a load state.
///
/// Network idle is approximated as a complete document whose resource count
/// has not changed for [`NETWORK_IDLE_THRESHOLD_MS`].
pub async fn wait_for_load_state(
    page: &dyn PageDriver,
    state: LoadState,
    timeout: Duration,
) -> ProbeResult<()> {
    let what = format!("load state {state}");
    match state {
        LoadState::DomContentLoaded => {
            poll_until(timeout, &what, move || async move {
                page.document_state()
                    .await
                    .ok()
                    .filter(crate::driver::DocumentState::is_dom_loaded)
                    .map(|_| ())
            })
            .await
        }
        LoadState::Load => {
            poll_until(timeout, &what, move || async move {
                page.document_state()
                    .await
                    .ok()
                    .filter(crate::driver::DocumentState::is_loaded)
                    .map(|_| ())
            })
            .await
        }
        LoadState::NetworkIdle => {
            let threshold = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
            let mut quiet_since: Option<(u64, Instant)> = None;
            let deadline = Instant::now() + timeout;
            loop {
                if let Ok(doc) = page.document_state().await {
                    if doc.is_loaded() {
                        match quiet_since {
                            Some((count, since)) if count == doc.resource_count => {
                                if since.elapsed() >= threshold {
                                    return Ok(());
                                }
                            }
                            _ => quiet_since = Some((doc.resource_count, Instant::now())),
                        }
                    } else {
                        quiet_since = None;
                    }
                }
                let now = Instant::now();
                if now >= deadline {
                    return Err(ProbeError::timeout(timeout, what));
                }
                let interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
                tokio::time::sleep(interval.min(deadline - now)).await;
            }
        }
    }
}
