//! Redirect-aware actions.
//!
//! Saving or deleting an agent can navigate away from the current page, and
//! a fast redirect may tear the page down before the click call returns.
//! [`click_with_redirect`] runs the click together with a URL wait and sorts
//! the result into an [`ActionOutcome`]:
//!
//! ```text
//!  record url ──► join(click, wait url) ──┬─ click ok ─────────────► Succeeded
//!                                         ├─ click err, teardown ──► SucceededViaRedirect
//!                                         └─ click err, other ─────► Failed(reason)
//! ```
//!
//! Nothing here retries; retries belong to the suite runner.

use crate::locator::Locator;
use crate::page_object::BasePage;
use crate::result::ProbeError;
use crate::wait::{self, LoadState, UrlPattern};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a state-changing action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action completed
    Succeeded,
    /// The page was torn down by the redirect the action caused
    SucceededViaRedirect,
    /// The action failed
    Failed(String),
}

impl ActionOutcome {
    /// Collapse to a boolean for assertions
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded | Self::SucceededViaRedirect)
    }

    /// Failure reason, if any
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Classify the error of a triggering click
    #[must_use]
    pub fn from_click_error(error: &ProbeError) -> Self {
        if error.is_context_teardown() {
            Self::SucceededViaRedirect
        } else {
            Self::Failed(error.to_string())
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::SucceededViaRedirect => write!(f, "succeeded via redirect"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// URL change that signals a completed action
#[derive(Debug, Clone)]
pub enum RedirectExpectation {
    /// Any URL different from the one before the click
    AnyChange,
    /// A URL matching the pattern
    Matches(UrlPattern),
}

/// Click `locator` while waiting up to `wait_budget` for the redirect.
///
/// After a completed click the new page gets a best-effort
/// `DOMContentLoaded` wait bounded by the navigation timeout.
pub async fn click_with_redirect(
    page: &BasePage,
    locator: &Locator,
    expectation: &RedirectExpectation,
    wait_budget: Duration,
) -> ActionOutcome {
    let before = page.url().await;
    let driver = page.driver();

    let url_wait = async {
        let url = match expectation {
            RedirectExpectation::AnyChange => {
                wait::wait_for_url_change(driver, &before, wait_budget).await
            }
            RedirectExpectation::Matches(pattern) => {
                wait::wait_for_url_pattern(driver, pattern, wait_budget).await
            }
        };
        Ok::<_, ProbeError>(url.ok())
    };

    match tokio::try_join!(page.click(locator), url_wait) {
        Ok(((), redirected)) => {
            match redirected {
                Some(url) => info!(from = %before, to = %url, "{} completed, navigation detected", locator.label()),
                None => debug!(url = %before, "{} completed without navigation", locator.label()),
            }
            page.wait_for_load_state(LoadState::DomContentLoaded, page.timeouts().navigation)
                .await;
            ActionOutcome::Succeeded
        }
        Err(e) => {
            let outcome = ActionOutcome::from_click_error(&e);
            match &outcome {
                ActionOutcome::SucceededViaRedirect => {
                    info!(error = %e, "{} triggered redirect", locator.label());
                }
                _ => warn!(error = %e, "{} failed", locator.label()),
            }
            outcome
        }
    }
}
