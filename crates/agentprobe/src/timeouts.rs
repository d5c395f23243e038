//! Named timeout policy.
//!
//! Every wait in the page layer draws its bound from a [`TimeoutPolicy`]
//! instead of an inline literal. The default values are tuned for the hosted
//! application; suites running against a slower environment scale the whole
//! policy at once with [`TimeoutPolicy::scaled`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any scaled or multiplied timeout (one year)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Symbolic durations used across the page layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    /// Animation settle, button state changes, dropdowns
    pub short: Duration,
    /// Form submissions, tab switches, search results
    pub medium: Duration,
    /// Page transitions, agent creation, saving
    pub long: Duration,
    /// Opening agents, redirects between pages
    pub navigation: Duration,
    /// Waiting for an element to become visible
    pub element_visible: Duration,
    /// Waiting for a button to become enabled
    pub element_enabled: Duration,
    /// Full page load including network
    pub page_load: Duration,
    /// API round-trips surfaced through the UI
    pub api_response: Duration,
    /// Ceiling for an entire scenario
    pub test: Duration,
    /// Default ceiling for a single driver action
    pub action: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_millis(500),
            medium: Duration::from_millis(1_000),
            long: Duration::from_millis(2_000),
            navigation: Duration::from_millis(3_000),
            element_visible: Duration::from_millis(5_000),
            element_enabled: Duration::from_millis(5_000),
            page_load: Duration::from_millis(10_000),
            api_response: Duration::from_millis(15_000),
            test: Duration::from_millis(90_000),
            action: Duration::from_millis(15_000),
        }
    }
}

impl TimeoutPolicy {
    /// Policy with the default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiply every duration by `factor`.
    ///
    /// Negative factors give zero, NaN leaves the policy unchanged, and
    /// results saturate at [`MAX_TIMEOUT`].
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        let factor = if factor.is_nan() { 1.0 } else { factor.max(0.0) };
        let scale = |d: Duration| {
            if d.is_zero() {
                return d;
            }
            Duration::try_from_secs_f64(d.as_secs_f64() * factor)
                .map_or(MAX_TIMEOUT, |scaled| scaled.min(MAX_TIMEOUT))
        };
        Self {
            short: scale(self.short),
            medium: scale(self.medium),
            long: scale(self.long),
            navigation: scale(self.navigation),
            element_visible: scale(self.element_visible),
            element_enabled: scale(self.element_enabled),
            page_load: scale(self.page_load),
            api_response: scale(self.api_response),
            test: scale(self.test),
            action: scale(self.action),
        }
    }

    /// Override the per-scenario ceiling
    #[must_use]
    pub const fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test = timeout;
        self
    }

    /// `base * multiplier`, for waits that do not fit a named bucket; saturates
    /// at [`MAX_TIMEOUT`]
    #[must_use]
    pub fn custom(multiplier: u32, base: Duration) -> Duration {
        base.checked_mul(multiplier)
            .map_or(MAX_TIMEOUT, |d| d.min(MAX_TIMEOUT))
    }
}

/// Network wait conditions, named after the browser load events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkWait {
    /// No network connections for at least 500ms
    Idle,
    /// The `load` event fired
    Load,
    /// The `DOMContentLoaded` event fired
    DomLoaded,
}

impl NetworkWait {
    /// Name of the underlying browser event
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "networkidle",
            Self::Load => "load",
            Self::DomLoaded => "domcontentloaded",
        }
    }
}
