//! Agentprobe: end-to-end testing of the Agents UI
//!
//! Page objects, resilient locators and redirect-aware flows over a
//! browser page, plus the scenario harness that runs the canonical agent
//! lifecycle checks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    AGENTPROBE Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenarios  │    │ Page       │    │ PageDriver │            │
//! │   │ + Harness  │───►│ Objects    │───►│ (CDP/Mock) │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         │                 │                                     │
//! │         ▼                 ▼                                     │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Fixtures   │    │ Candidate  │    │ Redirect   │            │
//! │   │ (auth)     │    │ Locators   │    │ Actions    │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod action;
pub mod browser;
pub mod config;
pub mod data;
pub mod driver;
pub mod fixture;
pub mod harness;
pub mod locator;
pub mod page_object;
pub mod pages;
mod result;
pub mod scenarios;
pub mod timeouts;
pub mod wait;

pub use action::{click_with_redirect, ActionOutcome, RedirectExpectation};
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpDriver};
pub use browser::BrowserConfig;
pub use config::{Credentials, KnownAgents, SuiteConfig};
pub use data::{AgentSpec, TestDataTracker, ValidationData};
pub use driver::{DocumentState, MockDriver, MockEffect, MockElement, PageDriver, SharedPage};
pub use fixture::{AuthFixture, Fixture, FixtureState, PageObjects};
pub use harness::{
    PageFactory, Scenario, ScenarioContext, ScenarioResult, Suite, SuiteResults, SuiteRunner,
};
pub use locator::{CandidateSet, Locator, Nth, Resolution, Selector};
pub use page_object::{BasePage, PageObject};
pub use pages::{AgentsPage, LoginPage};
pub use result::{ensure, is_teardown_message, ProbeError, ProbeResult};
pub use timeouts::{NetworkWait, TimeoutPolicy};
pub use wait::{LoadState, UrlMatcher, UrlPattern, VersionRef};

/// Prelude for scenario authors
pub mod prelude {
    pub use super::action::*;
    pub use super::config::*;
    pub use super::data::*;
    pub use super::fixture::*;
    pub use super::harness::*;
    pub use super::locator::*;
    pub use super::page_object::*;
    pub use super::pages::*;
    pub use super::result::*;
    pub use super::timeouts::*;
    pub use super::wait::*;
}
