//! Test data factory.
//!
//! Agents created by one run share the application's data store with every
//! other run, so identity comes from the name. Names embed a millisecond
//! timestamp that is strictly increasing within the process; two calls in
//! the same millisecond get consecutive values instead of a collision.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Default prefix for generated names
pub const DEFAULT_PREFIX: &str = "TestAgent";

static LAST_STAMP: AtomicU64 = AtomicU64::new(0);

/// Current epoch milliseconds, bumped past the last value handed out
fn unique_millis() -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    let mut last = LAST_STAMP.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(seen) => last = seen,
        }
    }
}

/// `{prefix}_{millis}`, unique within the process
#[must_use]
pub fn generate_agent_name(prefix: &str) -> String {
    format!("{prefix}_{}", unique_millis())
}

/// Lowercase alphanumeric string of `length` characters
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    let mut out = String::with_capacity(length);
    while out.len() < length {
        out.extend(uuid::Uuid::new_v4().simple().to_string().chars());
    }
    out.truncate(length);
    out
}

/// `{prefix} - {15 random chars}`
#[must_use]
pub fn generate_updated_context(prefix: &str) -> String {
    format!("{prefix} - {}", generate_random_string(15))
}

/// `TestVer_{millis}_{6 random chars}`
#[must_use]
pub fn generate_version_name() -> String {
    format!("{}_{}", generate_agent_name("TestVer"), generate_random_string(6))
}

/// Agent data to submit through the UI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional multi-line context
    pub context: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl AgentSpec {
    /// Agent with only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

/// Basic agent with every field set
#[must_use]
pub fn create_test_agent(prefix: &str) -> AgentSpec {
    AgentSpec::named(generate_agent_name(prefix))
        .with_description("Auto-generated test agent for automation testing")
        .with_context("This is a test agent created by automated tests")
}

/// Agent for creation scenarios
#[must_use]
pub fn agent_for_creation() -> AgentSpec {
    AgentSpec::named(generate_agent_name("CreateTest"))
        .with_description("Agent created to test agent creation functionality")
        .with_context("Test context for agent creation validation")
}

/// Agent for deletion scenarios
#[must_use]
pub fn agent_for_deletion() -> AgentSpec {
    AgentSpec::named(generate_agent_name("DeleteTest"))
        .with_description("Agent created for deletion test")
        .with_context("This agent will be deleted as part of test case")
}

/// Agent for edit scenarios
#[must_use]
pub fn agent_for_editing() -> AgentSpec {
    AgentSpec::named(generate_agent_name("EditTest"))
        .with_description("Agent created for editing test")
        .with_context("Original context that will be updated during test")
}

/// Default test agent with caller overrides applied
#[must_use]
pub fn custom_agent(customize: impl FnOnce(AgentSpec) -> AgentSpec) -> AgentSpec {
    customize(create_test_agent(DEFAULT_PREFIX))
}

/// Agent with only a name
#[must_use]
pub fn minimal_agent(prefix: &str) -> AgentSpec {
    AgentSpec::named(generate_agent_name(prefix))
}

/// Agent with every field populated, tags included
#[must_use]
pub fn maximal_agent() -> AgentSpec {
    AgentSpec::named(generate_agent_name("MaximalTest"))
        .with_description(format!(
            "Comprehensive test agent created at {}",
            Utc::now().to_rfc3339()
        ))
        .with_context(
            "Detailed context with multiple lines.\n\
             This agent has extensive configuration.\n\
             Used for comprehensive testing scenarios.",
        )
        .with_tag("test")
        .with_tag("automation")
        .with_tag("comprehensive")
}

/// Inputs for validation scenarios
#[derive(Debug, Clone, Copy)]
pub struct ValidationData;

impl ValidationData {
    /// Rejected by the name validator
    pub const EMPTY_NAME: &'static str = "";
    /// Special characters in a name
    pub const SPECIAL_CHARS: &'static str = "Test@Agent#$%";

    /// 256 characters, over the usual length limit
    #[must_use]
    pub fn long_name() -> String {
        "A".repeat(256)
    }

    /// Longest description the scenarios submit
    #[must_use]
    pub fn max_description() -> String {
        "Test description. ".repeat(50)
    }
}

/// Names of agents created during a run, for cleanup
#[derive(Debug, Default)]
pub struct TestDataTracker {
    created: Mutex<Vec<String>>,
}

impl TestDataTracker {
    /// Empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.created
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a created agent
    pub fn track(&self, name: impl Into<String>) {
        self.lock().push(name.into());
    }

    /// Tracked names, oldest first
    #[must_use]
    pub fn tracked(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Forget one occurrence of `name`; `false` when it was not tracked
    pub fn untrack(&self, name: &str) -> bool {
        let mut created = self.lock();
        match created.iter().position(|n| n == name) {
            Some(i) => {
                created.remove(i);
                true
            }
            None => false,
        }
    }

    /// Forget every tracked name
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of tracked names
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().len()
    }
}
