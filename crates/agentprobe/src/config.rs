//! Suite configuration sourced from the environment.

use crate::result::{ProbeError, ProbeResult};
use crate::timeouts::TimeoutPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default application origin
pub const DEFAULT_BASE_URL: &str = "https://next.elitea.ai";

/// Default path of the agents list view
pub const DEFAULT_AGENTS_PATH: &str = "/alita_ui/agents/all";

/// Default per-scenario ceiling for multi-step flows that include login
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 240_000;

/// Login credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Email or username
    pub email: String,
    /// Password
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Fail when either field is empty
    pub fn validate(&self) -> ProbeResult<()> {
        if self.email.trim().is_empty() {
            return Err(ProbeError::config("USER_EMAIL is not set"));
        }
        if self.password.is_empty() {
            return Err(ProbeError::config("USER_PASSWORD is not set"));
        }
        Ok(())
    }
}

/// Pre-existing agents some scenarios operate on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownAgents {
    /// Existing agent used by edit scenarios
    pub edit_target: String,
    /// Existing agent used by read-only scenarios
    pub read_only: String,
}

impl Default for KnownAgents {
    fn default() -> Self {
        Self {
            edit_target: "kpi_aqa_agent".to_string(),
            read_only: "Assessment analyst".to_string(),
        }
    }
}

/// Whole-suite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Application origin, without trailing slash
    pub base_url: String,
    /// Path of the agents list view
    pub agents_path: String,
    /// Login credentials
    pub credentials: Credentials,
    /// Known pre-existing agents
    pub known_agents: KnownAgents,
    /// Run the browser without a window
    pub headless: bool,
    /// Retries per failing scenario
    pub retries: u32,
    /// Scenarios in flight at once
    pub workers: usize,
    /// Timeout policy
    pub timeouts: TimeoutPolicy,
    /// Where screenshots are written
    pub artifacts_dir: PathBuf,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            agents_path: DEFAULT_AGENTS_PATH.to_string(),
            credentials: Credentials::default(),
            known_agents: KnownAgents::default(),
            headless: true,
            retries: 1,
            workers: 2,
            timeouts: TimeoutPolicy::default()
                .with_test_timeout(Duration::from_millis(DEFAULT_TEST_TIMEOUT_MS)),
            artifacts_dir: PathBuf::from("test-results"),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl SuiteConfig {
    /// Build from process environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Load a YAML file; missing keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml_ng::from_str(&text)?)
    }

    /// Overlay values from an environment lookup.
    ///
    /// `CI` switches to 2 retries and a single worker. `HEADED` opens a
    /// browser window.
    #[must_use]
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = non_empty("AGENTS_PATH") {
            self.agents_path = path;
        }
        if let Some(email) = non_empty("USER_EMAIL") {
            self.credentials.email = email;
        }
        if let Some(password) = lookup("USER_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(name) = non_empty("AGENT_EDIT_TARGET") {
            self.known_agents.edit_target = name;
        }
        if let Some(name) = non_empty("AGENT_READ_ONLY") {
            self.known_agents.read_only = name;
        }
        if non_empty("CI").is_some() {
            self.retries = 2;
            self.workers = 1;
        }
        if non_empty("HEADED").is_some() {
            self.headless = false;
        }
        if let Some(dir) = non_empty("ARTIFACTS_DIR") {
            self.artifacts_dir = PathBuf::from(dir);
        }
        self
    }

    /// Absolute URL of the agents list view
    #[must_use]
    pub fn agents_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.agents_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SuiteConfig::default();
        assert_eq!(config.agents_url(), "https://next.elitea.ai/alita_ui/agents/all");
        assert_eq!(config.retries, 1);
        assert_eq!(config.workers, 2);
        assert!(config.headless);
        assert_eq!(config.timeouts.test, Duration::from_secs(240));
    }

    #[test]
    fn test_env_overlay() {
        let config = SuiteConfig::default().merge_env(env(&[
            ("BASE_URL", "https://staging.example.com/"),
            ("USER_EMAIL", "qa@example.com"),
            ("USER_PASSWORD", "secret"),
            ("AGENT_EDIT_TARGET", "editable"),
            ("HEADED", "1"),
        ]));

        assert_eq!(
            config.agents_url(),
            "https://staging.example.com/alita_ui/agents/all"
        );
        assert_eq!(config.credentials, Credentials::new("qa@example.com", "secret"));
        assert_eq!(config.known_agents.edit_target, "editable");
        assert!(!config.headless);
    }

    #[test]
    fn test_ci_profile() {
        let config = SuiteConfig::default().merge_env(env(&[("CI", "true")]));
        assert_eq!(config.retries, 2);
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(Credentials::default().validate().is_err());
        assert!(Credentials::new("a@b.c", "").validate().is_err());
        assert!(Credentials::new("a@b.c", "pw").validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let rendered = format!("{:?}", Credentials::new("a@b.c", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_yaml_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, "base_url: https://local.test\nworkers: 4\n").unwrap();

        let config = SuiteConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.base_url, "https://local.test");
        assert_eq!(config.workers, 4);
        assert_eq!(config.retries, 1);
    }
}
