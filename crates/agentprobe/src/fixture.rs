//! Fixtures.
//!
//! A fixture prepares page state before a scenario body runs and cleans up
//! after it. [`AuthFixture`] signs a page in once; [`PageObjects`] builds the
//! page objects over one page and runs the fixture for signed-in views.

use crate::config::SuiteConfig;
use crate::driver::SharedPage;
use crate::page_object::BasePage;
use crate::pages::{AgentsPage, LoginPage};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Setup/teardown hooks around a scenario body
#[async_trait]
pub trait Fixture: Send + Sync {
    /// Prepare state; calling again after success is a no-op
    async fn setup(&mut self) -> ProbeResult<()>;

    /// Release state
    async fn teardown(&mut self) -> ProbeResult<()>;

    /// Name for logs
    fn name(&self) -> &str;
}

/// Lifecycle of a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixtureState {
    /// Not set up yet
    #[default]
    Registered,
    /// Setup succeeded
    SetUp,
    /// Torn down
    TornDown,
    /// Setup failed
    Failed,
}

/// Page objects over one page
#[derive(Clone)]
pub struct PageObjects {
    page: SharedPage,
    config: Arc<SuiteConfig>,
}

impl std::fmt::Debug for PageObjects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageObjects")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl PageObjects {
    /// Page objects for `page`
    #[must_use]
    pub fn new(page: SharedPage, config: Arc<SuiteConfig>) -> Self {
        Self { page, config }
    }

    /// Base page configured with the suite timeouts and artifacts directory
    #[must_use]
    pub fn base_page(&self) -> BasePage {
        BasePage::new(self.page.clone(), self.config.timeouts)
            .with_artifacts_dir(self.config.artifacts_dir.clone())
    }

    /// Login form
    #[must_use]
    pub fn login_page(&self) -> LoginPage {
        LoginPage::new(self.base_page())
    }

    /// Agents views, without signing in
    #[must_use]
    pub fn agents_page(&self) -> AgentsPage {
        AgentsPage::new(self.base_page(), self.config.agents_url())
    }

    /// Sign in, open the agents list, and hand back its page object
    pub async fn authenticated_agents_page(&self) -> ProbeResult<AgentsPage> {
        let mut auth = AuthFixture::new(self.clone());
        auth.setup().await?;
        let agents = self.agents_page();
        agents.base().goto(agents.agents_url()).await?;
        agents.base().wait_for_stable(self.config.timeouts.navigation).await;
        Ok(agents)
    }

    /// Suite configuration
    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }
}

/// Signs a page in with the configured credentials
#[derive(Debug)]
pub struct AuthFixture {
    pages: PageObjects,
    state: FixtureState,
}

impl AuthFixture {
    /// Fixture over the page behind `pages`
    #[must_use]
    pub fn new(pages: PageObjects) -> Self {
        Self {
            pages,
            state: FixtureState::Registered,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> FixtureState {
        self.state
    }

    async fn sign_in(&self) -> ProbeResult<()> {
        let config = self.pages.config();
        config.credentials.validate()?;

        let login = self.pages.login_page();
        login.base().goto(&config.base_url).await?;
        login.base().wait_for_stable(config.timeouts.medium).await;
        if login.is_login_page().await {
            login.login(&config.credentials).await?;
        } else {
            debug!("no login form; session already authenticated");
        }

        let url = login.base().url().await;
        let host = host_of(&config.base_url);
        if !url.contains(host) {
            return Err(ProbeError::Fixture {
                message: format!("landed on {url} after sign-in, outside {host}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Fixture for AuthFixture {
    async fn setup(&mut self) -> ProbeResult<()> {
        if self.state == FixtureState::SetUp {
            return Ok(());
        }
        match self.sign_in().await {
            Ok(()) => {
                self.state = FixtureState::SetUp;
                info!("authenticated");
                Ok(())
            }
            Err(e) => {
                self.state = FixtureState::Failed;
                Err(e)
            }
        }
    }

    async fn teardown(&mut self) -> ProbeResult<()> {
        self.state = FixtureState::TornDown;
        Ok(())
    }

    fn name(&self) -> &str {
        "auth"
    }
}

/// Host part of an absolute URL, or the input when it has no scheme
#[must_use]
pub fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}
