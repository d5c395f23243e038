//! Login form.

use crate::action::{click_with_redirect, RedirectExpectation};
use crate::config::Credentials;
use crate::locator::{CandidateSet, Selector};
use crate::page_object::{BasePage, PageObject};
use crate::result::{ProbeError, ProbeResult};
use tracing::info;

/// The sign-in form shown to unauthenticated sessions
#[derive(Debug, Clone)]
pub struct LoginPage {
    base: BasePage,
}

impl PageObject for LoginPage {
    fn url_pattern(&self) -> &str {
        "/login"
    }

    fn page_name(&self) -> &str {
        "login"
    }
}

impl LoginPage {
    /// Wrap a page
    #[must_use]
    pub const fn new(base: BasePage) -> Self {
        Self { base }
    }

    /// Base page primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    /// Email or username input
    #[must_use]
    pub fn email_input() -> CandidateSet {
        CandidateSet::new("email input")
            .or_css("input[name=\"email\"]")
            .or_css("input[type=\"email\"]")
            .or_css("input#username")
            .or_css("input[name=\"username\"]")
    }

    /// Password input
    #[must_use]
    pub fn password_input() -> CandidateSet {
        CandidateSet::new("password input")
            .or_css("input[name=\"password\"]")
            .or_css("input[type=\"password\"]")
            .or_css("input#password")
    }

    /// Submit button
    #[must_use]
    pub fn sign_in_button() -> CandidateSet {
        CandidateSet::new("sign in button")
            .or(Selector::css_with_text("button", "Sign in"))
            .or(Selector::css_with_text("button", "Log in"))
            .or_css("button[type=\"submit\"]")
    }

    /// Fill the form and submit.
    ///
    /// The email input gets twice the page-load bound to appear. Submission
    /// races a navigation wait; the landing page then settles.
    pub async fn login(&self, credentials: &Credentials) -> ProbeResult<()> {
        credentials.validate()?;
        let t = *self.base.timeouts();
        info!("logging in");

        let email = Self::email_input()
            .wait_for_any(self.base.driver(), t.page_load * 2)
            .await?
            .locator;
        self.base.wait_for_visible(&email, t.page_load * 2).await?;
        self.base.fill(&email, &credentials.email).await?;
        info!(email = %credentials.email, "email filled");

        let password = Self::password_input()
            .wait_for_any(self.base.driver(), t.page_load)
            .await?
            .locator;
        self.base.wait_for_visible(&password, t.page_load).await?;
        self.base.fill(&password, &credentials.password).await?;
        info!("password filled");

        let submit = Self::sign_in_button()
            .resolve(self.base.driver(), None)
            .await?
            .ok_or_else(|| ProbeError::ElementNotFound {
                locator: "sign in button".into(),
            })?
            .locator;
        let outcome =
            click_with_redirect(&self.base, &submit, &RedirectExpectation::AnyChange, t.page_load * 2).await;
        if let Some(reason) = outcome.reason() {
            return Err(ProbeError::action("sign in", reason));
        }

        self.base.wait_for_stable(t.navigation).await;
        let landed = self.base.url().await;
        info!(url = %landed, "logged in");
        Ok(())
    }

    /// Email and password inputs are both present
    pub async fn is_login_page(&self) -> bool {
        let page = self.base.driver();
        matches!(Self::email_input().resolve(page, None).await, Ok(Some(_)))
            && matches!(Self::password_input().resolve(page, None).await, Ok(Some(_)))
    }
}
