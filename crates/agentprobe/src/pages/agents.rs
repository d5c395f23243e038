//! Agents list and agent detail views.
//!
//! Every control the application renders in more than one shape is a
//! [`CandidateSet`]; controls with a single stable shape are plain
//! [`Locator`]s. Operations follow the two-tier policy of [`BasePage`]:
//! optional UI (search box, description, context, tabs, notifications) is
//! looked up and logged, while the delete flow and the version dialog are hard
//! expectations.

use crate::action::{click_with_redirect, ActionOutcome, RedirectExpectation};
use crate::data::AgentSpec;
use crate::locator::{CandidateSet, Locator, Selector};
use crate::page_object::{BasePage, PageObject};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{LoadState, UrlPattern, VersionRef};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Agents feature of the application
#[derive(Debug, Clone)]
pub struct AgentsPage {
    base: BasePage,
    agents_url: String,
}

impl PageObject for AgentsPage {
    fn url_pattern(&self) -> &str {
        "/agents/all"
    }

    fn page_name(&self) -> &str {
        "agents"
    }
}

// =============================================================================
// CONTROLS
// =============================================================================

fn dialog() -> Selector {
    Selector::role("dialog")
}

impl AgentsPage {
    /// "Create agent" button
    #[must_use]
    pub fn create_agent_button() -> CandidateSet {
        CandidateSet::new("create agent button")
            .or(Selector::css_with_text("button", "+ Agent"))
            .or(Selector::css_with_text("button", "Create Agent"))
            .or(Selector::css_with_text("button", "Add Agent"))
            .or(Selector::css_with_text("button", "New Agent"))
            .or_css("[aria-label*=\"Create\"]")
            .or_css("[aria-label*=\"Add\"]")
    }

    /// Search box of the list view
    #[must_use]
    pub fn search_input() -> CandidateSet {
        CandidateSet::new("search input")
            .or_css("input[placeholder*=\"Search\" i]")
            .or_css("input[aria-label*=\"Search\" i]")
    }

    /// Configuration tab of the detail view
    #[must_use]
    pub fn configuration_tab() -> CandidateSet {
        CandidateSet::new("configuration tab")
            .or(Selector::role_exact("tab", "Configuration"))
            .or(Selector::exact_text("Configuration"))
            .or(Selector::exact_text("Config"))
    }

    /// Run tab of the detail view
    #[must_use]
    pub fn run_tab() -> CandidateSet {
        CandidateSet::new("run tab")
            .or(Selector::role_exact("tab", "Run"))
            .or(Selector::exact_text("Run"))
    }

    /// Save button of the agent form
    #[must_use]
    pub fn save_button() -> CandidateSet {
        CandidateSet::new("save button")
            .or(Selector::css_with_text("button", "Save"))
            .or(Selector::css_with_text("button", "Update"))
    }

    /// Cancel button of the agent form
    #[must_use]
    pub fn cancel_button() -> Locator {
        Locator::new(Selector::css_with_text("button", "Cancel")).describe("cancel button")
    }

    /// Three-dot menu of the detail view
    #[must_use]
    pub fn menu_button() -> Locator {
        Locator::css("#undefined-action").describe("agent menu button")
    }

    /// "Delete" entry of the agent menu
    #[must_use]
    pub fn delete_menu_item() -> Locator {
        Locator::new(Selector::role_exact("menuitem", "Delete")).describe("delete menu item")
    }

    /// "Name" textbox of the open dialog (delete confirmation, version name)
    #[must_use]
    pub fn dialog_name_input() -> Locator {
        Locator::new(Selector::role_exact("textbox", "Name").within(dialog()))
            .describe("dialog name input")
    }

    /// Button of the open dialog
    #[must_use]
    pub fn dialog_button(name: &str) -> Locator {
        Locator::new(Selector::role_exact("button", name).within(dialog()))
            .describe(format!("dialog {name} button"))
    }

    /// "Save As Version" button
    #[must_use]
    pub fn save_as_version_button() -> Locator {
        Locator::new(Selector::role_exact("button", "Save As Version"))
            .describe("save as version button")
    }

    /// Name field of the agent form
    #[must_use]
    pub fn name_field() -> CandidateSet {
        CandidateSet::new("name field")
            .or_css("input[name=\"name\"]")
            .or_css("input[placeholder*=\"Name\" i]")
            .or_css("textarea[name=\"name\"]")
    }

    /// Description field; falls back to the second text control of the form
    #[must_use]
    pub fn description_field() -> CandidateSet {
        CandidateSet::new("description field")
            .or_css("textarea[name=\"description\"]")
            .or_css("input[name=\"description\"]")
            .or_css("textarea[placeholder*=\"escription\" i]")
            .or(Locator::css("textarea, input[type=\"text\"]").nth(1))
    }

    /// Context (guidelines) field; falls back to the third textarea
    #[must_use]
    pub fn context_field() -> CandidateSet {
        CandidateSet::new("context field")
            .or(Selector::Label {
                text: "Guidelines for the AI agent".into(),
                exact: true,
            })
            .or(Selector::label("Context"))
            .or_css("textarea[name=\"context\"]")
            .or_css("textarea[name=\"guidelines\"]")
            .or_css("textarea[placeholder*=\"ontext\" i]")
            .or_css("textarea[placeholder*=\"uideline\" i]")
            .or(Locator::css("textarea").nth(2))
    }

    /// Tag filter of the list view; each shape is tried at its last match
    #[must_use]
    pub fn tag_filter_input() -> CandidateSet {
        CandidateSet::new("tag filter")
            .or(Locator::css("input[placeholder*=\"tag\" i]").last())
            .or(Locator::css("input[placeholder*=\"filter\" i]").last())
            .or(Locator::css("input[name*=\"tag\"]").last())
            .or(Locator::css("input[type=\"text\"]").last())
    }

    /// Toasts and texts shown after a successful save
    #[must_use]
    pub fn success_indicators() -> Vec<Locator> {
        let mut out: Vec<Locator> = [
            "updated successfully",
            "successfully updated",
            "Agent has been updated",
            "Changes saved",
            "saved successfully",
            "created successfully",
        ]
        .into_iter()
        .map(|t| Locator::new(Selector::text(t)))
        .collect();
        out.extend(toast_locators());
        out
    }

    /// Toasts and texts shown after a deletion
    #[must_use]
    pub fn delete_indicators() -> Vec<Locator> {
        let mut out: Vec<Locator> = [
            "deleted successfully",
            "successfully deleted",
            "Agent has been deleted",
            "removed successfully",
            "successfully removed",
        ]
        .into_iter()
        .map(|t| Locator::new(Selector::text(t)))
        .collect();
        out.extend(toast_locators());
        out
    }

    /// Markers of a failed form validation
    #[must_use]
    pub fn validation_indicators() -> Vec<Locator> {
        vec![
            Locator::new(Selector::text("required")),
            Locator::new(Selector::text("mandatory")),
            Locator::new(Selector::text("cannot be empty")),
            Locator::css("[role=\"alert\"]"),
            Locator::css(".error"),
            Locator::css("[aria-invalid=\"true\"]"),
        ]
    }

    /// Notifications shown after saving a version
    #[must_use]
    pub fn version_indicators() -> Vec<Locator> {
        vec![
            Locator::new(Selector::text("Saved new version successfully")),
            Locator::new(Selector::text("Version saved")),
            Locator::new(Selector::text("New version created")),
            Locator::new(Selector::css_with_text("[role=\"alert\"]", "version")),
            Locator::new(Selector::css_with_text(".notification", "version")),
        ]
    }

    /// Ways an agent name shows up in the list
    #[must_use]
    pub fn presence_locators(name: &str) -> Vec<Locator> {
        vec![
            Locator::new(Selector::exact_text(name)),
            Locator::new(Selector::css_with_text("a", name)),
            Locator::new(Selector::text(name)),
        ]
    }

    /// Table rows of the list view
    #[must_use]
    pub fn rows() -> Locator {
        Locator::css("[role=\"row\"]")
    }

    /// "No agents" / "No results" message
    #[must_use]
    pub fn no_results_message() -> Locator {
        Locator::new(Selector::text_matches("no (agents|results)"))
    }
}

fn toast_locators() -> [Locator; 3] {
    [
        Locator::css(".toast"),
        Locator::css(".notification"),
        Locator::css("[role=\"alert\"]"),
    ]
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl AgentsPage {
    /// Wrap a page; `agents_url` is the absolute URL of the list view
    #[must_use]
    pub fn new(base: BasePage, agents_url: impl Into<String>) -> Self {
        Self {
            base,
            agents_url: agents_url.into(),
        }
    }

    /// Base page primitives
    #[must_use]
    pub const fn base(&self) -> &BasePage {
        &self.base
    }

    /// Absolute URL of the list view
    #[must_use]
    pub fn agents_url(&self) -> &str {
        &self.agents_url
    }

    /// Wait for a candidate to appear and be visible, or fail the scenario
    async fn require(&self, set: &CandidateSet, timeout: Duration) -> ProbeResult<Locator> {
        let resolution = set
            .wait_for_any(self.base.driver(), timeout)
            .await
            .map_err(|_| {
                ProbeError::assertion(format!(
                    "expected {} within {}ms",
                    set.name(),
                    timeout.as_millis()
                ))
            })?;
        self.base.expect_visible(&resolution.locator, timeout).await?;
        Ok(resolution.locator)
    }

    /// First visible match among `indicators`
    async fn first_visible(&self, indicators: &[Locator]) -> Option<Locator> {
        let t = self.base.timeouts();
        for locator in indicators {
            if self.base.exists(locator).await && self.base.is_visible_within(locator, t.medium).await {
                return Some(locator.clone());
            }
        }
        None
    }

    /// Open the creation form
    pub async fn click_create_agent(&self) -> ProbeResult<()> {
        let t = *self.base.timeouts();
        let button = self.require(&Self::create_agent_button(), t.page_load).await?;
        self.base.click(&button).await?;
        self.base.pause(t.long).await;
        info!("create agent button clicked");
        Ok(())
    }

    /// Type `name` into the search box and submit.
    ///
    /// Returns `false` when the view has no search box.
    pub async fn search_agent(&self, name: &str) -> ProbeResult<bool> {
        let Some(found) = Self::search_input().resolve(self.base.driver(), None).await? else {
            warn!("search input not found");
            return Ok(false);
        };
        info!(agent = name, "searching");
        self.base.fill(&found.locator, name).await?;
        self.base.driver().press(&found.locator, "Enter").await?;
        self.base.pause(self.base.timeouts().medium).await;
        info!("search query submitted");
        Ok(true)
    }

    /// Empty the search box, when there is one
    pub async fn clear_search(&self) -> bool {
        match Self::search_input().resolve(self.base.driver(), None).await {
            Ok(Some(found)) => {
                let cleared = self.base.driver().clear(&found.locator).await.is_ok();
                self.base.pause(self.base.timeouts().medium).await;
                cleared
            }
            _ => false,
        }
    }

    /// Click the agent called `name`, watching for navigation to its detail view.
    ///
    /// A click that does not navigate is accepted; a click that fails is not.
    pub async fn open_agent(&self, name: &str) -> ProbeResult<()> {
        info!(agent = name, "opening agent");
        let t = *self.base.timeouts();
        let target = Locator::new(Selector::text(name)).describe(format!("agent {name}"));
        let outcome =
            click_with_redirect(&self.base, &target, &RedirectExpectation::AnyChange, t.page_load).await;
        if let ActionOutcome::Failed(reason) = outcome {
            return Err(ProbeError::action(format!("open agent {name}"), reason));
        }
        info!(agent = name, "agent opened");
        Ok(())
    }

    async fn go_to_tab(&self, tab: CandidateSet) -> ProbeResult<bool> {
        info!(tab = tab.name(), "switching tab");
        let clicked = match tab.resolve(self.base.driver(), None).await? {
            Some(found) => {
                self.base.click(&found.locator).await?;
                info!(tab = tab.name(), "tab clicked");
                true
            }
            None => {
                warn!(tab = tab.name(), "tab not found");
                false
            }
        };
        self.base.pause(self.base.timeouts().long).await;
        Ok(clicked)
    }

    /// Switch to the Configuration tab; `false` when it is absent
    pub async fn go_to_configuration_tab(&self) -> ProbeResult<bool> {
        self.go_to_tab(Self::configuration_tab()).await
    }

    /// Switch to the Run tab; `false` when it is absent
    pub async fn go_to_run_tab(&self) -> ProbeResult<bool> {
        self.go_to_tab(Self::run_tab()).await
    }

    /// Fill the mandatory name field
    pub async fn fill_name(&self, name: &str) -> ProbeResult<()> {
        let field = self
            .require(&Self::name_field(), self.base.timeouts().page_load)
            .await?;
        self.base.fill(&field, name).await?;
        info!(name, "name field filled");
        Ok(())
    }

    /// Fill the description; `false` when the field is absent
    pub async fn fill_description(&self, description: &str) -> ProbeResult<bool> {
        let Some(found) = Self::description_field()
            .resolve(self.base.driver(), None)
            .await?
        else {
            warn!("description field not found");
            return Ok(false);
        };
        self.base.fill(&found.locator, description).await?;
        info!(strategy = found.index, "description field filled");
        Ok(true)
    }

    async fn context_locator(&self) -> ProbeResult<Option<Locator>> {
        let visible = Some(self.base.timeouts().element_visible);
        Ok(Self::context_field()
            .resolve(self.base.driver(), visible)
            .await?
            .map(|r| r.locator))
    }

    /// Clear and fill the context; `false` when the field is absent.
    ///
    /// The context widget appends on some layouts, so it is always cleared
    /// before filling.
    pub async fn fill_context(&self, context: &str) -> ProbeResult<bool> {
        let Some(field) = self.context_locator().await? else {
            warn!("context field not found");
            return Ok(false);
        };
        self.base.driver().clear(&field).await?;
        self.base.fill(&field, context).await?;
        info!("context field filled");
        Ok(true)
    }

    /// Current context value; empty when the field is absent
    pub async fn get_context_value(&self) -> ProbeResult<String> {
        match self.context_locator().await? {
            Some(field) => self.base.driver().input_value(&field).await,
            None => Ok(String::new()),
        }
    }

    async fn save_locator(&self) -> ProbeResult<Locator> {
        Self::save_button()
            .resolve(self.base.driver(), None)
            .await?
            .map(|r| r.locator)
            .ok_or_else(|| ProbeError::ElementNotFound {
                locator: "save button".into(),
            })
    }

    /// Click Save without watching for navigation
    pub async fn click_save(&self) -> ProbeResult<()> {
        let save = self.save_locator().await?;
        self.base.click(&save).await?;
        info!("save button clicked");
        Ok(())
    }

    /// Save, expecting the form to redirect
    pub async fn save_with_redirect(&self) -> ActionOutcome {
        let save = match self.save_locator().await {
            Ok(save) => save,
            Err(e) => return ActionOutcome::Failed(e.to_string()),
        };
        info!("clicking save");
        click_with_redirect(
            &self.base,
            &save,
            &RedirectExpectation::AnyChange,
            self.base.timeouts().page_load,
        )
        .await
    }

    /// Whether the Save button is disabled
    pub async fn is_save_button_disabled(&self) -> ProbeResult<bool> {
        let save = self.save_locator().await?;
        Ok(!self.base.driver().is_enabled(&save).await?)
    }

    /// Dismiss the creation form; `false` when there is no Cancel button
    pub async fn cancel_creation(&self) -> bool {
        let t = *self.base.timeouts();
        let cancelled = self.base.exists(&Self::cancel_button()).await
            && self.base.driver().click(&Self::cancel_button()).await.is_ok();
        self.base.pause(t.short).await;
        cancelled
    }

    /// A success notification is visible
    pub async fn check_success_notification(&self) -> bool {
        self.check_notification(&Self::success_indicators(), "success").await
    }

    /// A deletion notification is visible
    pub async fn check_delete_notification(&self) -> bool {
        self.check_notification(&Self::delete_indicators(), "delete").await
    }

    async fn check_notification(&self, indicators: &[Locator], kind: &str) -> bool {
        match self.first_visible(indicators).await {
            Some(locator) => {
                let text = self
                    .base
                    .driver()
                    .text_content(&locator)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                info!(kind, text = %text.trim(), "notification shown");
                true
            }
            None => {
                warn!(kind, "no notification found");
                false
            }
        }
    }

    /// Some validation marker is present
    pub async fn check_validation_error(&self) -> bool {
        for locator in Self::validation_indicators() {
            if self.base.exists(&locator).await {
                info!(%locator, "validation error found");
                return true;
            }
        }
        false
    }

    /// Whether `name` is on the page, by selector and then by raw content
    pub async fn verify_agent_in_list(&self, name: &str) -> bool {
        for locator in Self::presence_locators(name) {
            if self.base.exists(&locator).await {
                info!(agent = name, "agent found in list");
                return true;
            }
        }
        match self.base.driver().content().await {
            Ok(html) if html.contains(name) => {
                info!(agent = name, "agent name found in page content");
                true
            }
            _ => {
                warn!(agent = name, "agent not found in list");
                false
            }
        }
    }

    /// Whether no element shows `name`, after letting the list refresh
    pub async fn verify_agent_not_in_list(&self, name: &str) -> bool {
        self.base.pause(self.base.timeouts().long).await;
        for locator in Self::presence_locators(name) {
            if self.base.exists(&locator).await {
                warn!(agent = name, "agent still in list");
                return false;
            }
        }
        info!(agent = name, "agent not in list");
        true
    }

    /// Stricter presence check used after renames
    pub async fn is_agent_in_list(&self, name: &str) -> bool {
        self.base.pause(self.base.timeouts().medium).await;
        let locators = [
            Locator::new(Selector::exact_text(name)),
            Locator::new(Selector::css_with_text("a", name)),
            Locator::new(Selector::css_with_text("[data-testid*=\"agent\"]", name)),
        ];
        for locator in &locators {
            if self.base.exists(locator).await {
                info!(agent = name, "agent found in list");
                return true;
            }
        }
        warn!(agent = name, "agent not found in list");
        false
    }

    /// Create an agent through the form and save it
    pub async fn create_agent(&self, agent: &AgentSpec) -> ProbeResult<ActionOutcome> {
        self.click_create_agent().await?;
        self.base.capture_screenshot("agent-form-opened.png").await;

        self.fill_name(&agent.name).await?;
        if let Some(description) = &agent.description {
            self.fill_description(description).await?;
        }
        if let Some(context) = &agent.context {
            self.fill_context(context).await?;
        }
        self.base.capture_screenshot("agent-form-filled.png").await;

        let outcome = self.save_with_redirect().await;
        info!(agent = %agent.name, %outcome, "agent create submitted");
        Ok(outcome)
    }

    /// Search, open, and replace the context of an existing agent
    pub async fn edit_agent_context(&self, name: &str, context: &str) -> ProbeResult<ActionOutcome> {
        self.search_agent(name).await?;
        self.open_agent(name).await?;
        self.base.capture_screenshot("agent-opened.png").await;

        self.go_to_configuration_tab().await?;
        self.base.capture_screenshot("config-tab.png").await;

        self.fill_context(context).await?;
        self.base.capture_screenshot("context-modified.png").await;

        Ok(self.save_with_redirect().await)
    }

    /// Open the agent (unless already on a detail view) and bring up the
    /// type-to-confirm delete dialog
    pub async fn open_delete_dialog(&self, name: &str) -> ProbeResult<()> {
        let t = *self.base.timeouts();
        if !UrlPattern::agent_detail().matches(&self.base.url().await) {
            self.search_agent(name).await?;
            self.open_agent(name).await?;
        }
        self.base.pause(t.long).await;
        self.base.capture_screenshot("agent-detail-before-delete.png").await;

        let menu = Self::menu_button();
        self.base.expect_visible(&menu, t.page_load).await?;
        self.base.click(&menu).await?;
        info!("menu button clicked");
        self.base.pause(t.medium).await;

        let item = Self::delete_menu_item();
        self.base.expect_visible(&item, t.element_visible).await?;
        self.base.click(&item).await?;
        info!("delete menu item clicked");
        self.base.pause(t.medium).await;
        self.base.capture_screenshot("delete-confirmation-dialog.png").await;
        Ok(())
    }

    /// Delete the agent called `name` through the confirmation dialog
    pub async fn delete_agent(&self, name: &str) -> ProbeResult<()> {
        info!(agent = name, "deleting agent");
        let t = *self.base.timeouts();
        self.open_delete_dialog(name).await?;

        let confirm_input = Self::dialog_name_input();
        self.base.expect_visible(&confirm_input, t.element_visible).await?;
        self.base.fill(&confirm_input, name).await?;
        info!(agent = name, "confirmation name entered");
        self.base.pause(t.short).await;

        let confirm = Self::dialog_button("Delete");
        self.base.expect_enabled(&confirm, t.element_enabled).await?;
        self.base.click(&confirm).await?;
        info!(agent = name, "delete confirmed");
        self.base.pause(t.long).await;
        Ok(())
    }

    /// Dismiss the delete confirmation dialog
    pub async fn cancel_deletion(&self) -> ProbeResult<()> {
        self.base.click(&Self::dialog_button("Cancel")).await?;
        info!("deletion cancelled");
        self.base.pause(self.base.timeouts().medium).await;
        Ok(())
    }

    /// Save the open agent as a new named version.
    ///
    /// Success is signalled by a URL of the form `/agents/all/{id}/{versionId}`.
    /// A Save button that never enables is reported as a failed outcome.
    pub async fn save_as_new_version(&self, version_name: &str) -> ProbeResult<ActionOutcome> {
        info!(version = version_name, "saving as new version");
        let t = *self.base.timeouts();

        let open = Self::save_as_version_button();
        self.base.expect_visible(&open, t.element_visible).await?;
        self.base.click(&open).await?;
        self.base.pause(t.short).await;

        let input = Self::dialog_name_input();
        self.base.expect_visible(&input, t.element_visible).await?;
        self.base.fill(&input, version_name).await?;
        info!(version = version_name, "version name entered");

        let save = Self::dialog_button("Save");
        if let Err(e) = self.base.expect_enabled(&save, t.element_visible).await {
            warn!(error = %e, "version save unavailable");
            return Ok(ActionOutcome::Failed(e.to_string()));
        }
        let expectation = RedirectExpectation::Matches(UrlPattern::agent_version());
        let outcome = click_with_redirect(&self.base, &save, &expectation, t.api_response).await;
        self.base.pause(t.long).await;
        info!(%outcome, "version save finished");
        Ok(outcome)
    }

    /// A version-save notification is visible
    pub async fn check_version_save_notification(&self) -> bool {
        self.base.pause(self.base.timeouts().short).await;
        for locator in Self::version_indicators() {
            if self.base.is_visible_within(&locator, self.base.timeouts().medium).await {
                info!("version save notification found");
                return true;
            }
        }
        warn!("no version save notification found");
        false
    }

    /// Version shown in the detail view.
    ///
    /// The view has no stable hook for this value: the first read-only input
    /// holding an integer wins, then any text input holding a positive one.
    pub async fn get_current_version(&self) -> Option<u64> {
        self.base.pause(self.base.timeouts().short).await;
        if let Some(v) = self.first_integer_input("input[readonly]", false).await {
            info!(version = v, "current version");
            return Some(v);
        }
        if let Some(v) = self.first_integer_input("input[type=\"text\"]", true).await {
            info!(version = v, "current version from text inputs");
            return Some(v);
        }
        warn!("version number not found");
        None
    }

    async fn first_integer_input(&self, css: &str, positive: bool) -> Option<u64> {
        let driver = self.base.driver();
        let count = driver.count(&Locator::css(css)).await.unwrap_or(0);
        for i in 0..count {
            let Ok(value) = driver.input_value(&Locator::css(css).nth(i)).await else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            match value.parse::<u64>() {
                Ok(v) if !positive || v > 0 => return Some(v),
                _ => {}
            }
        }
        None
    }

    /// Version reference carried by the current URL
    pub async fn current_version_ref(&self) -> Option<VersionRef> {
        VersionRef::from_url(&self.base.url().await)
    }

    /// Go back to the list view.
    ///
    /// A failed navigation is tolerated when the page already shows the list.
    pub async fn navigate_to_agents_list(&self) -> ProbeResult<()> {
        info!("navigating to agents list");
        let t = *self.base.timeouts();
        self.base.pause(t.long).await;
        self.base
            .wait_for_load_state(LoadState::DomContentLoaded, t.navigation)
            .await;

        if let Err(e) = self.base.goto(&self.agents_url).await {
            warn!(error = %e, "navigation to agents list failed");
            if self.base.url().await.contains(self.url_pattern()) {
                info!("already on agents list");
                return Ok(());
            }
            return Err(e);
        }
        self.base
            .wait_for_load_state(LoadState::DomContentLoaded, t.navigation)
            .await;
        info!("on agents list");
        Ok(())
    }

    /// Apply a tag filter and return the filter field used
    pub async fn filter_by_tag(&self, tag: &str) -> ProbeResult<Locator> {
        let t = *self.base.timeouts();
        let mut chosen = None;
        for candidate in Self::tag_filter_input().candidates() {
            if self.base.exists(candidate).await && self.base.is_visible_within(candidate, t.short).await {
                debug!(locator = %candidate, "tag filter found");
                chosen = Some(candidate.clone().describe("tag filter"));
                break;
            }
        }
        let field = chosen.ok_or_else(|| ProbeError::assertion("expected a tag filter field"))?;
        self.base.expect_visible(&field, t.element_visible).await?;

        self.base.click(&field).await?;
        self.base.fill(&field, tag).await?;
        self.base.driver().press(&field, "Enter").await?;
        info!(tag, "filter applied");

        self.base.pause(t.medium).await;
        self.base
            .wait_for_load_state(LoadState::NetworkIdle, t.navigation)
            .await;
        Ok(field)
    }

    /// Rows in the list view
    pub async fn row_count(&self) -> usize {
        self.base.driver().count(&Self::rows()).await.unwrap_or(0)
    }

    /// Elements whose text is exactly `text`
    pub async fn text_occurrences(&self, text: &str) -> usize {
        self.base
            .driver()
            .count(&Locator::new(Selector::exact_text(text)))
            .await
            .unwrap_or(0)
    }

    /// "No agents/results" messages on the page
    pub async fn no_results_count(&self) -> usize {
        self.base
            .driver()
            .count(&Self::no_results_message())
            .await
            .unwrap_or(0)
    }
}
