//! Canonical end-to-end scenarios for the Agents UI.
//!
//! Each scenario signs in on its own page, creates any agent it mutates
//! under a unique name, and reports pass/fail through [`ensure`]. Agents a
//! scenario creates are recorded in the run's tracker.
//!
//! [`ensure`]: crate::result::ensure

mod create;
mod delete;
mod edit;
mod list;
mod login;

pub use create::{create_agent, create_duplicate_name, create_missing_name};
pub use delete::{cancel_deletion, delete_agent};
pub use edit::{edit_context, edit_name, save_new_version};
pub use list::{filter_by_tags, FILTER_TAG};
pub use login::login;

use crate::data::TestDataTracker;
use crate::harness::{Scenario, Suite};
use crate::pages::AgentsPage;
use tracing::warn;

/// Every canonical scenario, in run order
#[must_use]
pub fn suite() -> Suite {
    Suite::new("agents")
        .with(Scenario::new("login", login).tag("smoke").tag("auth"))
        .with(Scenario::new("create agent", create_agent).tag("smoke").tag("create"))
        .with(Scenario::new("create agent without name", create_missing_name).tag("create").tag("validation"))
        .with(Scenario::new("filter agents by tag", filter_by_tags).tag("list"))
        .with(Scenario::new("edit agent context", edit_context).tag("edit"))
        .with(Scenario::new("edit agent name", edit_name).tag("edit"))
        .with(Scenario::new("save agent as new version", save_new_version).tag("edit").tag("version"))
        .with(Scenario::new("delete agent", delete_agent).tag("delete"))
        .with(Scenario::new("cancel agent deletion", cancel_deletion).tag("delete"))
        .with(Scenario::new("reject duplicate agent name", create_duplicate_name).tag("create").tag("validation"))
}

/// Delete an agent left behind by a scenario and stop tracking it; failures
/// are only logged
async fn cleanup(agents: &AgentsPage, tracker: &TestDataTracker, name: &str) {
    let result = async {
        agents.navigate_to_agents_list().await?;
        agents.delete_agent(name).await
    }
    .await;
    match result {
        Ok(()) => {
            tracker.untrack(name);
        }
        Err(e) => warn!(agent = name, error = %e, "cleanup failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, SuiteConfig};
    use crate::driver::{DocumentState, MockDriver, MockEffect, MockElement, PageDriver, SharedPage};
    use crate::harness::ScenarioContext;
    use crate::locator::{Locator, Nth, Selector};
    use crate::result::{ProbeError, ProbeResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex, MutexGuard};

    const BASE: &str = "https://app.test";
    const LIST: &str = "https://app.test/alita_ui/agents/all";
    const EDIT_TARGET: &str = "kpi_aqa_agent";

    fn context_on(page: SharedPage, tracker: Arc<TestDataTracker>) -> ScenarioContext {
        let config = SuiteConfig {
            base_url: BASE.into(),
            credentials: Credentials::new("qa@example.com", "pw"),
            artifacts_dir: std::env::temp_dir().join("agentprobe-scenario-tests"),
            ..SuiteConfig::default()
        };
        ScenarioContext::new(page, Arc::new(config), tracker, 1)
    }

    fn context(mock: &Arc<MockDriver>) -> ScenarioContext {
        context_on(mock.clone(), Arc::new(TestDataTracker::new()))
    }

    // =========================================================================
    // FAKE AGENTS APPLICATION
    // =========================================================================

    /// How the application reacts to the agent form and its dialogs
    #[derive(Debug, Clone)]
    struct Rules {
        /// Rows rendered per created agent
        copies: usize,
        reject_duplicates: bool,
        renames: bool,
        deletes: bool,
        /// Cancelling the delete dialog deletes anyway
        cancel_deletes: bool,
        version_step: u64,
    }

    impl Default for Rules {
        fn default() -> Self {
            Self {
                copies: 1,
                reject_duplicates: false,
                renames: true,
                deletes: true,
                cancel_deletes: false,
                version_step: 1,
            }
        }
    }

    #[derive(Debug, Clone)]
    struct Listed {
        id: u64,
        name: String,
        version: u64,
        copies: usize,
    }

    impl Listed {
        fn shown_as(&self, (text, exact): (&str, bool)) -> bool {
            self.copies > 0 && if exact { self.name == text } else { self.name.contains(text) }
        }

        fn url(&self) -> String {
            format!("{LIST}/{}/{}", self.id, self.version)
        }
    }

    #[derive(Debug, Default)]
    struct Catalog {
        agents: Vec<Listed>,
        next_id: u64,
        /// Last value typed into the agent name field
        draft: String,
        /// Last value typed into a dialog name input
        confirm: String,
    }

    impl Catalog {
        fn push(&mut self, name: &str, version: u64, copies: usize) -> u64 {
            self.next_id += 1;
            self.agents.push(Listed {
                id: self.next_id,
                name: name.to_string(),
                version,
                copies,
            });
            self.next_id
        }
    }

    /// Agent name a selector looks for, and whether it must match exactly
    fn name_query(selector: &Selector) -> Option<(&str, bool)> {
        match selector {
            Selector::Text { text, exact } => Some((text.as_str(), *exact)),
            Selector::CssWithText { css, text } if css == "a" => Some((text.as_str(), false)),
            _ => None,
        }
    }

    /// Agent id of a detail or version URL
    fn agent_id(url: &str) -> Option<u64> {
        url.strip_prefix(LIST)?
            .strip_prefix('/')?
            .split('/')
            .next()?
            .parse()
            .ok()
    }

    /// Agents UI over an in-memory catalog.
    ///
    /// Static controls live on the wrapped mock page; agent rows, the form's
    /// Save button and the dialogs are driven by the catalog and [`Rules`].
    #[derive(Debug)]
    struct AgentsApp {
        page: MockDriver,
        catalog: Mutex<Catalog>,
        rules: Rules,
    }

    impl AgentsApp {
        fn new(rules: Rules) -> Arc<Self> {
            let page = MockDriver::new();
            for selector in [
                Selector::css_with_text("button", "+ Agent"),
                Selector::css("input[name=\"name\"]"),
                Selector::css("textarea[name=\"description\"]"),
                Selector::css("textarea[name=\"context\"]"),
                form_save(),
                Selector::css("input[placeholder*=\"Search\" i]"),
                AgentsPage::menu_button().selector,
                AgentsPage::delete_menu_item().selector,
                AgentsPage::dialog_name_input().selector,
                AgentsPage::dialog_button("Delete").selector,
                AgentsPage::dialog_button("Cancel").selector,
                AgentsPage::dialog_button("Save").selector,
                AgentsPage::save_as_version_button().selector,
            ] {
                page.add(selector, MockElement::visible());
            }
            Arc::new(Self {
                page,
                catalog: Mutex::new(Catalog::default()),
                rules,
            })
        }

        /// Application already holding `name` at `version`
        fn seeded(rules: Rules, name: &str, version: u64) -> Arc<Self> {
            let app = Self::new(rules);
            app.catalog().push(name, version, 1);
            app
        }

        fn catalog(&self) -> MutexGuard<'_, Catalog> {
            self.catalog
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }

        fn names(&self) -> Vec<String> {
            self.catalog().agents.iter().map(|a| a.name.clone()).collect()
        }

        fn version_of(&self, name: &str) -> Option<u64> {
            self.catalog()
                .agents
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.version)
        }

        /// Rendered rows a selector picks out
        fn mentions(&self, selector: &Selector) -> usize {
            name_query(selector).map_or(0, |query| {
                self.catalog()
                    .agents
                    .iter()
                    .filter(|a| a.shown_as(query))
                    .map(|a| a.copies)
                    .sum()
            })
        }

        /// Detail URL reached by clicking an agent row
        fn opened_by(&self, selector: &Selector) -> Option<String> {
            let query = name_query(selector)?;
            self.catalog()
                .agents
                .iter()
                .find(|a| a.shown_as(query))
                .map(Listed::url)
        }

        /// URL the application moves to after a control at `url` is clicked
        fn after_click(&self, selector: &Selector, url: &str) -> Option<String> {
            let rules = &self.rules;
            let current = agent_id(url);
            let mut catalog = self.catalog();

            if *selector == form_save() {
                let draft = std::mem::take(&mut catalog.draft);
                if let Some(id) = current {
                    let agent = catalog.agents.iter_mut().find(|a| a.id == id)?;
                    if rules.renames && !draft.is_empty() {
                        agent.name = draft;
                    }
                    return Some(agent.url());
                }
                if rules.reject_duplicates && catalog.agents.iter().any(|a| a.name == draft) {
                    self.page.add(
                        Selector::css("[role=\"alert\"]"),
                        MockElement::visible().with_text("Agent name already exists"),
                    );
                    return None;
                }
                let id = catalog.push(&draft, 1, rules.copies);
                return Some(format!("{LIST}/{id}"));
            }
            if *selector == AgentsPage::dialog_button("Delete").selector {
                if rules.deletes {
                    let confirm = catalog.confirm.clone();
                    if let Some(i) = catalog.agents.iter().position(|a| a.name == confirm) {
                        catalog.agents.remove(i);
                    }
                }
                return Some(LIST.to_string());
            }
            if *selector == AgentsPage::dialog_button("Cancel").selector {
                if rules.cancel_deletes {
                    catalog.agents.retain(|a| Some(a.id) != current);
                }
                return None;
            }
            if *selector == AgentsPage::dialog_button("Save").selector {
                let agent = catalog.agents.iter_mut().find(|a| Some(a.id) == current)?;
                agent.version += rules.version_step;
                return Some(agent.url());
            }
            None
        }
    }

    fn form_save() -> Selector {
        Selector::css_with_text("button", "Save")
    }

    #[async_trait]
    impl PageDriver for AgentsApp {
        async fn goto(&self, url: &str) -> ProbeResult<()> {
            self.page.goto(url).await
        }

        async fn current_url(&self) -> ProbeResult<String> {
            self.page.current_url().await
        }

        async fn document_state(&self) -> ProbeResult<DocumentState> {
            self.page.document_state().await
        }

        async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
            match self.mentions(&locator.selector) {
                0 => self.page.count(locator).await,
                n => Ok(match locator.nth {
                    Nth::Index(i) => usize::from(i < n),
                    Nth::First | Nth::Last => n,
                }),
            }
        }

        async fn is_visible(&self, locator: &Locator) -> ProbeResult<bool> {
            if self.mentions(&locator.selector) > 0 {
                return Ok(true);
            }
            self.page.is_visible(locator).await
        }

        async fn is_enabled(&self, locator: &Locator) -> ProbeResult<bool> {
            self.page.is_enabled(locator).await
        }

        async fn click(&self, locator: &Locator) -> ProbeResult<()> {
            if let Some(url) = self.opened_by(&locator.selector) {
                self.page.set_url(url);
                return Ok(());
            }
            self.page.click(locator).await?;
            let url = self.page.current_url().await?;
            if let Some(next) = self.after_click(&locator.selector, &url) {
                self.page.set_url(next);
            }
            Ok(())
        }

        async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
            self.page.fill(locator, value).await?;
            if locator.selector == AgentsPage::dialog_name_input().selector {
                self.catalog().confirm = value.to_string();
            } else if locator.selector == Selector::css("input[name=\"name\"]") {
                self.catalog().draft = value.to_string();
            }
            Ok(())
        }

        async fn clear(&self, locator: &Locator) -> ProbeResult<()> {
            self.page.clear(locator).await
        }

        async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
            self.page.press(locator, key).await
        }

        async fn input_value(&self, locator: &Locator) -> ProbeResult<String> {
            self.page.input_value(locator).await
        }

        async fn text_content(&self, locator: &Locator) -> ProbeResult<Option<String>> {
            self.page.text_content(locator).await
        }

        async fn content(&self) -> ProbeResult<String> {
            let rows: Vec<String> = self
                .names()
                .into_iter()
                .map(|name| format!("<span>{name}</span>"))
                .collect();
            Ok(rows.concat())
        }

        async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
            self.page.screenshot().await
        }
    }

    fn run_on(app: &Arc<AgentsApp>) -> (ScenarioContext, Arc<TestDataTracker>) {
        let tracker = Arc::new(TestDataTracker::new());
        (context_on(app.clone(), tracker.clone()), tracker)
    }

    /// Creation form whose Save button is in the given state
    fn creation_form(mock: &MockDriver, save: MockElement) {
        mock.add(Selector::css_with_text("button", "+ Agent"), MockElement::visible());
        mock.add(Selector::css("textarea[name=\"description\"]"), MockElement::visible());
        mock.add(Selector::css("textarea[name=\"context\"]"), MockElement::visible());
        mock.add(Selector::css_with_text("button", "Save"), save);
    }

    mod suite_tests {
        use super::*;

        #[test]
        fn test_one_scenario_per_case() {
            let suite = suite();
            assert_eq!(suite.len(), 10);
            let mut names: Vec<&str> = suite.scenarios().iter().map(Scenario::name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), 10);
        }

        #[test]
        fn test_tag_filters() {
            assert_eq!(suite().filter(Some("smoke")).len(), 2);
            assert_eq!(suite().filter(Some("delete")).len(), 2);
            assert_eq!(suite().filter(Some("validation")).len(), 2);
        }
    }

    mod login_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_login_lands_on_app_host() {
            let mock = MockDriver::shared();
            mock.add(Selector::css("input[name=\"email\"]"), MockElement::visible());
            mock.add(Selector::css("input[name=\"password\"]"), MockElement::visible());
            mock.add(
                Selector::css_with_text("button", "Sign in"),
                MockElement::visible().on_click(MockEffect::Navigate(format!("{BASE}/alita_ui/chat"))),
            );

            login(context(&mock)).await.unwrap();
            assert_eq!(mock.calls("fill"), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn test_login_redirected_off_host_fails() {
            let mock = MockDriver::shared();
            mock.add(Selector::css("input[name=\"email\"]"), MockElement::visible());
            mock.add(Selector::css("input[name=\"password\"]"), MockElement::visible());
            mock.add(
                Selector::css_with_text("button", "Sign in"),
                MockElement::visible().on_click(MockEffect::Navigate("https://sso.other/denied".into())),
            );

            let err = login(context(&mock)).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
        }
    }

    mod validation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_missing_name_blocked_by_disabled_save() {
            let mock = MockDriver::shared();
            creation_form(&mock, MockElement::visible().disabled());

            create_missing_name(context(&mock)).await.unwrap();
            let context_field = crate::locator::Locator::css("textarea[name=\"context\"]");
            assert_eq!(mock.value_of(&context_field).as_deref(), Some("Test Context"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_name_blocked_by_validation_message() {
            let mock = MockDriver::shared();
            creation_form(
                &mock,
                MockElement::visible().on_click(MockEffect::Add(
                    Selector::text("required"),
                    Box::new(MockElement::visible().with_text("Name is required")),
                )),
            );
            create_missing_name(context(&mock)).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_name_accepted_is_a_failure() {
            let mock = MockDriver::shared();
            creation_form(
                &mock,
                MockElement::visible().on_click(MockEffect::Navigate(format!("{LIST}/404"))),
            );
            let err = create_missing_name(context(&mock)).await.unwrap_err();
            assert!(err.to_string().contains("without a name"));
        }
    }

    mod create_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_create_agent_listed_once() {
            let app = AgentsApp::new(Rules::default());
            let (ctx, tracker) = run_on(&app);

            create_agent(ctx).await.unwrap();
            let names = app.names();
            assert_eq!(names.len(), 1);
            assert!(names[0].starts_with("CreateTest_"));
            assert_eq!(tracker.tracked(), names);
        }

        #[tokio::test(start_paused = true)]
        async fn test_create_agent_only_in_page_content_fails() {
            let app = AgentsApp::new(Rules {
                copies: 0,
                ..Rules::default()
            });
            let (ctx, _) = run_on(&app);

            let err = create_agent(ctx).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
            assert!(err.to_string().contains("exactly once, found 0"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_create_agent_listed_twice_fails() {
            let app = AgentsApp::new(Rules {
                copies: 2,
                ..Rules::default()
            });
            let (ctx, _) = run_on(&app);

            let err = create_agent(ctx).await.unwrap_err();
            assert!(err.to_string().contains("exactly once, found 2"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_duplicate_name_rejected() {
            let app = AgentsApp::new(Rules {
                reject_duplicates: true,
                ..Rules::default()
            });
            let (ctx, tracker) = run_on(&app);

            create_duplicate_name(ctx).await.unwrap();
            assert!(app.names().is_empty());
            assert_eq!(tracker.count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_duplicate_name_accepted_fails() {
            let app = AgentsApp::new(Rules::default());
            let (ctx, _) = run_on(&app);

            let err = create_duplicate_name(ctx).await.unwrap_err();
            assert!(err.to_string().contains("was accepted"));
            assert_eq!(app.names().len(), 1);
        }
    }

    mod edit_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_edit_context_saved() {
            let app = AgentsApp::seeded(Rules::default(), EDIT_TARGET, 3);
            let (ctx, _) = run_on(&app);

            edit_context(ctx).await.unwrap();
            let context = app
                .page
                .value_of(&Locator::css("textarea[name=\"context\"]"))
                .unwrap_or_default();
            assert!(context.starts_with("Updated Test Context"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_edit_context_with_disabled_save_fails() {
            let app = AgentsApp::seeded(Rules::default(), EDIT_TARGET, 3);
            app.page.remove(&form_save());
            app.page.add(form_save(), MockElement::visible().disabled());
            let (ctx, _) = run_on(&app);

            let err = edit_context(ctx).await.unwrap_err();
            assert!(err.to_string().contains(EDIT_TARGET));
        }

        #[tokio::test(start_paused = true)]
        async fn test_edit_name_renames_and_cleans_up() {
            let app = AgentsApp::new(Rules::default());
            let (ctx, tracker) = run_on(&app);

            edit_name(ctx).await.unwrap();
            assert!(app.names().is_empty());
            assert_eq!(tracker.count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_edit_name_not_applied_fails() {
            let app = AgentsApp::new(Rules {
                renames: false,
                ..Rules::default()
            });
            let (ctx, tracker) = run_on(&app);

            let err = edit_name(ctx).await.unwrap_err();
            assert!(err.to_string().contains("after the rename"));
            // the original agent is cleaned up; the unconfirmed new name stays tracked
            assert!(app.names().is_empty());
            assert_eq!(tracker.count(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_save_new_version_renews_id() {
            let app = AgentsApp::seeded(Rules::default(), EDIT_TARGET, 7);
            let (ctx, _) = run_on(&app);

            save_new_version(ctx).await.unwrap();
            assert_eq!(app.version_of(EDIT_TARGET), Some(8));
            assert!(app.page.current_url().await.unwrap().ends_with("/8"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_save_new_version_same_id_fails() {
            let app = AgentsApp::seeded(
                Rules {
                    version_step: 0,
                    ..Rules::default()
                },
                EDIT_TARGET,
                7,
            );
            let (ctx, _) = run_on(&app);

            let err = save_new_version(ctx).await.unwrap_err();
            assert!(matches!(err, ProbeError::AssertionFailed { .. }));
            assert!(err.to_string().contains("version id 7 was not renewed"));
        }
    }

    mod delete_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_delete_agent_removes_and_untracks() {
            let app = AgentsApp::new(Rules::default());
            let (ctx, tracker) = run_on(&app);

            delete_agent(ctx).await.unwrap();
            assert!(app.names().is_empty());
            assert_eq!(tracker.count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_delete_agent_still_listed_fails() {
            let app = AgentsApp::new(Rules {
                deletes: false,
                ..Rules::default()
            });
            let (ctx, tracker) = run_on(&app);

            let err = delete_agent(ctx).await.unwrap_err();
            assert!(err.to_string().contains("still listed after deletion"));
            assert_eq!(tracker.tracked(), app.names());
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancel_deletion_keeps_agent_until_cleanup() {
            let app = AgentsApp::new(Rules::default());
            let (ctx, tracker) = run_on(&app);

            cancel_deletion(ctx).await.unwrap();
            assert!(app.names().is_empty());
            assert_eq!(tracker.count(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancel_that_deletes_fails() {
            let app = AgentsApp::new(Rules {
                cancel_deletes: true,
                ..Rules::default()
            });
            let (ctx, tracker) = run_on(&app);

            let err = cancel_deletion(ctx).await.unwrap_err();
            assert!(err.to_string().contains("should survive a cancelled deletion"));
            assert_eq!(tracker.count(), 1);
        }
    }

    mod list_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_filter_passes_on_empty_result_message() {
            let mock = MockDriver::shared();
            mock.add(
                Selector::css("input[placeholder*=\"filter\" i]"),
                MockElement::visible()
                    .with_value("tags: ")
                    .appending()
                    .on_press(MockEffect::Add(
                        Selector::text_matches("no (agents|results)"),
                        Box::new(MockElement::visible().with_text("No agents found")),
                    )),
            );
            filter_by_tags(context(&mock)).await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_filter_without_input_fails() {
            let mock = MockDriver::shared();
            assert!(filter_by_tags(context(&mock)).await.is_err());
        }
    }
}
