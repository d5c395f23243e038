use super::cleanup;
use crate::data::{agent_for_creation, create_test_agent};
use crate::harness::ScenarioContext;
use crate::result::{ensure, ProbeResult};
use crate::wait::UrlPattern;
use tracing::{info, warn};

/// Create an agent, then find it exactly once in the list
pub async fn create_agent(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    let t = *base.timeouts();
    let agent = agent_for_creation();

    let outcome = agents.create_agent(&agent).await?;
    ctx.tracker().track(&agent.name);
    ensure(outcome.is_success(), format!("saving {} {outcome}", agent.name))?;

    base.wait_for_stable(t.navigation).await;
    let url = base.url().await;
    ensure(
        url.contains("/agents/all/"),
        format!("expected a detail view after creation, got {url}"),
    )?;
    if !agents.check_success_notification().await {
        info!("no creation notification shown");
    }

    agents.navigate_to_agents_list().await?;
    base.wait_for_stable(t.navigation).await;
    agents.search_agent(&agent.name).await?;
    let listed = agents.verify_agent_in_list(&agent.name).await;
    let occurrences = agents.text_occurrences(&agent.name).await;
    info!(listed, occurrences, "list checked after creation");
    ensure(
        occurrences == 1,
        format!("{} should be listed exactly once, found {occurrences}", agent.name),
    )
}

/// A nameless agent is refused: Save stays disabled or validation shows up,
/// and no detail view is reached
pub async fn create_missing_name(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    let t = *base.timeouts();

    agents.click_create_agent().await?;
    agents.fill_description("Test Description").await?;
    agents.fill_context("Test Context").await?;
    base.pause(t.medium).await;

    let save_disabled = agents.is_save_button_disabled().await.unwrap_or(false);
    let mut rejected = save_disabled || agents.check_validation_error().await;
    if !rejected {
        if let Err(e) = agents.click_save().await {
            warn!(error = %e, "save click failed");
        }
        base.pause(t.medium).await;
        rejected = agents.check_validation_error().await;
    }
    info!(save_disabled, rejected, "nameless agent submitted");

    let url = base.url().await;
    let created = UrlPattern::agent_detail().matches(&url);
    agents.cancel_creation().await;

    ensure(!created, format!("an agent without a name was created at {url}"))?;
    ensure(rejected, "expected a disabled Save button or a validation message")
}

/// Submitting an existing agent's name again is refused
pub async fn create_duplicate_name(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    let t = *base.timeouts();
    let agent = create_test_agent("DuplicateTest");

    let first = agents.create_agent(&agent).await?;
    ctx.tracker().track(&agent.name);
    ensure(first.is_success(), format!("saving {} {first}", agent.name))?;
    agents.navigate_to_agents_list().await?;

    agents.click_create_agent().await?;
    agents.fill_name(&agent.name).await?;
    if let Some(description) = &agent.description {
        agents.fill_description(description).await?;
    }
    base.pause(t.medium).await;

    let save_disabled = agents.is_save_button_disabled().await.unwrap_or(false);
    let mut rejected = save_disabled || agents.check_validation_error().await;
    if !rejected {
        if let Err(e) = agents.click_save().await {
            warn!(error = %e, "save click failed");
        }
        base.pause(t.medium).await;
        rejected = agents.check_validation_error().await;
    }
    info!(save_disabled, rejected, "duplicate name submitted");

    agents.cancel_creation().await;
    cleanup(&agents, ctx.tracker(), &agent.name).await;
    ensure(rejected, format!("a second agent named {} was accepted", agent.name))
}
