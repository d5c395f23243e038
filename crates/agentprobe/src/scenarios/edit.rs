use super::cleanup;
use crate::data::{agent_for_editing, generate_agent_name, generate_updated_context, generate_version_name};
use crate::harness::ScenarioContext;
use crate::result::{ensure, ProbeError, ProbeResult};
use crate::wait::VersionRef;
use tracing::info;

/// Replace the context of the shared edit target and save it
pub async fn edit_context(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let target = ctx.config().known_agents.edit_target.clone();
    let updated = generate_updated_context("Updated Test Context");

    let outcome = agents.edit_agent_context(&target, &updated).await?;
    ensure(outcome.is_success(), format!("saving {target} {outcome}"))?;

    let notified = agents.check_success_notification().await;
    let value = agents.get_context_value().await.unwrap_or_default();
    info!(notified, persisted = value == updated, "context saved");
    ensure(
        notified || value == updated,
        "expected a success notification or the updated context in the form",
    )?;

    if agents.go_to_run_tab().await? {
        let content = agents.base().driver().content().await?;
        info!(bytes = content.len(), "run tab rendered");
    }
    Ok(())
}

/// Rename a fresh agent and find it under the new name
pub async fn edit_name(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let agent = agent_for_editing();

    let created = agents.create_agent(&agent).await?;
    ctx.tracker().track(&agent.name);
    ensure(created.is_success(), format!("saving {} {created}", agent.name))?;

    let renamed = generate_agent_name(&agent.name);
    agents.go_to_configuration_tab().await?;
    agents.fill_name(&renamed).await?;
    let saved = agents.save_with_redirect().await;
    ensure(saved.is_success(), format!("renaming to {renamed} {saved}"))?;
    ctx.tracker().track(&renamed);

    agents.navigate_to_agents_list().await?;
    agents.search_agent(&renamed).await?;
    let listed = agents.is_agent_in_list(&renamed).await;
    if listed {
        ctx.tracker().untrack(&agent.name);
    }

    cleanup(&agents, ctx.tracker(), if listed { &renamed } else { &agent.name }).await;
    ensure(listed, format!("{renamed} should be listed after the rename"))
}

/// Save the edit target as a new version and land on its version URL
pub async fn save_new_version(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    let t = *base.timeouts();
    let target = ctx.config().known_agents.edit_target.clone();
    let version_name = generate_version_name();

    agents.search_agent(&target).await?;
    agents.open_agent(&target).await?;
    base.pause(t.long).await;
    let previous = agents
        .current_version_ref()
        .await
        .and_then(|v| v.version_number());

    let outcome = agents.save_as_new_version(&version_name).await?;
    ensure(outcome.is_success(), format!("saving version {version_name} {outcome}"))?;
    base.pause(t.medium).await;

    let url = base.url().await;
    let version = VersionRef::from_url(&url)
        .and_then(|v| v.version_number())
        .filter(|id| *id > 0)
        .ok_or_else(|| ProbeError::assertion(format!("expected a version URL, got {url}")))?;
    if let Some(previous) = previous {
        ensure(
            version != previous,
            format!("version id {version} was not renewed"),
        )?;
    }
    let shown = agents.get_current_version().await;
    info!(version, ?shown, "version saved");

    if !agents.check_version_save_notification().await {
        info!("no version notification shown");
    }
    Ok(())
}
