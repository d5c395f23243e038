use super::cleanup;
use crate::data::{agent_for_deletion, create_test_agent};
use crate::harness::ScenarioContext;
use crate::page_object::PageObject;
use crate::result::{ensure, ProbeResult};
use tracing::{info, warn};

/// Delete a fresh agent and check it is gone from the list
pub async fn delete_agent(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    let t = *base.timeouts();
    let agent = agent_for_deletion();

    let created = agents.create_agent(&agent).await?;
    ctx.tracker().track(&agent.name);
    ensure(created.is_success(), format!("saving {} {created}", agent.name))?;
    base.pause(t.navigation).await;

    agents.navigate_to_agents_list().await?;
    base.pause(t.long).await;
    agents.search_agent(&agent.name).await?;
    ensure(
        agents.verify_agent_in_list(&agent.name).await,
        format!("{} should be listed before deletion", agent.name),
    )?;

    agents.delete_agent(&agent.name).await?;
    if agents.check_delete_notification().await {
        info!(agent = %agent.name, "deletion confirmed by notification");
    } else {
        warn!(agent = %agent.name, "no deletion notification shown");
    }

    if !base.url().await.ends_with(agents.url_pattern()) {
        agents.navigate_to_agents_list().await?;
    }
    agents.clear_search().await;
    let gone = agents.verify_agent_not_in_list(&agent.name).await;
    if gone {
        ctx.tracker().untrack(&agent.name);
    }
    ensure(gone, format!("{} is still listed after deletion", agent.name))
}

/// Back out of the delete dialog and find the agent still listed
pub async fn cancel_deletion(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let agent = create_test_agent("CancelDeleteTest");

    let created = agents.create_agent(&agent).await?;
    ctx.tracker().track(&agent.name);
    ensure(created.is_success(), format!("saving {} {created}", agent.name))?;

    agents.open_delete_dialog(&agent.name).await?;
    agents.cancel_deletion().await?;

    agents.navigate_to_agents_list().await?;
    agents.search_agent(&agent.name).await?;
    let still_listed = agents.verify_agent_in_list(&agent.name).await;

    cleanup(&agents, ctx.tracker(), &agent.name).await;
    ensure(
        still_listed,
        format!("{} should survive a cancelled deletion", agent.name),
    )
}
