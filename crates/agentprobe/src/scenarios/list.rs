use crate::harness::ScenarioContext;
use crate::result::{ensure, ProbeResult};
use tracing::info;

/// Tag the list is filtered by
pub const FILTER_TAG: &str = "Feature";

/// Filter the list by a tag; the list either narrows to the tag, reports no
/// results, or at least keeps the tag in the filter field
pub async fn filter_by_tags(ctx: ScenarioContext) -> ProbeResult<()> {
    let agents = ctx.authenticated_agents_page().await?;
    let base = agents.base();
    base.wait_for_stable(base.timeouts().navigation).await;

    let field = agents.filter_by_tag(FILTER_TAG).await?;
    let rows = agents.row_count().await;
    let tag_matches = agents.text_occurrences(FILTER_TAG).await;
    let no_results = agents.no_results_count().await;
    let value = base.driver().input_value(&field).await.unwrap_or_default();
    info!(rows, tag_matches, no_results, %value, "tag filter applied");

    ensure(
        no_results > 0 || tag_matches > 0 || value == FILTER_TAG,
        format!("filtering by {FILTER_TAG} showed neither matches nor an empty-result message"),
    )
}
