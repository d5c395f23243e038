use crate::fixture::host_of;
use crate::harness::ScenarioContext;
use crate::result::{ensure, ProbeResult};
use tracing::info;

/// Sign in from the landing page and stay on the application host
pub async fn login(ctx: ScenarioContext) -> ProbeResult<()> {
    let config = ctx.config();
    let page = ctx.login_page();

    page.base().goto(&config.base_url).await?;
    page.login(&config.credentials).await?;

    let url = page.base().url().await;
    let host = host_of(&config.base_url);
    info!(%url, "after sign-in");
    ensure(url.contains(host), format!("expected to land on {host} after sign-in, got {url}"))
}
