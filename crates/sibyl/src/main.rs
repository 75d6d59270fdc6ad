use std::sync::Arc;

use anyhow::Context;

use sibyl_core::{config::Config, domain::UpdateType, updates::UpdateContext, Dispatcher};
use sibyl_http::SibylHttpClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sibyl_core::logging::init("sibyl")?;

    let cfg = Config::load()?;
    let client = Arc::new(SibylHttpClient::from_config(&cfg)?);
    tracing::info!(host = %client.host_url(), "using sibyl endpoint");

    let dispatcher = Dispatcher::new(client, cfg.dispatcher.clone())?;

    for update_type in UpdateType::ALL {
        dispatcher
            .add_handler(update_type, |_client, ctx: UpdateContext| async move {
                if let Some(ev) = ctx.scan_request() {
                    tracing::info!(
                        update_type = ?ctx.update_type(),
                        unique_id = %ev.unique_id,
                        target_user = ev.target_user,
                        target_type = ev.target_type,
                        reason = %ev.agent_reason,
                        "scan request update"
                    );
                }
                Ok(())
            })
            .await;
    }

    dispatcher.listen().await?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
            dispatcher.stop().await;
        }
        phase = dispatcher.wait() => {
            anyhow::bail!("polling session ended: {phase:?}");
        }
    }

    let phase = dispatcher.wait().await;
    tracing::info!(?phase, "dispatcher stopped");
    Ok(())
}
