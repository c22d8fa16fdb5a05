//! `watch` keeps the catalog fresh and reports every state change.

use std::sync::Arc;
use std::time::Duration;

use aura_state::{spawn_catalog_refresh, AppState};

use crate::App;

pub(crate) async fn run(app: &App) -> anyhow::Result<()> {
    let refresher = Arc::new(app.refresher());
    if let Err(e) = refresher.refresh().await {
        tracing::warn!(error = %e, "initial catalog load failed, waiting for the next refresh");
    }

    let mut changes = app.store.subscribe();
    report(&changes.borrow_and_update());

    let every = Duration::from_secs(app.config.catalog_refresh_secs);
    let mut scheduler = spawn_catalog_refresh(refresher, every).await?;
    println!(
        "refreshing the catalog every {}s; press Ctrl-C to stop",
        every.as_secs()
    );

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                report(&changes.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    scheduler.shutdown().await?;
    Ok(())
}

fn report(state: &AppState) {
    println!(
        "catalog #{}: {} products ({} visible), {} in cart, {} trial requests",
        state.catalog_seq,
        state.products.len(),
        state.visible_products().len(),
        state.cart.len(),
        state.trial_requests.len()
    );
}
