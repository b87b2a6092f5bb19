//! Shared plumbing for the cart commands

use crate::cart::{CartSync, CartView, HttpCartApi, LineId, LineView, SyncOptions};
use crate::cli::args::OutputFormat;
use crate::config::Config;
use crate::error::{CartError, CartResult};
use crate::journal::Journal;
use crate::ui::{self, SyncProgress, TaskSpinner, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Connect to the cart API and load the cart.
///
/// The spinner is skipped for machine-readable output.
pub(crate) async fn connect(
    config: &Config,
    ctx: &UiContext,
    announce: bool,
) -> CartResult<CartSync> {
    let api = Arc::new(HttpCartApi::new(&config.api));
    let journal = Journal::new(config);
    let options = SyncOptions {
        journal: journal.is_enabled().then_some(journal),
        ..SyncOptions::from(&config.sync)
    };
    let sync = CartSync::new(api, options);

    let mut spinner = announce.then(|| TaskSpinner::new(ctx));
    if let Some(spinner) = spinner.as_mut() {
        spinner.start(&format!("Loading cart from {}...", config.api.base_url));
    }

    match sync.load().await {
        Ok(()) => {
            if let Some(spinner) = spinner.as_mut() {
                spinner.stop(&format!("Cart loaded ({} lines)", sync.view().lines.len()));
            }
            Ok(sync)
        }
        Err(e) => {
            if let Some(spinner) = spinner.as_mut() {
                spinner.stop_error("Could not load cart");
            }
            Err(e)
        }
    }
}

/// Fail unless the line is in the loaded cart
pub(crate) fn require_line(sync: &CartSync, id: &LineId) -> CartResult<LineView> {
    sync.view()
        .line(id)
        .cloned()
        .ok_or_else(|| CartError::LineNotFound(id.clone()))
}

/// Block until every pending write has settled, showing progress
pub(crate) async fn wait_for_sync(ctx: &UiContext, sync: &CartSync) {
    let mut changes = sync.subscribe();
    let mut progress = SyncProgress::new(ctx, sync.pending_count());

    while sync.has_pending_updates() {
        progress.update(sync.pending_count());
        if changes.changed().await.is_err() {
            break;
        }
    }

    sync.settled().await;
    progress.finish();
    debug!("Cart settled");
}

/// Print the cart in the requested format
pub(crate) fn render(ctx: &UiContext, view: &CartView, format: OutputFormat) -> CartResult<()> {
    match format {
        OutputFormat::Table => ui::cart_table(ctx, view),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(view)?),
        OutputFormat::Plain => {
            for line in &view.lines {
                println!("{}\t{}", line.entry.line.line_id, line.entry.line.quantity);
            }
        }
    }
    Ok(())
}
