//! Remove command - delete a cart line

use super::common;
use crate::cart::LineId;
use crate::cli::args::{OutputFormat, RemoveArgs};
use crate::config::Config;
use crate::error::CartResult;
use crate::ui::{self, Tone, UiContext};

/// Execute the remove command
pub async fn execute(args: RemoveArgs, config: &Config) -> CartResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let sync = common::connect(config, &ctx, true).await?;
    let id = LineId::from(args.line);
    let line = common::require_line(&sync, &id)?;

    let label = line.entry.line.label();
    if !ui::confirm_removal(&ctx, label, line.entry.line.quantity).await? {
        ui::aside(&ctx, "Nothing removed");
        return Ok(());
    }

    sync.remove_line(&id);
    common::wait_for_sync(&ctx, &sync).await;

    let view = sync.view();
    common::render(&ctx, &view, OutputFormat::Table)?;
    if view.line(&id).is_some() {
        ui::say(
            &ctx,
            Tone::Attention,
            &format!("{} could not be removed", label),
            Some("Check the connection and retry"),
        );
    } else {
        ui::say(&ctx, Tone::Done, &format!("Removed {}", label), None);
    }
    ui::attention_report(&ctx, &view);
    Ok(())
}
