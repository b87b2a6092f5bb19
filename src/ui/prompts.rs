//! Removal confirmation
//!
//! Removing a line is the one destructive intent, so it is the only one that
//! asks first. `--yes` skips the question; without a terminal the line is
//! kept.

use super::context::UiContext;
use super::output::aside;
use crate::error::{CartError, CartResult};

/// Ask whether a line should leave the cart; `true` means remove it
pub async fn confirm_removal(ctx: &UiContext, label: &str, quantity: u32) -> CartResult<bool> {
    let question = format!("Remove {} (x{}) from the cart?", label, quantity);

    if ctx.auto_yes() {
        aside(ctx, &format!("{} (confirmed by --yes)", question));
        return Ok(true);
    }
    if !ctx.is_interactive() {
        aside(ctx, "No terminal to confirm removal; pass --yes to remove");
        return Ok(false);
    }

    // cliclack blocks on terminal input
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(question).initial_value(false).interact()
    })
    .await
    .map_err(|e| CartError::Internal(format!("Removal prompt task failed: {}", e)))?;

    answer.map_err(|e| CartError::User(format!("Removal not confirmed: {}", e)))
}
