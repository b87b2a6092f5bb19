//! Quantity commands - set, inc and dec
//!
//! Each change lands in the local cart at once; repeated steps are
//! coalesced into a single write per line before the cart is shown.

use super::common;
use crate::cart::{CartSync, LineId, LocalChange};
use crate::cli::args::{OutputFormat, SetArgs, StepArgs};
use crate::config::Config;
use crate::error::CartResult;
use crate::ui::{self, Tone, UiContext};
use tracing::info;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// Execute the set command
pub async fn set(args: SetArgs, config: &Config) -> CartResult<()> {
    let ctx = UiContext::detect();
    let sync = common::connect(config, &ctx, true).await?;
    let id = LineId::from(args.line);
    let before = common::require_line(&sync, &id)?;

    match sync.set_quantity(&id, args.quantity) {
        LocalChange::Clamped(kept) => ui::say(
            &ctx,
            Tone::Attention,
            &format!(
                "Quantity {} is outside 1..={}",
                args.quantity, before.entry.line.stock
            ),
            Some(&format!("Line kept at {}", kept)),
        ),
        change => info!("Line {} now {:?}", id, change.quantity()),
    }

    finish(&ctx, &sync).await
}

/// Execute the inc command
pub async fn inc(args: StepArgs, config: &Config) -> CartResult<()> {
    step(args, config, Direction::Up).await
}

/// Execute the dec command
pub async fn dec(args: StepArgs, config: &Config) -> CartResult<()> {
    step(args, config, Direction::Down).await
}

async fn step(args: StepArgs, config: &Config, direction: Direction) -> CartResult<()> {
    let ctx = UiContext::detect();
    let sync = common::connect(config, &ctx, true).await?;
    let id = LineId::from(args.line);
    common::require_line(&sync, &id)?;

    let applied = apply_steps(&sync, &id, direction, args.times);
    if applied < args.times {
        let reason = match direction {
            Direction::Up => "Reached the stock limit",
            Direction::Down => "Quantity cannot go below 1",
        };
        let hint = match direction {
            Direction::Up => "Lower the quantity or check stock".to_string(),
            Direction::Down => format!("Run: cartsync remove {}", id),
        };
        ui::say(
            &ctx,
            Tone::Attention,
            &format!("{} after {} of {} steps", reason, applied, args.times),
            Some(&hint),
        );
    }

    finish(&ctx, &sync).await
}

/// Apply up to `times` single steps; returns how many took effect
fn apply_steps(sync: &CartSync, id: &LineId, direction: Direction, times: u32) -> u32 {
    let mut applied = 0;
    for _ in 0..times {
        let change = match direction {
            Direction::Up => sync.increment(id),
            Direction::Down => sync.decrement(id),
        };
        if !matches!(change, LocalChange::Applied(_)) {
            break;
        }
        applied += 1;
    }
    applied
}

async fn finish(ctx: &UiContext, sync: &CartSync) -> CartResult<()> {
    common::wait_for_sync(ctx, sync).await;

    let view = sync.view();
    common::render(ctx, &view, OutputFormat::Table)?;
    ui::attention_report(ctx, &view);
    Ok(())
}
