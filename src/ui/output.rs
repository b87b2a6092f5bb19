//! Cart-facing terminal output
//!
//! Every message goes through a [`Tone`], which picks the cliclack log call
//! in a terminal and a bracketed tag in plain output. On top of that sit the
//! renderings the commands share: the line table with totals and the report
//! of lines the server corrected or refused.

use super::context::UiContext;
use crate::cart::{CartSummary, CartView, LineNotice, LinePhase, LineView};
use console::{style, StyledObject};

const ITEM_WIDTH: usize = 24;

/// How a message reads to the shopper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Done,
    Info,
    Attention,
    Failed,
}

impl Tone {
    fn tag(self) -> StyledObject<&'static str> {
        match self {
            Self::Done => style("[OK]").green(),
            Self::Info => style("[INFO]").cyan(),
            Self::Attention => style("[WARN]").yellow(),
            Self::Failed => style("[FAIL]").red(),
        }
    }
}

/// Print one message, with an optional dimmed hint after it
pub fn say(ctx: &UiContext, tone: Tone, message: &str, hint: Option<&str>) {
    let text = match hint {
        Some(hint) if ctx.use_fancy_output() => format!("{} - {}", message, style(hint).dim()),
        Some(hint) => format!("{} - {}", message, hint),
        None => message.to_string(),
    };

    if !ctx.use_fancy_output() {
        println!("  {} {}", tone.tag(), text);
        return;
    }

    let written = match tone {
        Tone::Done => cliclack::log::success(text),
        Tone::Info => cliclack::log::info(text),
        Tone::Attention => cliclack::log::warning(text),
        Tone::Failed => cliclack::log::error(text),
    };
    written.ok();
}

/// Dimmed aside, such as how to skip a prompt
pub fn aside(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Print the cart as a table followed by its totals
pub fn cart_table(ctx: &UiContext, view: &CartView) {
    let title = style(format!("Cart ({} lines)", view.lines.len())).cyan().bold();
    if ctx.use_fancy_output() {
        cliclack::intro(title).ok();
    } else {
        println!("{}", title);
        println!();
    }

    if view.lines.is_empty() {
        say(ctx, Tone::Info, "Cart is empty", None);
    } else {
        println!(
            "{:<26} {:<24} {:>5} {:>10} {:>11}  {}",
            style("LINE").bold(),
            style("ITEM").bold(),
            style("QTY").bold(),
            style("PRICE").bold(),
            style("SUBTOTAL").bold(),
            style("STATUS").bold()
        );
        println!("{}", "-".repeat(90));

        for line in &view.lines {
            let item = &line.entry.line;
            println!(
                "{:<26} {:<24} {:>5} {:>10} {:>11}  {}",
                item.line_id.as_str(),
                truncate(item.label(), ITEM_WIDTH),
                item.quantity,
                item.unit_price.round_dp(2),
                item.subtotal().round_dp(2),
                line_status(line)
            );
        }
        println!();
    }

    totals(ctx, &view.summary, view.has_pending_updates);
    if let Some(error) = &view.sync_error {
        say(ctx, Tone::Attention, error, Some("Run: cartsync show"));
    }
}

fn totals(ctx: &UiContext, summary: &CartSummary, pending: bool) {
    figure(ctx, "Items", &summary.item_count.to_string());
    figure(ctx, "Total", &summary.total_price.round_dp(2).to_string());

    // A differing server total only means something once writes are done
    if let Some(server_total) = summary.server_total {
        if server_total != summary.total_price && !pending {
            figure(ctx, "Server total", &server_total.round_dp(2).to_string());
        }
    }
}

fn figure(ctx: &UiContext, label: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(label).dim(), value);
    } else {
        println!("  {}: {}", label, value);
    }
}

/// Status column: write phase plus any server notice
pub fn line_status(line: &LineView) -> String {
    let phase = match line.phase {
        LinePhase::Clean => style("ok").green(),
        LinePhase::Dirty => style("pending").yellow(),
        LinePhase::InFlight => style("syncing").cyan(),
        LinePhase::Error => style("not saved").red(),
    };

    match &line.entry.notice {
        Some(notice) => format!("{} ({})", phase, style(notice_text(notice)).dim()),
        None => phase.to_string(),
    }
}

pub fn notice_text(notice: &LineNotice) -> String {
    match notice {
        LineNotice::StockLimited { max } => format!("only {} left", max),
        LineNotice::Rejected { message } => message.clone(),
    }
}

/// Report lines that were rolled back or corrected, then close the output.
///
/// Returns how many lines need attention.
pub fn attention_report(ctx: &UiContext, view: &CartView) -> usize {
    let mut attention = 0;
    for line in &view.lines {
        let label = line.entry.line.label();
        if line.entry.error {
            attention += 1;
            say(
                ctx,
                Tone::Attention,
                &format!("{} was not saved; showing {}", label, line.entry.line.quantity),
                Some("Retry the change"),
            );
        } else if let Some(notice) = &line.entry.notice {
            attention += 1;
            say(
                ctx,
                Tone::Attention,
                &format!("{}: {}", label, notice_text(notice)),
                None,
            );
        }
    }

    let (closing, tone) = match attention {
        0 => ("Cart synchronized".to_string(), Tone::Done),
        n => (format!("{} line(s) need attention", n), Tone::Attention),
    };
    if ctx.use_fancy_output() {
        let closing = match tone {
            Tone::Done => style(closing).green().bold(),
            _ => style(closing).yellow().bold(),
        };
        cliclack::outro(closing).ok();
    } else {
        println!();
        println!("{} {}", tone.tag(), closing);
    }

    attention
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}
