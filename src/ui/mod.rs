//! UI module for consistent CLI output
//!
//! Uses `cliclack` for prompts and spinners and `indicatif` for sync
//! progress, falling back to plain tagged lines in CI/non-interactive
//! environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync::ui::{self, Tone, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//! if ui::confirm_removal(&ctx, "Socks", 2).await? {
//!     sync.remove_line(&id);
//! }
//! ui::cart_table(&ctx, &sync.view());
//! ui::say(&ctx, Tone::Done, "Removed Socks", None);
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{aside, attention_report, cart_table, line_status, notice_text, say, Tone};
pub use progress::{SyncProgress, TaskSpinner};
pub use prompts::confirm_removal;
pub use theme::{init_theme, CartTheme};
