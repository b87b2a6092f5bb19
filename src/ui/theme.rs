//! cliclack theme for cart prompts
//!
//! The only prompt cartsync shows is the removal confirmation, so the theme
//! labels its choices "Remove" and "Keep" and marks the active prompt in red
//! as a destructive action. Spinners use a rotating sync glyph.

use cliclack::{Theme, ThemeState};
use console::Style;

const SYNC_SPINNER: &str = "◐◓◑◒";

#[derive(Debug, Clone, Default)]
pub struct CartTheme;

impl Theme for CartTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().red(),
            ThemeState::Error(_) => Style::new().red().bold(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().green().dim(),
        }
    }

    fn format_confirm(&self, state: &ThemeState, confirm: bool) -> String {
        let remove = self.radio_item(state, confirm, "Remove", "");
        let keep = self.radio_item(state, !confirm, "Keep", "");
        let divider = match state {
            ThemeState::Active => self.placeholder_style(state).apply_to(" / ").to_string(),
            _ => String::new(),
        };

        format!(
            "{}  {}{}{}\n",
            self.bar_color(state).apply_to("│"),
            remove,
            divider,
            keep
        )
    }

    fn spinner_chars(&self) -> String {
        SYNC_SPINNER.to_string()
    }
}

/// Install the theme for every cliclack prompt and spinner
pub fn init_theme() {
    cliclack::set_theme(CartTheme);
}
