//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cartsync - optimistic shopping-cart client
///
/// Changes cart quantities immediately and synchronizes them with the
/// store's cart API in the background, coalescing rapid edits.
#[derive(Parser, Debug)]
#[command(name = "cartsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CARTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cart API base URL (overrides api.base_url)
    #[arg(long, global = true, env = "CARTSYNC_API")]
    pub api: Option<String>,

    /// Session cookie sent with every request (overrides api.session_cookie)
    #[arg(long, global = true, env = "CARTSYNC_SESSION", hide_env_values = true)]
    pub session: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and display the cart
    Show(ShowArgs),

    /// Set a line's quantity
    Set(SetArgs),

    /// Increase a line's quantity
    Inc(StepArgs),

    /// Decrease a line's quantity (never below 1)
    Dec(StepArgs),

    /// Remove a line from the cart
    Remove(RemoveArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the set command
#[derive(Parser, Debug)]
pub struct SetArgs {
    /// Cart line ID
    pub line: String,

    /// New quantity (1 up to the line's stock)
    pub quantity: u32,
}

/// Arguments for the inc and dec commands
#[derive(Parser, Debug)]
pub struct StepArgs {
    /// Cart line ID
    pub line: String,

    /// Number of single steps to apply in quick succession
    #[arg(short = 'n', long, default_value = "1")]
    pub times: u32,
}

/// Arguments for the remove command
#[derive(Parser, Debug)]
pub struct RemoveArgs {
    /// Cart line ID
    pub line: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.base_url)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for the show command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one line per cart line)
    Plain,
}

impl OutputFormat {
    pub fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn cli_parses_show() {
        let cli = Cli::parse_from(["cartsync", "show", "--format", "json"]);
        match cli.command {
            Commands::Show(args) => assert_eq!(args.format, OutputFormat::Json),
            _ => panic!("expected Show command"),
        }
    }

    #[test]
    fn cli_parses_set() {
        let cli = Cli::parse_from(["cartsync", "set", "65f1c0ffee", "3"]);
        match cli.command {
            Commands::Set(args) => {
                assert_eq!(args.line, "65f1c0ffee");
                assert_eq!(args.quantity, 3);
            }
            _ => panic!("expected Set command"),
        }
    }

    #[test]
    fn cli_rejects_negative_quantity() {
        assert!(Cli::try_parse_from(["cartsync", "set", "a", "-1"]).is_err());
    }

    #[test]
    fn cli_parses_inc_times() {
        let cli = Cli::parse_from(["cartsync", "inc", "a", "-n", "3"]);
        match cli.command {
            Commands::Inc(args) => {
                assert_eq!(args.line, "a");
                assert_eq!(args.times, 3);
            }
            _ => panic!("expected Inc command"),
        }
    }

    #[test]
    fn cli_parses_dec_default_times() {
        let cli = Cli::parse_from(["cartsync", "dec", "a"]);
        match cli.command {
            Commands::Dec(args) => assert_eq!(args.times, 1),
            _ => panic!("expected Dec command"),
        }
    }

    #[test]
    fn cli_parses_remove_yes() {
        let cli = Cli::parse_from(["cartsync", "remove", "a", "--yes"]);
        match cli.command {
            Commands::Remove(args) => assert!(args.yes),
            _ => panic!("expected Remove command"),
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["cartsync", "config", "set", "sync.debounce_ms", "150"]);
        match cli.command {
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Set { key, value }),
            }) => {
                assert_eq!(key, "sync.debounce_ms");
                assert_eq!(value, "150");
            }
            _ => panic!("expected Config Set command"),
        }
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["cartsync", "show"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["cartsync", "-v", "show"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["cartsync", "-vv", "show"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    #[serial]
    fn api_flag_reads_environment() {
        std::env::set_var("CARTSYNC_API", "https://shop.example.com/api");
        let cli = Cli::parse_from(["cartsync", "show"]);
        std::env::remove_var("CARTSYNC_API");

        assert_eq!(cli.api.as_deref(), Some("https://shop.example.com/api"));
    }

    #[test]
    #[serial]
    fn api_flag_beats_environment() {
        std::env::set_var("CARTSYNC_API", "https://env.example.com/api");
        let cli = Cli::parse_from(["cartsync", "--api", "http://localhost:9000", "show"]);
        std::env::remove_var("CARTSYNC_API");

        assert_eq!(cli.api.as_deref(), Some("http://localhost:9000"));
    }
}
