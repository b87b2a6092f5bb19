//! cartsync - optimistic shopping-cart client
//!
//! CLI entry point that dispatches to subcommands.

use cartsync::cli::{Cli, Commands};
use cartsync::config::{Config, ConfigManager};
use cartsync::error::CartResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CartResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::locate(cli.config.clone());
    let mut config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    cartsync::ui::init_theme();
    debug!("Using config {}", config_manager.path().display());

    // Config commands see the file as written, not the flag overrides
    if let Commands::Config(args) = cli.command {
        return cartsync::cli::commands::config(args, &config, &config_manager).await;
    }

    apply_overrides(&mut config, cli.api, cli.session);

    match cli.command {
        Commands::Show(args) => cartsync::cli::commands::show(args, &config).await,
        Commands::Set(args) => cartsync::cli::commands::set(args, &config).await,
        Commands::Inc(args) => cartsync::cli::commands::inc(args, &config).await,
        Commands::Dec(args) => cartsync::cli::commands::dec(args, &config).await,
        Commands::Remove(args) => cartsync::cli::commands::remove(args, &config).await,
        Commands::Config(_) => unreachable!("Config handled above"),
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("cartsync=warn"),
        1 => EnvFilter::new("cartsync=info"),
        _ => EnvFilter::new("cartsync=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

fn apply_overrides(config: &mut Config, api: Option<String>, session: Option<String>) {
    if let Some(base_url) = api {
        debug!("API base URL overridden: {}", base_url);
        config.api.base_url = base_url;
    }
    if let Some(cookie) = session {
        config.api.session_cookie = Some(cookie);
    }
}
