//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{CartError, CartResult};
use crate::ui::{self, Tone, UiContext};

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 7] = [
    "general.log_format",
    "general.journal",
    "api.base_url",
    "api.session_cookie",
    "api.timeout_ms",
    "sync.debounce_ms",
    "sync.max_retries",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> CartResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            set_value(manager, config, &key, &value).await?
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> CartResult<()> {
    let mut shown = config.clone();
    if shown.api.session_cookie.is_some() {
        shown.api.session_cookie = Some("<redacted>".to_string());
    }
    println!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> CartResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::say(
            &ctx,
            Tone::Attention,
            &format!("Config already exists at {}", path.display()),
            Some("Use --force to overwrite"),
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::say(
        &ctx,
        Tone::Done,
        "Configuration initialized",
        Some(&path.display().to_string()),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> CartResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply_key(&mut config, key, value) {
        ui::say(&ctx, Tone::Failed, "Cannot set config value", Some(&e.to_string()));
        ui::aside(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        return Err(e);
    }

    manager.save(&config).await?;
    ui::say(&ctx, Tone::Done, &format!("Set {} = {}", key, value), None);

    Ok(())
}

/// Apply one dot-separated key to the config, then check the result
fn apply_key(config: &mut Config, key: &str, value: &str) -> CartResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = value.to_string(),
        ["general", "journal"] => config.general.journal = parse_bool(value)?,

        ["api", "base_url"] => config.api.base_url = value.trim_end_matches('/').to_string(),
        ["api", "session_cookie"] => {
            config.api.session_cookie = (!value.is_empty()).then(|| value.to_string());
        }
        ["api", "timeout_ms"] => config.api.timeout_ms = parse_number(value)?,

        ["sync", "debounce_ms"] => config.sync.debounce_ms = parse_number(value)?,
        ["sync", "max_retries"] => config.sync.max_retries = parse_number(value)?,

        _ => return Err(CartError::User(format!("Unknown config key: {}", key))),
    }

    config.validate().map_err(CartError::User)
}

fn parse_bool(value: &str) -> CartResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(CartError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> CartResult<T> {
    value
        .parse()
        .map_err(|_| CartError::User(format!("Invalid number: {}", value)))
}
