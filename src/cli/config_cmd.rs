//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::filename::{DEFAULT_TEMPLATE, DEFAULT_TIMESTAMP_FORMAT};
use crate::domain::recording::output::MAX_CHANNELS;
use crate::domain::recording::{AudioFormat, FilenameTemplate};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    set_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!(
        "{} = {}",
        key,
        get_value(&config, key).unwrap_or_else(|| value.to_string())
    ));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    match get_value(&config, key) {
        Some(v) => presenter.output(&v),
        None => presenter.output(NOT_SET),
    }

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(
            key,
            &get_value(&config, key).unwrap_or_else(|| NOT_SET.to_string()),
        );
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(invalid(
            key,
            format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        ))
    }
}

/// Validate `value` for `key` and store it in `config`
fn set_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "output_folder" => {
            let value = value.trim();
            if value.is_empty() {
                return Err(invalid(key, "Value must not be empty"));
            }
            config.output_folder = Some(value.to_string());
        }
        "sample_rate" => {
            let rate = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| invalid(key, "Value must be a positive number of Hz"))?;
            config.sample_rate = Some(rate);
        }
        "channels" => {
            let channels = value
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|c| (1..=MAX_CHANNELS).contains(c))
                .ok_or_else(|| {
                    invalid(key, format!("Value must be between 1 and {}", MAX_CHANNELS))
                })?;
            config.channels = Some(channels);
        }
        "format" => {
            let format = value
                .parse::<AudioFormat>()
                .map_err(|e| invalid(key, e.to_string()))?;
            if !format.is_supported() {
                return Err(invalid(
                    key,
                    format!("'{}' cannot be recorded. Supported: wav, flac, ogg", format),
                ));
            }
            config.format = Some(format.to_string());
        }
        "device" => {
            config.device = Some(value.trim().to_string());
        }
        "filename_template" => {
            FilenameTemplate::new(value, DEFAULT_TIMESTAMP_FORMAT)
                .map_err(|e| invalid(key, e.to_string()))?;
            config.filename_template = Some(value.to_string());
        }
        "timestamp_format" => {
            FilenameTemplate::new(DEFAULT_TEMPLATE, value)
                .map_err(|e| invalid(key, e.to_string()))?;
            config.timestamp_format = Some(value.to_string());
        }
        "tags" => {
            config.tags = Some(parse_tags(value).map_err(|m| invalid(key, m))?);
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

fn get_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "output_folder" => config.output_folder.clone(),
        "sample_rate" => config.sample_rate.map(|r| r.to_string()),
        "channels" => config.channels.map(|c| c.to_string()),
        "format" => config.format.clone(),
        "device" => config.device.clone(),
        "filename_template" => config.filename_template.clone(),
        "timestamp_format" => config.timestamp_format.clone(),
        "tags" => config.tags.as_ref().map(|t| t.join(", ")),
        _ => None,
    }
}

/// Parse a comma-separated tag list. Duplicates (ignoring case) are dropped.
fn parse_tags(value: &str) -> Result<Vec<String>, String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if tag.chars().any(|c| c == '/' || c == '\\') {
            return Err(format!("Tag '{}' must not contain path separators", tag));
        }
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    if tags.is_empty() {
        return Err("Provide at least one tag, separated by commas".to_string());
    }
    Ok(tags)
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}
