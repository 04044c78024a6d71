use std::time::Duration;

use crate::constants::{
    DEFAULT_COMPLETION_MODEL, DEFAULT_COMPLETION_TIMEOUT, DEFAULT_OPENAI_BASE_URL,
    HISTORY_EXPIRATION,
};

/// Deployment environment, selects the log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    pub fn from_env() -> Self {
        match var("ENVIRONMENT").ok().flatten().as_deref() {
            Some("production") => Env::Production,
            Some("staging") => Env::Staging,
            _ => Env::Dev,
        }
    }
}

pub struct ServerConfig {
    pub discord_token: String,
    pub openai_api_key: String,
    pub completion_model: String,
    pub openai_base_url: String,
    pub discord_mention_only: bool,
    pub history_expiration: Duration,
    pub completion_timeout: Duration,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

fn duration_secs_var(key: &str, default: Duration) -> Duration {
    match var(key).ok().flatten() {
        Some(val) => match val.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => {
                tracing::warn!(
                    "Environment variable `{key}` is not a number of seconds, using the default"
                );
                default
            }
        },
        None => default,
    }
}

fn bool_var(key: &str) -> bool {
    matches!(
        var(key).ok().flatten().as_deref(),
        Some("1" | "true" | "yes")
    )
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        ServerConfig {
            discord_token: required_var("DISCORD_BOT_TOKEN"),
            openai_api_key: required_var("OPENAI_API_KEY"),
            completion_model: var("OPENAI_MODEL")
                .ok()
                .flatten()
                .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
            openai_base_url: var("OPENAI_BASE_URL")
                .ok()
                .flatten()
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            discord_mention_only: bool_var("DISCORD_MENTION_ONLY"),
            history_expiration: duration_secs_var("HISTORY_EXPIRATION_SECS", HISTORY_EXPIRATION),
            completion_timeout: duration_secs_var(
                "COMPLETION_TIMEOUT_SECS",
                DEFAULT_COMPLETION_TIMEOUT,
            ),
        }
    }
}
