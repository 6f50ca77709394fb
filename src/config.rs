//! Configuration types, loaded once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mirror::activity::{ActivityPolicy, DEFAULT_FOLDER};
use crate::mirror::rate_limit::{DEFAULT_COOLDOWN, DEFAULT_LIMIT};
use crate::transport::telegram::DEFAULT_ALBUM_QUIET_PERIOD;
use crate::transport::{ConversationId, TelegramConfig};

/// Default location of the mirror database.
pub const DEFAULT_DATABASE_PATH: &str = "./data/telemirror.db";

/// Backpressure settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Sends before a cooldown.
    pub limit: usize,
    pub cooldown: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Activity filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityConfig {
    pub policy: ActivityPolicy,
    /// Title of the dialog filter consulted by `UnmutedAndFolder`.
    pub folder: String,
    pub refresh_interval: Duration,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            policy: ActivityPolicy::default(),
            folder: DEFAULT_FOLDER.to_string(),
            refresh_interval: Duration::from_secs(10),
        }
    }
}

/// Full mirror configuration.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub telegram: TelegramConfig,
    /// Where mirrors go. `None` runs the filter without sending anything.
    pub target: Option<ConversationId>,
    pub rate_limit: RateLimitConfig,
    pub activity: ActivityConfig,
    pub remove_urls: bool,
    /// Domains kept when `remove_urls` is on.
    pub url_whitelist: Vec<String>,
    pub database_path: PathBuf,
}

impl MirrorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let target = get("TARGET")
            .map(|v| parse::<i64>("TARGET", &v))
            .transpose()?
            .map(ConversationId);

        let limit = match get("LIMIT_TO_WAIT") {
            Some(v) => parse::<usize>("LIMIT_TO_WAIT", &v)?,
            None => DEFAULT_LIMIT,
        };
        let cooldown = match get("TIMEOUT_MIRRORING") {
            Some(v) => seconds("TIMEOUT_MIRRORING", &v)?,
            None => DEFAULT_COOLDOWN,
        };

        let policy = match get("ACTIVITY_POLICY") {
            Some(v) => v.parse::<ActivityPolicy>()?,
            None => ActivityPolicy::default(),
        };
        let folder = get("ACTIVITY_FOLDER").unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let refresh_secs = match get("ACTIVITY_REFRESH_SECS") {
            Some(v) => parse::<u64>("ACTIVITY_REFRESH_SECS", &v)?,
            None => 10,
        };
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ACTIVITY_REFRESH_SECS".into(),
                message: "must be at least 1".into(),
            });
        }

        let seed_chats = list(get("MIRROR_SOURCES"))
            .iter()
            .map(|id| parse::<i64>("MIRROR_SOURCES", id).map(ConversationId))
            .collect::<Result<Vec<_>, _>>()?;

        let remove_urls = match get("REMOVE_URLS") {
            Some(v) => flag("REMOVE_URLS", &v)?,
            None => false,
        };
        let url_whitelist = list(get("REMOVE_URLS_WL"));

        let database_path = get("DATABASE_PATH")
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
            .into();

        Ok(Self {
            telegram: TelegramConfig {
                bot_token: SecretString::from(bot_token),
                seed_chats,
                album_quiet_period: DEFAULT_ALBUM_QUIET_PERIOD,
            },
            target,
            rate_limit: RateLimitConfig { limit, cooldown },
            activity: ActivityConfig {
                policy,
                folder,
                refresh_interval: Duration::from_secs(refresh_secs),
            },
            remove_urls,
            url_whitelist,
            database_path,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("'{value}': {e}"),
    })
}

fn seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs = parse::<f64>(key, value)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("'{value}': {e}"),
    })
}

fn flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("'{value}' is not a boolean"),
        }),
    }
}

fn list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
