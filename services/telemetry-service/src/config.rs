use quiztrack_common::{env_or, env_required};
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://www.16personalities.com";
pub const DEFAULT_PROFILE_URL_PREFIX: &str = "https://www.16personalities.com/profiles/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Process configuration, read once at startup and shared with every handler.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub port: u16,
    pub database_url: String,
    pub allowed_origin: String,
    pub profile_url_prefix: String,
    pub environment: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env_required("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            port: env_or("PORT", 8080u16),
            database_url,
            allowed_origin: env_or("ALLOWED_ORIGIN", DEFAULT_ALLOWED_ORIGIN.to_string()),
            profile_url_prefix: env_or(
                "PROFILE_URL_PREFIX",
                DEFAULT_PROFILE_URL_PREFIX.to_string(),
            ),
            environment: env_or("APP_ENV", "development".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: String::new(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            profile_url_prefix: DEFAULT_PROFILE_URL_PREFIX.to_string(),
            environment: "test".to_string(),
        }
    }
}
