//! Server configuration.
//!
//! Values come from an optional TOML file (path in `JBS_CONFIG`, default
//! `jbs.toml`) overlaid with `JBS_`-prefixed environment variables, using
//! `__` between section and key:
//!
//!   JBS_DATABASE__URL=postgres://...
//!   JBS_FILEMAKER__PASSWORD=...

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{JbsError, JbsResult};

const CONFIG_PATH_VAR: &str = "JBS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "jbs.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub filemaker: FileMakerConfig,
    pub google: GoogleConfig,
    pub zoom: ZoomConfig,
    pub email: EmailConfig,
    pub turnstile: TurnstileConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileMakerConfig {
    /// Server root, e.g. `https://fm.example.com`.
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

fn default_calendar_id() -> String {
    "primary".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoomConfig {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub resend_api_key: String,
    pub from: String,
    /// Receives booking and contact notifications.
    pub lecturer_email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnstileConfig {
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Public origin used in links inside emails.
    pub base_url: String,
    /// Display text for the meeting link in confirmation emails.
    #[serde(default)]
    pub zoom_link: String,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load() -> JbsResult<Self> {
        Self::load_from(Environment::with_prefix("JBS").prefix_separator("_").separator("__"))
    }

    fn load_from(env: Environment) -> JbsResult<Self> {
        Config::builder()
            .add_source(File::from(Self::config_path()).required(false))
            .add_source(env.try_parsing(true))
            .build()
            .map_err(|e| JbsError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| JbsError::Config(e.to_string()))
    }
}
