use anyhow::{bail, Context};
use base64::Engine;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use std::{env, fs};

use crate::plaid::sync::SyncOptions;

pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Deserialize)]
pub struct SSLConfig {
    pub private_key_file: PathBuf,
    pub certificate_chain_file: PathBuf,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(PlaidEnvironment::Sandbox),
            "development" => Ok(PlaidEnvironment::Development),
            "production" => Ok(PlaidEnvironment::Production),
            other => Err(anyhow::anyhow!("Unknown Plaid environment: {}", other)),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    #[serde(default)]
    pub environment: PlaidEnvironment,
    pub redirect_uri: Option<String>,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

#[derive(Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub max_pages: u32,
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            max_pages: 50,
            timeout_secs: 30,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        SyncOptions {
            max_pages: config.max_pages,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_signups_enabled")]
    pub signups_enabled: bool,
    /// Base64 encoded token signing secret. When unset the server keeps its own in the state
    /// directory.
    pub secret: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_token_lifetime_secs")]
    pub token_lifetime_secs: u64,
    pub honeycomb_api_key: Option<String>,
    pub plaid: PlaidConfig,
    pub gemini: Option<GeminiConfig>,
    #[serde(default)]
    pub sync: SyncConfig,
    pub ssl: Option<SSLConfig>,
}

fn default_signups_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    5000
}

fn default_token_lifetime_secs() -> u64 {
    60 * 60
}

fn default_client_name() -> String {
    "Finance Dashboard".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Config, anyhow::Error> {
        let config = fs::read_to_string(path).context("Unable to read config file")?;
        Self::from_toml(&config)
    }

    pub fn from_toml(config: &str) -> Result<Config, anyhow::Error> {
        let config: Config = toml::from_str(config).with_context(|| "Unable to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Config, anyhow::Error> {
        let database_url = read_env("DATABASE_URL")?;
        let signups_enabled = match read_optional_env("SIGNUPS_ENABLED") {
            Some(value) => value
                .parse()
                .context("Unable to parse SIGNUPS_ENABLED value")?,
            None => default_signups_enabled(),
        };
        let port = match read_optional_env("PORT") {
            Some(value) => value.parse().context("Unable to parse PORT value")?,
            None => default_port(),
        };
        let token_lifetime_secs = match read_optional_env("TOKEN_LIFETIME_SECS") {
            Some(value) => value
                .parse()
                .context("Unable to parse TOKEN_LIFETIME_SECS value")?,
            None => default_token_lifetime_secs(),
        };
        let environment = match read_optional_env("PLAID_ENV") {
            Some(value) => value.parse()?,
            None => PlaidEnvironment::default(),
        };
        let plaid = PlaidConfig {
            client_id: read_env("PLAID_CLIENT_ID")?,
            secret: read_env("PLAID_SECRET")?,
            environment,
            redirect_uri: read_optional_env("PLAID_REDIRECT_URI"),
            client_name: read_optional_env("PLAID_CLIENT_NAME").unwrap_or_else(default_client_name),
        };
        let gemini = read_optional_env("GEMINI_API_KEY").map(|api_key| GeminiConfig {
            api_key,
            model: read_optional_env("GEMINI_MODEL").unwrap_or_else(default_gemini_model),
        });

        let defaults = SyncConfig::default();
        let sync = SyncConfig {
            max_pages: match read_optional_env("SYNC_MAX_PAGES") {
                Some(value) => value.parse().context("Unable to parse SYNC_MAX_PAGES value")?,
                None => defaults.max_pages,
            },
            timeout_secs: match read_optional_env("SYNC_TIMEOUT_SECS") {
                Some(value) => value
                    .parse()
                    .context("Unable to parse SYNC_TIMEOUT_SECS value")?,
                None => defaults.timeout_secs,
            },
        };

        let config = Config {
            database_url,
            signups_enabled,
            secret: read_optional_env("SECRET"),
            port,
            token_lifetime_secs,
            honeycomb_api_key: read_optional_env("HONEYCOMB_API_KEY"),
            plaid,
            gemini,
            sync,
            ssl: None,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.sync.max_pages == 0 {
            bail!("sync.max_pages must be at least 1");
        }
        if self.sync.timeout_secs == 0 {
            bail!("sync.timeout_secs must be at least 1");
        }
        self.secret_bytes()?;
        Ok(())
    }

    /// Decodes the configured signing secret, if there is one.
    pub fn secret_bytes(&self) -> Result<Option<Vec<u8>>, anyhow::Error> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };
        let base64_engine = base64::engine::general_purpose::STANDARD;
        let secret = base64_engine
            .decode(secret)
            .context("Unable to decode secret as base64")?;
        check_secret(secret).map(Some)
    }
}

/// Rejects signing secrets too short to resist guessing.
pub fn check_secret(secret: Vec<u8>) -> Result<Vec<u8>, anyhow::Error> {
    if secret.len() < MIN_SECRET_BYTES {
        bail!(
            "Secret must be at least {} bytes, got {}",
            MIN_SECRET_BYTES,
            secret.len()
        );
    }
    Ok(secret)
}

fn read_env(key: &str) -> Result<String, anyhow::Error> {
    env::var(key).with_context(|| format!("Unable to read env var: {}", key))
}

fn read_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}
