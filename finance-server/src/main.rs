#[macro_use]
extern crate tracing;

use std::error::Error;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, HttpServer};
use anyhow::{anyhow, Context};
use rand::Rng;
use rustls::{Certificate, PrivateKey, ServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;

use finance_lib::advisor::gemini::GeminiClient;
use finance_lib::advisor::LanguageModel;
use finance_lib::auth::jwt::JWTAuth;
use finance_lib::config::{check_secret, Config, SSLConfig};
use finance_lib::plaid::client::PlaidClient;
use finance_lib::plaid::Aggregator;
use finance_lib::AppDependencies;

const SERVICE_NAME: &str = "finance-server";
const MAX_POOL_SIZE: u32 = 10;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::Layer::default());
    let tracing_guard = tracing::subscriber::set_default(subscriber);
    info!("tracing initialized");

    let config = load_config()?;

    let telemetry_layer = config
        .honeycomb_api_key
        .as_deref()
        .map(|api_key| finance_lib::tracing::create_opentelemetry_layer(SERVICE_NAME, api_key))
        .transpose()?;

    let subscriber = registry::Registry::default()
        .with(LevelFilter::INFO)
        .with(tracing_subscriber::fmt::Layer::default())
        .with(telemetry_layer);
    tracing::subscriber::set_global_default(subscriber).context("Unable to set up tracing")?;
    drop(tracing_guard);

    let pool = finance_repo::sqlx_repo::connect(&config.database_url, MAX_POOL_SIZE).await?;
    let (user_repo, asset_repo, health_check) =
        finance_repo::sqlx_repo::create_repos(pool.clone());

    let secret = match config.secret_bytes()? {
        Some(secret) => secret,
        None => get_secret()?,
    };
    let jwt_auth = JWTAuth::with_lifetime(secret, Duration::from_secs(config.token_lifetime_secs));

    let aggregator: Arc<dyn Aggregator> = Arc::new(PlaidClient::new(&config.plaid)?);
    info!(environment = ?config.plaid.environment, "Using Plaid");

    let language_model: Option<Arc<dyn LanguageModel>> = match &config.gemini {
        Some(gemini_config) => Some(Arc::new(GeminiClient::new(gemini_config)?)),
        None => {
            warn!("No Gemini API key configured, advisor disabled");
            None
        }
    };

    let dependencies = AppDependencies {
        jwt_auth,
        user_repo,
        asset_repo,
        health_check,
        aggregator,
        language_model,
        sync_options: (&config.sync).into(),
        signups_enabled: config.signups_enabled,
    };

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(finance_lib::tracing::create_middleware())
            .configure(finance_lib::app_config_func(dependencies.clone()))
    });
    let address = ("0.0.0.0", config.port);
    server = match config.ssl {
        None => {
            warn!("Using http");
            server.bind(address)?
        }
        Some(ssl_config) => {
            info!("Using https");
            server.bind_rustls(address, load_rustls_config(ssl_config)?)?
        }
    };
    info!(port = config.port, "Starting server");
    server.run().await?;

    pool.close().await;
    Ok(())
}

/// Reads `config.toml` if there is one, otherwise configuration comes from the environment.
fn load_config() -> Result<Config, anyhow::Error> {
    match get_config_file() {
        Some(config_path) => {
            info!(path = %config_path.display(), "Reading config file");
            Config::from_file(config_path)
        }
        None => {
            info!("No config file found, reading config from environment");
            Config::from_env()
        }
    }
}

fn get_config_file() -> Option<PathBuf> {
    let config_current_dir = PathBuf::from("config.toml");
    if config_current_dir.exists() {
        return Some(config_current_dir);
    }
    if let Ok(config_env) = std::env::var("CONFIGURATION_DIRECTORY") {
        let config_path = PathBuf::from(config_env).join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}

fn load_rustls_config(ssl_config: SSLConfig) -> Result<ServerConfig, anyhow::Error> {
    let config = ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth();

    let mut cert_file = BufReader::new(
        File::open(ssl_config.certificate_chain_file)
            .context("Error opening certificate chain file")?,
    );
    let mut key_file = BufReader::new(
        File::open(ssl_config.private_key_file).context("Error opening private key file")?,
    );

    let cert_chain = certs(&mut cert_file)
        .context("Unable to read certificate chain file")?
        .into_iter()
        .map(Certificate)
        .collect();
    let mut keys: Vec<PrivateKey> = pkcs8_private_keys(&mut key_file)
        .context("Unable to read private key file")?
        .into_iter()
        .map(PrivateKey)
        .collect();

    if keys.is_empty() {
        return Err(anyhow!("No private key found in file"));
    }

    let config = config
        .with_single_cert(cert_chain, keys.remove(0))
        .context("Invalid certificate or private key")?;
    Ok(config)
}

fn get_state_dir() -> PathBuf {
    if let Ok(state_env) = std::env::var("STATE_DIRECTORY") {
        return PathBuf::from(state_env);
    }

    PathBuf::from("data")
}

/// Gets the secret from file. If the file does not exist it will generate a new secret and save it
/// to the file
fn get_secret() -> Result<Vec<u8>, anyhow::Error> {
    let state_dir = get_state_dir();
    let secret_file = state_dir.join("secret");
    if secret_file.exists() {
        let secret = fs::read(secret_file).context("Unable to read secret file")?;
        check_secret(secret)
    } else {
        let mut rng = rand::thread_rng();
        let mut secret: [u8; 128] = [0; 128];
        rng.fill(&mut secret);

        fs::create_dir_all(&state_dir).context("Unable to create state directory")?;
        fs::write(secret_file, secret).context("Unable to write secret file")?;
        info!(state_dir = %state_dir.display(), "Generated new secret");

        Ok(secret.to_vec())
    }
}
