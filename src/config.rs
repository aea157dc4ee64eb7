use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_SESSION_SECRET: &str = "default-secret-key";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub cors_origin: String,
    pub client_url: String,
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub session_secret: String,
    pub max_voters: usize,
    pub subscriber_buffer: usize,
    pub trust_proxy: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let session_secret = var("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, creator tokens use the built-in default secret");
            DEFAULT_SESSION_SECRET.to_string()
        });

        Ok(Self {
            server_addr: try_load("SERVER_ADDR", "0.0.0.0:8000")?,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:5173")?,
            client_url: try_load::<String>("CLIENT_URL", "http://localhost:5173")?
                .trim_end_matches('/')
                .to_string(),
            mongo_uri: var("MONGO_URI"),
            db_name: try_load("DB_NAME", "polling_app")?,
            session_secret,
            max_voters: try_load("MAX_VOTERS", "100")?,
            subscriber_buffer: try_load("SUBSCRIBER_BUFFER", "32")?,
            trust_proxy: try_load("TRUST_PROXY", "false")?,
        })
    }

    pub fn voting_url(&self, poll_id: &str) -> String {
        format!("{}/poll/{}", self.client_url, poll_id)
    }

    pub fn results_url(&self, poll_id: &str) -> String {
        format!("{}/results/{}", self.client_url, poll_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            cors_origin: "http://localhost:5173".to_string(),
            client_url: "http://localhost:5173".to_string(),
            mongo_uri: None,
            db_name: "polling_app".to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            max_voters: 100,
            subscriber_buffer: 32,
            trust_proxy: false,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}
