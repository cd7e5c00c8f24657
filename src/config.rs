use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Runtime configuration, read once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origin: String,
    /// PostgreSQL collaborators are used when set, in-memory ones otherwise
    pub database_url: Option<String>,
    pub max_message_length: usize,
    /// Debate ids pre-registered in the in-memory room directory
    pub seed_rooms: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            port: try_load("PORT", 5000),
            jwt_secret,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:3000".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            max_message_length: try_load("MAX_MESSAGE_LENGTH", 5000),
            seed_rooms: env::var("SEED_ROOMS")
                .map(|rooms| parse_list(&rooms))
                .unwrap_or_default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            database_url: None,
            max_message_length: 5000,
            seed_rooms: Vec::new(),
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
