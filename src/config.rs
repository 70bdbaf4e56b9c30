use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// MySQL document store; the in-memory store is used when unset
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub api_prefix: String,

    // Seeded super-admin
    pub default_admin_username: String,
    pub default_admin_password: Option<String>,

    pub max_upload_mb: usize,
    pub log_dir: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "0.0.0.0:5000"),
            database_url: non_empty("DATABASE_URL"),
            jwt_secret: non_empty("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 86_400)?, // default 24h
            api_prefix: var_or("API_PREFIX", "/api"),

            default_admin_username: var_or("DEFAULT_ADMIN_USERNAME", "admin"),
            default_admin_password: non_empty("DEFAULT_ADMIN_PASSWORD"),

            max_upload_mb: parsed_or("MAX_UPLOAD_MB", 50)?,
            log_dir: var_or("LOG_DIR", "logs"),
        })
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

#[cfg(test)]
impl Config {
    pub fn test() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: "test-secret".into(),
            access_token_ttl: 3600,
            api_prefix: "/api".into(),
            default_admin_username: "admin".into(),
            default_admin_password: Some("admin-pass".into()),
            max_upload_mb: 5,
            log_dir: "logs".into(),
        }
    }
}
