//! Configuration module for the pastry blog backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Secret used to sign session tokens. A random one is generated when unset.
    pub session_secret: Option<String>,
    pub session_ttl_hours: i64,
    /// bcrypt work factor for newly hashed passwords
    pub bcrypt_cost: u32,
    /// Admin account created at startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Object storage project URL (e.g. https://xyz.supabase.co)
    pub storage_url: String,
    pub storage_key: String,
    pub storage_bucket: String,
    /// Serverless function converting HEIC uploads to JPEG
    pub image_function: String,
    /// Transactional email API
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    /// Public site URL, used in newsletter links
    pub site_url: String,
    /// Maximum accepted request body size (uploads included)
    pub max_upload_bytes: usize,
    /// Timeout applied to outgoing HTTP calls
    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/patisserie.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            session_secret: None,
            session_ttl_hours: 24 * 30,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_email: None,
            admin_password: None,
            storage_url: "http://localhost:54321".to_string(),
            storage_key: String::new(),
            storage_bucket: "images".to_string(),
            image_function: "convert-heic".to_string(),
            email_api_url: "https://api.resend.com".to_string(),
            email_api_key: String::new(),
            email_from: "Pâtisserie <newsletter@localhost>".to_string(),
            site_url: "http://localhost:3000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            http_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let db_path = env::var("PATISSERIE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = env::var("PATISSERIE_BIND_ADDR")
            .map(|addr| addr.parse().expect("Invalid PATISSERIE_BIND_ADDR format"))
            .unwrap_or(defaults.bind_addr);

        let log_level = env::var("PATISSERIE_LOG_LEVEL").unwrap_or(defaults.log_level);

        let log_format = match env::var("PATISSERIE_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let session_ttl_hours = parse_var("PATISSERIE_SESSION_TTL_HOURS", defaults.session_ttl_hours);
        let bcrypt_cost = parse_var("PATISSERIE_BCRYPT_COST", defaults.bcrypt_cost);
        let max_upload_bytes = parse_var("PATISSERIE_MAX_UPLOAD_BYTES", defaults.max_upload_bytes);
        let http_timeout_secs = parse_var("PATISSERIE_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs);

        Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            session_secret: non_empty_var("PATISSERIE_SESSION_SECRET"),
            session_ttl_hours,
            bcrypt_cost,
            admin_email: non_empty_var("ADMIN_EMAIL"),
            admin_password: non_empty_var("ADMIN_PASSWORD"),
            storage_url: env::var("PATISSERIE_STORAGE_URL").unwrap_or(defaults.storage_url),
            storage_key: env::var("PATISSERIE_STORAGE_KEY").unwrap_or(defaults.storage_key),
            storage_bucket: env::var("PATISSERIE_STORAGE_BUCKET")
                .unwrap_or(defaults.storage_bucket),
            image_function: env::var("PATISSERIE_IMAGE_FUNCTION")
                .unwrap_or(defaults.image_function),
            email_api_url: env::var("PATISSERIE_EMAIL_API_URL").unwrap_or(defaults.email_api_url),
            email_api_key: env::var("PATISSERIE_EMAIL_API_KEY").unwrap_or(defaults.email_api_key),
            email_from: env::var("PATISSERIE_EMAIL_FROM").unwrap_or(defaults.email_from),
            site_url: env::var("PATISSERIE_SITE_URL").unwrap_or(defaults.site_url),
            max_upload_bytes,
            http_timeout_secs,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("PATISSERIE_DB_PATH");
        env::remove_var("PATISSERIE_BIND_ADDR");
        env::remove_var("PATISSERIE_LOG_LEVEL");
        env::remove_var("PATISSERIE_LOG_FORMAT");
        env::remove_var("PATISSERIE_SESSION_SECRET");
        env::remove_var("PATISSERIE_STORAGE_BUCKET");
        env::remove_var("PATISSERIE_BCRYPT_COST");

        let config = Config::from_env();

        assert!(config.session_secret.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/patisserie.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.storage_bucket, "images");
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_invalid_number_falls_back_to_default() {
        env::set_var("PATISSERIE_TEST_NUMBER", "not-a-number");
        assert_eq!(parse_var("PATISSERIE_TEST_NUMBER", 42u64), 42);
        env::remove_var("PATISSERIE_TEST_NUMBER");
    }
}
