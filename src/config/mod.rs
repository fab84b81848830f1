//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `MOTIONHOUSE_*` environment variables. Missing values fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the marketing frontend)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Take the client address from X-Forwarded-For / X-Real-IP.
    /// Only enable behind a reverse proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            trust_proxy: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/motionhouse.db".to_string()
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Settings cache TTL in seconds
    #[serde(default = "default_settings_ttl")]
    pub settings_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            settings_ttl_seconds: default_settings_ttl(),
        }
    }
}

fn default_settings_ttl() -> u64 {
    60
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. Empty means "generate at startup".
    #[serde(default)]
    pub session_secret: String,
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Add the `Secure` attribute to the session cookie
    #[serde(default)]
    pub cookie_secure: bool,
    /// Admin account created when the users table is empty
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: String::new(),
            session_ttl_hours: default_session_ttl_hours(),
            cookie_secure: false,
            bootstrap_admin_email: None,
            bootstrap_admin_password: None,
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24 * 7
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 25MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    25 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "video/mp4".to_string(),
        "video/webm".to_string(),
        "application/pdf".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            "application/pdf" => "pdf",
            _ => "bin",
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Failed logins allowed per username within `login_window_seconds`
    #[serde(default = "default_login_attempts")]
    pub login_attempts: usize,
    #[serde(default = "default_login_window")]
    pub login_window_seconds: i64,
    /// Login requests allowed per IP within `ip_window_seconds`
    #[serde(default = "default_ip_requests")]
    pub ip_requests: usize,
    #[serde(default = "default_ip_window")]
    pub ip_window_seconds: i64,
    /// Public form submissions (contact, newsletter) per IP
    #[serde(default = "default_form_submissions")]
    pub form_submissions: usize,
    #[serde(default = "default_form_window")]
    pub form_window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_attempts: default_login_attempts(),
            login_window_seconds: default_login_window(),
            ip_requests: default_ip_requests(),
            ip_window_seconds: default_ip_window(),
            form_submissions: default_form_submissions(),
            form_window_seconds: default_form_window(),
        }
    }
}

fn default_login_attempts() -> usize {
    5
}

fn default_login_window() -> i64 {
    15 * 60
}

fn default_ip_requests() -> usize {
    10
}

fn default_ip_window() -> i64 {
    60
}

fn default_form_submissions() -> usize {
    5
}

fn default_form_window() -> i64 {
    10 * 60
}

/// Site-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Supported content locales
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            default_locale: default_locale(),
        }
    }
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string(), "ar".to_string()]
}

fn default_locale() -> String {
    "en".to_string()
}

impl SiteConfig {
    pub fn is_supported(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognized variables:
    /// - MOTIONHOUSE_SERVER_HOST / _PORT / _CORS_ORIGIN / _TRUST_PROXY
    /// - MOTIONHOUSE_DATABASE_URL
    /// - MOTIONHOUSE_CACHE_SETTINGS_TTL_SECONDS
    /// - MOTIONHOUSE_AUTH_SESSION_SECRET / _SESSION_TTL_HOURS / _COOKIE_SECURE
    /// - MOTIONHOUSE_AUTH_BOOTSTRAP_ADMIN_EMAIL / _BOOTSTRAP_ADMIN_PASSWORD
    /// - MOTIONHOUSE_UPLOAD_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_ttl_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_ttl_hours must be positive".to_string(),
            ));
        }
        if self.site.locales.is_empty() {
            return Err(ConfigError::ValidationError(
                "site.locales must not be empty".to_string(),
            ));
        }
        if !self.site.is_supported(&self.site.default_locale) {
            return Err(ConfigError::ValidationError(format!(
                "site.default_locale '{}' is not in site.locales",
                self.site.default_locale
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MOTIONHOUSE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MOTIONHOUSE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("MOTIONHOUSE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(trust_proxy) = std::env::var("MOTIONHOUSE_SERVER_TRUST_PROXY") {
            self.server.trust_proxy = matches!(trust_proxy.as_str(), "1" | "true");
        }

        if let Ok(url) = std::env::var("MOTIONHOUSE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("MOTIONHOUSE_CACHE_SETTINGS_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.settings_ttl_seconds = ttl;
            }
        }

        if let Ok(secret) = std::env::var("MOTIONHOUSE_AUTH_SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Ok(hours) = std::env::var("MOTIONHOUSE_AUTH_SESSION_TTL_HOURS") {
            if let Ok(hours) = hours.parse::<i64>() {
                self.auth.session_ttl_hours = hours;
            }
        }
        if let Ok(secure) = std::env::var("MOTIONHOUSE_AUTH_COOKIE_SECURE") {
            match secure.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.auth.cookie_secure = true,
                "0" | "false" | "no" => self.auth.cookie_secure = false,
                _ => {}
            }
        }
        if let Ok(email) = std::env::var("MOTIONHOUSE_AUTH_BOOTSTRAP_ADMIN_EMAIL") {
            self.auth.bootstrap_admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("MOTIONHOUSE_AUTH_BOOTSTRAP_ADMIN_PASSWORD") {
            self.auth.bootstrap_admin_password = Some(password);
        }

        if let Ok(path) = std::env::var("MOTIONHOUSE_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Env-mutating tests share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
