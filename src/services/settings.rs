//! Settings service
//!
//! Whitelisted site settings stored as key-value rows. Reads go through the
//! in-memory cache; every write invalidates it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidateEmail, ValidateUrl, ValidationError};

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::SettingsRepository;
use crate::services::sanitize::{clean_text, is_safe_url};

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_TAGLINE: &str = "site_tagline";
    pub const CONTACT_EMAIL: &str = "contact_email";
    pub const CONTACT_PHONE: &str = "contact_phone";
    pub const WHATSAPP_NUMBER: &str = "whatsapp_number";
    pub const ADDRESS: &str = "address";
    pub const INSTAGRAM_URL: &str = "instagram_url";
    pub const LINKEDIN_URL: &str = "linkedin_url";
    pub const VIMEO_URL: &str = "vimeo_url";
    pub const YOUTUBE_URL: &str = "youtube_url";
    pub const SHOWREEL_URL: &str = "showreel_url";
    pub const NOTIFICATION_EMAIL: &str = "notification_email";

    /// Everything an admin may write
    pub const ALL: &[&str] = &[
        SITE_NAME,
        SITE_TAGLINE,
        CONTACT_EMAIL,
        CONTACT_PHONE,
        WHATSAPP_NUMBER,
        ADDRESS,
        INSTAGRAM_URL,
        LINKEDIN_URL,
        VIMEO_URL,
        YOUTUBE_URL,
        SHOWREEL_URL,
        NOTIFICATION_EMAIL,
    ];
}

const PUBLIC_CACHE_KEY: &str = "settings:public";
const ALL_CACHE_KEY: &str = "settings:all";

/// Full settings, as seen by admins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_tagline: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub whatsapp_number: String,
    pub address: String,
    pub instagram_url: String,
    pub linkedin_url: String,
    pub vimeo_url: String,
    pub youtube_url: String,
    pub showreel_url: String,
    pub notification_email: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Motionhouse".to_string(),
            site_tagline: "Motion graphics, CGI and VFX".to_string(),
            contact_email: String::new(),
            contact_phone: String::new(),
            whatsapp_number: String::new(),
            address: String::new(),
            instagram_url: String::new(),
            linkedin_url: String::new(),
            vimeo_url: String::new(),
            youtube_url: String::new(),
            showreel_url: String::new(),
            notification_email: String::new(),
        }
    }
}

impl SiteSettings {
    fn from_map(mut map: HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let mut take = |key: &str, default: String| map.remove(key).unwrap_or(default);

        Self {
            site_name: take(keys::SITE_NAME, defaults.site_name),
            site_tagline: take(keys::SITE_TAGLINE, defaults.site_tagline),
            contact_email: take(keys::CONTACT_EMAIL, defaults.contact_email),
            contact_phone: take(keys::CONTACT_PHONE, defaults.contact_phone),
            whatsapp_number: take(keys::WHATSAPP_NUMBER, defaults.whatsapp_number),
            address: take(keys::ADDRESS, defaults.address),
            instagram_url: take(keys::INSTAGRAM_URL, defaults.instagram_url),
            linkedin_url: take(keys::LINKEDIN_URL, defaults.linkedin_url),
            vimeo_url: take(keys::VIMEO_URL, defaults.vimeo_url),
            youtube_url: take(keys::YOUTUBE_URL, defaults.youtube_url),
            showreel_url: take(keys::SHOWREEL_URL, defaults.showreel_url),
            notification_email: take(keys::NOTIFICATION_EMAIL, defaults.notification_email),
        }
    }

    pub fn public(&self) -> PublicSettings {
        PublicSettings {
            site_name: self.site_name.clone(),
            site_tagline: self.site_tagline.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            whatsapp_number: self.whatsapp_number.clone(),
            address: self.address.clone(),
            instagram_url: self.instagram_url.clone(),
            linkedin_url: self.linkedin_url.clone(),
            vimeo_url: self.vimeo_url.clone(),
            youtube_url: self.youtube_url.clone(),
            showreel_url: self.showreel_url.clone(),
        }
    }
}

/// Subset served to anonymous visitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub site_tagline: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub whatsapp_number: String,
    pub address: String,
    pub instagram_url: String,
    pub linkedin_url: String,
    pub vimeo_url: String,
    pub youtube_url: String,
    pub showreel_url: String,
}

/// Admin update. Absent fields are left unchanged, unknown fields rejected.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SettingsUpdate {
    #[validate(length(min = 1, max = 120))]
    pub site_name: Option<String>,
    #[validate(length(max = 255))]
    pub site_tagline: Option<String>,
    #[validate(custom(function = "email_or_empty"))]
    pub contact_email: Option<String>,
    #[validate(length(max = 40))]
    pub contact_phone: Option<String>,
    #[validate(length(max = 40))]
    pub whatsapp_number: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(custom(function = "web_link_or_empty"))]
    pub instagram_url: Option<String>,
    #[validate(custom(function = "web_link_or_empty"))]
    pub linkedin_url: Option<String>,
    #[validate(custom(function = "web_link_or_empty"))]
    pub vimeo_url: Option<String>,
    #[validate(custom(function = "web_link_or_empty"))]
    pub youtube_url: Option<String>,
    #[validate(custom(function = "web_link_or_empty"))]
    pub showreel_url: Option<String>,
    #[validate(custom(function = "email_or_empty"))]
    pub notification_email: Option<String>,
}

/// An empty string clears the link; anything else must be an http(s) URL
fn web_link_or_empty(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    let lower = value.to_lowercase();
    let web_scheme = lower.starts_with("http://") || lower.starts_with("https://");
    if web_scheme && is_safe_url(value) && value.validate_url() {
        Ok(())
    } else {
        Err(ValidationError::new("url").with_message("Must be an http(s) URL".into()))
    }
}

/// An empty string clears the address
fn email_or_empty(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("Must be an email address".into()))
    }
}

impl SettingsUpdate {
    /// Present fields as key-value pairs, text cleaned
    pub fn into_map(self) -> HashMap<String, String> {
        let pairs = [
            (keys::SITE_NAME, self.site_name),
            (keys::SITE_TAGLINE, self.site_tagline),
            (keys::CONTACT_EMAIL, self.contact_email),
            (keys::CONTACT_PHONE, self.contact_phone),
            (keys::WHATSAPP_NUMBER, self.whatsapp_number),
            (keys::ADDRESS, self.address),
            (keys::INSTAGRAM_URL, self.instagram_url),
            (keys::LINKEDIN_URL, self.linkedin_url),
            (keys::VIMEO_URL, self.vimeo_url),
            (keys::YOUTUBE_URL, self.youtube_url),
            (keys::SHOWREEL_URL, self.showreel_url),
            (keys::NOTIFICATION_EMAIL, self.notification_email),
        ];

        pairs
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), clean_text(&v))))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Failed to load settings: {0}")]
    LoadError(String),

    #[error("Failed to save settings: {0}")]
    SaveError(String),

    #[error("Unknown setting: {0}")]
    InvalidKey(String),
}

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: Arc<MemoryCache>,
    ttl: Duration,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: Arc<MemoryCache>, ttl: Duration) -> Self {
        Self { repo, cache, ttl }
    }

    /// Settings for the public site, cached
    pub async fn public_settings(&self) -> Result<PublicSettings, SettingsServiceError> {
        if let Some(cached) = self.cached::<PublicSettings>(PUBLIC_CACHE_KEY).await {
            return Ok(cached);
        }

        let settings = self.load().await?.public();
        self.store(PUBLIC_CACHE_KEY, &settings).await;
        Ok(settings)
    }

    /// Every whitelisted setting, cached
    pub async fn all_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        if let Some(cached) = self.cached::<SiteSettings>(ALL_CACHE_KEY).await {
            return Ok(cached);
        }

        let settings = self.load().await?;
        self.store(ALL_CACHE_KEY, &settings).await;
        Ok(settings)
    }

    /// Write whitelisted keys and drop every cached settings view
    pub async fn update(
        &self,
        values: &HashMap<String, String>,
    ) -> Result<SiteSettings, SettingsServiceError> {
        if let Some(unknown) = values.keys().find(|k| !keys::ALL.contains(&k.as_str())) {
            return Err(SettingsServiceError::InvalidKey(unknown.clone()));
        }

        if !values.is_empty() {
            self.repo
                .set_many(values)
                .await
                .map_err(|e| SettingsServiceError::SaveError(e.to_string()))?;
        }

        if let Err(e) = self.cache.delete_pattern("settings:*").await {
            tracing::warn!("Failed to invalidate settings cache: {}", e);
        }

        self.all_settings().await
    }

    async fn load(&self) -> Result<SiteSettings, SettingsServiceError> {
        let rows = self
            .repo
            .get_all()
            .await
            .map_err(|e| SettingsServiceError::LoadError(e.to_string()))?;

        let map = rows
            .into_iter()
            .filter(|s| keys::ALL.contains(&s.key.as_str()))
            .map(|s| (s.key, s.value))
            .collect();
        Ok(SiteSettings::from_map(map))
    }

    // Cache failures degrade to a database read
    async fn cached<T: serde::de::DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        match self.cache.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Settings cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn store<T: Serialize + Send + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value, self.ttl).await {
            tracing::warn!("Settings cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSettingsRepository;
    use crate::db::{create_test_pool, migrations::run_migrations, DbPool};

    async fn setup() -> (SettingsService, DbPool) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let service = SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new(Duration::from_secs(60))),
            Duration::from_secs(60),
        );
        (service, pool)
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let (service, _) = setup().await;
        let settings = service.all_settings().await.unwrap();
        assert_eq!(settings, SiteSettings::default());
    }

    #[tokio::test]
    async fn test_public_subset_hides_notification_email() {
        let (service, _) = setup().await;
        service
            .update(&map(&[(keys::NOTIFICATION_EMAIL, "ops@studio.example")]))
            .await
            .unwrap();

        let json = serde_json::to_value(service.public_settings().await.unwrap()).unwrap();
        assert!(json.get("notification_email").is_none());
        assert!(json.get("site_name").is_some());
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let (service, pool) = setup().await;
        assert_eq!(service.public_settings().await.unwrap().site_name, "Motionhouse");

        // A write behind the service's back is hidden by the cache
        SqlxSettingsRepository::new(pool)
            .set(keys::SITE_NAME, "Stale")
            .await
            .unwrap();
        assert_eq!(service.public_settings().await.unwrap().site_name, "Motionhouse");

        service
            .update(&map(&[(keys::SITE_NAME, "Studio Nine")]))
            .await
            .unwrap();
        assert_eq!(service.public_settings().await.unwrap().site_name, "Studio Nine");
        assert_eq!(service.all_settings().await.unwrap().site_name, "Studio Nine");
    }

    #[tokio::test]
    async fn test_unknown_key_rejected() {
        let (service, _) = setup().await;
        let err = service
            .update(&map(&[("admin_password", "x")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsServiceError::InvalidKey(k) if k == "admin_password"));
    }

    #[test]
    fn test_settings_update_into_map() {
        let update = SettingsUpdate {
            site_name: Some("  Motion <b>Nine</b> ".to_string()),
            vimeo_url: Some("https://vimeo.com/studio".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let values = update.into_map();
        assert_eq!(values.len(), 2);
        assert_eq!(values[keys::SITE_NAME], "Motion Nine");
    }

    #[test]
    fn test_settings_update_validation() {
        let update = SettingsUpdate {
            contact_email: Some("not-an-email".to_string()),
            instagram_url: Some("instagram".to_string()),
            ..Default::default()
        };
        let errors = update.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("contact_email"));
        assert!(fields.contains_key("instagram_url"));

        let unknown = serde_json::from_str::<SettingsUpdate>(r#"{"theme":"dark"}"#);
        assert!(unknown.is_err());
    }

    #[test]
    fn test_settings_links_must_be_web_urls() {
        for link in [
            "javascript:alert(document.cookie)",
            "JavaScript:alert(1)",
            "data:text/html,hi",
            "ftp://files.studio.example",
        ] {
            let update = SettingsUpdate {
                instagram_url: Some(link.to_string()),
                ..Default::default()
            };
            assert!(update.validate().is_err(), "{}", link);
        }

        let update = SettingsUpdate {
            showreel_url: Some("https://vimeo.com/123456".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }

    #[tokio::test]
    async fn test_empty_values_clear_links_and_emails() {
        let (service, _pool) = setup().await;
        let set = SettingsUpdate {
            instagram_url: Some("https://instagram.com/studio".to_string()),
            contact_email: Some("hello@studio.example".to_string()),
            ..Default::default()
        };
        service.update(&set.into_map()).await.unwrap();

        let clear = SettingsUpdate {
            instagram_url: Some(String::new()),
            contact_email: Some(String::new()),
            ..Default::default()
        };
        assert!(clear.validate().is_ok());
        let settings = service.update(&clear.into_map()).await.unwrap();
        assert_eq!(settings.instagram_url, "");
        assert_eq!(settings.contact_email, "");
    }
}
