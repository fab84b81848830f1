//! Newsletter subscriptions

use std::sync::Arc;

use crate::db::repositories::NewsletterRepository;
use crate::models::{ListParams, PagedResult, Subscriber};
use crate::services::sanitize::normalize_email;

#[derive(Debug, thiserror::Error)]
pub enum NewsletterServiceError {
    #[error("Email is already subscribed: {0}")]
    AlreadySubscribed(String),

    #[error("Subscriber not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct NewsletterService {
    repo: Arc<dyn NewsletterRepository>,
    locales: Vec<String>,
    default_locale: String,
}

impl NewsletterService {
    pub fn new(repo: Arc<dyn NewsletterRepository>, locales: Vec<String>, default_locale: String) -> Self {
        Self {
            repo,
            locales,
            default_locale,
        }
    }

    /// Subscribe an email. An inactive subscription is re-activated with the
    /// new locale; an active one is a conflict.
    pub async fn subscribe(
        &self,
        email: &str,
        locale: Option<&str>,
    ) -> Result<Subscriber, NewsletterServiceError> {
        let email = normalize_email(email);
        let locale = self.resolve_locale(locale);

        match self.repo.get_by_email(&email).await? {
            Some(existing) if existing.is_active => {
                Err(NewsletterServiceError::AlreadySubscribed(email))
            }
            Some(existing) => {
                tracing::info!(subscriber_id = existing.id, "Newsletter subscription re-activated");
                Ok(self.repo.set_active(existing.id, true, Some(&locale)).await?)
            }
            None => Ok(self.repo.create(&email, &locale).await?),
        }
    }

    /// Deactivate a subscription. Unknown emails are not reported, so the
    /// public endpoint does not reveal who is subscribed.
    pub async fn unsubscribe(&self, email: &str) -> Result<(), NewsletterServiceError> {
        let email = normalize_email(email);
        if let Some(existing) = self.repo.get_by_email(&email).await? {
            if existing.is_active {
                self.repo.set_active(existing.id, false, None).await?;
            }
        }
        Ok(())
    }

    pub async fn list(
        &self,
        active: Option<bool>,
        params: &ListParams,
    ) -> Result<PagedResult<Subscriber>, NewsletterServiceError> {
        let (subscribers, total) = self.repo.list(active, params).await?;
        Ok(PagedResult::new(subscribers, total, params))
    }

    pub async fn delete(&self, id: i64) -> Result<(), NewsletterServiceError> {
        if !self.repo.delete(id).await? {
            return Err(NewsletterServiceError::NotFound);
        }
        Ok(())
    }

    pub async fn count_active(&self) -> Result<i64, NewsletterServiceError> {
        Ok(self.repo.count_active().await?)
    }

    fn resolve_locale(&self, locale: Option<&str>) -> String {
        locale
            .map(|l| l.trim().to_lowercase())
            .filter(|l| self.locales.contains(l))
            .unwrap_or_else(|| self.default_locale.clone())
    }
}
