//! Activity log
//!
//! Audit entries for logins and backoffice writes. Recording never fails the
//! request that triggered it.

use anyhow::Result;
use std::sync::Arc;

use crate::db::repositories::ActivityRepository;
use crate::models::{ActivityFilter, ActivityLog, ListParams, NewActivity, PagedResult};

pub struct ActivityService {
    repo: Arc<dyn ActivityRepository>,
}

impl ActivityService {
    pub fn new(repo: Arc<dyn ActivityRepository>) -> Self {
        Self { repo }
    }

    /// Record an entry; failures are logged and swallowed
    pub async fn record(&self, activity: NewActivity) {
        if let Err(e) = self.repo.record(&activity).await {
            tracing::warn!(action = %activity.action, "Failed to record activity: {:#}", e);
        }
    }

    pub async fn list(
        &self,
        filter: &ActivityFilter,
        params: &ListParams,
    ) -> Result<PagedResult<ActivityLog>> {
        let (entries, total) = self.repo.list(filter, params).await?;
        Ok(PagedResult::new(entries, total, params))
    }
}
