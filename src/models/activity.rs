//! Activity log model
//!
//! Every backoffice write and every login leaves one entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: i64,
    /// Acting user, `None` for public actions or deleted users
    pub user_id: Option<i64>,
    /// Dotted action name, e.g. "article.create"
    pub action: String,
    /// Resource type, e.g. "article"
    pub resource: String,
    pub resource_id: Option<String>,
    /// Free-form JSON details
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action: String,
    pub resource: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

impl NewActivity {
    pub fn new(user_id: Option<i64>, action: &str, resource: &str) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            resource: resource.to_string(),
            ..Default::default()
        }
    }

    pub fn with_resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

/// Filters for the activity listing
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub resource: Option<String>,
    pub user_id: Option<i64>,
}
