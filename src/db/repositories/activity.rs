//! Activity log repository
//!
//! Append-only audit trail.

use crate::db::DbPool;
use crate::models::{ActivityFilter, ActivityLog, ListParams, NewActivity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record(&self, activity: &NewActivity) -> Result<ActivityLog>;

    /// Newest first
    async fn list(
        &self,
        filter: &ActivityFilter,
        params: &ListParams,
    ) -> Result<(Vec<ActivityLog>, i64)>;
}

pub struct SqlxActivityRepository {
    pool: DbPool,
}

impl SqlxActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn ActivityRepository> {
        Arc::new(Self::new(pool))
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ActivityFilter) {
    let mut separator = " WHERE ";
    if let Some(resource) = &filter.resource {
        qb.push(separator).push("resource = ").push_bind(resource.clone());
        separator = " AND ";
    }
    if let Some(user_id) = filter.user_id {
        qb.push(separator).push("user_id = ").push_bind(user_id);
    }
}

#[async_trait]
impl ActivityRepository for SqlxActivityRepository {
    async fn record(&self, activity: &NewActivity) -> Result<ActivityLog> {
        let now = Utc::now();
        let details = activity
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize activity details")?;

        let result = sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, resource, resource_id, details, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.user_id)
        .bind(&activity.action)
        .bind(&activity.resource)
        .bind(&activity.resource_id)
        .bind(details)
        .bind(&activity.ip_address)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to record activity")?;

        Ok(ActivityLog {
            id: result.last_insert_rowid(),
            user_id: activity.user_id,
            action: activity.action.clone(),
            resource: activity.resource.clone(),
            resource_id: activity.resource_id.clone(),
            details: activity.details.clone(),
            ip_address: activity.ip_address.clone(),
            created_at: now,
        })
    }

    async fn list(
        &self,
        filter: &ActivityFilter,
        params: &ListParams,
    ) -> Result<(Vec<ActivityLog>, i64)> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM activity_logs");
        push_filter(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count activity")?;

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, action, resource, resource_id, details, ip_address, created_at \
             FROM activity_logs",
        );
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list activity")?;

        Ok((rows.iter().map(row_to_activity).collect(), total))
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> ActivityLog {
    let details: Option<String> = row.get("details");
    ActivityLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        action: row.get("action"),
        resource: row.get("resource"),
        resource_id: row.get("resource_id"),
        // Unparseable details are surfaced as a plain string
        details: details.map(|d| {
            serde_json::from_str(&d).unwrap_or(serde_json::Value::String(d))
        }),
        ip_address: row.get("ip_address"),
        created_at: row.get("created_at"),
    }
}
