//! Newsletter repository

use crate::db::DbPool;
use crate::models::{ListParams, Subscriber};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

const SUBSCRIBER_COLUMNS: &str = "id, email, locale, is_active, created_at, updated_at";

#[async_trait]
pub trait NewsletterRepository: Send + Sync {
    async fn create(&self, email: &str, locale: &str) -> Result<Subscriber>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Set activity and locale of an existing subscriber
    async fn set_active(&self, id: i64, active: bool, locale: Option<&str>) -> Result<Subscriber>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn list(&self, active: Option<bool>, params: &ListParams)
        -> Result<(Vec<Subscriber>, i64)>;

    async fn count_active(&self) -> Result<i64>;
}

pub struct SqlxNewsletterRepository {
    pool: DbPool,
}

impl SqlxNewsletterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn NewsletterRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl NewsletterRepository for SqlxNewsletterRepository {
    async fn create(&self, email: &str, locale: &str) -> Result<Subscriber> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO newsletter (email, locale, is_active, created_at, updated_at) VALUES (?, ?, 1, ?, ?)",
        )
        .bind(email)
        .bind(locale)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create subscriber")?;

        Ok(Subscriber {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            locale: locale.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Subscriber>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM newsletter WHERE id = ?",
            SUBSCRIBER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get subscriber by ID")?;

        Ok(row.as_ref().map(row_to_subscriber))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM newsletter WHERE email = ?",
            SUBSCRIBER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get subscriber by email")?;

        Ok(row.as_ref().map(row_to_subscriber))
    }

    async fn set_active(&self, id: i64, active: bool, locale: Option<&str>) -> Result<Subscriber> {
        sqlx::query(
            "UPDATE newsletter SET is_active = ?, locale = COALESCE(?, locale), updated_at = ? WHERE id = ?",
        )
        .bind(active)
        .bind(locale)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update subscriber")?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Subscriber not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM newsletter WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete subscriber")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        active: Option<bool>,
        params: &ListParams,
    ) -> Result<(Vec<Subscriber>, i64)> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM newsletter");
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM newsletter", SUBSCRIBER_COLUMNS));
        if let Some(active) = active {
            count_query.push(" WHERE is_active = ").push_bind(active);
            query.push(" WHERE is_active = ").push_bind(active);
        }

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count subscribers")?;

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());
        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list subscribers")?;

        Ok((rows.iter().map(row_to_subscriber).collect(), total))
    }

    async fn count_active(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM newsletter WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count subscribers")?;

        Ok(row.get("count"))
    }
}

fn row_to_subscriber(row: &sqlx::sqlite::SqliteRow) -> Subscriber {
    Subscriber {
        id: row.get("id"),
        email: row.get("email"),
        locale: row.get("locale"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
