//! Interaction repository

use crate::db::DbPool;
use crate::models::{Interaction, InteractionKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn create(
        &self,
        lead_id: i64,
        user_id: i64,
        kind: InteractionKind,
        content: &str,
    ) -> Result<Interaction>;

    /// Interactions of one lead, oldest first
    async fn list_by_lead(&self, lead_id: i64) -> Result<Vec<Interaction>>;
}

pub struct SqlxInteractionRepository {
    pool: DbPool,
}

impl SqlxInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn InteractionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl InteractionRepository for SqlxInteractionRepository {
    async fn create(
        &self,
        lead_id: i64,
        user_id: i64,
        kind: InteractionKind,
        content: &str,
    ) -> Result<Interaction> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO interactions (lead_id, user_id, kind, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(lead_id)
        .bind(user_id)
        .bind(kind.as_str())
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create interaction")?;

        Ok(Interaction {
            id: result.last_insert_rowid(),
            lead_id,
            user_id,
            kind,
            content: content.to_string(),
            created_at: now,
        })
    }

    async fn list_by_lead(&self, lead_id: i64) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, lead_id, user_id, kind, content, created_at
            FROM interactions
            WHERE lead_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list interactions")?;

        rows.iter().map(row_to_interaction).collect()
    }
}

fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction> {
    let kind_str: String = row.get("kind");
    let kind = InteractionKind::parse(&kind_str)
        .with_context(|| format!("Invalid interaction kind in database: {}", kind_str))?;

    Ok(Interaction {
        id: row.get("id"),
        lead_id: row.get("lead_id"),
        user_id: row.get("user_id"),
        kind,
        content: row.get("content"),
        created_at: row.get("created_at"),
    })
}
