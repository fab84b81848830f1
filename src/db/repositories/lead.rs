//! Lead repository
//!
//! Database operations for contact-form leads.

use crate::db::DbPool;
use crate::models::{Lead, LeadStatus, ListParams, NewLead};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::sync::Arc;

const LEAD_COLUMNS: &str = "id, name, email, phone, company, service, budget, message, locale, \
     source, status, assigned_to, notes, estimate_min, estimate_max, created_at, updated_at";

/// Lead repository trait
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create(&self, lead: &NewLead) -> Result<Lead>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Lead>>;

    /// Persist status, assignment and notes
    async fn update(&self, lead: &Lead) -> Result<Lead>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// List leads, newest first, optionally in one status
    async fn list(
        &self,
        status: Option<LeadStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Lead>, i64)>;

    async fn count_by_status(&self, status: LeadStatus) -> Result<i64>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxLeadRepository {
    pool: DbPool,
}

impl SqlxLeadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DbPool) -> Arc<dyn LeadRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LeadRepository for SqlxLeadRepository {
    async fn create(&self, lead: &NewLead) -> Result<Lead> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO leads (name, email, phone, company, service, budget, message, locale,
                source, status, estimate_min, estimate_max, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.company)
        .bind(&lead.service)
        .bind(&lead.budget)
        .bind(&lead.message)
        .bind(&lead.locale)
        .bind(&lead.source)
        .bind(LeadStatus::New.as_str())
        .bind(lead.estimate_min)
        .bind(lead.estimate_max)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to create lead")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| anyhow::anyhow!("Lead not found after insert"))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Lead>> {
        let row = sqlx::query(&format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get lead by ID")?;

        row.as_ref().map(row_to_lead).transpose()
    }

    async fn update(&self, lead: &Lead) -> Result<Lead> {
        sqlx::query(
            "UPDATE leads SET status = ?, assigned_to = ?, notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(lead.status.as_str())
        .bind(lead.assigned_to)
        .bind(&lead.notes)
        .bind(Utc::now())
        .bind(lead.id)
        .execute(&self.pool)
        .await
        .context("Failed to update lead")?;

        self.get_by_id(lead.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Lead not found after update"))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete lead")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(
        &self,
        status: Option<LeadStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Lead>, i64)> {
        let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM leads");
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM leads", LEAD_COLUMNS));
        if let Some(status) = status {
            count_query.push(" WHERE status = ").push_bind(status.as_str());
            query.push(" WHERE status = ").push_bind(status.as_str());
        }

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .context("Failed to count leads")?;

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list leads")?;

        let leads = rows.iter().map(row_to_lead).collect::<Result<Vec<_>>>()?;
        Ok((leads, total))
    }

    async fn count_by_status(&self, status: LeadStatus) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM leads WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count leads by status")?;

        Ok(row.get("count"))
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM leads")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count leads")?;

        Ok(row.get("count"))
    }
}

fn row_to_lead(row: &sqlx::sqlite::SqliteRow) -> Result<Lead> {
    let status_str: String = row.get("status");
    let status = LeadStatus::parse(&status_str)
        .with_context(|| format!("Invalid lead status in database: {}", status_str))?;

    Ok(Lead {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        company: row.get("company"),
        service: row.get("service"),
        budget: row.get("budget"),
        message: row.get("message"),
        locale: row.get("locale"),
        source: row.get("source"),
        status,
        assigned_to: row.get("assigned_to"),
        notes: row.get("notes"),
        estimate_min: row.get("estimate_min"),
        estimate_max: row.get("estimate_max"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Role, User};

    async fn setup() -> (DbPool, SqlxLeadRepository) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        (pool.clone(), SqlxLeadRepository::new(pool))
    }

    fn new_lead(email: &str) -> NewLead {
        NewLead {
            name: "Client".to_string(),
            email: email.to_string(),
            message: "We need a 60s explainer".to_string(),
            locale: "en".to_string(),
            source: "contact_form".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_new() {
        let (_pool, repo) = setup().await;
        let mut input = new_lead("client@brand.example");
        input.estimate_min = Some(2100.0);
        input.estimate_max = Some(2300.0);

        let lead = repo.create(&input).await.unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.estimate_min, Some(2100.0));
        assert!(lead.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_update_and_filter_by_status() {
        let (_pool, repo) = setup().await;
        let mut lead = repo.create(&new_lead("a@brand.example")).await.unwrap();
        repo.create(&new_lead("b@brand.example")).await.unwrap();

        lead.status = LeadStatus::Qualified;
        lead.notes = Some("Budget confirmed".to_string());
        let updated = repo.update(&lead).await.unwrap();
        assert_eq!(updated.status, LeadStatus::Qualified);
        assert_eq!(updated.notes.as_deref(), Some("Budget confirmed"));

        let params = ListParams::default();
        let (items, total) = repo.list(Some(LeadStatus::Qualified), &params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].email, "a@brand.example");

        let (_, total) = repo.list(None, &params).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(repo.count_by_status(LeadStatus::New).await.unwrap(), 1);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_assignee_deletion_clears_assignment() {
        let (pool, repo) = setup().await;
        let users = SqlxUserRepository::new(pool);
        let sales = users
            .create(&User::new(
                "sales@studio.example".to_string(),
                "Sales".to_string(),
                "hash".to_string(),
                Role::Sales,
            ))
            .await
            .unwrap();

        let mut lead = repo.create(&new_lead("c@brand.example")).await.unwrap();
        lead.assigned_to = Some(sales.id);
        repo.update(&lead).await.unwrap();

        users.delete(sales.id).await.unwrap();
        let reloaded = repo.get_by_id(lead.id).await.unwrap().unwrap();
        assert!(reloaded.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, repo) = setup().await;
        let lead = repo.create(&new_lead("d@brand.example")).await.unwrap();
        assert!(repo.delete(lead.id).await.unwrap());
        assert!(repo.get_by_id(lead.id).await.unwrap().is_none());
    }
}
