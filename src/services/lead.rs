//! Lead service
//!
//! Contact-form submissions become leads, optionally carrying a price
//! estimate. Sales staff move them through the pipeline and log
//! interactions against them.

use std::sync::Arc;

use crate::db::repositories::{InteractionRepository, LeadRepository, UserRepository};
use crate::models::{
    Interaction, InteractionKind, Lead, LeadStatus, ListParams, NewLead, PagedResult, Role,
    UpdateLeadInput, User,
};
use crate::services::pricing::{self, PricingError, PricingEstimate};
use crate::services::sanitize::{clean_optional, clean_text, normalize_email};

pub const CONTACT_FORM_SOURCE: &str = "contact_form";

#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error("Lead not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Public contact form submission
#[derive(Debug, Clone, Default)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service: Option<String>,
    pub budget: Option<String>,
    pub message: String,
    pub locale: Option<String>,
    /// `(minutes, complexity_factor)` from the calculator, if used
    pub estimate: Option<(f64, f64)>,
}

/// The created lead and the estimate attached to it
#[derive(Debug, Clone)]
pub struct ContactReceipt {
    pub lead: Lead,
    pub estimate: Option<PricingEstimate>,
}

pub struct LeadService {
    leads: Arc<dyn LeadRepository>,
    interactions: Arc<dyn InteractionRepository>,
    users: Arc<dyn UserRepository>,
    locales: Vec<String>,
    default_locale: String,
}

impl LeadService {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        interactions: Arc<dyn InteractionRepository>,
        users: Arc<dyn UserRepository>,
        locales: Vec<String>,
        default_locale: String,
    ) -> Self {
        Self {
            leads,
            interactions,
            users,
            locales,
            default_locale,
        }
    }

    pub async fn submit_contact(&self, input: ContactInput) -> Result<ContactReceipt, LeadServiceError> {
        let name = clean_text(&input.name);
        let message = clean_text(&input.message);
        if name.is_empty() {
            return Err(LeadServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }
        if message.is_empty() {
            return Err(LeadServiceError::ValidationError(
                "Message cannot be empty".to_string(),
            ));
        }

        // Invalid calculator input rejects the whole submission
        let estimate = input
            .estimate
            .map(|(minutes, complexity)| pricing::estimate(minutes, complexity))
            .transpose()?;

        let locale = input
            .locale
            .map(|l| l.trim().to_lowercase())
            .filter(|l| self.locales.contains(l))
            .unwrap_or_else(|| self.default_locale.clone());

        let lead = self
            .leads
            .create(&NewLead {
                name,
                email: normalize_email(&input.email),
                phone: clean_optional(input.phone.as_deref()),
                company: clean_optional(input.company.as_deref()),
                service: clean_optional(input.service.as_deref()),
                budget: clean_optional(input.budget.as_deref()),
                message,
                locale,
                source: CONTACT_FORM_SOURCE.to_string(),
                estimate_min: estimate.as_ref().map(|e| e.total.min),
                estimate_max: estimate.as_ref().map(|e| e.total.max),
            })
            .await?;

        tracing::info!(lead_id = lead.id, "Lead created from contact form");
        Ok(ContactReceipt { lead, estimate })
    }

    pub async fn get(&self, id: i64) -> Result<Lead, LeadServiceError> {
        self.leads.get_by_id(id).await?.ok_or(LeadServiceError::NotFound)
    }

    pub async fn list(
        &self,
        status: Option<LeadStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Lead>, LeadServiceError> {
        let (leads, total) = self.leads.list(status, params).await?;
        Ok(PagedResult::new(leads, total, params))
    }

    pub async fn update(&self, id: i64, input: UpdateLeadInput) -> Result<Lead, LeadServiceError> {
        let mut lead = self.get(id).await?;

        if let Some(status) = input.status {
            lead.status = status;
        }
        if let Some(assigned_to) = input.assigned_to {
            if let Some(user_id) = assigned_to {
                self.check_assignee(user_id).await?;
            }
            lead.assigned_to = assigned_to;
        }
        if let Some(notes) = input.notes {
            lead.notes = clean_optional(Some(&notes));
        }

        Ok(self.leads.update(&lead).await?)
    }

    pub async fn delete(&self, id: i64) -> Result<(), LeadServiceError> {
        if !self.leads.delete(id).await? {
            return Err(LeadServiceError::NotFound);
        }
        tracing::info!(lead_id = id, "Lead deleted");
        Ok(())
    }

    pub async fn add_interaction(
        &self,
        lead_id: i64,
        author: &User,
        kind: InteractionKind,
        content: &str,
    ) -> Result<Interaction, LeadServiceError> {
        self.get(lead_id).await?;
        let content = clean_text(content);
        if content.is_empty() {
            return Err(LeadServiceError::ValidationError(
                "Interaction content cannot be empty".to_string(),
            ));
        }

        Ok(self
            .interactions
            .create(lead_id, author.id, kind, &content)
            .await?)
    }

    pub async fn interactions(&self, lead_id: i64) -> Result<Vec<Interaction>, LeadServiceError> {
        self.get(lead_id).await?;
        Ok(self.interactions.list_by_lead(lead_id).await?)
    }

    pub async fn count(&self) -> Result<i64, LeadServiceError> {
        Ok(self.leads.count().await?)
    }

    pub async fn count_by_status(&self, status: LeadStatus) -> Result<i64, LeadServiceError> {
        Ok(self.leads.count_by_status(status).await?)
    }

    /// Leads go to active sales staff or admins
    async fn check_assignee(&self, user_id: i64) -> Result<(), LeadServiceError> {
        let user = self.users.get_by_id(user_id).await?;
        match user {
            Some(u) if u.is_active && matches!(u.role, Role::Sales | Role::Admin) => Ok(()),
            Some(_) => Err(LeadServiceError::ValidationError(
                "Leads can only be assigned to active sales staff".to_string(),
            )),
            None => Err(LeadServiceError::ValidationError(format!(
                "User {} does not exist",
                user_id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxInteractionRepository, SqlxLeadRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations::run_migrations};

    struct Fixture {
        service: LeadService,
        sales: User,
        writer: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();

        let users = SqlxUserRepository::new(pool.clone());
        let sales = users
            .create(&User::new(
                "sales@studio.example".to_string(),
                "Sales".to_string(),
                "hash".to_string(),
                Role::Sales,
            ))
            .await
            .unwrap();
        let writer = users
            .create(&User::new(
                "writer@studio.example".to_string(),
                "Writer".to_string(),
                "hash".to_string(),
                Role::Writer,
            ))
            .await
            .unwrap();

        Fixture {
            service: LeadService::new(
                SqlxLeadRepository::boxed(pool.clone()),
                SqlxInteractionRepository::boxed(pool.clone()),
                SqlxUserRepository::boxed(pool),
                vec!["en".to_string(), "ar".to_string()],
                "en".to_string(),
            ),
            sales,
            writer,
        }
    }

    fn contact() -> ContactInput {
        ContactInput {
            name: "Layla <b>Haddad</b>".to_string(),
            email: " Layla@Brand.Example ".to_string(),
            company: Some("Brand Co".to_string()),
            message: "We need a 60 second product film.".to_string(),
            locale: Some("AR".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_contact_cleans_input() {
        let fx = setup().await;
        let receipt = fx.service.submit_contact(contact()).await.unwrap();
        let lead = receipt.lead;

        assert_eq!(lead.name, "Layla Haddad");
        assert_eq!(lead.email, "layla@brand.example");
        assert_eq!(lead.locale, "ar");
        assert_eq!(lead.source, CONTACT_FORM_SOURCE);
        assert_eq!(lead.status, LeadStatus::New);
        assert!(lead.estimate_min.is_none());
        assert!(receipt.estimate.is_none());
    }

    #[tokio::test]
    async fn test_submit_contact_with_estimate() {
        let fx = setup().await;
        let mut input = contact();
        input.estimate = Some((10.0, 1.0));

        let receipt = fx.service.submit_contact(input).await.unwrap();
        assert_eq!(receipt.lead.estimate_min, Some(38300.0));
        assert_eq!(receipt.lead.estimate_max, Some(39300.0));
        assert!(receipt.estimate.is_some());
    }

    #[tokio::test]
    async fn test_submit_contact_rejects_bad_estimate() {
        let fx = setup().await;
        let mut input = contact();
        input.estimate = Some((0.0, 0.5));
        assert!(matches!(
            fx.service.submit_contact(input).await,
            Err(LeadServiceError::Pricing(PricingError::InvalidMinutes(_)))
        ));
        assert_eq!(fx.service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_locale_falls_back() {
        let fx = setup().await;
        let mut input = contact();
        input.locale = Some("fr".to_string());
        let receipt = fx.service.submit_contact(input).await.unwrap();
        assert_eq!(receipt.lead.locale, "en");
    }

    #[tokio::test]
    async fn test_update_assignment() {
        let fx = setup().await;
        let lead = fx.service.submit_contact(contact()).await.unwrap().lead;

        let updated = fx
            .service
            .update(
                lead.id,
                UpdateLeadInput {
                    status: Some(LeadStatus::Qualified),
                    assigned_to: Some(Some(fx.sales.id)),
                    notes: Some("Budget confirmed".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, LeadStatus::Qualified);
        assert_eq!(updated.assigned_to, Some(fx.sales.id));
        assert_eq!(updated.notes.as_deref(), Some("Budget confirmed"));

        let err = fx
            .service
            .update(
                lead.id,
                UpdateLeadInput {
                    assigned_to: Some(Some(fx.writer.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LeadServiceError::ValidationError(_)));

        let cleared = fx
            .service
            .update(
                lead.id,
                UpdateLeadInput {
                    assigned_to: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.assigned_to.is_none());
    }

    #[tokio::test]
    async fn test_interactions() {
        let fx = setup().await;
        let lead = fx.service.submit_contact(contact()).await.unwrap().lead;

        fx.service
            .add_interaction(lead.id, &fx.sales, InteractionKind::Call, "Intro call")
            .await
            .unwrap();
        fx.service
            .add_interaction(lead.id, &fx.sales, InteractionKind::Email, "Sent proposal")
            .await
            .unwrap();

        let history = fx.service.interactions(lead.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Intro call");

        assert!(matches!(
            fx.service
                .add_interaction(lead.id, &fx.sales, InteractionKind::Note, "  ")
                .await,
            Err(LeadServiceError::ValidationError(_))
        ));
        assert!(matches!(
            fx.service.interactions(9999).await,
            Err(LeadServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let fx = setup().await;
        let first = fx.service.submit_contact(contact()).await.unwrap().lead;
        fx.service.submit_contact(contact()).await.unwrap();
        fx.service
            .update(
                first.id,
                UpdateLeadInput {
                    status: Some(LeadStatus::Lost),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let params = ListParams::default();
        assert_eq!(fx.service.list(None, &params).await.unwrap().total, 2);
        assert_eq!(
            fx.service
                .list(Some(LeadStatus::Lost), &params)
                .await
                .unwrap()
                .total,
            1
        );
        assert_eq!(fx.service.count_by_status(LeadStatus::New).await.unwrap(), 1);

        fx.service.delete(first.id).await.unwrap();
        assert!(matches!(
            fx.service.delete(first.id).await,
            Err(LeadServiceError::NotFound)
        ));
    }
}
