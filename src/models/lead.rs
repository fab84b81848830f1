//! Lead model
//!
//! Leads come from the public contact form and are worked by the sales team.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Requested service, free text from the form
    pub service: Option<String>,
    pub budget: Option<String>,
    pub message: String,
    pub locale: String,
    /// Where the lead came from, e.g. "contact_form"
    pub source: String,
    pub status: LeadStatus,
    /// Sales user the lead is assigned to
    pub assigned_to: Option<i64>,
    /// Internal notes, never shown publicly
    pub notes: Option<String>,
    /// Total price estimate attached at submission time (AED)
    pub estimate_min: Option<f64>,
    pub estimate_max: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sales pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::New
    }
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "qualified" => Some(LeadStatus::Qualified),
            "converted" => Some(LeadStatus::Converted),
            "lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a lead from the contact form
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub service: Option<String>,
    pub budget: Option<String>,
    pub message: String,
    pub locale: String,
    pub source: String,
    pub estimate_min: Option<f64>,
    pub estimate_max: Option<f64>,
}

/// Backoffice update of a lead
#[derive(Debug, Clone, Default)]
pub struct UpdateLeadInput {
    pub status: Option<LeadStatus>,
    /// `Some(None)` clears the assignment
    pub assigned_to: Option<Option<i64>>,
    pub notes: Option<String>,
}
