//! Database repositories
//!
//! Each repository handles CRUD operations for one entity behind a trait so
//! services can be tested against any implementation.

pub mod activity;
pub mod article;
pub mod interaction;
pub mod lead;
pub mod newsletter;
pub mod settings;
pub mod user;

pub use activity::{ActivityRepository, SqlxActivityRepository};
pub use article::{ArticleRepository, SqlxArticleRepository};
pub use interaction::{InteractionRepository, SqlxInteractionRepository};
pub use lead::{LeadRepository, SqlxLeadRepository};
pub use newsletter::{NewsletterRepository, SqlxNewsletterRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};
