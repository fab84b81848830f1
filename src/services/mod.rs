//! Services layer - Business logic
//!
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod activity;
pub mod article;
pub mod lead;
pub mod markdown;
pub mod newsletter;
pub mod password;
pub mod pricing;
pub mod rate_limiter;
pub mod sanitize;
pub mod session;
pub mod settings;
pub mod user;

pub use activity::ActivityService;
pub use article::{ArticleService, ArticleServiceError, CreateArticleInput};
pub use lead::{ContactInput, ContactReceipt, LeadService, LeadServiceError};
pub use markdown::MarkdownRenderer;
pub use newsletter::{NewsletterService, NewsletterServiceError};
pub use password::{hash_password, verify_password};
pub use pricing::{PricingError, PricingEstimate};
pub use rate_limiter::{RateLimited, RateLimiter};
pub use session::{SessionClaims, SessionError, SessionSigner};
pub use settings::{PublicSettings, SettingsService, SettingsServiceError, SettingsUpdate, SiteSettings};
pub use user::{LoginSession, UserService, UserServiceError};
