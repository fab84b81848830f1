//! Data models
//!
//! Database entities and the input types the services pass to repositories.

mod activity;
mod article;
mod interaction;
mod lead;
mod newsletter;
mod pagination;
mod user;

pub use activity::{ActivityFilter, ActivityLog, NewActivity};
pub use article::{Article, ArticleFilter, ArticleStatus, NewArticle, UpdateArticleInput};
pub use interaction::{Interaction, InteractionKind};
pub use lead::{Lead, LeadStatus, NewLead, UpdateLeadInput};
pub use newsletter::Subscriber;
pub use pagination::{ListParams, PagedResult, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use user::{CreateUserInput, Role, UpdateUserInput, User};
