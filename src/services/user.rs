//! User service
//!
//! Backoffice accounts and authentication:
//! - login with argon2id verification and signed session tokens
//! - per-request session validation against the current user row
//! - admin CRUD with self-protection and last-admin guards
//! - bootstrap admin on an empty database

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::is_foreign_key_violation;
use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, ListParams, PagedResult, Role, UpdateUserInput, User};
use crate::services::password::{
    check_password_policy, hash_password, verify_dummy, verify_password,
};
use crate::services::sanitize::{clean_text, normalize_email};
use crate::services::session::SessionSigner;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or inactive account
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    signer: Arc<SessionSigner>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, signer: Arc<SessionSigner>) -> Self {
        Self { repo, signer }
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.signer.ttl_seconds()
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown emails still run one argon2 verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, UserServiceError> {
        let email = normalize_email(email);
        let Some(user) = self.repo.get_by_email(&email).await? else {
            verify_dummy(password);
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(UserServiceError::AuthenticationError(
                "Invalid email or password".to_string(),
            ));
        }
        if !user.is_active {
            return Err(UserServiceError::AuthenticationError(
                "Account is disabled".to_string(),
            ));
        }

        let (token, expires_at) = self
            .signer
            .issue(user.id, user.role)
            .map_err(|e| UserServiceError::InternalError(e.into()))?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(LoginSession {
            user,
            token,
            expires_at,
        })
    }

    /// Resolve a session token to its user.
    ///
    /// `None` for bad or expired tokens, missing or inactive users, and
    /// tokens whose role no longer matches the user's role.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let claims = match self.signer.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                return Ok(None);
            }
        };

        let user = self.repo.get_by_id(claims.sub).await?;
        Ok(user.filter(|u| u.is_active && u.role == claims.role))
    }

    pub async fn get(&self, id: i64) -> Result<User, UserServiceError> {
        self.repo.get_by_id(id).await?.ok_or(UserServiceError::NotFound)
    }

    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self.repo.list(params).await?;
        Ok(PagedResult::new(users, total, params))
    }

    pub async fn count(&self) -> Result<i64, UserServiceError> {
        Ok(self.repo.count().await?)
    }

    pub async fn create(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        let name = clean_text(&input.name);
        validate_email(&email)?;
        if name.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Name cannot be empty".to_string(),
            ));
        }
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;

        if self.repo.get_by_email(&email).await?.is_some() {
            return Err(UserServiceError::UserExists(email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .repo
            .create(&User::new(email, name, password_hash, input.role))
            .await?;

        tracing::info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Apply an admin's update to a user
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.get(id).await?;

        if actor.id == user.id {
            if input.role.is_some_and(|r| r != user.role) {
                return Err(UserServiceError::Forbidden(
                    "You cannot change your own role".to_string(),
                ));
            }
            if input.is_active == Some(false) {
                return Err(UserServiceError::Forbidden(
                    "You cannot deactivate your own account".to_string(),
                ));
            }
        }

        let loses_admin = user.is_admin()
            && user.is_active
            && (input.role.is_some_and(|r| r != Role::Admin) || input.is_active == Some(false));
        if loses_admin {
            self.ensure_other_admin().await?;
        }

        if let Some(email) = input.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if email != user.email {
                if self.repo.get_by_email(&email).await?.is_some() {
                    return Err(UserServiceError::UserExists(email));
                }
                user.email = email;
            }
        }
        if let Some(name) = input.name {
            let name = clean_text(&name);
            if name.is_empty() {
                return Err(UserServiceError::ValidationError(
                    "Name cannot be empty".to_string(),
                ));
            }
            user.name = name;
        }
        if let Some(password) = input.password {
            check_password_policy(&password).map_err(UserServiceError::ValidationError)?;
            user.password_hash = hash_password(&password)?;
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }

        Ok(self.repo.update(&user).await?)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        if actor.id == id {
            return Err(UserServiceError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }

        let user = self.get(id).await?;
        if user.is_admin() && user.is_active {
            self.ensure_other_admin().await?;
        }

        match self.repo.delete(id).await {
            Ok(true) => {}
            Ok(false) => return Err(UserServiceError::NotFound),
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(UserServiceError::ValidationError(
                    "User still owns articles or lead interactions; deactivate the account instead"
                        .to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the configured admin when no users exist yet
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if email.trim().is_empty() || password.is_empty() {
            return Ok(None);
        }
        if self.repo.count().await? > 0 {
            return Ok(None);
        }

        let user = self
            .create(CreateUserInput {
                email: email.to_string(),
                name: "Administrator".to_string(),
                password: password.to_string(),
                role: Role::Admin,
            })
            .await?;
        tracing::info!(email = %user.email, "Bootstrap admin created");
        Ok(Some(user))
    }

    async fn ensure_other_admin(&self) -> Result<(), UserServiceError> {
        if self.repo.count_active_by_role(Role::Admin).await? <= 1 {
            return Err(UserServiceError::ValidationError(
                "At least one active admin is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid && email.len() <= 254 {
        Ok(())
    } else {
        Err(UserServiceError::ValidationError(
            "Invalid email address".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations::run_migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        UserService::new(
            SqlxUserRepository::boxed(pool),
            Arc::new(SessionSigner::new(b"user-service-test", 24)),
        )
    }

    fn input(email: &str, role: Role) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            name: "Test User".to_string(),
            password: "password123".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_delete_author_keeps_their_articles() {
        use crate::db::repositories::{ArticleRepository, SqlxArticleRepository};
        use crate::models::{ArticleStatus, NewArticle};

        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let service = UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            Arc::new(SessionSigner::new(b"user-service-test", 24)),
        );
        let articles = SqlxArticleRepository::new(pool);

        let admin = service.create(input("admin@studio.example", Role::Admin)).await.unwrap();
        let writer = service.create(input("writer@studio.example", Role::Writer)).await.unwrap();
        let article = articles
            .create(&NewArticle {
                slug: "making-of".to_string(),
                locale: "en".to_string(),
                title: "Making of".to_string(),
                excerpt: None,
                content: "Body".to_string(),
                content_html: "<p>Body</p>".to_string(),
                cover_image: None,
                status: ArticleStatus::Published,
                author_id: writer.id,
                published_at: Some(Utc::now()),
            })
            .await
            .unwrap();

        let err = service.delete(&admin, writer.id).await.unwrap_err();
        assert!(matches!(err, UserServiceError::ValidationError(_)));
        assert!(articles.get_by_id(article.id).await.unwrap().is_some());
        assert!(service.get(writer.id).await.is_ok());

        articles.delete(article.id).await.unwrap();
        service.delete(&admin, writer.id).await.unwrap();
        assert!(matches!(
            service.get(writer.id).await,
            Err(UserServiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_normalizes_email() {
        let service = setup().await;
        let user = service
            .create(input("  Writer@Studio.Example ", Role::Writer))
            .await
            .unwrap();
        assert_eq!(user.email, "writer@studio.example");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let service = setup().await;
        service.create(input("a@studio.example", Role::Sales)).await.unwrap();
        let err = service
            .create(input("A@studio.example", Role::Sales))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup().await;
        let mut weak = input("b@studio.example", Role::Writer);
        weak.password = "short".to_string();
        assert!(matches!(
            service.create(weak).await,
            Err(UserServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(input("no-at-sign", Role::Writer)).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_and_validate_session() {
        let service = setup().await;
        let user = service.create(input("sales@studio.example", Role::Sales)).await.unwrap();

        let session = service.login("SALES@studio.example", "password123").await.unwrap();
        assert_eq!(session.user.id, user.id);

        let resolved = service.validate_session(&session.token).await.unwrap();
        assert_eq!(resolved.map(|u| u.id), Some(user.id));
        assert!(service.validate_session("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = setup().await;
        service.create(input("w@studio.example", Role::Writer)).await.unwrap();

        assert!(matches!(
            service.login("w@studio.example", "wrong-password").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login("nobody@studio.example", "password123").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_login_and_loses_session() {
        let service = setup().await;
        let admin = service.create(input("admin@studio.example", Role::Admin)).await.unwrap();
        let writer = service.create(input("w@studio.example", Role::Writer)).await.unwrap();
        let session = service.login("w@studio.example", "password123").await.unwrap();

        service
            .update(
                &admin,
                writer.id,
                UpdateUserInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.validate_session(&session.token).await.unwrap().is_none());
        assert!(matches!(
            service.login("w@studio.example", "password123").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_role_change_invalidates_session() {
        let service = setup().await;
        let admin = service.create(input("admin@studio.example", Role::Admin)).await.unwrap();
        let user = service.create(input("s@studio.example", Role::Sales)).await.unwrap();
        let session = service.login("s@studio.example", "password123").await.unwrap();

        service
            .update(
                &admin,
                user.id,
                UpdateUserInput {
                    role: Some(Role::Writer),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(service.validate_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_self_protection() {
        let service = setup().await;
        let admin = service.create(input("admin@studio.example", Role::Admin)).await.unwrap();

        let demote = UpdateUserInput {
            role: Some(Role::Writer),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&admin, admin.id, demote).await,
            Err(UserServiceError::Forbidden(_))
        ));

        let deactivate = UpdateUserInput {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(matches!(
            service.update(&admin, admin.id, deactivate).await,
            Err(UserServiceError::Forbidden(_))
        ));

        assert!(matches!(
            service.delete(&admin, admin.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_last_admin_guard() {
        let service = setup().await;
        let first = service.create(input("one@studio.example", Role::Admin)).await.unwrap();
        let second = service.create(input("two@studio.example", Role::Admin)).await.unwrap();

        service.delete(&first, second.id).await.unwrap();

        // The remaining admin is the last one; demoting through another
        // account is not possible either
        let other = User { id: 999, ..first.clone() };
        let err = service
            .update(
                &other,
                first.id,
                UpdateUserInput {
                    role: Some(Role::Sales),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_update_fields() {
        let service = setup().await;
        let admin = service.create(input("admin@studio.example", Role::Admin)).await.unwrap();
        let user = service.create(input("w@studio.example", Role::Writer)).await.unwrap();

        let updated = service
            .update(
                &admin,
                user.id,
                UpdateUserInput {
                    name: Some("Renamed".to_string()),
                    password: Some("new-password-1".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(service.login("w@studio.example", "new-password-1").await.is_ok());

        let err = service
            .update(
                &admin,
                user.id,
                UpdateUserInput {
                    email: Some("admin@studio.example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_on_empty_table() {
        let service = setup().await;
        let created = service
            .ensure_bootstrap_admin("owner@studio.example", "bootstrap-pass")
            .await
            .unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));

        let again = service
            .ensure_bootstrap_admin("other@studio.example", "bootstrap-pass")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(service.count().await.unwrap(), 1);

        assert!(service.ensure_bootstrap_admin("", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let service = setup().await;
        assert!(matches!(service.get(42).await, Err(UserServiceError::NotFound)));
    }
}
