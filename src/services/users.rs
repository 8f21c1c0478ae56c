use crate::{
    auth::password,
    entities::{user, Role},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, IsolationLevel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::validate_email;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub admins: u64,
    pub inactive: u64,
}

/// Fields an admin may change on another account.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Accounts, credentials and admin user management.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Creates an account. The very first account becomes an admin; the
    /// count and the insert share one serializable transaction.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Please provide name, email, and password".into(),
            ));
        }
        if !validate_email(email.as_str()) {
            return Err(ServiceError::invalid_field(
                "email",
                "Please provide a valid email",
            ));
        }

        let password_hash = password::hash(password)?;

        let isolation = signup_isolation(self.db_pool.get_database_backend());
        let txn = self.db_pool.begin_with_config(isolation, None).await?;

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict("Email already registered".into()));
        }

        let role = if user::Entity::find().count(&txn).await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            is_active: Set(true),
            last_login: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(duplicate_email)?;

        txn.commit().await.map_err(duplicate_email)?;

        info!(user_id = %created.id, role = %created.role, "user signed up");
        Ok(created)
    }

    /// Checks credentials. A deactivated account is refused before the
    /// password is looked at.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<user::Model, ServiceError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Please provide email and password".into(),
            ));
        }

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_CREDENTIALS.into()))?;

        if !account.is_active {
            return Err(ServiceError::AccountDisabled(
                "Your account has been deactivated. Contact admin.".into(),
            ));
        }

        if !password::verify(password, &account.password_hash)? {
            warn!(user_id = %account.id, "failed login attempt");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let mut active: user::ActiveModel = account.into();
        active.last_login = Set(Some(Utc::now()));
        let account = active.update(&*self.db_pool).await?;

        info!(user_id = %account.id, "user logged in");
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn find(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find_by_id(id).one(&*self.db_pool).await?)
    }

    /// Every account, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    /// Changes role and/or active flag of `id` on behalf of `actor_id`.
    /// An admin may not demote or deactivate themselves.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        actor_id: Uuid,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<user::Model, ServiceError> {
        let target = self
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if target.id == actor_id {
            if matches!(changes.role, Some(role) if role != target.role) {
                return Err(ServiceError::SelfModification(
                    "You cannot change your own role".into(),
                ));
            }
            if changes.is_active == Some(false) {
                return Err(ServiceError::SelfModification(
                    "You cannot deactivate your own account".into(),
                ));
            }
        }

        let mut active: user::ActiveModel = target.into();
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        let updated = active.update(&*self.db_pool).await?;

        info!(user_id = %id, by = %actor_id, "user updated");
        Ok(updated)
    }

    /// Removes `id` and returns the removed record.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor_id: Uuid, id: Uuid) -> Result<user::Model, ServiceError> {
        let target = self
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if target.id == actor_id {
            return Err(ServiceError::SelfModification(
                "You cannot delete your own account".into(),
            ));
        }

        target.clone().delete(&*self.db_pool).await?;

        info!(user_id = %id, by = %actor_id, "user deleted");
        Ok(target)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<UserStats, ServiceError> {
        let db = &*self.db_pool;
        let total = user::Entity::find().count(db).await?;
        let active = user::Entity::find()
            .filter(user::Column::IsActive.eq(true))
            .count(db)
            .await?;
        let admins = user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin))
            .count(db)
            .await?;

        Ok(UserStats {
            total,
            active,
            admins,
            inactive: total.saturating_sub(active),
        })
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Postgres runs READ COMMITTED by default, where two first signups could
/// both count zero users. SQLite already serializes writers.
fn signup_isolation(backend: DbBackend) -> Option<IsolationLevel> {
    match backend {
        DbBackend::Postgres => Some(IsolationLevel::Serializable),
        _ => None,
    }
}

/// A concurrent signup can still win the race to the unique email index.
fn duplicate_email(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ServiceError::Conflict("Email already registered".into())
        }
        _ => err.into(),
    }
}
