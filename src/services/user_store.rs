use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::{NewUser, User, UserChanges};

/// Persistence for user records.
///
/// Lookups that miss return `Ok(None)`; callers decide whether that is a
/// not-found error.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<Vec<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn insert(&self, user: NewUser) -> Result<User>;

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>>;

    /// Removes the record and returns it as it was before deletion.
    async fn delete(&self, id: Uuid) -> Result<Option<User>>;

    async fn set_profile_picture(&self, id: Uuid, path: Option<String>) -> Result<Option<User>>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, location, bio, department, \
     email_notifications, push_notifications, profile_picture, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY created_at DESC", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert(&self, new: NewUser) -> Result<User> {
        let query = format!(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, phone, location, bio, department,
                email_notifications, push_notifications
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(new.name)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.role)
            .bind(new.phone)
            .bind(new.location)
            .bind(new.bio)
            .bind(new.department)
            .bind(new.email_notifications)
            .bind(new.push_notifications)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let query = format!(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                phone = COALESCE($6, phone),
                location = COALESCE($7, location),
                bio = COALESCE($8, bio),
                department = COALESCE($9, department),
                email_notifications = COALESCE($10, email_notifications),
                push_notifications = COALESCE($11, push_notifications),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.role)
            .bind(changes.phone)
            .bind(changes.location)
            .bind(changes.bio)
            .bind(changes.department)
            .bind(changes.email_notifications)
            .bind(changes.push_notifications)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn set_profile_picture(&self, id: Uuid, path: Option<String>) -> Result<Option<User>> {
        let query = format!(
            "UPDATE users SET profile_picture = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}
