use crate::auth::repo_types::{NewUser, User};
use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

macro_rules! user_columns {
    () => {
        "id, name, email, phone, password_hash, role, is_active, is_verified, \
         email_verification_token, email_verified_at, password_reset_token, \
         password_reset_expires, created_at, updated_at"
    };
}
pub(crate) use user_columns;

impl User {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by email, ignoring case.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email_verification_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email_verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_password_reset_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE password_reset_token = $1"
        ))
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new user inside the registration transaction.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewUser<'_>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (name, email, phone, password_hash, role, is_active, is_verified, \
             email_verification_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING ",
            user_columns!()
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.phone)
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.is_active)
        .bind(new.is_verified)
        .bind(new.email_verification_token)
        .fetch_one(&mut **tx)
        .await?;
        Ok(user)
    }

    pub async fn mark_email_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE,
                   email_verified_at = now(),
                   email_verification_token = NULL,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Marks the account verified and active (Aadhaar check passed).
    pub async fn activate(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET is_verified = TRUE, is_active = TRUE, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_password_reset(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_reset_token = $2, password_reset_expires = $3, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a new hash and consume the reset token.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $2,
                   password_reset_token = NULL,
                   password_reset_expires = NULL,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Mirror a verification decision onto the account flags.
    pub async fn set_account_flags_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        is_verified: bool,
        is_active: bool,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET is_verified = $2, is_active = $3, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(is_verified)
        .bind(is_active)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn set_active(db: &PgPool, id: Uuid, active: bool) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
