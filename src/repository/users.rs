//! Users repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, Conflict},
    models::user::{NewUser, UpdateUser, User, UserQuery, UserShort},
};

use super::Page;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by email (authentication key)
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create(&self, user: &NewUser) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password, first_name, last_name, role, membership_id,
                               phone_number, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role)
        .bind(&user.membership_id)
        .bind(&user.phone_number)
        .bind(&user.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Conflict::EmailTaken.into(),
            other => AppError::from(other),
        })?;

        Ok(created)
    }

    pub async fn update(&self, id: i32, update: &UpdateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_number = COALESCE($4, phone_number),
                address = COALESCE($5, address),
                profile_image = COALESCE($6, profile_image),
                role = COALESCE($7, role),
                membership_status = COALESCE($8, membership_status),
                membership_expiry = COALESCE($9, membership_expiry),
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.phone_number)
        .bind(&update.address)
        .bind(&update.profile_image)
        .bind(update.role)
        .bind(update.membership_status)
        .bind(update.membership_expiry)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Delete a user that has no book on loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        let active_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE borrower_id = $1 AND status = 'issued'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if active_loans > 0 {
            return Err(Conflict::UserHasActiveLoans.into());
        }

        // Loans and fines are an audit trail and keep their borrower
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    AppError::BadRequest("User has a loan history and cannot be deleted".to_string())
                }
                other => AppError::from(other),
            })?;

        tx.commit().await?;
        Ok(())
    }

    /// Check whether any administrator exists
    pub async fn admin_exists(&self) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a UserQuery) {
        builder.push(" WHERE TRUE");

        if let Some(ref search) = query.search {
            let pattern = format!("%{}%", search.trim());
            builder
                .push(" AND (first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR membership_id ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(role) = query.role {
            builder.push(" AND role = ").push_bind(role);
        }

        if let Some(status) = query.membership_status {
            builder.push(" AND membership_status = ").push_bind(status);
        }
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery, page: Page) -> AppResult<(Vec<UserShort>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        Self::push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, email, first_name, last_name, role, membership_id, membership_status FROM users",
        );
        Self::push_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let users = select.build_query_as::<UserShort>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }
}
