//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        user::{NewUser, RegisterUser, UpdateUser, User, UserClaims, UserQuery, UserShort},
        MembershipStatus, Role,
    },
    repository::{Page, Repository},
};

const MEMBERSHIP_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a membership id such as `LIB-7K2Q9ZTA`
pub fn generate_membership_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| MEMBERSHIP_ID_ALPHABET[rng.gen_range(0..MEMBERSHIP_ID_ALPHABET.len())] as char)
        .collect();
    format!("LIB-{}", suffix)
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    fn issue_token(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Register a new member and log them in
    pub async fn register(&self, request: RegisterUser) -> AppResult<(String, User)> {
        let new_user = NewUser {
            email: request.email.trim().to_lowercase(),
            password_hash: hash_password(&request.password)?,
            first_name: request.first_name,
            last_name: request.last_name,
            role: Role::Member,
            membership_id: generate_membership_id(),
            phone_number: request.phone_number,
            address: request.address,
        };

        let user = self.repository.users.create(&new_user).await?;
        tracing::info!(user_id = user.id, membership_id = ?user.membership_id, "Member registered");

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Authenticate by email and password and return a JWT
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        if user.membership_status == MembershipStatus::Suspended {
            return Err(AppError::Authentication("Account is suspended".to_string()));
        }

        let token = self.issue_token(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (users, total) = self.repository.users.search(query, page).await?;
        Ok((users, total, page))
    }

    /// Update a user; only administrators may change role or membership
    pub async fn update_user(&self, claims: &UserClaims, id: i32, update: UpdateUser) -> AppResult<User> {
        let update = if claims.is_admin() {
            update
        } else {
            update.restrict_to_profile()
        };
        let user = self.repository.users.update(id, &update).await?;
        tracing::info!(user_id = id, updated_by = claims.user_id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the configured administrator account if it does not exist yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (
            self.config.bootstrap_admin_email.as_deref(),
            self.config.bootstrap_admin_password.as_deref(),
        ) else {
            if !self.repository.users.admin_exists().await? {
                tracing::warn!("No administrator account exists and no bootstrap administrator is configured");
            }
            return Ok(());
        };

        if self.repository.users.find_by_email(email).await?.is_some() {
            return Ok(());
        }

        let admin = NewUser {
            email: email.trim().to_lowercase(),
            password_hash: hash_password(password)?,
            first_name: "Library".to_string(),
            last_name: "Administrator".to_string(),
            role: Role::Admin,
            membership_id: generate_membership_id(),
            phone_number: None,
            address: None,
        };

        let user = self.repository.users.create(&admin).await?;
        tracing::info!(user_id = user.id, email = %user.email, "Bootstrap administrator created");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_id_format() {
        let id = generate_membership_id();
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("LIB-"));
        assert!(id[4..].bytes().all(|b| MEMBERSHIP_ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("secret-pw").unwrap();
        assert_ne!(hash, "secret-pw");
        assert!(verify_password(&hash, "secret-pw").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
        assert!(verify_password("not-a-hash", "secret-pw").is_err());
    }
}
