//! User model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{MembershipStatus, Role};
use crate::error::AppError;

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing, default)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub membership_id: Option<String>,
    pub membership_status: MembershipStatus,
    pub membership_expiry: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub join_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Short user representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub membership_id: Option<String>,
    pub membership_status: MembershipStatus,
}

impl From<User> for UserShort {
    fn from(user: User) -> Self {
        UserShort {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            membership_id: user.membership_id,
            membership_status: user.membership_status,
        }
    }
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    /// Matches first name, last name, email or membership id
    pub search: Option<String>,
    pub role: Option<Role>,
    pub membership_status: Option<MembershipStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Self-registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Fields of a user insert, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub membership_id: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

/// Update user request
///
/// `role`, `membership_status` and `membership_expiry` are only honoured
/// when the caller is an administrator.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub profile_image: Option<String>,
    pub role: Option<Role>,
    pub membership_status: Option<MembershipStatus>,
    pub membership_expiry: Option<NaiveDate>,
}

impl UpdateUser {
    /// Drop the fields a non-administrator may not change
    pub fn restrict_to_profile(self) -> Self {
        Self {
            role: None,
            membership_status: None,
            membership_expiry: None,
            ..self
        }
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, expiration_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(expiration_hours as i64)).timestamp(),
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require librarian or admin privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian privileges required".to_string()))
        }
    }

    /// Members may only act on their own records; staff on anyone's
    pub fn require_self_or_staff(&self, user_id: i32) -> Result<(), AppError> {
        if self.is_staff() || self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Authorization("Not authorized".to_string()))
        }
    }
}
