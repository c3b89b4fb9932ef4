//! User model, rights and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Rights level on a resource family
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rights {
    None = 0,
    Read = 1,
    Write = 2,
}

/// User account type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Reader,
    Librarian,
    Admin,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Reader => "reader",
            AccountType::Librarian => "librarian",
            AccountType::Admin => "admin",
        }
    }

    /// Rights granted to this account type
    pub fn rights(&self) -> UserRights {
        match self {
            AccountType::Reader => UserRights {
                catalog_rights: Rights::Read,
                borrows_rights: Rights::None,
                users_rights: Rights::None,
            },
            AccountType::Librarian => UserRights {
                catalog_rights: Rights::Write,
                borrows_rights: Rights::Write,
                users_rights: Rights::Read,
            },
            AccountType::Admin => UserRights {
                catalog_rights: Rights::Write,
                borrows_rights: Rights::Write,
                users_rights: Rights::Write,
            },
        }
    }
}

impl Default for AccountType {
    fn default() -> Self {
        AccountType::Reader
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reader" => Ok(AccountType::Reader),
            "librarian" => Ok(AccountType::Librarian),
            "admin" => Ok(AccountType::Admin),
            _ => Err(format!("Invalid account type: {}", s)),
        }
    }
}

// SQLx conversion for AccountType
impl sqlx::Type<Postgres> for AccountType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for AccountType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for AccountType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_type: AccountType,
    pub date_joined: DateTime<Utc>,
}

/// Short user representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserShort {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub account_type: AccountType,
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub account_type: Option<AccountType>,
}

/// Change own password request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePassword {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// User rights structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRights {
    pub catalog_rights: Rights,
    /// Write here is the "can mark returned" librarian permission
    pub borrows_rights: Rights,
    pub users_rights: Rights,
}

impl UserRights {
    pub fn can_mark_returned(&self) -> bool {
        self.borrows_rights >= Rights::Write
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub account_type: AccountType,
    pub rights: UserRights,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
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

    // Authorization checks
    pub fn require_write_catalog(&self) -> Result<(), AppError> {
        if self.rights.catalog_rights >= Rights::Write {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to edit the catalog".to_string()))
        }
    }

    pub fn can_mark_returned(&self) -> bool {
        self.rights.can_mark_returned()
    }

    /// Librarian permission for lending, returning and renewing copies
    pub fn require_mark_returned(&self) -> Result<(), AppError> {
        if self.can_mark_returned() {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to manage borrowed books".to_string()))
        }
    }

    pub fn require_read_users(&self) -> Result<(), AppError> {
        if self.rights.users_rights >= Rights::Read {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to read users".to_string()))
        }
    }

    pub fn require_write_users(&self) -> Result<(), AppError> {
        if self.rights.users_rights >= Rights::Write {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to write users".to_string()))
        }
    }
}
