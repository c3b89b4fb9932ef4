//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::UsersConfig,
    error::{AppError, AppResult},
    models::{
        pagination::Page,
        user::{AccountType, ChangePassword, CreateUser, User, UserClaims, UserShort},
    },
    repository::Repository,
};

const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: UsersConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: UsersConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate user by username and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = match self.repository.users.get_by_username(username).await? {
            Some(user) => user,
            None => {
                tracing::warn!(username, "Login attempt for unknown user");
                return Err(AppError::Authentication("Invalid username or password".to_string()));
            }
        };

        if !verify_password(&user.password, password)? {
            tracing::warn!(username, "Login attempt with wrong password");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            account_type: user.account_type,
            rights: user.account_type.rights(),
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn change_password(&self, user_id: i32, data: &ChangePassword) -> AppResult<()> {
        let user = self.repository.users.get_by_id(user_id).await?;

        if !verify_password(&user.password, &data.current_password)? {
            return Err(AppError::field("current_password", "Current password is incorrect"));
        }

        let hash = hash_password(&data.new_password)?;
        self.repository.users.update_password(user_id, &hash).await?;
        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn list(&self, page: Page) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.list(page).await
    }

    /// Create a new user
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        if self.repository.users.username_exists(&user.username).await? {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let hash = hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &hash).await?;
        tracing::info!(user_id = created.id, account_type = %created.account_type, "User created");
        Ok(created)
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the `admin` account on an empty database when a password is configured
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let Some(password) = self.config.bootstrap_admin_password.clone() else {
            return Ok(());
        };

        if self.repository.users.count().await? > 0 {
            return Ok(());
        }

        self.create_user(CreateUser {
            username: BOOTSTRAP_ADMIN_USERNAME.to_string(),
            password,
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            account_type: Some(AccountType::Admin),
        })
        .await?;

        tracing::info!("Bootstrap admin account created");
        Ok(())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
