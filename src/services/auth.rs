//! Authentication and account service

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use tokio::sync::RwLock;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, NewUser, Principal, RegisterUser, Role, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    /// Token ids revoked by logout, with their expiry timestamp
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self {
            repository,
            config,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new member account
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        let request = request.normalized();
        request.validate()?;

        let RegisterUser { name, email, password } = request;

        if self.repository.users.get_by_name(&name).await?.is_some()
            || self.repository.users.get_by_email(&email).await?.is_some()
        {
            return Err(AppError::Conflict(
                "Registration failed. User may already exist.".to_string(),
            ));
        }

        let role = if self
            .config
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(&email))
        {
            Role::Admin
        } else {
            Role::Member
        };

        let user = self
            .repository
            .users
            .create(&NewUser {
                name,
                email,
                password_hash: self.hash_password(&password)?,
                role,
            })
            .await?;

        tracing::info!("Registered user {} ({}) as {}", user.id, user.identity(), user.role);
        Ok(user)
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn login(&self, request: LoginRequest) -> AppResult<(String, User)> {
        request.validate()?;

        let user = self
            .repository
            .users
            .get_by_email(request.email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, &request.password)? {
            tracing::info!("Failed login attempt for {}", user.identity());
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let lifetime_secs = if request.remember_me {
            self.config.remember_me_days as i64 * 86_400
        } else {
            self.config.jwt_expiration_hours as i64 * 3600
        };

        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            jti: uuid::Uuid::new_v4().to_string(),
            exp: now + lifetime_secs,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!("User {} logged in", user.identity());
        Ok((token, user))
    }

    /// Validate a bearer token and return its claims
    pub async fn verify_token(&self, token: &str) -> AppResult<UserClaims> {
        let claims = UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if self.revoked.read().await.contains_key(&claims.jti) {
            return Err(AppError::Authentication("Token has been revoked".to_string()));
        }

        Ok(claims)
    }

    /// Revoke the token behind `claims` until it expires
    pub async fn logout(&self, claims: &UserClaims) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp);
        tracing::info!("User {} logged out", claims.identity());
    }

    /// Reload the account behind a logged-in principal
    pub async fn current_user(&self, principal: &impl Principal) -> AppResult<User> {
        self.repository
            .users
            .get_by_email(principal.identity())
            .await?
            .ok_or_else(|| AppError::Authentication("Account no longer exists".to_string()))
    }

    /// Verify user password
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
