// tokens go out as "<token id>|<secret>", only sha256(secret) is stored

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use super::required;
use crate::error::{AppError, AppResult};
use crate::models::{LoginRequest, NewUser, RegisterRequest, TokenId, User, UserId, UserProfile};
use crate::store::{Store, StoreError};

const TOKEN_SECRET_LEN: usize = 40;

#[derive(Debug, Error)]
#[error("failed to hash password: {0}")]
pub struct PasswordHashError(String);

/// Successful login payload.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub token: String,
    pub token_type: &'static str,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub token_id: TokenId,
}

pub async fn register(store: &dyn Store, req: RegisterRequest) -> AppResult<UserProfile> {
    let name = required(req.name, "name")?;
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;

    if req.password_confirmation.as_deref() != Some(password.as_str()) {
        return Err(AppError::invalid(
            "password",
            "The password field confirmation does not match.",
        ));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&password)
        .map_err(|e| AppError::internal("Registration failed", e))?;

    let user = store
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => email_taken(),
            other => AppError::internal("Registration failed", other),
        })?;

    info!(user_id = %user.id, "user registered");
    Ok(UserProfile::from(&user))
}

/// Verifies credentials, revokes the user's previous tokens and issues a new one.
pub async fn login(store: &dyn Store, req: LoginRequest) -> AppResult<LoginResponse> {
    let email = required(req.email, "email")?;
    let password = required(req.password, "password")?;

    let Some(user) = store.find_user_by_email(&email).await? else {
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&user, &password) {
        return Err(AppError::InvalidCredentials);
    }

    let revoked = store.delete_user_tokens(user.id).await?;
    let token = issue_token(store, user.id).await?;

    info!(user_id = %user.id, revoked, "user logged in");
    Ok(LoginResponse {
        user: UserProfile::from(&user),
        token,
        token_type: "Bearer",
    })
}

pub async fn logout(store: &dyn Store, session: Session) -> AppResult<()> {
    store
        .delete_token(session.token_id)
        .await
        .map_err(|e| AppError::internal("Logout failed", e))?;
    Ok(())
}

pub async fn current_user(store: &dyn Store, session: Session) -> AppResult<UserProfile> {
    match store.find_user(session.user_id).await? {
        Some(user) => Ok(UserProfile::from(&user)),
        None => Err(AppError::Unauthenticated),
    }
}

/// Create a token row and return the plain-text token for the client.
pub async fn issue_token(store: &dyn Store, user_id: UserId) -> Result<String, StoreError> {
    let secret = generate_secret();
    let token = store.create_token(user_id, digest(&secret)).await?;
    Ok(format!("{}|{}", token.id, secret))
}

/// Resolve a plain-text bearer token. `None` for anything malformed or unknown.
pub async fn resolve_token(store: &dyn Store, bearer: &str) -> Result<Option<Session>, StoreError> {
    let Some((id, secret)) = bearer.split_once('|') else {
        return Ok(None);
    };
    let Ok(id) = id.parse::<i64>() else {
        return Ok(None);
    };

    let Some(token) = store.find_token(TokenId(id)).await? else {
        return Ok(None);
    };
    if token.secret_hash != digest(secret) {
        return Ok(None);
    }

    Ok(Some(Session {
        user_id: token.user_id,
        token_id: token.id,
    }))
}

fn email_taken() -> AppError {
    AppError::invalid("email", "The email has already been taken.")
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SECRET_LEN)
        .map(char::from)
        .collect()
}

fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}

fn verify_password(user: &User, password: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(&user.password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
