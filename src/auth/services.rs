use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{SigninRequest, SignupRequest},
    jwt::JwtKeys,
    password,
    repo::{StoreError, UserStore},
    repo_types::User,
};
use crate::error::ApiError;

const SIGNUP_FAILED: &str = "Error creating user";
const SIGNIN_FAILED: &str = "Error during login";
const PROTECTED_FAILED: &str = "Error accessing protected route";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Username and email must have visible characters; a password only has to be non-empty.
fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

async fn hash_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain)).await?
}

async fn verify_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    Ok(tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash)).await?)
}

/// Registers a user and returns it with a freshly signed token.
pub async fn signup(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: SignupRequest,
) -> Result<(User, String), ApiError> {
    let (Some(username), Some(email), Some(plain)) =
        (present(req.username), present(req.email), non_empty(req.password))
    else {
        return Err(ApiError::Validation("All fields are required"));
    };
    let username = username.trim().to_string();
    let email = normalize_email(&email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("Invalid email format"));
    }

    match store.find_by_email(&email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(ApiError::DuplicateEmail);
        }
        Ok(None) => {}
        Err(e) => return Err(ApiError::internal(SIGNUP_FAILED, e)),
    }

    let hash = hash_blocking(plain)
        .await
        .map_err(|e| ApiError::internal(SIGNUP_FAILED, e))?;

    let user = match store.create_user(&username, &email, &hash).await {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!(email = %email, "email registered concurrently");
            return Err(ApiError::DuplicateEmail);
        }
        Err(e) => return Err(ApiError::internal(SIGNUP_FAILED, e)),
    };

    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal(SIGNUP_FAILED, e))?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((user, token))
}

/// Checks credentials. Unknown email and wrong password are the same error to the caller.
pub async fn signin(
    store: &dyn UserStore,
    keys: &JwtKeys,
    req: SigninRequest,
) -> Result<(User, String), ApiError> {
    let (Some(email), Some(plain)) = (present(req.email), non_empty(req.password)) else {
        return Err(ApiError::Validation("Email and password are required"));
    };
    let email = normalize_email(&email);

    let user = match store.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => return Err(ApiError::internal(SIGNIN_FAILED, e)),
    };

    let ok = verify_blocking(plain, user.password_hash.clone())
        .await
        .map_err(|e| ApiError::internal(SIGNIN_FAILED, e))?;
    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = keys
        .sign(user.id)
        .map_err(|e| ApiError::internal(SIGNIN_FAILED, e))?;

    info!(user_id = %user.id, "user logged in");
    Ok((user, token))
}

pub async fn profile(store: &dyn UserStore, user_id: Uuid) -> Result<User, ApiError> {
    match store.find_by_id(user_id).await {
        Ok(Some(u)) => Ok(u),
        Ok(None) => {
            warn!(user_id = %user_id, "token subject no longer exists");
            Err(ApiError::NotFound("User not found"))
        }
        Err(e) => Err(ApiError::internal(PROTECTED_FAILED, e)),
    }
}
