use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use grobro_db::Database;
use grobro_db::models::NewUser;
use grobro_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, ApiResult};
use crate::files::Storage;
use crate::notify::Notifier;
use crate::{blocking, convert};

/// Shortest password accepted anywhere, matching the settings form.
pub const MIN_PASSWORD_LEN: usize = 5;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub storage: Storage,
    pub notifier: Arc<dyn Notifier>,
    /// `From` header for notification emails, e.g. `GroBro <bot@example.com>`.
    pub mail_from: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    // Usernames become upload path segments, so keep them to a safe alphabet
    let username_ok = (3..=32).contains(&req.username.len())
        && req
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !username_ok {
        return Err(ApiError::BadRequest(
            "Username must be 3-32 letters, digits, '_' or '-'.".into(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if !req.email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address.".into()));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::BadRequest("First and last name are required.".into()));
    }

    let user_id = Uuid::new_v4();
    let username = req.username.clone();

    blocking(&state, move |db| -> ApiResult<_> {
        if db.email_or_username_taken(&req.username, &req.email)? {
            return Err(ApiError::Conflict("Username or email already registered.".into()));
        }

        let password_hash = hash_password(&req.password)?;

        db.create_user(&NewUser {
            id: &user_id.to_string(),
            username: &req.username,
            email: &req.email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            city: req.city.as_deref(),
            state: req.state.as_deref(),
        })?;
        Ok(())
    })
    .await?;

    info!("Registered user {} ({})", username, user_id);

    let token = create_token(&state.jwt_secret, user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = blocking(&state, move |db| -> ApiResult<_> {
        let user = db
            .get_user_by_username(&req.username)?
            .ok_or(ApiError::Unauthorized)?;

        if !verify_password(&req.password, &user.password)? {
            return Err(ApiError::Unauthorized);
        }
        Ok(user)
    })
    .await?;

    let user_id = convert::parse_id(&user.id)?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// Hash with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// False on a wrong password; an unparseable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("Corrupt password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn each_hash_gets_a_fresh_salt() {
        let first = hash_password("abcde").unwrap();
        let second = hash_password("abcde").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("abcde", &second).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
