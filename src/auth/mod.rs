//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs issued by the identity provider; `sub` carries the
//! user id that keys the `users` table.

// region:    --- Imports
use crate::error::{AppError, AppResult};
use crate::query;
use crate::state::AppState;
use crate::user::model::UserType;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: usize,
}

pub fn issue_token(
    secret: &str,
    user_id: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + ttl).timestamp().max(0) as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> AppResult<TokenClaims> {
    // Provider tokens carry an audience we do not pin.
    let mut validation = Validation::default();
    validation.validate_aud = false;

    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("{:<12} --> Token rejected: {}", "Auth", e);
        AppError::Unauthorized
    })
}

fn bearer_token(parts: &Parts) -> AppResult<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)
}
// endregion: --- Tokens

// region:    --- Extractors

/// A request carrying a valid token, whether or not a profile exists yet.
#[derive(Debug, Clone)]
pub struct AuthSubject(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthSubject {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = verify_token(&state.config.jwt_secret, token)?;
        Ok(AuthSubject(claims.sub))
    }
}

/// The authenticated user with a stored profile.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub user_type: UserType,
}

impl CurrentUser {
    pub fn require(&self, user_type: UserType) -> AppResult<()> {
        if self.user_type == user_type {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthSubject(user_id) = AuthSubject::from_request_parts(parts, state).await?;
        match query::handlers::get_user(&state.db, &user_id).await? {
            Some(user) => Ok(CurrentUser {
                id: user.id,
                user_type: user.user_type,
            }),
            None => {
                warn!("{:<12} --> No profile for subject: {}", "Auth", user_id);
                Err(AppError::Unauthorized)
            }
        }
    }
}
// endregion: --- Extractors
