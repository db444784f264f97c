//! JWT Authentication

use crate::error::ApiError;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use portal_access::{ActorId, Role};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: ActorId,
    pub session_id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// Hex SHA-256 of a password, as stored on accounts
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn create_token(
    secret: &str,
    expires_at: DateTime<Utc>,
    actor: ActorId,
    session_id: Uuid,
    email: &str,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: actor,
        session_id,
        email: email.to_string(),
        role,
        exp: expires_at.timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Signed-in caller with a live session
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub actor: ActorId,
    pub session_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let claims = verify_token(&state.config.jwt_secret, token).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized
        })?;

        if !state.has_session(claims.session_id) {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser {
            actor: claims.sub,
            session_id: claims.session_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let actor = Uuid::new_v4();
        let session = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(8);
        let token = create_token("secret", expires_at, actor, session, "a@b.c", Role::Client).unwrap();

        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.sub, actor);
        assert_eq!(claims.session_id, session);
        assert_eq!(claims.role, Role::Client);

        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_password_digest_is_hex_sha256() {
        assert_eq!(
            password_digest("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }
}
