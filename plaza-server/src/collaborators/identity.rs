use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use plaza_core::UserId;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Who is on the other end of a session once its token checks out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        let user_id = user_id.into();
        Self {
            username: user_id.to_string(),
            user_id,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("auth token is missing")]
    MissingToken,
    #[error("auth token is invalid")]
    InvalidToken,
    #[error("auth token has expired")]
    TokenExpired,
}

/// Resolves an opaque auth token into an identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avatar_url: Option<String>,
    exp: u64,
}

/// HS256 bearer tokens whose `sub` claim is the user id.
pub struct JwtVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Mints a token for local testing and tooling.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::InvalidToken)?;

        self.issue_with_expiry(identity, now.as_secs() + ttl.as_secs())
    }

    fn issue_with_expiry(&self, identity: &Identity, exp: u64) -> Result<String, AuthError> {
        let claims = Claims {
            sub: identity.user_id.to_string(),
            name: Some(identity.username.clone()),
            avatar_url: identity.avatar_url.clone(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity {
            username: claims.name.unwrap_or_else(|| claims.sub.clone()),
            user_id: UserId::from(claims.sub),
            avatar_url: claims.avatar_url,
        })
    }
}
