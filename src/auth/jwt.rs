use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, error::AuthError, state::AppState};

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64).saturating_mul(60)),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, user_type: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let exp = now
            .checked_add(TimeDuration::seconds(ttl_secs))
            .context("token expiry out of range")?;
        let claims = Claims {
            id: user_id,
            user_type: user_type.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, user_type, "jwt signed");
        Ok(token)
    }

    /// Signs and prepends the `Bearer ` scheme.
    pub fn sign_bearer(&self, user_id: Uuid, user_type: &str) -> anyhow::Result<String> {
        Ok(format!("{BEARER_PREFIX}{}", self.sign(user_id, user_type)?))
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

/// Extracts and validates a bearer JWT, yielding its claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthError::Unauthorized("invalid auth scheme"))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(e) => {
                warn!(error = %e, "invalid or expired token");
                Err(AuthError::Unauthorized("invalid or expired token"))
            }
        }
    }
}
