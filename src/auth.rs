//! Bearer access tokens and the caller identity extractors.
//!
//! Access tokens are issued by the external identity service and verified
//! here with the shared `ACCESS_TOKEN_SECRET` (HS256). Handlers take an
//! [`Identity`] argument for authenticated routes or a [`MaybeIdentity`]
//! for routes that personalise their output when a token is present.

use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::domain::{ProfileId, Role};
use crate::error::HubError;

/// Purpose marker carried by every access token.
pub const ACCESS_TOKEN_PURPOSE: &str = "accessToken";

/// Claims of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject profile id.
    pub id: ProfileId,
    /// Subject e-mail address.
    pub email: String,
    /// Subject role.
    pub role: Role,
    /// Always [`ACCESS_TOKEN_PURPOSE`].
    pub purpose: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Caller profile id.
    pub id: ProfileId,
    /// Caller e-mail address.
    pub email: String,
    /// Caller role.
    pub role: Role,
}

impl Identity {
    /// Checks that the caller holds one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Forbidden`] otherwise.
    pub fn require(&self, roles: &[Role]) -> Result<(), HubError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(HubError::Forbidden(format!(
                "role '{}' may not perform this action",
                self.role.as_str()
            )))
        }
    }
}

/// HS256 signer/verifier for access tokens.
#[derive(Clone)]
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for AccessTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokens").finish_non_exhaustive()
    }
}

impl AccessTokens {
    /// Creates a signer/verifier from the shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs an access token for `identity` valid for `ttl_secs`.
    ///
    /// The identity service normally does this; the service itself only
    /// uses it for tooling and tests.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Dependency`] if signing fails.
    pub fn issue(&self, identity: &Identity, ttl_secs: i64) -> Result<String, HubError> {
        let claims = AccessClaims {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role,
            purpose: ACCESS_TOKEN_PURPOSE.to_string(),
            exp: Utc::now().timestamp().saturating_add(ttl_secs),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| HubError::Dependency(format!("failed to sign access token: {e}")))
    }

    /// Verifies a token and returns the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Unauthorized`] for a bad signature, an expired
    /// token or a wrong purpose.
    pub fn verify(&self, token: &str) -> Result<Identity, HubError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<AccessClaims>(token, &self.decoding, &validation)
            .map_err(|e| HubError::Unauthorized(format!("invalid access token: {e}")))?;
        if data.claims.purpose != ACCESS_TOKEN_PURPOSE {
            return Err(HubError::Unauthorized(
                "token is not an access token".to_string(),
            ));
        }
        Ok(Identity {
            id: data.claims.id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

/// Extracts the raw token from an `Authorization` header. Both
/// `Bearer <token>` and a bare token are accepted.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, HubError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| HubError::Unauthorized("malformed authorization header".to_string()))?
        .trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token))
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = HubError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| HubError::Unauthorized("you are not authorized".to_string()))?;
        state.access_tokens.verify(token)
    }
}

/// Optional caller identity. A missing header yields `None`; a present
/// but invalid token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = HubError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(state.access_tokens.verify(token)?))),
            None => Ok(Self(None)),
        }
    }
}
