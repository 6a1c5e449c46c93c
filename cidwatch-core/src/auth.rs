//! Bearer-token authentication middleware

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use thiserror::Error;
use tracing::debug;

use crate::api::ApiError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized - no authorization header")]
    MissingHeader,

    #[error("Unauthorized - invalid token")]
    InvalidToken,
}

/// Decides whether a request's `Authorization` header is acceptable
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, authorization: Option<&str>) -> Result<(), AuthError>;
}

/// Accepts `Authorization: Bearer <token>` for a single shared token
pub struct BearerToken {
    token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for BearerToken {
    fn authenticate(&self, authorization: Option<&str>) -> Result<(), AuthError> {
        let header = authorization
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingHeader)?;

        let mut parts = header.split(' ');
        let scheme = parts.next().unwrap_or_default();
        let token = parts.next().unwrap_or_default();

        if scheme != "Bearer" || token.is_empty() || token != self.token {
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }
}

/// Middleware rejecting requests the authenticator refuses with 401
pub async fn require_auth(
    State(authenticator): State<Arc<dyn Authenticator>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()));

    if let Err(e) = authenticator.authenticate(header.as_deref()) {
        debug!("Rejected {} {}: {}", req.method(), req.uri().path(), e);
        return Err(ApiError::Unauthorized(e));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        let auth = BearerToken::new("s3cret");

        assert_eq!(auth.authenticate(Some("Bearer s3cret")), Ok(()));
        assert_eq!(auth.authenticate(None), Err(AuthError::MissingHeader));
        assert_eq!(
            auth.authenticate(Some("Bearer wrong")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            auth.authenticate(Some("Basic s3cret")),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(auth.authenticate(Some("Bearer")), Err(AuthError::InvalidToken));
        assert_eq!(auth.authenticate(Some("")), Err(AuthError::MissingHeader));
    }

    #[test]
    fn test_empty_configured_token_never_matches() {
        let auth = BearerToken::new("");
        assert_eq!(auth.authenticate(Some("Bearer ")), Err(AuthError::InvalidToken));
    }
}
