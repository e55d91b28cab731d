//! Caller identity middleware
//!
//! Authentication and session issuance live in the upstream gateway; by the
//! time a request reaches this service the caller is already verified and
//! the gateway has stamped `x-user-id` / `x-user-role` onto it. This module
//! only lifts those headers into a typed context.

use axum::extract::FromRequestParts;
use axum::http::header::HeaderMap;
use axum::http::request::Parts;

use crate::AppError;

/// Verified caller identity injected by the gateway
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: String,
    pub role: String,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let user_id = headers.get("x-user-id")?.to_str().ok()?.to_string();
        if user_id.is_empty() {
            return None;
        }
        let role = headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("viewer")
            .to_string();
        Some(Self { user_id, role })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        CallerIdentity::from_headers(&parts.headers).ok_or(AppError::Unauthorized)
    }
}

/// Identity when anonymous callers are allowed (websocket handshake)
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<CallerIdentity>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(CallerIdentity::from_headers(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user-7"));
        headers.insert("x-user-role", HeaderValue::from_static("operator"));

        let identity = CallerIdentity::from_headers(&headers).unwrap();
        assert_eq!(identity.user_id, "user-7");
        assert_eq!(identity.role, "operator");
    }

    #[test]
    fn test_missing_user_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert!(CallerIdentity::from_headers(&headers).is_none());
    }

    #[test]
    fn test_role_defaults_to_viewer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user-7"));
        let identity = CallerIdentity::from_headers(&headers).unwrap();
        assert_eq!(identity.role, "viewer");
    }
}
