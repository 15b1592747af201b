use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::error::ApiError;
use crate::models::auth::{AuthenticatedManager, Claims};

pub const SESSION_COOKIE: &str = "session";

impl<S> FromRequestParts<S> for AuthenticatedManager
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not signed in".into()))?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("JWT secret not configured")))?;

        decode_session_token(&token, &secret.0)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired session".into()))
    }
}

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

/// The session cookie wins; a bearer header is accepted for API clients.
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = get_cookie(headers, SESSION_COOKIE).filter(|c| !c.is_empty()) {
        return Some(cookie);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

pub fn decode_session_token(token: &str, secret: &str) -> Result<AuthenticatedManager, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedManager {
        manager_id: claims.sub.parse()?,
        email: claims.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def.ghi; other=1"),
        );
        assert_eq!(get_cookie(&headers, "session").as_deref(), Some("abc.def.ghi"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("old_session=zzz"));
        assert_eq!(get_cookie(&headers, "session"), None);
    }

    #[test]
    fn test_session_token_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));

        headers.insert(header::COOKIE, HeaderValue::from_static("session=from-cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_session_token("not-a-jwt", "secret").is_err());
    }
}
