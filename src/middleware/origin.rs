use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// The origin browsers must present on state-changing requests.
#[derive(Clone)]
pub struct AllowedOrigin(pub Arc<str>);

impl AllowedOrigin {
    pub fn new(app_base_url: &str) -> Self {
        let origin = origin_of(app_base_url).unwrap_or(app_base_url);
        Self(Arc::from(origin))
    }
}

/// `scheme://host[:port]` prefix of an absolute URL.
pub fn origin_of(url: &str) -> Option<&str> {
    let idx = url.find("://")?;
    let rest = &url[idx + 3..];
    let end = rest.find('/').map(|i| idx + 3 + i).unwrap_or(url.len());
    Some(&url[..end])
}

/// True for `http://localhost[:port]` and `http://127.0.0.1[:port]`, nothing else.
fn is_loopback_origin(origin: &str) -> bool {
    let Some(authority) = origin.strip_prefix("http://") else {
        return false;
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };
    let port_ok = port.map_or(true, |p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    port_ok && (host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1")
}

/// Exact match against the app origin. When the app itself runs on a loopback
/// origin (development), any loopback port is accepted too.
pub fn origin_allowed(origin: &str, allowed: &str) -> bool {
    if origin.eq_ignore_ascii_case(allowed) {
        return true;
    }
    is_loopback_origin(allowed) && is_loopback_origin(origin)
}

/// CSRF guard: rejects cross-site POST/PUT/PATCH/DELETE with 403.
/// Requests carrying neither `Origin` nor `Referer` are non-browser clients and pass.
pub async fn require_same_origin(
    State(allowed): State<AllowedOrigin>,
    request: Request,
    next: Next,
) -> Response {
    let mutating = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    );
    if !mutating {
        return next.run(request).await;
    }

    let headers = request.headers();
    let presented = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(header::REFERER)
                .and_then(|v| v.to_str().ok())
                .and_then(origin_of)
                .map(str::to_string)
        });

    match presented {
        Some(origin) if !origin_allowed(&origin, &allowed.0) => {
            tracing::warn!("blocked {} {} from origin {origin}", request.method(), request.uri().path());
            ApiError::Forbidden("Origin not allowed".into()).into_response()
        }
        _ => next.run(request).await,
    }
}
