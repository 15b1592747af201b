use std::time::Duration;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::{ApiResponse, ApiResult},
    middleware::auth::SESSION_COOKIE,
    models::{
        auth::AuthenticatedManager,
        user::{LoginRequest, RegisterRequest, SessionGrant},
    },
    services::auth::AuthService,
    AppState,
};

/// `Set-Cookie` value for a session; `None` clears it.
pub fn session_cookie(token: Option<&str>, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    match token {
        Some(token) => format!(
            "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}{secure}"
        ),
        None => format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure}"),
    }
}

fn with_session(state: &AppState, grant: SessionGrant, created: bool) -> Response {
    let cookie = session_cookie(
        Some(&grant.token),
        state.config.session_ttl_seconds,
        state.config.session_cookie_secure,
    );
    let body = if created {
        ApiResponse::created(grant.profile)
    } else {
        ApiResponse::ok(grant.profile)
    };
    ([(header::SET_COOKIE, cookie)], body).into_response()
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<Response> {
    let grant = AuthService::register(
        &state.db,
        &body.email,
        &body.password,
        &body.display_name,
        &state.config.jwt_secret,
        state.config.session_ttl_seconds,
    )
    .await?;
    Ok(with_session(&state, grant, true))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Response> {
    // 5 attempts per 15 min per email
    let rate_key = format!("login:{}", body.email.trim().to_lowercase());
    state
        .rate_limiter
        .check(&rate_key, 5, Duration::from_secs(900))?;

    let grant = AuthService::login(
        &state.db,
        &body.email,
        &body.password,
        &state.config.jwt_secret,
        state.config.session_ttl_seconds,
    )
    .await?;
    Ok(with_session(&state, grant, false))
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie(None, 0, state.config.session_cookie_secure);
    (
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response()
}

pub async fn me(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
) -> ApiResult<impl IntoResponse> {
    let profile = AuthService::profile(&state.db, manager.manager_id).await?;
    Ok(ApiResponse::ok(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie(Some("abc"), 3600, false);
        assert_eq!(cookie, "session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=3600");

        let secure = session_cookie(Some("abc"), 60, true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_clearing_cookie_expires_it() {
        let cookie = session_cookie(None, 3600, false);
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
