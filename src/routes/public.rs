//! Unauthenticated endpoints reached through a form link.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    error::{ApiResponse, ApiResult},
    middleware::rate_limit::client_ip,
    models::form_response::SubmitResponseRequest,
    services::{
        form_links::FormLinkService, metrics::FORM_VIEWS_COUNTER, public_form::PublicFormService,
        responses::ResponseService,
    },
    AppState,
};

const VIEW_LIMIT: u64 = 60;
const VIEW_WINDOW: Duration = Duration::from_secs(60);
const SUBMIT_LIMIT: u64 = 10;
const SUBMIT_WINDOW: Duration = Duration::from_secs(3600);

/// GET /api/public/forms/{token}: token or short code
pub async fn get_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let rate_key = format!("form_view:{}:{key}", client_ip(&headers));
    state.rate_limiter.check(&rate_key, VIEW_LIMIT, VIEW_WINDOW)?;

    let link = FormLinkService::resolve_active(&state.db, &state.short_codes, &key).await?;
    let form = PublicFormService::load(&state.db, &link).await?;

    FormLinkService::record_view(&state.db, link.id).await?;
    FORM_VIEWS_COUNTER.with_label_values(&[link.role.as_str()]).inc();

    Ok(ApiResponse::ok(form))
}

/// POST /api/public/forms/{token}/responses
pub async fn submit_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<SubmitResponseRequest>,
) -> ApiResult<impl IntoResponse> {
    let rate_key = format!("form_submit:{}:{key}", client_ip(&headers));
    state.rate_limiter.check(&rate_key, SUBMIT_LIMIT, SUBMIT_WINDOW)?;

    let link = FormLinkService::resolve_active(&state.db, &state.short_codes, &key).await?;
    let response = ResponseService::submit(&state.db, &link, &body).await?;
    Ok(ApiResponse::created(response))
}

/// GET /f/{short_code}: 302 to the full form URL
pub async fn short_link(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let link = FormLinkService::resolve(&state.db, &state.short_codes, &code).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, state.config.form_url(&link.token))]))
}
