use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{ApiResponse, ApiResult},
    models::{auth::AuthenticatedManager, form_link::CreateFormLinkRequest},
    services::form_links::FormLinkService,
    AppState,
};

/// POST /api/plans/{id}/form-links: replaces any live link for the same role
pub async fn create_form_link(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<CreateFormLinkRequest>,
) -> ApiResult<impl IntoResponse> {
    let link = FormLinkService::issue(
        &state.db,
        &state.config,
        &state.short_codes,
        manager.manager_id,
        plan_id,
        &body,
    )
    .await?;
    Ok(ApiResponse::created(link))
}

pub async fn list_form_links(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(plan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let links = FormLinkService::list(&state.db, &state.config, manager.manager_id, plan_id).await?;
    Ok(ApiResponse::ok(links))
}

pub async fn revoke_form_link(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let link = FormLinkService::revoke(
        &state.db,
        &state.config,
        &state.short_codes,
        manager.manager_id,
        id,
    )
    .await?;
    Ok(ApiResponse::ok(link))
}
