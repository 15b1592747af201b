use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{ApiResponse, ApiResult},
    models::{
        auth::AuthenticatedManager,
        group::{CreateGroupRequest, UpdateGroupRequest},
    },
    services::groups::{self, GroupService},
    AppState,
};

pub async fn list_groups(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
) -> ApiResult<impl IntoResponse> {
    let groups = GroupService::list(&state.db, manager.manager_id).await?;
    Ok(ApiResponse::ok(groups))
}

pub async fn get_group(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let group = GroupService::get(&state.db, manager.manager_id, id).await?;
    Ok(ApiResponse::ok(groups::view(group)))
}

pub async fn create_group(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Json(body): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = GroupService::create(&state.db, manager.manager_id, &body).await?;
    Ok(ApiResponse::created(group))
}

pub async fn update_group(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = GroupService::update(&state.db, manager.manager_id, id, &body).await?;
    Ok(ApiResponse::ok(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    GroupService::delete(&state.db, manager.manager_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
