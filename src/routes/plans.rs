use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResponse, ApiResult},
    models::{
        auth::AuthenticatedManager,
        plan::{CreatePlanRequest, SetPlanGroupsRequest, UpdatePlanRequest},
    },
    services::{
        finalize::FinalizeService, generation::GenerateRequest, plans::PlanService,
        responses::ResponseService, shopping::ShoppingService,
    },
    AppState,
};

pub async fn list_plans(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
) -> ApiResult<impl IntoResponse> {
    let plans = PlanService::list(&state.db, manager.manager_id).await?;
    Ok(ApiResponse::ok(plans))
}

pub async fn get_plan(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let plan = PlanService::detail(&state.db, manager.manager_id, id).await?;
    Ok(ApiResponse::ok(plan))
}

pub async fn create_plan(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Json(body): Json<CreatePlanRequest>,
) -> ApiResult<impl IntoResponse> {
    let plan = PlanService::create(&state.db, manager.manager_id, &body).await?;
    Ok(ApiResponse::created(plan))
}

pub async fn update_plan(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePlanRequest>,
) -> ApiResult<impl IntoResponse> {
    let plan = PlanService::update(&state.db, manager.manager_id, id, &body).await?;
    Ok(ApiResponse::ok(plan))
}

pub async fn delete_plan(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    PlanService::delete(&state.db, manager.manager_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_plan_groups(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
    Json(body): Json<SetPlanGroupsRequest>,
) -> ApiResult<impl IntoResponse> {
    let plan = PlanService::set_groups(&state.db, manager.manager_id, id, &body.group_ids).await?;
    Ok(ApiResponse::ok(plan))
}

/// POST /api/plans/{id}/generate: body is optional
pub async fn generate_meals(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
    body: Option<Json<GenerateRequest>>,
) -> ApiResult<impl IntoResponse> {
    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Meal generation is not configured".into()))?;
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let meals = generator.generate(&state.db, manager.manager_id, id, &req).await?;
    Ok(ApiResponse::created(meals))
}

pub async fn list_responses(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let responses = ResponseService::list(&state.db, manager.manager_id, id).await?;
    Ok(ApiResponse::ok(responses))
}

pub async fn finalize_plan(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let outcome = FinalizeService::finalize(&state.db, manager.manager_id, id).await?;
    Ok(ApiResponse::ok(outcome))
}

pub async fn get_shopping_list(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    PlanService::get(&state.db, manager.manager_id, id).await?;
    let list = ShoppingService::get(&state.db, id).await?;
    Ok(ApiResponse::ok(list))
}

pub async fn regenerate_shopping_list(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let list = FinalizeService::regenerate_shopping_list(&state.db, manager.manager_id, id).await?;
    Ok(ApiResponse::ok(list))
}
