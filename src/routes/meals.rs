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
        meal::{MealInput, UpdateMealRequest},
    },
    services::meals::MealService,
    AppState,
};

/// GET /api/plans/{id}/meals
pub async fn list_meals(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(plan_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let meals = MealService::list(&state.db, manager.manager_id, plan_id).await?;
    Ok(ApiResponse::ok(meals))
}

/// POST /api/plans/{id}/meals
pub async fn create_meal(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<MealInput>,
) -> ApiResult<impl IntoResponse> {
    let meal = MealService::create(&state.db, manager.manager_id, plan_id, &body).await?;
    Ok(ApiResponse::created(meal))
}

pub async fn update_meal(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMealRequest>,
) -> ApiResult<impl IntoResponse> {
    let meal = MealService::update(&state.db, manager.manager_id, id, &body).await?;
    Ok(ApiResponse::ok(meal))
}

pub async fn delete_meal(
    State(state): State<AppState>,
    manager: AuthenticatedManager,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    MealService::delete(&state.db, manager.manager_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
