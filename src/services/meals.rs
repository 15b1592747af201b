use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::meal::{validate_ingredients, Meal, MealInput, UpdateMealRequest},
    services::plans::PlanService,
};

/// Absent keeps the stored description; blank clears it.
fn merge_description(update: Option<&str>, current: Option<String>) -> Option<String> {
    match update.map(str::trim) {
        None => current,
        Some("") => None,
        Some(text) => Some(text.to_string()),
    }
}

pub struct MealService;

impl MealService {
    pub async fn list_for_plan(pool: &PgPool, plan_id: Uuid) -> ApiResult<Vec<Meal>> {
        let meals = sqlx::query_as::<_, Meal>(
            "SELECT * FROM meals
             WHERE plan_id = $1
             ORDER BY CASE day
                 WHEN 'monday' THEN 1 WHEN 'tuesday' THEN 2 WHEN 'wednesday' THEN 3
                 WHEN 'thursday' THEN 4 WHEN 'friday' THEN 5 WHEN 'saturday' THEN 6
                 ELSE 7 END,
               meal_type, name",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(meals)
    }

    pub async fn list(pool: &PgPool, manager_id: Uuid, plan_id: Uuid) -> ApiResult<Vec<Meal>> {
        PlanService::get(pool, manager_id, plan_id).await?;
        Self::list_for_plan(pool, plan_id).await
    }

    pub async fn create(
        pool: &PgPool,
        manager_id: Uuid,
        plan_id: Uuid,
        input: &MealInput,
    ) -> ApiResult<Meal> {
        PlanService::get_open(pool, manager_id, plan_id).await?;
        input.validate().map_err(ApiError::BadRequest)?;

        let meal = insert(pool, plan_id, input).await?;
        Ok(meal)
    }

    /// Owned meal lookup: the meal's plan must belong to `manager_id`.
    async fn get_owned(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<Meal> {
        sqlx::query_as::<_, Meal>(
            "SELECT m.* FROM meals m
             JOIN plans p ON p.id = m.plan_id
             WHERE m.id = $1 AND p.manager_id = $2",
        )
        .bind(id)
        .bind(manager_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Meal not found"))
    }

    pub async fn update(
        pool: &PgPool,
        manager_id: Uuid,
        id: Uuid,
        req: &UpdateMealRequest,
    ) -> ApiResult<Meal> {
        let current = Self::get_owned(pool, manager_id, id).await?;
        PlanService::get_open(pool, manager_id, current.plan_id).await?;

        let merged = MealInput {
            day: req.day.unwrap_or(current.day),
            meal_type: req.meal_type.unwrap_or(current.meal_type),
            name: req.name.clone().unwrap_or(current.name),
            description: merge_description(req.description.as_deref(), current.description),
            servings: req.servings.unwrap_or(current.servings),
            ingredients: req.ingredients.clone().unwrap_or(current.ingredients.0),
        };
        merged.validate().map_err(ApiError::BadRequest)?;

        let meal = sqlx::query_as::<_, Meal>(
            "UPDATE meals
             SET day = $1, meal_type = $2, name = $3, description = $4,
                 servings = $5, ingredients = $6, updated_at = NOW()
             WHERE id = $7
             RETURNING *",
        )
        .bind(merged.day.as_str())
        .bind(merged.meal_type.as_str())
        .bind(merged.name.trim())
        .bind(&merged.description)
        .bind(merged.servings)
        .bind(Json(&merged.ingredients))
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(meal)
    }

    pub async fn delete(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<()> {
        let meal = Self::get_owned(pool, manager_id, id).await?;
        PlanService::get_open(pool, manager_id, meal.plan_id).await?;
        sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Swap every meal of a plan for `inputs` in one transaction.
    pub async fn replace_all(pool: &PgPool, plan_id: Uuid, inputs: &[MealInput]) -> ApiResult<Vec<Meal>> {
        for input in inputs {
            validate_ingredients(&input.ingredients).map_err(ApiError::BadRequest)?;
        }

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM meals WHERE plan_id = $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;
        for input in inputs {
            insert(&mut *tx, plan_id, input).await?;
        }
        tx.commit().await?;

        Self::list_for_plan(pool, plan_id).await
    }
}

async fn insert<'e, E>(executor: E, plan_id: Uuid, input: &MealInput) -> ApiResult<Meal>
where
    E: sqlx::PgExecutor<'e>,
{
    let meal = sqlx::query_as::<_, Meal>(
        "INSERT INTO meals (plan_id, day, meal_type, name, description, servings, ingredients)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(plan_id)
    .bind(input.day.as_str())
    .bind(input.meal_type.as_str())
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.servings)
    .bind(Json(&input.ingredients))
    .fetch_one(executor)
    .await?;
    Ok(meal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_description() {
        let current = Some("Slow-cooked".to_string());
        assert_eq!(merge_description(None, current.clone()), current);
        assert_eq!(merge_description(Some(""), current.clone()), None);
        assert_eq!(merge_description(Some("   "), current.clone()), None);
        assert_eq!(merge_description(Some(" Grilled "), current), Some("Grilled".to_string()));
    }
}
