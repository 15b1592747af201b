use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        form_response::Selections,
        plan::{Plan, PlanStatus},
        shopping_list::{FinalizeOutcome, ShoppingList},
    },
    services::{
        metrics::FINALIZED_COUNTER, plans::PlanService, resolution, responses::ResponseService,
        shopping::ShoppingService,
    },
};

/// Drop ids of meals deleted since the response came in, and days left empty.
pub fn retain_known_meals(selections: Selections, known: &HashSet<Uuid>) -> Selections {
    selections
        .into_iter()
        .filter_map(|(day, ids)| {
            let ids: Vec<Uuid> = ids.into_iter().filter(|id| known.contains(id)).collect();
            (!ids.is_empty()).then_some((day, ids))
        })
        .collect()
}

pub struct FinalizeService;

impl FinalizeService {
    /// Resolve the latest responses into the plan's final selections and
    /// build its shopping list. Running it again recomputes both.
    pub async fn finalize(pool: &PgPool, manager_id: Uuid, plan_id: Uuid) -> ApiResult<FinalizeOutcome> {
        PlanService::get(pool, manager_id, plan_id).await?;

        let responses = ResponseService::for_plan(pool, plan_id).await?;
        if responses.is_empty() {
            return Err(ApiError::bad_request("No responses have been submitted yet"));
        }

        let known: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>("SELECT id FROM meals WHERE plan_id = $1")
            .bind(plan_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();
        let selections = retain_known_meals(resolution::resolve(&responses), &known);
        if selections.is_empty() {
            return Err(ApiError::bad_request("The responses do not select any meal"));
        }

        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM plan_selections WHERE plan_id = $1")
            .bind(plan_id)
            .execute(&mut *tx)
            .await?;
        for (day, meal_ids) in &selections {
            sqlx::query(
                "INSERT INTO plan_selections (plan_id, day, meal_id)
                 SELECT $1, $2, UNNEST($3::UUID[])",
            )
            .bind(plan_id)
            .bind(day)
            .bind(meal_ids)
            .execute(&mut *tx)
            .await?;
        }
        let plan = sqlx::query_as::<_, Plan>(
            "UPDATE plans SET status = $1, finalized_at = NOW(), updated_at = NOW()
             WHERE id = $2
             RETURNING *",
        )
        .bind(PlanStatus::Finalized.as_str())
        .bind(plan_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        FINALIZED_COUNTER.inc();
        tracing::info!(
            "plan {plan_id} finalized from {} response(s), {} day(s) selected",
            responses.len(),
            selections.len()
        );

        let shopping_list = ShoppingService::generate(pool, plan_id).await?;
        Ok(FinalizeOutcome { plan, selections, shopping_list })
    }

    /// Rebuild the shopping list of a finalized plan.
    pub async fn regenerate_shopping_list(
        pool: &PgPool,
        manager_id: Uuid,
        plan_id: Uuid,
    ) -> ApiResult<ShoppingList> {
        let plan = PlanService::get(pool, manager_id, plan_id).await?;
        if !plan.is_finalized() {
            return Err(ApiError::bad_request("Finalize the plan before building its shopping list"));
        }
        ShoppingService::generate(pool, plan_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_known_meals() {
        let (a, b, gone) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let known: HashSet<Uuid> = [a, b].into_iter().collect();

        let mut selections = Selections::new();
        selections.insert("monday".into(), vec![a, gone]);
        selections.insert("tuesday".into(), vec![gone]);
        selections.insert("wednesday".into(), vec![]);
        selections.insert("thursday".into(), vec![b]);

        let kept = retain_known_meals(selections, &known);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept["monday"], vec![a]);
        assert_eq!(kept["thursday"], vec![b]);
    }
}
