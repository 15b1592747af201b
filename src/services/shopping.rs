use std::collections::{BTreeMap, HashMap};

use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        form_response::Selections,
        group::Demographics,
        meal::Meal,
        shopping_list::{ShoppingItem, ShoppingList},
    },
};

// Adult-equivalent weights per age band.
pub const ADULT_WEIGHT: f64 = 1.0;
pub const TEEN_WEIGHT: f64 = 1.2;
pub const KID_WEIGHT: f64 = 0.7;
pub const TODDLER_WEIGHT: f64 = 0.4;

/// `AE = adults*1.0 + teens*1.2 + kids*0.7 + toddlers*0.4`
pub fn adult_equivalents(d: &Demographics) -> f64 {
    d.adults as f64 * ADULT_WEIGHT
        + d.teens as f64 * TEEN_WEIGHT
        + d.kids as f64 * KID_WEIGHT
        + d.toddlers as f64 * TODDLER_WEIGHT
}

/// Linear scaling of a recipe quantity written for `servings` adults.
pub fn scale_quantity(quantity: f64, servings: i32, ae: f64) -> f64 {
    if servings <= 0 {
        return 0.0;
    }
    quantity * ae / servings as f64
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Sum scaled ingredients across every selected (day, meal) occurrence.
///
/// Items are merged on lower-cased trimmed name and unit, sorted by name then
/// unit. A meal picked on two days counts twice. Ids not found in `meals` are
/// skipped.
pub fn build_items(selections: &Selections, meals: &[Meal], ae: f64) -> Vec<ShoppingItem> {
    let by_id: HashMap<Uuid, &Meal> = meals.iter().map(|m| (m.id, m)).collect();
    let mut items: BTreeMap<(String, String), ShoppingItem> = BTreeMap::new();

    for meal_ids in selections.values() {
        for meal_id in meal_ids {
            let Some(meal) = by_id.get(meal_id) else {
                continue;
            };
            for ingredient in meal.ingredients.iter() {
                let name = ingredient.name.trim();
                let unit = ingredient.unit.trim();
                let key = (name.to_lowercase(), unit.to_lowercase());
                let item = items.entry(key).or_insert_with(|| ShoppingItem {
                    name: name.to_string(),
                    unit: unit.to_string(),
                    quantity: 0.0,
                    meals: Vec::new(),
                });
                item.quantity += scale_quantity(ingredient.quantity, meal.servings, ae);
                if !item.meals.contains(&meal.name) {
                    item.meals.push(meal.name.clone());
                }
            }
        }
    }

    items
        .into_values()
        .map(|mut item| {
            item.quantity = round2(item.quantity);
            item
        })
        .collect()
}

pub struct ShoppingService;

impl ShoppingService {
    /// Combined demographics of every group linked to the plan.
    pub async fn plan_demographics(pool: &PgPool, plan_id: Uuid) -> ApiResult<Demographics> {
        let rows = sqlx::query_as::<_, Demographics>(
            "SELECT g.adults, g.teens, g.kids, g.toddlers
             FROM groups g
             JOIN plan_groups pg ON pg.group_id = g.id
             WHERE pg.plan_id = $1",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().sum())
    }

    /// Final selections as written by finalization.
    pub async fn final_selections(pool: &PgPool, plan_id: Uuid) -> ApiResult<Selections> {
        let rows: Vec<(String, Uuid)> = sqlx::query_as(
            "SELECT ps.day, ps.meal_id
             FROM plan_selections ps
             JOIN meals m ON m.id = ps.meal_id
             WHERE ps.plan_id = $1
             ORDER BY ps.day, m.meal_type, m.name",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;

        let mut selections = Selections::new();
        for (day, meal_id) in rows {
            selections.entry(day).or_default().push(meal_id);
        }
        Ok(selections)
    }

    /// Recompute and store the plan's shopping list from its final selections.
    pub async fn generate(pool: &PgPool, plan_id: Uuid) -> ApiResult<ShoppingList> {
        let selections = Self::final_selections(pool, plan_id).await?;
        let demographics = Self::plan_demographics(pool, plan_id).await?;
        let ae = adult_equivalents(&demographics);

        let meals = sqlx::query_as::<_, Meal>("SELECT * FROM meals WHERE plan_id = $1")
            .bind(plan_id)
            .fetch_all(pool)
            .await?;

        let items = build_items(&selections, &meals, ae);
        tracing::info!(
            "shopping list for plan {plan_id}: {} item(s), AE {ae:.2}",
            items.len()
        );

        let list = sqlx::query_as::<_, ShoppingList>(
            "INSERT INTO shopping_lists (plan_id, total_ae, items)
             VALUES ($1, $2, $3)
             ON CONFLICT (plan_id) DO UPDATE SET
                 total_ae = EXCLUDED.total_ae,
                 items = EXCLUDED.items,
                 generated_at = NOW()
             RETURNING *",
        )
        .bind(plan_id)
        .bind(ae)
        .bind(Json(items))
        .fetch_one(pool)
        .await?;
        Ok(list)
    }

    pub async fn get(pool: &PgPool, plan_id: Uuid) -> ApiResult<ShoppingList> {
        sqlx::query_as::<_, ShoppingList>("SELECT * FROM shopping_lists WHERE plan_id = $1")
            .bind(plan_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("No shopping list for this plan yet"))
    }
}
