use std::collections::BTreeMap;

use sqlx::PgPool;

use crate::{
    error::ApiResult,
    models::{
        form_link::{FormLink, PublicForm, PublicMeal},
        meal::{Day, Meal},
        plan::Plan,
    },
    services::{meals::MealService, plans::PlanService},
};

/// Group meals by day for the public form, keeping their incoming order.
pub fn meals_by_day(meals: Vec<Meal>) -> BTreeMap<Day, Vec<PublicMeal>> {
    let mut days: BTreeMap<Day, Vec<PublicMeal>> = BTreeMap::new();
    for meal in meals {
        days.entry(meal.day).or_default().push(PublicMeal {
            id: meal.id,
            name: meal.name,
            description: meal.description,
            meal_type: meal.meal_type,
        });
    }
    days
}

pub struct PublicFormService;

impl PublicFormService {
    pub async fn load(pool: &PgPool, link: &FormLink) -> ApiResult<PublicForm> {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(link.plan_id)
            .fetch_one(pool)
            .await?;
        let groups = PlanService::groups(pool, plan.id).await?;
        let meals = MealService::list_for_plan(pool, plan.id).await?;

        Ok(PublicForm {
            finalized: plan.is_finalized(),
            plan_name: plan.name,
            week_start: plan.week_start,
            role: link.role,
            expires_at: link.expires_at,
            dietary_restrictions: PlanService::dietary_restrictions(&groups),
            days: meals_by_day(meals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meal::MealType;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn meal(day: Day, name: &str) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            day,
            meal_type: MealType::Dinner,
            name: name.into(),
            description: None,
            servings: 4,
            ingredients: Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_meals_by_day_groups_and_hides_ingredients() {
        let days = meals_by_day(vec![
            meal(Day::Tuesday, "Tacos"),
            meal(Day::Monday, "Curry"),
            meal(Day::Tuesday, "Risotto"),
        ]);
        assert_eq!(days.len(), 2);
        let tuesday: Vec<&str> = days[&Day::Tuesday].iter().map(|m| m.name.as_str()).collect();
        assert_eq!(tuesday, vec!["Tacos", "Risotto"]);

        let json = serde_json::to_value(&days).unwrap();
        assert!(json["monday"][0].get("ingredients").is_none());
    }
}
