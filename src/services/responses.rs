use std::collections::HashSet;

use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        form_link::FormLink,
        form_response::{FormResponse, PlanResponses, Selections, SubmitResponseRequest},
        meal::Day,
    },
    services::{metrics::RESPONSES_COUNTER, plans::PlanService, resolution},
};

pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_NAME_CHARS: usize = 100;

/// Canonicalize day keys, drop repeated ids within a day, and reject ids that
/// are not meals of the plan.
pub fn validate_selections(input: &Selections, plan_meals: &HashSet<Uuid>) -> Result<Selections, String> {
    let mut out = Selections::new();
    for (key, ids) in input {
        let day: Day = key.parse().map_err(|_| format!("Unknown day '{key}'"))?;
        if out.contains_key(day.as_str()) {
            return Err(format!("Day '{day}' appears more than once"));
        }
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(ids.len());
        for id in ids {
            if !plan_meals.contains(id) {
                return Err(format!("Meal {id} is not part of this plan"));
            }
            if seen.insert(*id) {
                kept.push(*id);
            }
        }
        out.insert(day.as_str().to_string(), kept);
    }
    Ok(out)
}

fn clean_text(value: Option<&str>, max: usize, field: &str) -> Result<Option<String>, String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(format!("{field} must be at most {max} characters")),
        Some(v) => Ok(Some(v.to_string())),
        None => Ok(None),
    }
}

pub struct ResponseService;

impl ResponseService {
    /// Store a respondent's answer. `link` must already be known to be active.
    pub async fn submit(
        pool: &PgPool,
        link: &FormLink,
        req: &SubmitResponseRequest,
    ) -> ApiResult<FormResponse> {
        let finalized: bool = sqlx::query_scalar("SELECT status = 'finalized' FROM plans WHERE id = $1")
            .bind(link.plan_id)
            .fetch_one(pool)
            .await?;
        if finalized {
            return Err(ApiError::bad_request("This plan has already been finalized"));
        }

        let respondent_name = clean_text(req.respondent_name.as_deref(), MAX_NAME_CHARS, "Name")
            .map_err(ApiError::BadRequest)?;
        let comment = clean_text(req.comment.as_deref(), MAX_COMMENT_CHARS, "Comment")
            .map_err(ApiError::BadRequest)?;

        let plan_meals: HashSet<Uuid> = sqlx::query_scalar::<_, Uuid>("SELECT id FROM meals WHERE plan_id = $1")
            .bind(link.plan_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();
        let selections = validate_selections(&req.selections, &plan_meals).map_err(ApiError::BadRequest)?;

        let response = sqlx::query_as::<_, FormResponse>(
            "INSERT INTO form_responses (form_link_id, role, respondent_name, selections, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(link.id)
        .bind(link.role.as_str())
        .bind(respondent_name)
        .bind(Json(&selections))
        .bind(comment)
        .fetch_one(pool)
        .await?;

        RESPONSES_COUNTER.with_label_values(&[link.role.as_str()]).inc();
        tracing::info!(
            "response {} recorded for plan {} via {} link",
            response.id,
            link.plan_id,
            link.role.as_str()
        );
        Ok(response)
    }

    /// Every response submitted through any of the plan's links, newest first.
    pub async fn for_plan(pool: &PgPool, plan_id: Uuid) -> ApiResult<Vec<FormResponse>> {
        let responses = sqlx::query_as::<_, FormResponse>(
            "SELECT r.* FROM form_responses r
             JOIN form_links l ON l.id = r.form_link_id
             WHERE l.plan_id = $1
             ORDER BY r.submitted_at DESC",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(responses)
    }

    pub async fn list(pool: &PgPool, manager_id: Uuid, plan_id: Uuid) -> ApiResult<PlanResponses> {
        PlanService::get(pool, manager_id, plan_id).await?;
        let responses = Self::for_plan(pool, plan_id).await?;
        let preview = resolution::resolve(&responses);
        Ok(PlanResponses { responses, preview })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_selections_normalizes_and_dedupes() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let plan_meals: HashSet<Uuid> = [a, b].into_iter().collect();

        let mut input = Selections::new();
        input.insert("Monday".into(), vec![a, b, a]);
        input.insert("friday".into(), vec![]);

        let out = validate_selections(&input, &plan_meals).unwrap();
        assert_eq!(out["monday"], vec![a, b]);
        assert!(out["friday"].is_empty());
        assert!(!out.contains_key("Monday"));
    }

    #[test]
    fn test_validate_selections_rejects_foreign_meals_and_bad_days() {
        let a = Uuid::new_v4();
        let plan_meals: HashSet<Uuid> = [a].into_iter().collect();

        let mut foreign = Selections::new();
        foreign.insert("monday".into(), vec![Uuid::new_v4()]);
        assert!(validate_selections(&foreign, &plan_meals).is_err());

        let mut bad_day = Selections::new();
        bad_day.insert("someday".into(), vec![a]);
        assert!(validate_selections(&bad_day, &plan_meals).is_err());
    }

    #[test]
    fn test_validate_selections_rejects_same_day_twice() {
        let a = Uuid::new_v4();
        let plan_meals: HashSet<Uuid> = [a].into_iter().collect();
        let mut input = Selections::new();
        input.insert("MONDAY".into(), vec![a]);
        input.insert("monday".into(), vec![a]);
        assert!(validate_selections(&input, &plan_meals).is_err());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  hi  "), 10, "Comment").unwrap().as_deref(), Some("hi"));
        assert_eq!(clean_text(Some("   "), 10, "Comment").unwrap(), None);
        assert_eq!(clean_text(None, 10, "Comment").unwrap(), None);
        assert!(clean_text(Some(&"x".repeat(11)), 10, "Comment").is_err());
    }
}
