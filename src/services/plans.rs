use chrono::{Datelike, Duration, NaiveDate};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        group::{Demographics, Group},
        plan::{CreatePlanRequest, Plan, PlanDetail, PlanStatus, UpdatePlanRequest},
    },
    services::{groups, shopping::adult_equivalents},
};

/// Monday of the ISO week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub struct PlanService;

impl PlanService {
    pub async fn list(pool: &PgPool, manager_id: Uuid) -> ApiResult<Vec<Plan>> {
        let plans = sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE manager_id = $1 ORDER BY week_start DESC, created_at DESC",
        )
        .bind(manager_id)
        .fetch_all(pool)
        .await?;
        Ok(plans)
    }

    /// Fetch a plan owned by `manager_id`; anything else reads as not found.
    pub async fn get(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<Plan> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1 AND manager_id = $2")
            .bind(id)
            .bind(manager_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Plan not found"))
    }

    /// Like `get`, but refuses finalized plans.
    pub async fn get_open(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<Plan> {
        let plan = Self::get(pool, manager_id, id).await?;
        if plan.is_finalized() {
            return Err(ApiError::bad_request("Plan is already finalized"));
        }
        Ok(plan)
    }

    pub async fn detail(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<PlanDetail> {
        let plan = Self::get(pool, manager_id, id).await?;
        let linked = Self::groups(pool, id).await?;
        let demographics: Demographics = linked.iter().map(|g| g.demographics).sum();
        Ok(PlanDetail {
            plan,
            adult_equivalents: adult_equivalents(&demographics),
            demographics,
            groups: linked.into_iter().map(groups::view).collect(),
        })
    }

    pub async fn groups(pool: &PgPool, plan_id: Uuid) -> ApiResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, Group>(
            "SELECT g.*
             FROM groups g
             JOIN plan_groups pg ON pg.group_id = g.id
             WHERE pg.plan_id = $1
             ORDER BY g.name",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn create(pool: &PgPool, manager_id: Uuid, req: &CreatePlanRequest) -> ApiResult<PlanDetail> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(ApiError::bad_request("Name is required"));
        }

        let mut tx = pool.begin().await?;
        let plan = sqlx::query_as::<_, Plan>(
            "INSERT INTO plans (manager_id, name, week_start)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(manager_id)
        .bind(name)
        .bind(week_monday(req.week_start))
        .fetch_one(&mut *tx)
        .await?;
        replace_groups(&mut tx, manager_id, plan.id, &req.group_ids).await?;
        tx.commit().await?;

        tracing::info!("plan {} created for week of {}", plan.id, plan.week_start);
        Self::detail(pool, manager_id, plan.id).await
    }

    pub async fn update(
        pool: &PgPool,
        manager_id: Uuid,
        id: Uuid,
        req: &UpdatePlanRequest,
    ) -> ApiResult<Plan> {
        let current = Self::get(pool, manager_id, id).await?;
        if req.week_start.is_some() && current.is_finalized() {
            return Err(ApiError::bad_request("Cannot move a finalized plan to another week"));
        }
        let name = match &req.name {
            Some(n) if n.trim().is_empty() => return Err(ApiError::bad_request("Name is required")),
            Some(n) => n.trim().to_string(),
            None => current.name,
        };
        let week_start = req.week_start.map(week_monday).unwrap_or(current.week_start);

        let plan = sqlx::query_as::<_, Plan>(
            "UPDATE plans SET name = $1, week_start = $2, updated_at = NOW()
             WHERE id = $3 AND manager_id = $4
             RETURNING *",
        )
        .bind(name)
        .bind(week_start)
        .bind(id)
        .bind(manager_id)
        .fetch_one(pool)
        .await?;
        Ok(plan)
    }

    pub async fn delete(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1 AND manager_id = $2")
            .bind(id)
            .bind(manager_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Plan not found"));
        }
        Ok(())
    }

    pub async fn set_groups(
        pool: &PgPool,
        manager_id: Uuid,
        id: Uuid,
        group_ids: &[Uuid],
    ) -> ApiResult<PlanDetail> {
        Self::get_open(pool, manager_id, id).await?;
        let mut tx = pool.begin().await?;
        replace_groups(&mut tx, manager_id, id, group_ids).await?;
        tx.commit().await?;
        Self::detail(pool, manager_id, id).await
    }

    /// Moves a draft plan to `collecting`; other states are left alone.
    pub async fn mark_collecting(pool: &PgPool, id: Uuid) -> ApiResult<()> {
        sqlx::query(
            "UPDATE plans SET status = $1, updated_at = NOW()
             WHERE id = $2 AND status = $3",
        )
        .bind(PlanStatus::Collecting.as_str())
        .bind(id)
        .bind(PlanStatus::Draft.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Union of the linked groups' restrictions, deduplicated.
    pub fn dietary_restrictions(linked: &[Group]) -> Vec<String> {
        let all: Vec<String> = linked
            .iter()
            .flat_map(|g| g.dietary_restrictions.iter().cloned())
            .collect();
        groups::normalize_restrictions(&all)
    }
}

async fn replace_groups(
    tx: &mut Transaction<'_, Postgres>,
    manager_id: Uuid,
    plan_id: Uuid,
    group_ids: &[Uuid],
) -> ApiResult<()> {
    let mut ids = group_ids.to_vec();
    ids.sort();
    ids.dedup();

    if !ids.is_empty() {
        let owned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM groups WHERE manager_id = $1 AND id = ANY($2)",
        )
        .bind(manager_id)
        .bind(&ids)
        .fetch_one(&mut **tx)
        .await?;
        if owned != ids.len() as i64 {
            return Err(ApiError::bad_request("Unknown group id"));
        }
    }

    sqlx::query("DELETE FROM plan_groups WHERE plan_id = $1")
        .bind(plan_id)
        .execute(&mut **tx)
        .await?;
    if !ids.is_empty() {
        sqlx::query(
            "INSERT INTO plan_groups (plan_id, group_id)
             SELECT $1, UNNEST($2::UUID[])",
        )
        .bind(plan_id)
        .bind(&ids)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
