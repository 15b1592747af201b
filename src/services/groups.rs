use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::group::{CreateGroupRequest, Demographics, Group, GroupView, UpdateGroupRequest},
    services::shopping::adult_equivalents,
};

pub struct GroupService;

impl GroupService {
    pub async fn list(pool: &PgPool, manager_id: Uuid) -> ApiResult<Vec<GroupView>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM groups WHERE manager_id = $1 ORDER BY status, name",
        )
        .bind(manager_id)
        .fetch_all(pool)
        .await?;
        Ok(groups.into_iter().map(view).collect())
    }

    pub async fn get(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<Group> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = $1 AND manager_id = $2")
            .bind(id)
            .bind(manager_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Group not found"))
    }

    pub async fn create(
        pool: &PgPool,
        manager_id: Uuid,
        req: &CreateGroupRequest,
    ) -> ApiResult<GroupView> {
        let name = required_name(&req.name)?;
        validate_demographics(&req.demographics)?;
        let restrictions = normalize_restrictions(&req.dietary_restrictions);

        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups
                (manager_id, name, adults, teens, kids, toddlers, dietary_restrictions, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(manager_id)
        .bind(name)
        .bind(req.demographics.adults)
        .bind(req.demographics.teens)
        .bind(req.demographics.kids)
        .bind(req.demographics.toddlers)
        .bind(&restrictions)
        .bind(&req.notes)
        .fetch_one(pool)
        .await?;
        Ok(view(group))
    }

    pub async fn update(
        pool: &PgPool,
        manager_id: Uuid,
        id: Uuid,
        req: &UpdateGroupRequest,
    ) -> ApiResult<GroupView> {
        let current = Self::get(pool, manager_id, id).await?;

        let name = match &req.name {
            Some(n) => required_name(n)?.to_string(),
            None => current.name,
        };
        let d = current.demographics;
        let demographics = Demographics {
            adults: req.adults.unwrap_or(d.adults),
            teens: req.teens.unwrap_or(d.teens),
            kids: req.kids.unwrap_or(d.kids),
            toddlers: req.toddlers.unwrap_or(d.toddlers),
        };
        validate_demographics(&demographics)?;
        let restrictions = req
            .dietary_restrictions
            .as_deref()
            .map(normalize_restrictions)
            .unwrap_or(current.dietary_restrictions);
        let status = req.status.unwrap_or(current.status);
        let notes = req.notes.clone().or(current.notes);

        let group = sqlx::query_as::<_, Group>(
            "UPDATE groups
             SET name = $1, adults = $2, teens = $3, kids = $4, toddlers = $5,
                 dietary_restrictions = $6, status = $7, notes = $8, updated_at = NOW()
             WHERE id = $9 AND manager_id = $10
             RETURNING *",
        )
        .bind(name)
        .bind(demographics.adults)
        .bind(demographics.teens)
        .bind(demographics.kids)
        .bind(demographics.toddlers)
        .bind(&restrictions)
        .bind(status.as_str())
        .bind(notes)
        .bind(id)
        .bind(manager_id)
        .fetch_one(pool)
        .await?;
        Ok(view(group))
    }

    pub async fn delete(pool: &PgPool, manager_id: Uuid, id: Uuid) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1 AND manager_id = $2")
            .bind(id)
            .bind(manager_id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Group not found"));
        }
        Ok(())
    }
}

pub fn view(group: Group) -> GroupView {
    let adult_equivalents = adult_equivalents(&group.demographics);
    GroupView { group, adult_equivalents }
}

fn required_name(name: &str) -> ApiResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    Ok(name)
}

fn validate_demographics(d: &Demographics) -> ApiResult<()> {
    if d.is_negative() {
        return Err(ApiError::bad_request("Head counts cannot be negative"));
    }
    if d.headcount() == 0 {
        return Err(ApiError::bad_request("A group needs at least one person"));
    }
    Ok(())
}

/// Trim, drop blanks, and dedupe case-insensitively keeping the first spelling.
pub fn normalize_restrictions(input: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in input {
        let r = r.trim();
        if r.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(r)) {
            continue;
        }
        out.push(r.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_restrictions() {
        let input = vec![
            " Vegetarian ".to_string(),
            "nut-free".to_string(),
            "".to_string(),
            "vegetarian".to_string(),
            "Nut-Free".to_string(),
        ];
        assert_eq!(normalize_restrictions(&input), vec!["Vegetarian", "nut-free"]);
    }

    #[test]
    fn test_validate_demographics() {
        assert!(validate_demographics(&Demographics { adults: 1, ..Default::default() }).is_ok());
        assert!(validate_demographics(&Demographics::default()).is_err());
        assert!(validate_demographics(&Demographics { adults: 2, kids: -1, ..Default::default() }).is_err());
    }
}
