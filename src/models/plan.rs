use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    group::{Demographics, GroupView},
    UnknownVariant,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Collecting,
    Finalized,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Collecting => "collecting",
            PlanStatus::Finalized => "finalized",
        }
    }
}

impl TryFrom<String> for PlanStatus {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "draft" => Ok(PlanStatus::Draft),
            "collecting" => Ok(PlanStatus::Collecting),
            "finalized" => Ok(PlanStatus::Finalized),
            _ => Err(UnknownVariant::new("plan status", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub name: String,
    /// Always a Monday.
    pub week_start: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: PlanStatus,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn is_finalized(&self) -> bool {
        self.status == PlanStatus::Finalized
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub week_start: NaiveDate,
    #[serde(default)]
    pub group_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SetPlanGroupsRequest {
    pub group_ids: Vec<Uuid>,
}

/// GET /api/plans/{id} payload.
#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub groups: Vec<GroupView>,
    pub demographics: Demographics,
    pub adult_equivalents: f64,
}
