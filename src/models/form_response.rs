use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::form_link::FormRole;

/// Day key (`"monday"`..`"sunday"`) → chosen meal ids.
pub type Selections = BTreeMap<String, Vec<Uuid>>;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FormResponse {
    pub id: Uuid,
    pub form_link_id: Uuid,
    /// Role of the link at submission time.
    #[sqlx(try_from = "String")]
    pub role: FormRole,
    pub respondent_name: Option<String>,
    pub selections: Json<Selections>,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub respondent_name: Option<String>,
    pub selections: Selections,
    pub comment: Option<String>,
}

/// GET /api/plans/{id}/responses payload.
#[derive(Debug, Serialize)]
pub struct PlanResponses {
    pub responses: Vec<FormResponse>,
    /// What finalizing right now would write.
    pub preview: Selections,
}
