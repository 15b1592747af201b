use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::{form_response::Selections, plan::Plan};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    /// Names of the meals this item is needed for.
    pub meals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShoppingList {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub total_ae: f64,
    pub items: Json<Vec<ShoppingItem>>,
    pub generated_at: DateTime<Utc>,
}

/// POST /api/plans/{id}/finalize payload.
#[derive(Debug, Serialize)]
pub struct FinalizeOutcome {
    pub plan: Plan,
    pub selections: Selections,
    pub shopping_list: ShoppingList,
}
