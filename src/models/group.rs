use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Archived,
}

impl GroupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Active => "active",
            GroupStatus::Archived => "archived",
        }
    }
}

impl TryFrom<String> for GroupStatus {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "active" => Ok(GroupStatus::Active),
            "archived" => Ok(GroupStatus::Archived),
            _ => Err(UnknownVariant::new("group status", s)),
        }
    }
}

/// Head counts by age band. Drives the adult-equivalent scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Demographics {
    pub adults: i32,
    pub teens: i32,
    pub kids: i32,
    pub toddlers: i32,
}

impl Demographics {
    pub fn headcount(&self) -> i32 {
        self.adults + self.teens + self.kids + self.toddlers
    }

    pub fn is_negative(&self) -> bool {
        self.adults < 0 || self.teens < 0 || self.kids < 0 || self.toddlers < 0
    }
}

impl std::ops::Add for Demographics {
    type Output = Demographics;

    fn add(self, rhs: Demographics) -> Demographics {
        Demographics {
            adults: self.adults + rhs.adults,
            teens: self.teens + rhs.teens,
            kids: self.kids + rhs.kids,
            toddlers: self.toddlers + rhs.toddlers,
        }
    }
}

impl std::iter::Sum for Demographics {
    fn sum<I: Iterator<Item = Demographics>>(iter: I) -> Self {
        iter.fold(Demographics::default(), |acc, d| acc + d)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub demographics: Demographics,
    pub dietary_restrictions: Vec<String>,
    #[sqlx(try_from = "String")]
    pub status: GroupStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(flatten)]
    pub demographics: Demographics,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub adults: Option<i32>,
    pub teens: Option<i32>,
    pub kids: Option<i32>,
    pub toddlers: Option<i32>,
    pub dietary_restrictions: Option<Vec<String>>,
    pub status: Option<GroupStatus>,
    pub notes: Option<String>,
}

/// Group as returned by the API: the row plus its adult-equivalent weight.
#[derive(Debug, Serialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: Group,
    pub adult_equivalents: f64,
}
