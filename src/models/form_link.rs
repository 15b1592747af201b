use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    meal::{Day, MealType},
    UnknownVariant,
};

/// Who a public link is meant for. `CoManager` answers override `Other` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormRole {
    CoManager,
    Other,
}

impl FormRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormRole::CoManager => "co_manager",
            FormRole::Other => "other",
        }
    }
}

impl TryFrom<String> for FormRole {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "co_manager" => Ok(FormRole::CoManager),
            "other" => Ok(FormRole::Other),
            _ => Err(UnknownVariant::new("form role", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Active,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FormLink {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub token: String,
    pub short_code: String,
    #[sqlx(try_from = "String")]
    pub role: FormRole,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub view_count: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FormLink {
    /// Revocation takes precedence over expiry. A link is expired from the
    /// instant `expires_at` is reached.
    pub fn state_at(&self, now: DateTime<Utc>) -> LinkState {
        if self.revoked_at.is_some() {
            LinkState::Revoked
        } else if now >= self.expires_at {
            LinkState::Expired
        } else {
            LinkState::Active
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == LinkState::Active
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFormLinkRequest {
    pub role: FormRole,
    pub expires_in_days: Option<i64>,
}

/// Manager-facing representation of a link.
#[derive(Debug, Serialize)]
pub struct FormLinkView {
    #[serde(flatten)]
    pub link: FormLink,
    pub state: LinkState,
    pub url: String,
    pub short_url: String,
}

/// A meal as shown on the public form. Ingredients stay private.
#[derive(Debug, Clone, Serialize)]
pub struct PublicMeal {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub meal_type: MealType,
}

/// Read model served to whoever holds a form token.
#[derive(Debug, Serialize)]
pub struct PublicForm {
    pub plan_name: String,
    pub week_start: NaiveDate,
    pub role: FormRole,
    pub expires_at: DateTime<Utc>,
    pub finalized: bool,
    pub dietary_restrictions: Vec<String>,
    pub days: BTreeMap<Day, Vec<PublicMeal>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(expires_at: DateTime<Utc>, revoked_at: Option<DateTime<Utc>>) -> FormLink {
        FormLink {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            token: "t".repeat(32),
            short_code: "abcd1234".into(),
            role: FormRole::Other,
            expires_at,
            revoked_at,
            view_count: 0,
            created_by: Uuid::new_v4(),
            created_at: expires_at - Duration::days(7),
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let expires_at = Utc::now();
        let l = link(expires_at, None);

        assert_eq!(l.state_at(expires_at - Duration::milliseconds(1)), LinkState::Active);
        assert_eq!(l.state_at(expires_at), LinkState::Expired);
        assert_eq!(l.state_at(expires_at + Duration::seconds(1)), LinkState::Expired);
    }

    #[test]
    fn test_revoked_wins_over_expired() {
        let now = Utc::now();
        let l = link(now - Duration::days(1), Some(now - Duration::days(2)));
        assert_eq!(l.state_at(now), LinkState::Revoked);
        assert!(!l.is_active_at(now));

        let fresh_but_revoked = link(now + Duration::days(3), Some(now));
        assert_eq!(fresh_but_revoked.state_at(now), LinkState::Revoked);
    }

    #[test]
    fn test_role_round_trips_through_text_column() {
        assert_eq!(FormRole::try_from("co_manager".to_string()).unwrap(), FormRole::CoManager);
        assert_eq!(FormRole::try_from(FormRole::Other.as_str().to_string()).unwrap(), FormRole::Other);
        assert!(FormRole::try_from("admin".to_string()).is_err());
        assert_eq!(serde_json::to_value(FormRole::CoManager).unwrap(), "co_manager");
    }

    #[test]
    fn test_public_form_days_are_ordered_by_weekday() {
        let mut days = BTreeMap::new();
        days.insert(Day::Sunday, vec![]);
        days.insert(Day::Monday, vec![]);
        days.insert(Day::Thursday, vec![]);
        let form = PublicForm {
            plan_name: "Week".into(),
            week_start: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            role: FormRole::Other,
            expires_at: Utc::now(),
            finalized: false,
            dietary_restrictions: vec![],
            days,
        };
        let json = serde_json::to_string(&form).unwrap();
        let monday = json.find("\"monday\"").unwrap();
        let thursday = json.find("\"thursday\"").unwrap();
        let sunday = json.find("\"sunday\"").unwrap();
        assert!(monday < thursday && thursday < sunday);
    }
}
