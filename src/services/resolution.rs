//! Conflict rule between the two respondent roles.
//!
//! Only the latest response per role counts. The co-manager's answer is laid
//! over the other respondent's one day at a time: every day key the co-manager
//! sent replaces the other side's entry for that day, even when the
//! co-manager's list is empty. Days the co-manager left out keep the other
//! side's choice.

use crate::models::{
    form_link::FormRole,
    form_response::{FormResponse, Selections},
};

/// Most recently submitted response for `role`. Ties keep the first one seen.
pub fn latest_by_role(responses: &[FormResponse], role: FormRole) -> Option<&FormResponse> {
    responses
        .iter()
        .filter(|r| r.role == role)
        .fold(None, |best: Option<&FormResponse>, r| match best {
            Some(b) if b.submitted_at >= r.submitted_at => Some(b),
            _ => Some(r),
        })
}

/// Shallow key-by-key overlay, co-manager wins.
pub fn merge_selections(other: Option<&Selections>, co_manager: Option<&Selections>) -> Selections {
    let mut merged = other.cloned().unwrap_or_default();
    if let Some(co) = co_manager {
        for (day, meals) in co {
            merged.insert(day.clone(), meals.clone());
        }
    }
    merged
}

/// What finalization writes for a set of responses.
pub fn resolve(responses: &[FormResponse]) -> Selections {
    let other = latest_by_role(responses, FormRole::Other).map(|r| &r.selections.0);
    let co_manager = latest_by_role(responses, FormRole::CoManager).map(|r| &r.selections.0);
    merge_selections(other, co_manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    fn response(role: FormRole, at: DateTime<Utc>, selections: &[(&str, Vec<Uuid>)]) -> FormResponse {
        FormResponse {
            id: Uuid::new_v4(),
            form_link_id: Uuid::new_v4(),
            role,
            respondent_name: None,
            selections: Json(
                selections
                    .iter()
                    .map(|(day, ids)| (day.to_string(), ids.clone()))
                    .collect(),
            ),
            comment: None,
            submitted_at: at,
        }
    }

    #[test]
    fn test_latest_by_role_picks_newest() {
        let t0 = Utc::now();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let responses = vec![
            response(FormRole::Other, t0, &[("monday", vec![a])]),
            response(FormRole::Other, t0 + Duration::minutes(5), &[("monday", vec![b])]),
            response(FormRole::CoManager, t0 + Duration::minutes(10), &[]),
        ];

        let latest = latest_by_role(&responses, FormRole::Other).unwrap();
        assert_eq!(latest.selections.0["monday"], vec![b]);
        assert!(latest_by_role(&responses[..2], FormRole::CoManager).is_none());
    }

    #[test]
    fn test_latest_by_role_ignores_list_order() {
        let t0 = Utc::now();
        let newer = response(FormRole::CoManager, t0 + Duration::hours(1), &[]);
        let older = response(FormRole::CoManager, t0, &[]);
        let newer_id = newer.id;
        let responses = vec![newer, older];
        assert_eq!(latest_by_role(&responses, FormRole::CoManager).unwrap().id, newer_id);
    }

    #[test]
    fn test_co_manager_overrides_key_by_key() {
        let (m1, m2, m3, m4) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut other = Selections::new();
        other.insert("monday".into(), vec![m1]);
        other.insert("tuesday".into(), vec![m2]);
        let mut co = Selections::new();
        co.insert("tuesday".into(), vec![m3]);
        co.insert("wednesday".into(), vec![m4]);

        let merged = merge_selections(Some(&other), Some(&co));
        assert_eq!(merged["monday"], vec![m1]);
        assert_eq!(merged["tuesday"], vec![m3]);
        assert_eq!(merged["wednesday"], vec![m4]);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_empty_co_manager_day_clears_other_choice() {
        let m1 = Uuid::new_v4();
        let mut other = Selections::new();
        other.insert("friday".into(), vec![m1]);
        let mut co = Selections::new();
        co.insert("friday".into(), vec![]);

        let merged = merge_selections(Some(&other), Some(&co));
        assert!(merged["friday"].is_empty());
    }

    #[test]
    fn test_missing_sides_are_empty() {
        let m1 = Uuid::new_v4();
        let mut only = Selections::new();
        only.insert("monday".into(), vec![m1]);

        assert_eq!(merge_selections(Some(&only), None), only);
        assert_eq!(merge_selections(None, Some(&only)), only);
        assert!(merge_selections(None, None).is_empty());
    }

    #[test]
    fn test_resolve_uses_latest_of_each_role() {
        let t0 = Utc::now();
        let (old_co, new_co, other_pick) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let responses = vec![
            response(FormRole::CoManager, t0, &[("monday", vec![old_co])]),
            response(FormRole::Other, t0 + Duration::minutes(30), &[("monday", vec![other_pick]), ("sunday", vec![other_pick])]),
            response(FormRole::CoManager, t0 + Duration::minutes(20), &[("monday", vec![new_co])]),
        ];

        let merged = resolve(&responses);
        // co-manager wins even though the other response is more recent
        assert_eq!(merged["monday"], vec![new_co]);
        assert_eq!(merged["sunday"], vec![other_pick]);
    }
}
