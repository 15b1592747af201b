use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use super::UnknownVariant;

/// Day of the plan week. Serialized as the lowercase English weekday name,
/// which is also the key used in form selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Day::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| UnknownVariant::new("day", s))
    }
}

impl TryFrom<String> for Day {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(UnknownVariant::new("meal type", s)),
        }
    }
}

impl TryFrom<String> for MealType {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub plan_id: Uuid,
    #[sqlx(try_from = "String")]
    pub day: Day,
    #[sqlx(try_from = "String")]
    pub meal_type: MealType,
    pub name: String,
    pub description: Option<String>,
    /// Number of adult servings the ingredient list is written for.
    pub servings: i32,
    pub ingredients: Json<Vec<Ingredient>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for POST /api/plans/{id}/meals; also what generation produces.
#[derive(Debug, Clone, Deserialize)]
pub struct MealInput {
    pub day: Day,
    pub meal_type: MealType,
    pub name: String,
    pub description: Option<String>,
    pub servings: i32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl MealInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Meal name is required".into());
        }
        if self.servings <= 0 {
            return Err("Servings must be positive".into());
        }
        validate_ingredients(&self.ingredients)
    }
}

pub fn validate_ingredients(ingredients: &[Ingredient]) -> Result<(), String> {
    for ingredient in ingredients {
        if ingredient.name.trim().is_empty() {
            return Err("Ingredient name is required".into());
        }
        if !ingredient.quantity.is_finite() || ingredient.quantity < 0.0 {
            return Err(format!("Invalid quantity for ingredient '{}'", ingredient.name));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    pub day: Option<Day>,
    pub meal_type: Option<MealType>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub servings: Option<i32>,
    pub ingredients: Option<Vec<Ingredient>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_parsing_is_case_insensitive() {
        assert_eq!("Monday".parse::<Day>().unwrap(), Day::Monday);
        assert_eq!(" sunday ".parse::<Day>().unwrap(), Day::Sunday);
        assert!("funday".parse::<Day>().is_err());
        assert!("2025-06-02".parse::<Day>().is_err());
    }

    #[test]
    fn test_day_serializes_as_selection_key() {
        assert_eq!(serde_json::to_value(Day::Wednesday).unwrap(), "wednesday");
        for day in Day::ALL {
            assert_eq!(day.as_str().parse::<Day>().unwrap(), day);
        }
    }

    #[test]
    fn test_meal_input_validation() {
        let mut input = MealInput {
            day: Day::Monday,
            meal_type: MealType::Dinner,
            name: "Lentil soup".into(),
            description: None,
            servings: 4,
            ingredients: vec![Ingredient { name: "lentils".into(), quantity: 300.0, unit: "g".into() }],
        };
        assert!(input.validate().is_ok());

        input.servings = 0;
        assert!(input.validate().is_err());

        input.servings = 4;
        input.ingredients[0].quantity = -1.0;
        assert!(input.validate().is_err());

        input.ingredients[0].quantity = f64::NAN;
        assert!(input.validate().is_err());
    }
}
