use std::collections::HashMap;

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    models::{
        group::Demographics,
        meal::{Day, Ingredient, Meal, MealInput, MealType},
    },
    services::{
        meals::MealService, metrics::GENERATIONS_COUNTER, plans::PlanService,
        shopping::adult_equivalents,
    },
};

pub const DEFAULT_OPTIONS_PER_SLOT: usize = 2;
pub const MAX_OPTIONS_PER_SLOT: usize = 4;

const SYSTEM_PROMPT: &str = "You are a meal planner for households. \
Answer with a single JSON object of the form \
{\"meals\": [{\"day\": \"monday\", \"meal_type\": \"dinner\", \"name\": \"...\", \
\"description\": \"...\", \"servings\": 4, \
\"ingredients\": [{\"name\": \"...\", \"quantity\": 1.5, \"unit\": \"kg\"}]}]}. \
Days are lowercase English weekday names. Quantities are numbers for the given servings.";

/// Body for POST /api/plans/{id}/generate.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub days: Option<Vec<Day>>,
    pub meal_types: Option<Vec<MealType>>,
    pub options_per_slot: Option<usize>,
}

/// What the generator is asked for, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationScope {
    pub days: Vec<Day>,
    pub meal_types: Vec<MealType>,
    pub options_per_slot: usize,
}

impl GenerationScope {
    pub fn from_request(req: &GenerateRequest) -> Result<Self, String> {
        let mut days = req.days.clone().unwrap_or_else(|| Day::ALL.to_vec());
        days.sort();
        days.dedup();
        let mut meal_types = req.meal_types.clone().unwrap_or_else(|| vec![MealType::Dinner]);
        meal_types.sort();
        meal_types.dedup();
        let options_per_slot = req.options_per_slot.unwrap_or(DEFAULT_OPTIONS_PER_SLOT);

        if days.is_empty() || meal_types.is_empty() {
            return Err("Nothing to generate".into());
        }
        if !(1..=MAX_OPTIONS_PER_SLOT).contains(&options_per_slot) {
            return Err(format!("options_per_slot must be between 1 and {MAX_OPTIONS_PER_SLOT}"));
        }
        Ok(Self { days, meal_types, options_per_slot })
    }
}

/// Loose shape of one generated meal; anything malformed is dropped later.
#[derive(Debug, Deserialize)]
struct GeneratedMeal {
    day: String,
    meal_type: Option<String>,
    name: String,
    description: Option<String>,
    servings: Option<f64>,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
}

pub fn build_prompt(
    demographics: &Demographics,
    restrictions: &[String],
    scope: &GenerationScope,
) -> String {
    let days: Vec<&str> = scope.days.iter().map(Day::as_str).collect();
    let types: Vec<&str> = scope.meal_types.iter().map(MealType::as_str).collect();
    let restrictions = if restrictions.is_empty() {
        "none".to_string()
    } else {
        restrictions.join(", ")
    };
    format!(
        "Plan meals for a household of {adults} adults, {teens} teenagers, {kids} children \
         and {toddlers} toddlers ({ae:.1} adult equivalents).\n\
         Dietary restrictions: {restrictions}.\n\
         Days: {days}.\n\
         Meal types: {types}.\n\
         Propose {options} different option(s) for every day and meal type. \
         Write each recipe for 4 adult servings.",
        adults = demographics.adults,
        teens = demographics.teens,
        kids = demographics.kids,
        toddlers = demographics.toddlers,
        ae = adult_equivalents(demographics),
        days = days.join(", "),
        types = types.join(", "),
        options = scope.options_per_slot,
    )
}

/// Strip a surrounding Markdown code fence, if any.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Turn the model's reply into meal inputs inside `scope`. Invalid entries and
/// entries beyond `options_per_slot` for a (day, meal type) are dropped.
pub fn parse_meals(content: &str, scope: &GenerationScope) -> anyhow::Result<Vec<MealInput>> {
    #[derive(Deserialize)]
    struct Payload {
        meals: Vec<serde_json::Value>,
    }

    let payload: Payload =
        serde_json::from_str(strip_code_fence(content)).context("generator reply is not the expected JSON")?;

    let mut per_slot: HashMap<(Day, &'static str), usize> = HashMap::new();
    let mut out = Vec::new();
    for value in payload.meals {
        let Ok(raw) = serde_json::from_value::<GeneratedMeal>(value) else {
            continue;
        };
        let Ok(day) = raw.day.parse::<Day>() else {
            continue;
        };
        let meal_type = match raw.meal_type.as_deref() {
            Some(t) => match t.parse::<MealType>() {
                Ok(t) => t,
                Err(_) => continue,
            },
            None if scope.meal_types.len() == 1 => scope.meal_types[0],
            None => continue,
        };
        if !scope.days.contains(&day) || !scope.meal_types.contains(&meal_type) {
            continue;
        }

        let input = MealInput {
            day,
            meal_type,
            name: raw.name.trim().to_string(),
            description: raw.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            servings: raw.servings.map(|s| s.round() as i32).unwrap_or(4),
            ingredients: raw.ingredients,
        };
        if input.validate().is_err() {
            continue;
        }

        let count = per_slot.entry((day, meal_type.as_str())).or_insert(0);
        if *count >= scope.options_per_slot {
            continue;
        }
        *count += 1;
        out.push(input);
    }
    Ok(out)
}

pub struct MealGenerator {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl MealGenerator {
    /// Returns None if no AI key is configured.
    pub fn new(config: &Config) -> Option<Self> {
        let api_key = config.ai_api_key.clone()?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.ai_timeout_seconds))
            .build()
            .map_err(|e| tracing::error!("could not build generator HTTP client: {e}"))
            .ok()?;
        Some(Self {
            client,
            api_url: config.ai_api_url.clone(),
            api_key,
            model: config.ai_model.clone(),
        })
    }

    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        let payload = json!({
            "model": self.model,
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("generator request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("generator returned {status}: {text}");
        }

        let body: serde_json::Value = response.json().await.context("generator reply is not JSON")?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .context("generator reply has no message content")
    }

    /// Replace the plan's candidate meals with freshly generated ones.
    pub async fn generate(
        &self,
        pool: &PgPool,
        manager_id: Uuid,
        plan_id: Uuid,
        req: &GenerateRequest,
    ) -> ApiResult<Vec<Meal>> {
        let scope = GenerationScope::from_request(req).map_err(ApiError::BadRequest)?;
        PlanService::get_open(pool, manager_id, plan_id).await?;

        let linked = PlanService::groups(pool, plan_id).await?;
        if linked.is_empty() {
            return Err(ApiError::bad_request("Link at least one group to the plan first"));
        }
        let demographics: Demographics = linked.iter().map(|g| g.demographics).sum();
        let restrictions = PlanService::dietary_restrictions(&linked);
        let prompt = build_prompt(&demographics, &restrictions, &scope);

        let inputs = match self.complete(&prompt).await.and_then(|reply| parse_meals(&reply, &scope)) {
            Ok(inputs) if !inputs.is_empty() => inputs,
            Ok(_) => {
                GENERATIONS_COUNTER.with_label_values(&["empty"]).inc();
                return Err(ApiError::Internal(anyhow::anyhow!(
                    "generator returned no usable meals for plan {plan_id}"
                )));
            }
            Err(e) => {
                GENERATIONS_COUNTER.with_label_values(&["error"]).inc();
                return Err(ApiError::Internal(e.context(format!("meal generation for plan {plan_id}"))));
            }
        };

        let meals = MealService::replace_all(pool, plan_id, &inputs).await?;
        GENERATIONS_COUNTER.with_label_values(&["ok"]).inc();
        tracing::info!("generated {} meal(s) for plan {plan_id}", meals.len());
        Ok(meals)
    }
}
