use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref FORM_LINKS_COUNTER: CounterVec = register_counter_vec!(
        "api_form_links_issued_total",
        "Public form links issued, by role",
        &["role"]
    ).unwrap();

    pub static ref FORM_VIEWS_COUNTER: CounterVec = register_counter_vec!(
        "api_form_views_total",
        "Public form views, by role",
        &["role"]
    ).unwrap();

    pub static ref RESPONSES_COUNTER: CounterVec = register_counter_vec!(
        "api_form_responses_total",
        "Form responses submitted, by role",
        &["role"]
    ).unwrap();

    pub static ref GENERATIONS_COUNTER: CounterVec = register_counter_vec!(
        "api_meal_generations_total",
        "AI meal generation runs, by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref RATE_LIMITED_COUNTER: CounterVec = register_counter_vec!(
        "api_rate_limited_total",
        "Requests rejected by the rate limiter, by scope",
        &["scope"]
    ).unwrap();

    pub static ref FINALIZED_COUNTER: IntCounter = register_int_counter!(
        "api_plans_finalized_total",
        "Plans finalized"
    ).unwrap();
}
