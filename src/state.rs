use std::{sync::Arc, time::Duration};

use sqlx::PgPool;

use crate::{
    config::Config,
    middleware::rate_limit::RateLimiter,
    services::{generation::MealGenerator, short_codes::ShortCodeCache},
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub short_codes: Arc<ShortCodeCache>,
    pub generator: Option<Arc<MealGenerator>>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        let generator = MealGenerator::new(&config).map(Arc::new);
        if generator.is_some() {
            tracing::info!("AI meal generation configured (model {})", config.ai_model);
        } else {
            tracing::info!("AI_API_KEY not set, meal generation disabled");
        }

        Self {
            short_codes: Arc::new(ShortCodeCache::new(Duration::from_secs(
                config.short_code_cache_ttl_seconds,
            ))),
            rate_limiter: Arc::new(RateLimiter::new()),
            generator,
            config,
            db,
        }
    }
}
