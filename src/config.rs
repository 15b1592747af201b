use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl_seconds: u64,
    pub session_cookie_secure: bool,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
    pub form_link_ttl_days: i64,
    pub short_code_cache_ttl_seconds: u64,
    // AI meal generation (optional)
    pub ai_api_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "604800".into())
                .parse()?,
            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            form_link_ttl_days: env::var("FORM_LINK_TTL_DAYS")
                .unwrap_or_else(|_| "7".into())
                .parse()?,
            short_code_cache_ttl_seconds: env::var("SHORT_CODE_CACHE_TTL_SECONDS")
                .unwrap_or_else(|_| "600".into())
                .parse()?,
            ai_api_url: env::var("AI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            ai_api_key: env::var("AI_API_KEY").ok().filter(|s| !s.is_empty()),
            ai_model: env::var("AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            ai_timeout_seconds: env::var("AI_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
        })
    }

    /// Public URL of a form, addressed by its full token.
    pub fn form_url(&self, token: &str) -> String {
        format!("{}/form/{token}", self.app_base_url)
    }

    /// Public short URL, addressed by the link's short code.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/f/{short_code}", self.app_base_url)
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}
