pub mod auth;
pub mod form_links;
pub mod groups;
pub mod health;
pub mod meals;
pub mod metrics;
pub mod plans;
pub mod public;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    middleware::{
        auth::JwtSecret,
        origin::{origin_allowed, require_same_origin, AllowedOrigin},
    },
    AppState,
};

/// Request bodies are small JSON documents.
const BODY_LIMIT: usize = 1024 * 1024;

fn cors_layer(allowed: AllowedOrigin) -> CorsLayer {
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        origin
            .to_str()
            .map(|o| origin_allowed(o, &allowed.0))
            .unwrap_or(false)
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
        .allow_origin(cors_origin)
}

pub fn router(state: AppState) -> Router {
    let allowed = AllowedOrigin::new(&state.config.app_base_url);
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        // Groups
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/groups/{id}",
            get(groups::get_group).put(groups::update_group).delete(groups::delete_group),
        )
        // Plans
        .route("/api/plans", get(plans::list_plans).post(plans::create_plan))
        .route(
            "/api/plans/{id}",
            get(plans::get_plan).put(plans::update_plan).delete(plans::delete_plan),
        )
        .route("/api/plans/{id}/groups", put(plans::set_plan_groups))
        .route("/api/plans/{id}/meals", get(meals::list_meals).post(meals::create_meal))
        .route("/api/plans/{id}/generate", post(plans::generate_meals))
        .route(
            "/api/plans/{id}/form-links",
            get(form_links::list_form_links).post(form_links::create_form_link),
        )
        .route("/api/plans/{id}/responses", get(plans::list_responses))
        .route("/api/plans/{id}/finalize", post(plans::finalize_plan))
        .route(
            "/api/plans/{id}/shopping-list",
            get(plans::get_shopping_list).post(plans::regenerate_shopping_list),
        )
        // Meals
        .route("/api/meals/{id}", put(meals::update_meal).delete(meals::delete_meal))
        // Form links
        .route("/api/form-links/{id}/revoke", post(form_links::revoke_form_link))
        // Public form
        .route("/api/public/forms/{token}", get(public::get_form))
        .route("/api/public/forms/{token}/responses", post(public::submit_response))
        .route("/f/{short_code}", get(public::short_link))
        .layer(axum::middleware::from_fn_with_state(allowed.clone(), require_same_origin))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/mealplan_test".into(),
            jwt_secret: "test-secret".into(),
            session_ttl_seconds: 3600,
            session_cookie_secure: false,
            host: "127.0.0.1".into(),
            port: 0,
            app_base_url: "https://meals.example.com".into(),
            form_link_ttl_days: 7,
            short_code_cache_ttl_seconds: 600,
            ai_api_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            ai_api_key: None,
            ai_model: "test-model".into(),
            ai_timeout_seconds: 60,
        }
    }

    /// Router over a lazy pool; only routes that fail before touching the
    /// database can be exercised.
    fn test_router() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        router(AppState::new(pool, Arc::new(config)))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_manager_routes_require_session() {
        let response = test_router()
            .oneshot(HttpRequest::builder().uri("/api/groups").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_session_is_rejected() {
        let response = test_router()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/plans")
                    .header(header::COOKIE, "session=not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cross_origin_post_is_forbidden() {
        let response = test_router()
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/api/auth/logout")
                    .header(header::ORIGIN, "https://evil.example.net")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let response = test_router()
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/api/auth/logout")
                    .header(header::ORIGIN, "https://meals.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_malformed_form_key_is_not_found() {
        let response = test_router()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/public/forms/not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_public_form_views_are_rate_limited() {
        let app = test_router();
        let mut last = StatusCode::OK;
        // 60 views per minute per client and key
        for _ in 0..61 {
            let response = app
                .clone()
                .oneshot(
                    HttpRequest::builder()
                        .uri("/api/public/forms/bad-key")
                        .header("x-real-ip", "203.0.113.7")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            last = response.status();
        }

        assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders() {
        let response = test_router()
            .oneshot(HttpRequest::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
