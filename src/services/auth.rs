use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        auth::Claims,
        user::{Manager, ManagerProfile, SessionGrant},
    },
};

const BCRYPT_COST: u32 = 12;
const MIN_PASSWORD_LEN: usize = 8;

pub struct AuthService;

impl AuthService {
    pub async fn register(
        pool: &PgPool,
        email: &str,
        password: &str,
        display_name: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> ApiResult<SessionGrant> {
        let email = normalize_email(email)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ApiError::bad_request("Display name is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM managers WHERE email = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await?;
        if taken {
            return Err(ApiError::bad_request("An account already exists for this email"));
        }

        let hash = bcrypt::hash(password, BCRYPT_COST).map_err(anyhow::Error::from)?;
        let manager = sqlx::query_as::<_, Manager>(
            "INSERT INTO managers (email, password_hash, display_name)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(&email)
        .bind(hash)
        .bind(display_name)
        .fetch_one(pool)
        .await?;

        tracing::info!("registered manager {}", manager.id);
        Self::grant(manager, jwt_secret, ttl_seconds)
    }

    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
    ) -> ApiResult<SessionGrant> {
        let invalid = || ApiError::Unauthorized("Invalid email or password".into());
        let email = normalize_email(email).map_err(|_| invalid())?;

        let manager = sqlx::query_as::<_, Manager>("SELECT * FROM managers WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?
            .ok_or_else(invalid)?;

        let valid = bcrypt::verify(password, &manager.password_hash).unwrap_or(false);
        if !valid {
            return Err(invalid());
        }

        Self::grant(manager, jwt_secret, ttl_seconds)
    }

    pub async fn profile(pool: &PgPool, manager_id: Uuid) -> ApiResult<ManagerProfile> {
        sqlx::query_as::<_, Manager>("SELECT * FROM managers WHERE id = $1")
            .bind(manager_id)
            .fetch_optional(pool)
            .await?
            .map(ManagerProfile::from)
            .ok_or_else(|| ApiError::not_found("Manager not found"))
    }

    fn grant(manager: Manager, jwt_secret: &str, ttl_seconds: u64) -> ApiResult<SessionGrant> {
        let token = Self::generate_session_token(manager.id, &manager.email, jwt_secret, ttl_seconds)?;
        Ok(SessionGrant { profile: manager.into(), token })
    }

    pub fn generate_session_token(
        manager_id: Uuid,
        email: &str,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: manager_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }
}

fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_session_token;

    #[test]
    fn test_session_token_round_trip() {
        let id = Uuid::new_v4();
        let token = AuthService::generate_session_token(id, "cook@example.com", "s3cret", 3600).unwrap();
        let manager = decode_session_token(&token, "s3cret").unwrap();
        assert_eq!(manager.manager_id, id);
        assert_eq!(manager.email, "cook@example.com");
    }

    #[test]
    fn test_session_token_wrong_secret_rejected() {
        let token = AuthService::generate_session_token(Uuid::new_v4(), "a@b.co", "one", 3600).unwrap();
        assert!(decode_session_token(&token, "two").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Cook@Example.COM ").unwrap(), "cook@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@localhost").is_err());
    }
}
