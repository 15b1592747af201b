use chrono::{Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    models::form_link::{CreateFormLinkRequest, FormLink, FormLinkView, FormRole, LinkState},
    services::{metrics::FORM_LINKS_COUNTER, plans::PlanService, short_codes::ShortCodeCache},
};

pub const TOKEN_LEN: usize = 32;
pub const SHORT_CODE_LEN: usize = 8;
pub const MAX_TTL_DAYS: i64 = 90;
const ISSUE_ATTEMPTS: u32 = 3;

/// Lowercase letters and digits minus the easily confused ones (0/o, 1/l/i).
const SHORT_CODE_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz23456789";

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn generate_short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LEN)
        .map(|_| SHORT_CODE_ALPHABET[rng.gen_range(0..SHORT_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Links a new issue for `role` must revoke: every unrevoked link of that role.
/// Expired ones count too, since only `revoked_at` frees the (plan, role) slot.
pub fn superseded(links: &[FormLink], role: FormRole) -> Vec<&FormLink> {
    links
        .iter()
        .filter(|l| l.role == role && l.revoked_at.is_none())
        .collect()
}

fn evict_all(cache: &ShortCodeCache, codes: &[String]) {
    for code in codes {
        cache.evict(code);
    }
}

/// Token, short-code or live-link index collision.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub fn view(config: &Config, link: FormLink) -> FormLinkView {
    FormLinkView {
        state: link.state_at(Utc::now()),
        url: config.form_url(&link.token),
        short_url: config.short_url(&link.short_code),
        link,
    }
}

pub struct FormLinkService;

impl FormLinkService {
    /// Mint a new link for (plan, role). Any live link for the same pair is
    /// revoked in the same transaction, so at most one stays active.
    pub async fn issue(
        pool: &PgPool,
        config: &Config,
        cache: &ShortCodeCache,
        manager_id: Uuid,
        plan_id: Uuid,
        req: &CreateFormLinkRequest,
    ) -> ApiResult<FormLinkView> {
        let days = req.expires_in_days.unwrap_or(config.form_link_ttl_days);
        if !(1..=MAX_TTL_DAYS).contains(&days) {
            return Err(ApiError::bad_request(format!(
                "expires_in_days must be between 1 and {MAX_TTL_DAYS}"
            )));
        }
        PlanService::get_open(pool, manager_id, plan_id).await?;

        let mut attempt = 1;
        let (link, replaced) = loop {
            match Self::try_issue(pool, manager_id, plan_id, req.role, days).await {
                Err(e) if is_unique_violation(&e) && attempt < ISSUE_ATTEMPTS => {
                    tracing::warn!("form link issue for plan {plan_id} collided, retrying");
                    attempt += 1;
                }
                Err(e) if is_unique_violation(&e) => {
                    return Err(ApiError::Conflict(
                        "Another link for this role was issued at the same time, try again".into(),
                    ));
                }
                other => break other?,
            }
        };

        evict_all(cache, &replaced);
        PlanService::mark_collecting(pool, plan_id).await?;
        FORM_LINKS_COUNTER.with_label_values(&[req.role.as_str()]).inc();
        tracing::info!(
            "issued {} link {} for plan {plan_id} (replaced {})",
            req.role.as_str(),
            link.id,
            replaced.len()
        );

        Ok(view(config, link))
    }

    /// One issue transaction. Returns the new link and the short codes it replaced.
    async fn try_issue(
        pool: &PgPool,
        manager_id: Uuid,
        plan_id: Uuid,
        role: FormRole,
        days: i64,
    ) -> Result<(FormLink, Vec<String>), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let existing = sqlx::query_as::<_, FormLink>(
            "SELECT * FROM form_links WHERE plan_id = $1 FOR UPDATE",
        )
        .bind(plan_id)
        .fetch_all(&mut *tx)
        .await?;

        let replaced = superseded(&existing, role);
        let ids: Vec<Uuid> = replaced.iter().map(|l| l.id).collect();
        let codes: Vec<String> = replaced.iter().map(|l| l.short_code.clone()).collect();
        if !ids.is_empty() {
            sqlx::query("UPDATE form_links SET revoked_at = NOW() WHERE id = ANY($1)")
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        let link = sqlx::query_as::<_, FormLink>(
            "INSERT INTO form_links (plan_id, token, short_code, role, expires_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(plan_id)
        .bind(generate_token())
        .bind(generate_short_code())
        .bind(role.as_str())
        .bind(Utc::now() + Duration::days(days))
        .bind(manager_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok((link, codes))
    }

    pub async fn list(
        pool: &PgPool,
        config: &Config,
        manager_id: Uuid,
        plan_id: Uuid,
    ) -> ApiResult<Vec<FormLinkView>> {
        PlanService::get(pool, manager_id, plan_id).await?;
        let links = sqlx::query_as::<_, FormLink>(
            "SELECT * FROM form_links WHERE plan_id = $1 ORDER BY created_at DESC",
        )
        .bind(plan_id)
        .fetch_all(pool)
        .await?;
        Ok(links.into_iter().map(|l| view(config, l)).collect())
    }

    /// Idempotent: revoking a revoked link keeps the first timestamp.
    pub async fn revoke(
        pool: &PgPool,
        config: &Config,
        cache: &ShortCodeCache,
        manager_id: Uuid,
        link_id: Uuid,
    ) -> ApiResult<FormLinkView> {
        let link = sqlx::query_as::<_, FormLink>(
            "UPDATE form_links l SET revoked_at = COALESCE(l.revoked_at, NOW())
             FROM plans p
             WHERE l.id = $1 AND p.id = l.plan_id AND p.manager_id = $2
             RETURNING l.*",
        )
        .bind(link_id)
        .bind(manager_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Form link not found"))?;

        cache.evict(&link.short_code);
        tracing::info!("revoked form link {link_id}");
        Ok(view(config, link))
    }

    /// Look a link up by full token or short code, whatever its state.
    pub async fn resolve(pool: &PgPool, cache: &ShortCodeCache, key: &str) -> ApiResult<FormLink> {
        let not_found = || ApiError::not_found("Form link not found");
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(not_found());
        }

        if key.len() == TOKEN_LEN {
            return sqlx::query_as::<_, FormLink>("SELECT * FROM form_links WHERE token = $1")
                .bind(key)
                .fetch_optional(pool)
                .await?
                .ok_or_else(not_found);
        }

        if let Some(token) = cache.get(key) {
            if let Some(link) = sqlx::query_as::<_, FormLink>("SELECT * FROM form_links WHERE token = $1")
                .bind(&token)
                .fetch_optional(pool)
                .await?
            {
                return Ok(link);
            }
            cache.evict(key);
        }

        let link = sqlx::query_as::<_, FormLink>("SELECT * FROM form_links WHERE short_code = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?
            .ok_or_else(not_found)?;
        cache.insert(&link.short_code, &link.token);
        Ok(link)
    }

    /// Like `resolve`, but only active links. Revoked and expired links read as 404.
    pub async fn resolve_active(pool: &PgPool, cache: &ShortCodeCache, key: &str) -> ApiResult<FormLink> {
        let link = Self::resolve(pool, cache, key).await?;
        match link.state_at(Utc::now()) {
            LinkState::Active => Ok(link),
            LinkState::Revoked => Err(ApiError::not_found("This form link has been revoked")),
            LinkState::Expired => Err(ApiError::not_found("This form link has expired")),
        }
    }

    pub async fn record_view(pool: &PgPool, link_id: Uuid) -> ApiResult<()> {
        sqlx::query("UPDATE form_links SET view_count = view_count + 1 WHERE id = $1")
            .bind(link_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete links revoked or expired more than `older_than_days` ago.
    /// Their responses go with them.
    pub async fn prune(pool: &PgPool, older_than_days: i64, dry_run: bool) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);
        let condition = "(revoked_at IS NOT NULL AND revoked_at < $1) OR expires_at < $1";

        if dry_run {
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(*)::BIGINT FROM form_links WHERE {condition}"
            ))
            .bind(cutoff)
            .fetch_one(pool)
            .await?;
            return Ok(count as u64);
        }

        let result = sqlx::query(&format!("DELETE FROM form_links WHERE {condition}"))
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_token(), token);
    }

    #[test]
    fn test_short_code_shape() {
        for _ in 0..100 {
            let code = generate_short_code();
            assert_eq!(code.len(), SHORT_CODE_LEN);
            assert!(code.bytes().all(|b| SHORT_CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'o', '1', 'l', 'i']));
        }
    }

    fn link(role: FormRole, expires_in: i64, revoked: bool) -> FormLink {
        let now = Utc::now();
        FormLink {
            id: Uuid::new_v4(),
            plan_id: Uuid::nil(),
            token: generate_token(),
            short_code: generate_short_code(),
            role,
            expires_at: now + Duration::days(expires_in),
            revoked_at: revoked.then_some(now),
            view_count: 0,
            created_by: Uuid::nil(),
            created_at: now,
        }
    }

    #[test]
    fn test_superseded_picks_unrevoked_links_of_role() {
        let live = link(FormRole::CoManager, 3, false);
        let expired = link(FormRole::CoManager, -1, false);
        let revoked = link(FormRole::CoManager, 3, true);
        let other = link(FormRole::Other, 3, false);
        let links = vec![live.clone(), expired.clone(), revoked, other];

        let ids: Vec<Uuid> = superseded(&links, FormRole::CoManager).iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![live.id, expired.id]);
    }

    #[test]
    fn test_reissue_leaves_one_active_link_per_role() {
        let now = Utc::now();
        let mut links = vec![
            link(FormRole::CoManager, 3, false),
            link(FormRole::Other, 3, false),
            link(FormRole::CoManager, 5, true),
        ];

        for _ in 0..2 {
            let ids: Vec<Uuid> = superseded(&links, FormRole::CoManager).iter().map(|l| l.id).collect();
            for l in links.iter_mut().filter(|l| ids.contains(&l.id)) {
                l.revoked_at = Some(now);
            }
            links.push(link(FormRole::CoManager, 7, false));
        }

        let active = |role| links.iter().filter(|l| l.role == role && l.is_active_at(now)).count();
        assert_eq!(active(FormRole::CoManager), 1);
        assert_eq!(active(FormRole::Other), 1);
        assert!(links.last().unwrap().is_active_at(now));
        assert_eq!(superseded(&links, FormRole::CoManager).len(), 1);
    }

    #[test]
    fn test_reissue_evicts_replaced_short_codes() {
        let cache = ShortCodeCache::new(std::time::Duration::from_secs(600));
        let old = link(FormRole::Other, 3, false);
        let kept = link(FormRole::CoManager, 3, false);
        cache.insert(&old.short_code, &old.token);
        cache.insert(&kept.short_code, &kept.token);

        let links = vec![old.clone(), kept.clone()];
        let codes: Vec<String> = superseded(&links, FormRole::Other)
            .iter()
            .map(|l| l.short_code.clone())
            .collect();
        evict_all(&cache, &codes);

        assert_eq!(cache.get(&old.short_code), None);
        assert_eq!(cache.get(&kept.short_code), Some(kept.token));
    }

    #[test]
    fn test_short_code_and_token_lengths_differ() {
        // resolve() tells them apart by length
        assert_ne!(SHORT_CODE_LEN, TOKEN_LEN);
    }
}
