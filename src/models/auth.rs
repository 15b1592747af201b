use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in the session JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // manager UUID
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated session: available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedManager {
    pub manager_id: Uuid,
    pub email: String,
}
