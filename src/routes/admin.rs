use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{AppState, error::AppError};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured admin key.
pub struct AdminKey;

impl FromRequestParts<AppState> for AdminKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-API-Key header".into()))?;

        if !constant_time_eq(provided.as_bytes(), state.config.admin_api_key.as_bytes()) {
            return Err(AppError::Forbidden("Invalid API key".into()));
        }

        Ok(AdminKey)
    }
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(lhs: &[u8], rhs: &[u8]) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    let mut diff = 0_u8;
    for (a, b) in lhs.iter().zip(rhs) {
        diff |= a ^ b;
    }
    diff == 0
}
