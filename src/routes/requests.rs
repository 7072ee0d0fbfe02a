use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use super::admin::AdminKey;
use crate::AppState;
use crate::city::{CityRequest, CityRequestCreate};
use crate::error::AppResult;

pub async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<CityRequestCreate>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state.cities.submit_request(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Thanks, we received your city request." })),
    ))
}

pub async fn list_requests(
    _admin: AdminKey,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CityRequest>>> {
    Ok(Json(state.cities.list_requests().await?))
}
