use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::admin::AdminKey;
use crate::AppState;
use crate::city::{CityListItem, CityResponse, CreateCityRequest};
use crate::error::AppResult;

pub async fn list_cities(State(state): State<AppState>) -> AppResult<Json<Vec<CityListItem>>> {
    Ok(Json(state.cities.list_cities().await?))
}

pub async fn get_city(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<CityResponse>> {
    Ok(Json(state.cities.get_city(&slug).await?))
}

pub async fn create_city(
    _admin: AdminKey,
    State(state): State<AppState>,
    Json(body): Json<CreateCityRequest>,
) -> AppResult<(StatusCode, Json<CityResponse>)> {
    let city = state.cities.create_profile(body).await?;
    Ok((StatusCode::CREATED, Json(city)))
}
