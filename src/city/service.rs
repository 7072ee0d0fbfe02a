use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use opentelemetry::KeyValue;
use tracing::Instrument;

use super::model::{
    City, CityListItem, CityRequest, CityRequestCreate, CityResponse, CreateCityRequest, NewCity,
};
use super::store::{Claim, CityStore};
use super::text::slugify;
use crate::error::{AppError, AppResult};
use crate::intel::IntelGenerator;
use crate::telemetry::metrics::{CITY_GENERATION_DURATION, CITY_PROFILES};

/// How long generated intel is considered current.
pub const STALE_AFTER_DAYS: i64 = 30;

#[derive(Clone)]
pub struct CityService {
    store: Arc<dyn CityStore>,
    generator: Arc<IntelGenerator>,
}

impl CityService {
    pub fn new(store: Arc<dyn CityStore>, generator: Arc<IntelGenerator>) -> Self {
        Self { store, generator }
    }

    #[tracing::instrument(
        name = "city.create_profile",
        skip(self, req),
        fields(city.slug = tracing::field::Empty, city.name = %req.city_name)
    )]
    pub async fn create_profile(&self, req: CreateCityRequest) -> AppResult<CityResponse> {
        let city_name = req.city_name.trim();
        let country = req.country.trim();
        let country_code = req.country_code.trim().to_uppercase();

        if city_name.is_empty() || country.is_empty() {
            return Err(AppError::Validation(
                "city_name and country must not be empty".into(),
            ));
        }

        let slug = match req.slug.as_deref() {
            Some(explicit) => explicit.trim().to_string(),
            None => slugify(&format!("{city_name}-{country_code}")),
        };
        if slug.is_empty() {
            return Err(AppError::Validation("Slug cannot be empty".into()));
        }
        tracing::Span::current().record("city.slug", slug.as_str());

        let new = NewCity {
            slug,
            city_name: city_name.to_string(),
            country: country.to_string(),
            country_code,
            latitude: req.latitude,
            longitude: req.longitude,
        };

        let city = match self.store.claim(&new).await? {
            Claim::Claimed(city) => city,
            Claim::Generating => {
                return Err(AppError::Conflict("City is currently generating".into()));
            }
            Claim::Ready => return Err(AppError::Conflict("City already exists".into())),
        };

        // The claimed row must leave `generating` even if this request is dropped.
        let service = self.clone();
        tokio::spawn(
            async move { service.generate_profile(city).await }.instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| AppError::Internal(format!("city generation task failed: {e}")))?
    }

    async fn generate_profile(&self, city: City) -> AppResult<CityResponse> {
        let start = Instant::now();
        let outcome = self.generator.generate(&city.city_name, &city.country).await;
        CITY_GENERATION_DURATION.record(start.elapsed().as_secs_f64(), &[]);

        let generated = match outcome {
            Ok(generated) => generated,
            Err(e) => {
                self.abandon(&city, &e.to_string()).await;
                return Err(AppError::Generation(e.to_string()));
            }
        };

        let intel = match serde_json::to_value(&generated.intel) {
            Ok(intel) => intel,
            Err(e) => {
                let message = format!("failed to encode city intel: {e}");
                self.abandon(&city, &message).await;
                return Err(AppError::Internal(message));
            }
        };
        let retrieved_at = Utc::now();
        let stale_after = retrieved_at + Duration::days(STALE_AFTER_DAYS);

        let city = self
            .store
            .mark_ready(
                city.id,
                &intel,
                &generated.raw_response,
                retrieved_at,
                stale_after,
            )
            .await?;

        CITY_PROFILES.add(1, &[KeyValue::new("status", "ready")]);
        tracing::info!(
            slug = %city.slug,
            attempts = generated.attempts,
            "City profile ready"
        );

        Ok(city.into())
    }

    /// Records the failure and releases the slug for a later retry.
    async fn abandon(&self, city: &City, reason: &str) {
        CITY_PROFILES.add(1, &[KeyValue::new("status", "failed")]);
        tracing::error!(slug = %city.slug, error = %reason, "City generation failed");

        if let Err(e) = self.store.mark_failed(city.id).await {
            tracing::error!(slug = %city.slug, error = %e, "Failed to mark city as failed");
        }
    }

    #[tracing::instrument(name = "city.list", skip(self))]
    pub async fn list_cities(&self) -> AppResult<Vec<CityListItem>> {
        let cities = self.store.list_ready().await?;
        Ok(cities.into_iter().map(CityListItem::from).collect())
    }

    #[tracing::instrument(name = "city.get", skip(self))]
    pub async fn get_city(&self, slug: &str) -> AppResult<CityResponse> {
        self.store
            .find_by_slug(slug)
            .await?
            .map(CityResponse::from)
            .ok_or_else(|| AppError::NotFound("City not found".into()))
    }

    #[tracing::instrument(name = "city.submit_request", skip_all)]
    pub async fn submit_request(&self, req: CityRequestCreate) -> AppResult<CityRequest> {
        let raw_input = req.raw_input.trim();
        if raw_input.is_empty() {
            return Err(AppError::Validation("raw_input must not be empty".into()));
        }
        let email = req
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());

        let request = self.store.insert_request(raw_input, email).await?;
        tracing::info!(request.id = %request.id, "City request received");
        Ok(request)
    }

    #[tracing::instrument(name = "city.list_requests", skip(self))]
    pub async fn list_requests(&self) -> AppResult<Vec<CityRequest>> {
        Ok(self.store.list_requests().await?)
    }
}
