use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text::country_flag;
use crate::intel::{CityIntel, TransportType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CityStatus {
    Generating,
    Ready,
    Failed,
}

impl CityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CityStatus::Generating => "generating",
            CityStatus::Ready => "ready",
            CityStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(CityStatus::Generating),
            "ready" => Ok(CityStatus::Ready),
            "failed" => Ok(CityStatus::Failed),
            other => Err(format!("unknown city status {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct City {
    pub id: Uuid,
    pub slug: String,
    pub city_name: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metro_area_name: Option<String>,
    pub status: CityStatus,
    pub retrieved_at: DateTime<Utc>,
    pub stale_after: Option<DateTime<Utc>>,
    pub intel: Option<serde_json::Value>,
    pub raw_response: Option<String>,
}

impl City {
    /// Stored intel decoded against the current schema.
    ///
    /// A document that no longer decodes is reported and treated as absent.
    pub fn parsed_intel(&self) -> Option<CityIntel> {
        let value = self.intel.as_ref()?;
        match serde_json::from_value(value.clone()) {
            Ok(intel) => Some(intel),
            Err(e) => {
                tracing::warn!(slug = %self.slug, error = %e, "Stored city intel does not decode");
                None
            }
        }
    }
}

/// Identity and descriptive fields used to claim a slug for generation.
#[derive(Debug, Clone)]
pub struct NewCity {
    pub slug: String,
    pub city_name: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCityRequest {
    pub city_name: String,
    pub country: String,
    pub country_code: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityResponse {
    pub slug: String,
    pub city_name: String,
    pub country: String,
    pub country_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: CityStatus,
    pub retrieved_at: DateTime<Utc>,
    pub stale_after: Option<DateTime<Utc>>,
    pub intel: Option<CityIntel>,
}

impl From<City> for CityResponse {
    fn from(city: City) -> Self {
        let intel = city.parsed_intel();
        Self {
            slug: city.slug,
            city_name: city.city_name,
            country: city.country,
            country_code: city.country_code,
            latitude: city.latitude,
            longitude: city.longitude,
            status: city.status,
            retrieved_at: city.retrieved_at,
            stale_after: city.stale_after,
            intel,
        }
    }
}

/// At-a-glance summary shown in city listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityCard {
    pub flag: String,
    pub has_metro: bool,
    pub contactless: bool,
    pub rideshare: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityListItem {
    pub slug: String,
    pub city_name: String,
    pub country: String,
    pub country_code: String,
    pub status: CityStatus,
    pub card: CityCard,
}

impl From<City> for CityListItem {
    fn from(city: City) -> Self {
        let intel = city.parsed_intel();
        let card = CityCard {
            flag: country_flag(&city.country_code),
            has_metro: intel
                .as_ref()
                .is_some_and(|i| i.has_mode(TransportType::Metro)),
            contactless: intel.as_ref().is_some_and(CityIntel::accepts_contactless),
            rideshare: intel
                .as_ref()
                .map(|i| {
                    i.available_rideshare()
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        Self {
            slug: city.slug,
            city_name: city.city_name,
            country: city.country,
            country_code: city.country_code,
            status: city.status,
            card,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CityRequest {
    pub id: Uuid,
    pub raw_input: String,
    pub email: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CityRequestCreate {
    pub raw_input: String,
    #[serde(default)]
    pub email: Option<String>,
}
