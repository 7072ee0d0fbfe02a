use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{City, CityRequest, CityStatus, NewCity};

/// Outcome of trying to take a slug for generation.
#[derive(Debug)]
pub enum Claim {
    Claimed(City),
    /// Another generation holds the slug.
    Generating,
    /// The slug already has a ready profile.
    Ready,
}

/// Persistence for city profiles and visitor requests.
#[async_trait::async_trait]
pub trait CityStore: Send + Sync {
    /// Marks `new.slug` as generating, inserting it or taking over a failed
    /// row in place. Generating and ready rows are left untouched.
    async fn claim(&self, new: &NewCity) -> Result<Claim, sqlx::Error>;

    async fn mark_ready(
        &self,
        id: Uuid,
        intel: &serde_json::Value,
        raw_response: &str,
        retrieved_at: DateTime<Utc>,
        stale_after: DateTime<Utc>,
    ) -> Result<City, sqlx::Error>;

    async fn mark_failed(&self, id: Uuid) -> Result<(), sqlx::Error>;

    /// Ready cities ordered by name.
    async fn list_ready(&self) -> Result<Vec<City>, sqlx::Error>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<City>, sqlx::Error>;

    async fn insert_request(
        &self,
        raw_input: &str,
        email: Option<&str>,
    ) -> Result<CityRequest, sqlx::Error>;

    /// Newest first.
    async fn list_requests(&self) -> Result<Vec<CityRequest>, sqlx::Error>;
}

const CITY_COLUMNS: &str = "id, slug, city_name, country, country_code, latitude, longitude, \
     metro_area_name, status, retrieved_at, stale_after, intel, raw_response";

#[derive(sqlx::FromRow)]
struct CityRow {
    id: Uuid,
    slug: String,
    city_name: String,
    country: String,
    country_code: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    metro_area_name: Option<String>,
    status: String,
    retrieved_at: DateTime<Utc>,
    stale_after: Option<DateTime<Utc>>,
    intel: Option<serde_json::Value>,
    raw_response: Option<String>,
}

impl TryFrom<CityRow> for City {
    type Error = sqlx::Error;

    fn try_from(row: CityRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<CityStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(City {
            id: row.id,
            slug: row.slug,
            city_name: row.city_name,
            country: row.country,
            country_code: row.country_code,
            latitude: row.latitude,
            longitude: row.longitude,
            metro_area_name: row.metro_area_name,
            status,
            retrieved_at: row.retrieved_at,
            stale_after: row.stale_after,
            intel: row.intel,
            raw_response: row.raw_response,
        })
    }
}

#[derive(Clone)]
pub struct PgCityStore {
    pool: PgPool,
}

impl PgCityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CityStore for PgCityStore {
    #[tracing::instrument(name = "db.cities.claim", skip_all, fields(slug = %new.slug))]
    async fn claim(&self, new: &NewCity) -> Result<Claim, sqlx::Error> {
        let row = sqlx::query_as::<_, CityRow>(&format!(
            "INSERT INTO cities \
             (id, slug, city_name, country, country_code, latitude, longitude, status, retrieved_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'generating', now()) \
             ON CONFLICT (slug) DO UPDATE SET \
               city_name = EXCLUDED.city_name, \
               country = EXCLUDED.country, \
               country_code = EXCLUDED.country_code, \
               latitude = EXCLUDED.latitude, \
               longitude = EXCLUDED.longitude, \
               status = 'generating', \
               stale_after = NULL, \
               intel = NULL, \
               raw_response = NULL \
             WHERE cities.status = 'failed' \
             RETURNING {CITY_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.slug)
        .bind(&new.city_name)
        .bind(&new.country)
        .bind(&new.country_code)
        .bind(new.latitude)
        .bind(new.longitude)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Claim::Claimed(City::try_from(row)?));
        }

        let status: Option<String> = sqlx::query_scalar("SELECT status FROM cities WHERE slug = $1")
            .bind(&new.slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match status.as_deref() {
            Some("ready") => Claim::Ready,
            _ => Claim::Generating,
        })
    }

    #[tracing::instrument(name = "db.cities.mark_ready", skip(self, intel, raw_response))]
    async fn mark_ready(
        &self,
        id: Uuid,
        intel: &serde_json::Value,
        raw_response: &str,
        retrieved_at: DateTime<Utc>,
        stale_after: DateTime<Utc>,
    ) -> Result<City, sqlx::Error> {
        let row = sqlx::query_as::<_, CityRow>(&format!(
            "UPDATE cities SET status = 'ready', intel = $2, raw_response = $3, \
             retrieved_at = $4, stale_after = $5 \
             WHERE id = $1 \
             RETURNING {CITY_COLUMNS}"
        ))
        .bind(id)
        .bind(intel)
        .bind(raw_response)
        .bind(retrieved_at)
        .bind(stale_after)
        .fetch_one(&self.pool)
        .await?;

        City::try_from(row)
    }

    #[tracing::instrument(name = "db.cities.mark_failed", skip(self))]
    async fn mark_failed(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE cities SET status = 'failed' WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "db.cities.list_ready", skip(self))]
    async fn list_ready(&self) -> Result<Vec<City>, sqlx::Error> {
        sqlx::query_as::<_, CityRow>(&format!(
            "SELECT {CITY_COLUMNS} FROM cities WHERE status = 'ready' ORDER BY city_name ASC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(City::try_from)
        .collect()
    }

    #[tracing::instrument(name = "db.cities.find_by_slug", skip(self))]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<City>, sqlx::Error> {
        sqlx::query_as::<_, CityRow>(&format!("SELECT {CITY_COLUMNS} FROM cities WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(City::try_from)
            .transpose()
    }

    #[tracing::instrument(name = "db.city_requests.insert", skip_all)]
    async fn insert_request(
        &self,
        raw_input: &str,
        email: Option<&str>,
    ) -> Result<CityRequest, sqlx::Error> {
        sqlx::query_as::<_, CityRequest>(
            "INSERT INTO city_requests (id, raw_input, email, status) \
             VALUES ($1, $2, $3, 'pending') \
             RETURNING id, raw_input, email, requested_at, status",
        )
        .bind(Uuid::new_v4())
        .bind(raw_input)
        .bind(email)
        .fetch_one(&self.pool)
        .await
    }

    #[tracing::instrument(name = "db.city_requests.list", skip(self))]
    async fn list_requests(&self) -> Result<Vec<CityRequest>, sqlx::Error> {
        sqlx::query_as::<_, CityRequest>(
            "SELECT id, raw_input, email, requested_at, status \
             FROM city_requests ORDER BY requested_at DESC",
        )
        .fetch_all(&self.pool)
        .await
    }
}

/// In-process store with the same claim semantics as `PgCityStore`.
#[derive(Clone, Default)]
pub struct MemoryCityStore {
    cities: Arc<RwLock<HashMap<String, City>>>,
    requests: Arc<RwLock<Vec<CityRequest>>>,
}

impl MemoryCityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update_by_id(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut City),
    ) -> Result<City, sqlx::Error> {
        let mut cities = self.cities.write();
        let city = cities
            .values_mut()
            .find(|c| c.id == id)
            .ok_or(sqlx::Error::RowNotFound)?;
        apply(city);
        Ok(city.clone())
    }
}

#[async_trait::async_trait]
impl CityStore for MemoryCityStore {
    async fn claim(&self, new: &NewCity) -> Result<Claim, sqlx::Error> {
        let mut cities = self.cities.write();

        if let Some(existing) = cities.get_mut(&new.slug) {
            match existing.status {
                CityStatus::Generating => return Ok(Claim::Generating),
                CityStatus::Ready => return Ok(Claim::Ready),
                CityStatus::Failed => {}
            }
            existing.city_name = new.city_name.clone();
            existing.country = new.country.clone();
            existing.country_code = new.country_code.clone();
            existing.latitude = new.latitude;
            existing.longitude = new.longitude;
            existing.status = CityStatus::Generating;
            existing.stale_after = None;
            existing.intel = None;
            existing.raw_response = None;
            return Ok(Claim::Claimed(existing.clone()));
        }

        let city = City {
            id: Uuid::new_v4(),
            slug: new.slug.clone(),
            city_name: new.city_name.clone(),
            country: new.country.clone(),
            country_code: new.country_code.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
            metro_area_name: None,
            status: CityStatus::Generating,
            retrieved_at: Utc::now(),
            stale_after: None,
            intel: None,
            raw_response: None,
        };
        cities.insert(city.slug.clone(), city.clone());
        Ok(Claim::Claimed(city))
    }

    async fn mark_ready(
        &self,
        id: Uuid,
        intel: &serde_json::Value,
        raw_response: &str,
        retrieved_at: DateTime<Utc>,
        stale_after: DateTime<Utc>,
    ) -> Result<City, sqlx::Error> {
        self.update_by_id(id, |city| {
            city.status = CityStatus::Ready;
            city.intel = Some(intel.clone());
            city.raw_response = Some(raw_response.to_string());
            city.retrieved_at = retrieved_at;
            city.stale_after = Some(stale_after);
        })
    }

    async fn mark_failed(&self, id: Uuid) -> Result<(), sqlx::Error> {
        self.update_by_id(id, |city| city.status = CityStatus::Failed)
            .map(|_| ())
    }

    async fn list_ready(&self) -> Result<Vec<City>, sqlx::Error> {
        let mut ready: Vec<City> = self
            .cities
            .read()
            .values()
            .filter(|c| c.status == CityStatus::Ready)
            .cloned()
            .collect();
        ready.sort_by(|a, b| a.city_name.cmp(&b.city_name));
        Ok(ready)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<City>, sqlx::Error> {
        Ok(self.cities.read().get(slug).cloned())
    }

    async fn insert_request(
        &self,
        raw_input: &str,
        email: Option<&str>,
    ) -> Result<CityRequest, sqlx::Error> {
        let request = CityRequest {
            id: Uuid::new_v4(),
            raw_input: raw_input.to_string(),
            email: email.map(str::to_string),
            requested_at: Utc::now(),
            status: "pending".to_string(),
        };
        self.requests.write().push(request.clone());
        Ok(request)
    }

    async fn list_requests(&self) -> Result<Vec<CityRequest>, sqlx::Error> {
        Ok(self.requests.read().iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_city(slug: &str, name: &str) -> NewCity {
        NewCity {
            slug: slug.to_string(),
            city_name: name.to_string(),
            country: "Spain".to_string(),
            country_code: "ES".to_string(),
            latitude: None,
            longitude: None,
        }
    }

    async fn claimed(store: &MemoryCityStore, slug: &str, name: &str) -> City {
        match store.claim(&new_city(slug, name)).await.unwrap() {
            Claim::Claimed(city) => city,
            other => panic!("expected {slug} to be claimed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_claim_conflicts_while_generating() {
        let store = MemoryCityStore::new();
        claimed(&store, "madrid-es", "Madrid").await;

        let second = store.claim(&new_city("madrid-es", "Madrid")).await.unwrap();
        assert!(matches!(second, Claim::Generating));
    }

    #[tokio::test]
    async fn test_ready_city_is_not_reclaimed() {
        let store = MemoryCityStore::new();
        let now = Utc::now();
        let city = claimed(&store, "madrid-es", "Madrid").await;
        store
            .mark_ready(city.id, &serde_json::json!({"tips": []}), "{}", now, now)
            .await
            .unwrap();

        let again = store.claim(&new_city("madrid-es", "Madrid Metro")).await.unwrap();
        assert!(matches!(again, Claim::Ready));

        let stored = store.find_by_slug("madrid-es").await.unwrap().unwrap();
        assert_eq!(stored.status, CityStatus::Ready);
        assert_eq!(stored.city_name, "Madrid");
        assert_eq!(stored.intel, Some(serde_json::json!({"tips": []})));
        assert_eq!(stored.raw_response.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_reclaim_failed_keeps_identity() {
        let store = MemoryCityStore::new();
        let city = claimed(&store, "madrid-es", "Madrid").await;
        store.mark_failed(city.id).await.unwrap();

        let again = claimed(&store, "madrid-es", "Madrid Metro").await;

        assert_eq!(again.id, city.id);
        assert_eq!(again.city_name, "Madrid Metro");
        assert_eq!(again.status, CityStatus::Generating);
    }

    #[tokio::test]
    async fn test_list_ready_sorted_by_name() {
        let store = MemoryCityStore::new();
        let now = Utc::now();
        for (slug, name) in [("rome-it", "Rome"), ("lisbon-pt", "Lisbon"), ("oslo-no", "Oslo")] {
            let city = claimed(&store, slug, name).await;
            if slug != "oslo-no" {
                store
                    .mark_ready(city.id, &serde_json::json!({}), "{}", now, now)
                    .await
                    .unwrap();
            }
        }

        let names: Vec<String> = store
            .list_ready()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.city_name)
            .collect();
        assert_eq!(names, vec!["Lisbon", "Rome"]);
    }

    #[tokio::test]
    async fn test_mark_unknown_id_is_row_not_found() {
        let store = MemoryCityStore::new();
        let err = store.mark_failed(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn test_requests_newest_first() {
        let store = MemoryCityStore::new();
        store.insert_request("Porto", None).await.unwrap();
        store
            .insert_request("Bergen", Some("ops@example.com"))
            .await
            .unwrap();

        let requests = store.list_requests().await.unwrap();
        assert_eq!(requests[0].raw_input, "Bergen");
        assert_eq!(requests[0].email.as_deref(), Some("ops@example.com"));
        assert_eq!(requests[1].raw_input, "Porto");
        assert!(requests.iter().all(|r| r.status == "pending"));
    }
}
