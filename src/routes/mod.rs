pub mod admin;
pub mod cities;
pub mod health;
pub mod requests;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/cities", get(cities::list_cities))
        .route("/api/cities", post(cities::create_city))
        .route("/api/cities/{slug}", get(cities::get_city))
        .route("/api/requests", post(requests::submit_request))
        .route("/api/requests", get(requests::list_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    use super::*;
    use crate::city::service::testing::{barcelona_service, service_with_fixture};
    use crate::config::Config;

    const KEY: &str = "test-admin-key";

    fn app_with(service: crate::city::CityService) -> Router {
        create_router(AppState {
            config: Config::for_tests(),
            cities: service,
        })
    }

    fn app() -> (Router, NamedTempFile) {
        let (service, _store, fixture) = barcelona_service();
        (app_with(service), fixture)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header("X-API-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn barcelona() -> Value {
        json!({"city_name": "Barcelona", "country": "Spain", "country_code": "es"})
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _fixture) = app();
        let (status, body) = send(&app, get("/api/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "transit-intel");
    }

    #[tokio::test]
    async fn test_create_city_requires_api_key() {
        let (app, _fixture) = app();

        let (status, body) = send(&app, post_json("/api/cities", barcelona(), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing X-API-Key header");

        let (status, body) = send(&app, post_json("/api/cities", barcelona(), Some("nope"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_create_then_read_city() {
        let (app, _fixture) = app();

        let (status, created) = send(&app, post_json("/api/cities", barcelona(), Some(KEY))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["slug"], "barcelona-es");
        assert_eq!(created["status"], "ready");
        assert_eq!(created["intel"]["modes"][0]["type"], "metro");

        let (status, list) = send(&app, get("/api/cities")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["slug"], "barcelona-es");
        assert_eq!(list[0]["card"]["has_metro"], true);
        assert_eq!(list[0]["card"]["rideshare"], json!(["Cabify", "Bolt"]));

        let (status, city) = send(&app, get("/api/cities/barcelona-es")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(city["country_code"], "ES");
    }

    #[tokio::test]
    async fn test_unknown_city_is_404() {
        let (app, _fixture) = app();
        let (status, body) = send(&app, get("/api/cities/atlantis")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "City not found");
    }

    #[tokio::test]
    async fn test_generation_failure_is_502() {
        let (service, _store, _fixture) = service_with_fixture("[]");
        let app = app_with(service);

        let (status, body) = send(&app, post_json("/api/cities", barcelona(), Some(KEY))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("City generation failed: ")
        );
    }

    #[tokio::test]
    async fn test_submit_and_list_requests() {
        let (app, _fixture) = app();

        let (status, body) = send(
            &app,
            post_json("/api/requests", json!({"raw_input": "  Lyon, France "}), None),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Thanks, we received your city request.");

        let (status, _) = send(&app, get("/api/requests")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/requests")
            .header("X-API-Key", KEY)
            .body(Body::empty())
            .unwrap();
        let (status, list) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["raw_input"], "Lyon, France");
        assert_eq!(list[0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_blank_request_is_rejected() {
        let (app, _fixture) = app();
        let (status, _) = send(
            &app,
            post_json("/api/requests", json!({"raw_input": "   "}), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
