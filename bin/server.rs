// Shop Analytics - Web Server
// REST API with Axum over the analytics engine

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use shop_analytics::{
    init_tracing, AnalyticsEngine, AnalyticsError, Config, Granularity, RecordSource, SqliteStore,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;

type SharedSource = Arc<Mutex<dyn RecordSource + Send>>;

/// Shared application state
#[derive(Clone)]
struct AppState {
    source: SharedSource,
    config: Arc<Config>,
}

impl AppState {
    fn lock(&self) -> MutexGuard<'_, dyn RecordSource + Send + 'static> {
        // Handlers only read, so a poisoned lock still guards consistent data
        self.source.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn engine<'a>(
        &self,
        source: &'a (dyn RecordSource + Send),
    ) -> AnalyticsEngine<&'a (dyn RecordSource + Send)> {
        AnalyticsEngine::new(source)
            .with_collections(self.config.collections.clone())
            .with_geography_limit(self.config.geography_limit)
    }
}

// ============================================================================
// Responses
// ============================================================================

fn error_response(err: AnalyticsError) -> Response {
    match err {
        AnalyticsError::InvalidGranularity(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
        other => {
            tracing::error!(error = %other, "analytics request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "An error occurred while fetching data",
                    "details": other.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn respond<T: Serialize>(result: Result<T, AnalyticsError>) -> Response {
    match result {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => error_response(e),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": shop_analytics::VERSION }))
}

/// GET /api/total_sales/:interval
async fn total_sales(State(state): State<AppState>, Path(interval): Path<String>) -> Response {
    let granularity = match interval.parse::<Granularity>() {
        Ok(g) => g,
        Err(e) => return error_response(e),
    };
    let source = state.lock();
    respond(state.engine(&*source).total_sales(granularity))
}

/// GET /api/sales_growth/:interval
async fn sales_growth(State(state): State<AppState>, Path(interval): Path<String>) -> Response {
    let granularity = match interval.parse::<Granularity>() {
        Ok(g) => g,
        Err(e) => return error_response(e),
    };
    let source = state.lock();
    respond(state.engine(&*source).sales_growth(granularity))
}

/// GET /api/new_customers/:interval
async fn new_customers(State(state): State<AppState>, Path(interval): Path<String>) -> Response {
    let granularity = match interval.parse::<Granularity>() {
        Ok(g) => g,
        Err(e) => return error_response(e),
    };
    let source = state.lock();
    respond(state.engine(&*source).new_customers(granularity))
}

/// GET /api/repeat_customers/:interval
async fn repeat_customers(State(state): State<AppState>, Path(interval): Path<String>) -> Response {
    let granularity = match interval.parse::<Granularity>() {
        Ok(g) => g,
        Err(e) => return error_response(e),
    };
    let source = state.lock();
    respond(state.engine(&*source).repeat_customers(granularity))
}

/// GET /api/customer_geography
async fn customer_geography(State(state): State<AppState>) -> Response {
    let source = state.lock();
    respond(state.engine(&*source).customer_geography())
}

/// GET /api/customer_ltv
async fn customer_ltv(State(state): State<AppState>) -> Response {
    let source = state.lock();
    respond(state.engine(&*source).customer_ltv())
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/total_sales/:interval", get(total_sales))
        .route("/sales_growth/:interval", get(sales_growth))
        .route("/new_customers/:interval", get(new_customers))
        .route("/repeat_customers/:interval", get(repeat_customers))
        .route("/customer_geography", get(customer_geography))
        .route("/customer_ltv", get(customer_ltv))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing("info");

    let config = Config::from_env()?;
    let store = SqliteStore::open(&config.db_path)?;
    tracing::info!(db = %config.db_path.display(), "database opened");

    let state = AppState {
        source: Arc::new(Mutex::new(store)),
        config: Arc::new(config.clone()),
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    tracing::info!(addr = %config.bind_addr, "server running");

    axum::serve(listener, build_router(state))
        .await
        .context("Server terminated")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use shop_analytics::MemoryStore;
    use tower::ServiceExt;

    struct BrokenSource;

    impl RecordSource for BrokenSource {
        fn fetch_all(&self, _collection: &str) -> anyhow::Result<Vec<Value>> {
            anyhow::bail!("database is locked")
        }
    }

    fn state_with<S: RecordSource + Send + 'static>(source: S) -> AppState {
        AppState {
            source: Arc::new(Mutex::new(source)),
            config: Arc::new(Config::default()),
        }
    }

    fn sample_store() -> MemoryStore {
        MemoryStore::new()
            .with_collection(
                "shopifyOrders",
                vec![
                    json!({ "created_at": "2023-01-10", "customer": { "id": 1 },
                            "total_price_set": { "shop_money": { "amount": "100" } } }),
                    json!({ "created_at": "2023-02-10", "customer": { "id": 1 },
                            "total_price_set": { "shop_money": { "amount": "150" } } }),
                ],
            )
            .with_collection(
                "shopifyCustomers",
                vec![json!({ "id": 1, "created_at": "2022-12-01", "default_address": { "city": "Quito" } })],
            )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_total_sales_endpoint() {
        let app = build_router(state_with(sample_store()));
        let (status, body) = get_json(app, "/api/total_sales/monthly").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                { "_id": "2023-01", "total_sales": 100.0 },
                { "_id": "2023-02", "total_sales": 150.0 }
            ])
        );
    }

    #[tokio::test]
    async fn test_sales_growth_endpoint() {
        let app = build_router(state_with(sample_store()));
        let (status, body) = get_json(app, "/api/sales_growth/monthly").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "date": "2023-02", "growth_rate": 50.0 }]));
    }

    #[tokio::test]
    async fn test_invalid_interval_is_rejected() {
        let app = build_router(state_with(sample_store()));
        let (status, body) = get_json(app, "/api/repeat_customers/weekly").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("weekly"));
    }

    #[tokio::test]
    async fn test_invalid_interval_rejected_before_fetch() {
        // A broken source would yield 500; the interval check must come first
        let app = build_router(state_with(BrokenSource));
        let (status, _) = get_json(app, "/api/new_customers/hourly").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_data_source_failure_is_500() {
        let app = build_router(state_with(BrokenSource));
        let (status, body) = get_json(app, "/api/customer_ltv").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["details"].as_str().unwrap().contains("database is locked"));
    }

    #[tokio::test]
    async fn test_cohort_and_geography_endpoints() {
        let app = build_router(state_with(sample_store()));
        let (status, body) = get_json(app.clone(), "/api/customer_ltv").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{ "_id": "2022-12", "avg_ltv": 250.0, "customer_count": 1 }])
        );

        let (status, body) = get_json(app, "/api/customer_geography").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{ "_id": "Quito", "count": 1 }]));
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state_with(MemoryStore::new()));
        let (status, body) = get_json(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
