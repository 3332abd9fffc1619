//! HTTP API gateway for Nakshatra.
//!
//! Exposes the consultation API under `/v1`, plus health and service
//! info endpoints.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{
    Router,
    extract::State,
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use nakshatra_agent::TurnPipeline;
use nakshatra_config::{AppConfig, GatewayConfig};
use nakshatra_core::knowledge::KnowledgeStore;
use nakshatra_core::provider::Provider;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub pipeline: Arc<TurnPipeline>,
    pub provider: Arc<dyn Provider>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub start_time: Instant,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build every collaborator from configuration.
    pub async fn from_config(config: AppConfig) -> Result<Self, nakshatra_core::Error> {
        let provider = nakshatra_providers::build_from_config(&config)?;
        let knowledge = nakshatra_knowledge::build_from_config(&config, provider.clone())?;
        let sessions = nakshatra_memory::build_from_config(&config).await?;
        let resolver = Arc::new(nakshatra_chart::build_from_config(&config)?);

        info!(
            provider = provider.name(),
            knowledge = knowledge.name(),
            sessions = sessions.name(),
            "Gateway collaborators ready"
        );

        let pipeline = nakshatra_agent::build_pipeline(&config, provider.clone(), knowledge.clone(), sessions, resolver);
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            provider,
            knowledge,
            start_time: Instant::now(),
        })
    }
}

/// Build the full router.
///
/// Layers applied:
/// - request body size limit (`gateway.max_body_bytes`)
/// - request timeout; a timed-out turn is dropped before it saves
/// - sliding-window rate limiting when `gateway.rate_limit_per_minute > 0`
/// - CORS
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let gateway = state.config.gateway.clone();

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(gateway.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(gateway.request_timeout_secs)));

    if gateway.rate_limit_per_minute > 0 {
        let limiter = Arc::new(RateLimiter::new(
            gateway.rate_limit_per_minute as usize,
            Duration::from_secs(60),
        ));
        app = app.layer(middleware::from_fn(move |req, next| {
            let limiter = limiter.clone();
            rate_limit_middleware(limiter, req, next)
        }));
    }

    app.layer(cors_layer(&gateway))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(gateway: &GatewayConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if gateway.cors_origins.is_empty() || gateway.cors_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = gateway
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(config).await?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Rate Limiter ---

/// Sliding-window rate limiter shared by every client of this process.
///
/// Thread-safe via `std::sync::Mutex` (non-async, held briefly).
struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns `true` if another request fits in the current window.
    fn check(&self) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());

        while hits.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            return false;
        }

        hits.push_back(now);
        true
    }
}

/// Returns 429 Too Many Requests when the window is full.
/// `/health` is exempt so monitoring can poll it freely.
async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    if !limiter.check() {
        warn!(path = %req.uri().path(), "Rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(req).await)
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    service: &'static str,
    status: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        service: "Nakshatra Vedic astrology assistant",
        status: "running",
    })
}

#[derive(Serialize)]
struct ComponentHealth {
    provider: String,
    knowledge_store: String,
    session_store: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
    components: ComponentHealth,
}

fn component_status<E: std::fmt::Display>(result: Result<bool, E>) -> String {
    match result {
        Ok(true) => "ok".into(),
        Ok(false) => "unavailable".into(),
        Err(e) => format!("error: {e}"),
    }
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let components = ComponentHealth {
        provider: component_status(state.provider.health_check().await),
        knowledge_store: component_status(state.knowledge.health_check().await),
        session_store: component_status(state.pipeline.sessions().health_check().await),
    };
    let healthy = [&components.provider, &components.knowledge_store, &components.session_store]
        .iter()
        .all(|status| status.as_str() == "ok");

    Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        components,
    })
}
