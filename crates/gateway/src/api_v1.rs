//! HTTP API v1: consultation endpoints.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`: Run one consultation turn
//! - `POST /v1/kundali`: Compute a kundali for a birth profile
//! - `GET  /v1/session/{id}`: Session summary
//! - `GET  /v1/session/{id}/kundali`: The session's stored kundali

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use nakshatra_core::chart::ChartSummary;
use nakshatra_core::knowledge::ContextCategory;
use nakshatra_core::profile::UserProfile;
use nakshatra_core::vocabulary::ZodiacSign;

use crate::SharedState;
use crate::error::{ApiError, from_domain, from_rejection, session_not_found};

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/kundali", post(kundali_handler))
        .route("/session/{id}", get(session_handler))
        .route("/session/{id}/kundali", get(session_kundali_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    /// Required on the first message of a session.
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub context_used: Vec<ContextCategory>,
    pub zodiac_sign: Option<ZodiacSign>,
    pub moon_sign: Option<ZodiacSign>,
    pub ascendant_sign: Option<ZodiacSign>,
    pub current_dasha: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KundaliSummary {
    pub sun_sign: Option<ZodiacSign>,
    pub moon_sign: Option<ZodiacSign>,
    pub ascendant_sign: Option<ZodiacSign>,
    pub lagna_lord: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub user_profile: Option<UserProfile>,
    pub message_count: usize,
    pub last_context: Vec<ContextCategory>,
    pub kundali_summary: Option<KundaliSummary>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(from_rejection)?;
    info!(
        session_id = %payload.session_id,
        message_len = payload.message.len(),
        new_profile = payload.user_profile.is_some(),
        "v1/chat request"
    );

    let outcome = state
        .pipeline
        .run_turn(&payload.session_id, &payload.message, payload.user_profile.as_ref())
        .await
        .map_err(from_domain)?;

    Ok(Json(ChatResponse {
        response: outcome.reply,
        context_used: outcome.context_used,
        zodiac_sign: outcome.sun_sign,
        moon_sign: outcome.moon_sign,
        ascendant_sign: outcome.ascendant_sign,
        current_dasha: outcome.current_dasha,
    }))
}

async fn kundali_handler(
    State(state): State<SharedState>,
    payload: Result<Json<UserProfile>, JsonRejection>,
) -> Result<Json<ChartSummary>, ApiError> {
    let Json(profile) = payload.map_err(from_rejection)?;
    info!(name = %profile.name, "v1/kundali request");

    let chart = state
        .pipeline
        .resolver()
        .resolve(&profile)
        .await
        .map_err(from_domain)?;
    Ok(Json(chart))
}

async fn session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .pipeline
        .sessions()
        .load(&id)
        .await
        .map_err(|e| from_domain(e.into()))?
        .ok_or_else(|| session_not_found(&id))?;

    let kundali_summary = session.chart.as_ref().map(|chart| KundaliSummary {
        sun_sign: chart.sun_sign(),
        moon_sign: chart.moon_sign(),
        ascendant_sign: chart.ascendant_sign(),
        lagna_lord: chart.key_positions.lagna_lord.clone(),
    });

    Ok(Json(SessionResponse {
        message_count: session.messages.len(),
        session_id: session.session_id,
        user_profile: session.profile,
        last_context: session.last_context,
        kundali_summary,
    }))
}

async fn session_kundali_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ChartSummary>, ApiError> {
    let session = state
        .pipeline
        .sessions()
        .load(&id)
        .await
        .map_err(|e| from_domain(e.into()))?;

    session
        .and_then(|s| s.chart)
        .map(Json)
        .ok_or_else(|| session_not_found(&id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockProvider, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const LEO_PLAN: &str = r#"{"needs_retrieval": true, "query": "Leo sun sign traits",
        "filters": {"zodiac": ["Leo"], "planet": [], "life_area": [], "nakshatra": []}, "reasoning": null}"#;

    fn profile_json() -> Value {
        json!({
            "name": "Asha",
            "birth_date": "1992-08-17",
            "birth_time": "06:45",
            "birth_place": "Pune, India",
            "preferred_language": "en"
        })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn chat_starts_session_and_reports_signs() {
        let state = test_state(MockProvider::new(LEO_PLAN, Ok("As a Leo you lead with warmth.")));
        let app = v1_router(state.clone());

        let (status, body) = send(
            app,
            "POST",
            "/chat",
            Some(json!({
                "session_id": "s-1",
                "message": "What does my sun sign mean?",
                "user_profile": profile_json()
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "As a Leo you lead with warmth.");
        assert_eq!(body["context_used"], json!(["zodiac_traits"]));
        assert_eq!(body["zodiac_sign"], "Leo");
        assert_eq!(body["moon_sign"], "Virgo");
        assert_eq!(body["ascendant_sign"], "Aries");
        assert_eq!(state.pipeline.sessions().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn chat_without_profile_for_new_session_is_bad_request() {
        let app = v1_router(test_state(MockProvider::new(LEO_PLAN, Ok("unused"))));
        let (status, body) = send(
            app,
            "POST",
            "/chat",
            Some(json!({"session_id": "new", "message": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn malformed_chat_body_is_bad_request() {
        let app = v1_router(test_state(MockProvider::new(LEO_PLAN, Ok("unused"))));
        let (status, body) = send(app, "POST", "/chat", Some(json!({"message": "Hello"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn generation_failure_is_bad_gateway() {
        let app = v1_router(test_state(MockProvider::new(LEO_PLAN, Err("upstream down"))));
        let (status, body) = send(
            app,
            "POST",
            "/chat",
            Some(json!({"session_id": "s-1", "message": "Hello", "user_profile": profile_json()})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "generation_failed");
    }

    #[tokio::test]
    async fn unknown_birth_place_is_not_found() {
        let app = v1_router(test_state(MockProvider::new(LEO_PLAN, Ok("unused"))));
        let mut profile = profile_json();
        profile["birth_place"] = json!("Atlantis");

        let (status, body) = send(app, "POST", "/kundali", Some(profile)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "place_not_found");
    }

    #[tokio::test]
    async fn kundali_returns_full_chart() {
        let app = v1_router(test_state(MockProvider::new(LEO_PLAN, Ok("unused"))));
        let (status, body) = send(app, "POST", "/kundali", Some(profile_json())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_name"], "Asha");
        assert_eq!(body["location"]["utc_offset"], "+05:30");
        assert!(body["planets"].as_array().unwrap().len() >= 4);
    }

    #[tokio::test]
    async fn session_summary_after_a_turn() {
        let state = test_state(MockProvider::new(LEO_PLAN, Ok("As a Leo you lead with warmth.")));
        let (status, _) = send(
            v1_router(state.clone()),
            "POST",
            "/chat",
            Some(json!({"session_id": "s-1", "message": "Sun sign?", "user_profile": profile_json()})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(v1_router(state.clone()), "GET", "/session/s-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message_count"], 2);
        assert_eq!(body["last_context"], json!(["zodiac_traits"]));
        assert_eq!(body["kundali_summary"]["sun_sign"], "Leo");
        assert_eq!(body["kundali_summary"]["lagna_lord"], "Mars");
        assert_eq!(body["user_profile"]["name"], "Asha");

        let (status, body) = send(v1_router(state), "GET", "/session/s-1/kundali", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key_positions"]["moon"]["sign"], "Virgo");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = test_state(MockProvider::new(LEO_PLAN, Ok("unused")));
        let (status, body) = send(v1_router(state.clone()), "GET", "/session/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "session_not_found");

        let (status, _) = send(v1_router(state), "GET", "/session/missing/kundali", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
