//! Liveness probe for load balancers and monitoring.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use comptoir_core::PaymentMethod;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: ServingStatus,
    pub database: bool,
    pub payment_methods: Vec<PaymentMethod>,
    pub server_time: String,
}

/// `503` when the database doesn't answer.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let (code, status) = if database {
        (StatusCode::OK, ServingStatus::Serving)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ServingStatus::NotServing)
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            payment_methods: state.services.payments.methods(),
            server_time: Utc::now().to_rfc3339(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::testing::{json, TestApp};

    #[tokio::test]
    async fn test_health() {
        let mut t = TestApp::new().await;
        let response = t.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "SERVING");
        assert_eq!(body["payment_methods"], serde_json::json!(["stripe"]));
    }

    #[tokio::test]
    async fn test_closed_database() {
        let mut t = TestApp::new().await;
        t.db.close().await;
        let response = t.get("/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
