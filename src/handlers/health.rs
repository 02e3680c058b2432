use axum::response::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthzResponse {
    pub message: String,
}

/// GET /healthz - Liveness probe, always `{"message":"OK"}`
pub async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse {
        message: "OK".to_string(),
    })
}
