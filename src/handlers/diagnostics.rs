// Endpoints that exercise the middleware chain and shutdown behaviour by hand:
//   curl -A "Mozilla/5.0 (Windows NT 10.0)" http://localhost:8080/log2
//   curl -u test:test http://localhost:8080/basic-auth

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;

use crate::context::RequestContext;

pub const SLOW_OPERATION: Duration = Duration::from_secs(5);

/// GET /os, /log, /log2 - Echo the OS recorded for this request
pub async fn os_check(context: RequestContext) -> Response {
    match context.os() {
        "" => (StatusCode::INTERNAL_SERVER_ERROR, "os not found").into_response(),
        os => os.to_string().into_response(),
    }
}

/// GET /slow - Long-running request for observing graceful shutdown
pub async fn slow_operation() -> &'static str {
    tokio::time::sleep(SLOW_OPERATION).await;
    "slow operation done"
}
