use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::BasicCredentials;
use crate::config::AuthConfig;

const CHALLENGE: &str = r#"Basic realm="Restricted""#;

/// Gate the wrapped routes behind the configured basic-auth credential pair.
///
/// Missing or malformed credentials get a 401 with a `WWW-Authenticate`
/// challenge; wrong credentials get a bare 401. The inner handler only runs on
/// an exact match.
pub async fn basic_auth_middleware(
    State(auth): State<Arc<AuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = match BasicCredentials::from_headers(request.headers()) {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::debug!("Basic auth rejected for {}: {}", request.uri().path(), e);
            return unauthorized(true);
        }
    };

    if !credentials.matches(&auth) {
        tracing::warn!("Basic auth failed for user '{}' on {}", credentials.user_id, request.uri().path());
        return unauthorized(false);
    }

    next.run(request).await
}

fn unauthorized(challenge: bool) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    if challenge {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    }
    response
}
