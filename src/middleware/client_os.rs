use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};

use crate::context::RequestContext;

// woothee's marker for anything it cannot classify
const UNKNOWN_OS: &str = "UNKNOWN";

/// Derive the client OS from `User-Agent` and record it in the request context.
/// Never rejects: an absent or unrecognised agent records an empty string.
pub async fn client_os_middleware(mut request: Request, next: Next) -> Response {
    let os = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(detect_os)
        .unwrap_or_default();

    RequestContext::attach(request.extensions_mut()).set_os(os);
    next.run(request).await
}

/// OS name for a user-agent string, empty when it cannot be determined
pub fn detect_os(user_agent: &str) -> String {
    let parser = woothee::parser::Parser::new();
    match parser.parse(user_agent) {
        Some(result) if result.os != UNKNOWN_OS => result.os.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    const CHROME_ON_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_ON_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";

    fn app() -> Router {
        Router::new()
            .route("/os", get(|context: RequestContext| async move { context.os().to_string() }))
            .layer(middleware::from_fn(client_os_middleware))
    }

    async fn os_seen_by_handler(user_agent: Option<&str>) -> String {
        let mut builder = axum::http::Request::builder().uri("/os");
        if let Some(ua) = user_agent {
            builder = builder.header(header::USER_AGENT, ua);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn detects_desktop_operating_systems() {
        assert!(detect_os(CHROME_ON_WINDOWS).starts_with("Windows"));
        assert!(!detect_os(SAFARI_ON_MAC).is_empty());
    }

    #[test]
    fn unparseable_agent_is_empty() {
        assert_eq!(detect_os(""), "");
        assert_eq!(detect_os("definitely not a browser"), "");
    }

    #[tokio::test]
    async fn downstream_handler_sees_os() {
        let os = os_seen_by_handler(Some(CHROME_ON_WINDOWS)).await;
        assert!(os.starts_with("Windows"), "got {:?}", os);
    }

    #[tokio::test]
    async fn missing_agent_yields_empty_os() {
        assert_eq!(os_seen_by_handler(None).await, "");
    }
}
