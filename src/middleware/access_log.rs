use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::context::RequestContext;

/// One line of the access log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogRecord {
    pub timestamp: DateTime<Utc>,
    /// Milliseconds spent in the wrapped handler
    pub latency: i64,
    pub path: String,
    pub os: String,
}

/// Destination for serialized access-log lines
pub trait AccessLogSink: Send + Sync {
    fn write_line(&self, line: &str) -> std::io::Result<()>;
}

pub struct StdoutSink;

impl AccessLogSink for StdoutSink {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", line)
    }
}

#[derive(Clone)]
pub struct AccessLogger {
    sink: Arc<dyn AccessLogSink>,
}

impl AccessLogger {
    pub fn new(sink: Arc<dyn AccessLogSink>) -> Self {
        Self { sink }
    }

    pub fn stdout() -> Self {
        Self::new(Arc::new(StdoutSink))
    }

    /// Write one JSON line. Failures go to the diagnostic log and are otherwise dropped.
    pub fn emit(&self, record: &AccessLogRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode access log record: {}", e);
                return;
            }
        };
        if let Err(e) = self.sink.write_line(&line) {
            tracing::error!("Failed to write access log record: {}", e);
        }
    }
}

impl Default for AccessLogger {
    fn default() -> Self {
        Self::stdout()
    }
}

/// Time the inner chain and emit an [`AccessLogRecord`] once it has produced a response.
///
/// The request context is attached here so the OS recorded by an inner
/// enricher is visible when the record is built.
pub async fn access_log_middleware(
    State(logger): State<AccessLogger>,
    mut request: Request,
    next: Next,
) -> Response {
    let timestamp = Utc::now();
    let started = Instant::now();
    let path = request.uri().path().to_string();
    let context = RequestContext::attach(request.extensions_mut());

    let response = next.run(request).await;

    let record = AccessLogRecord {
        timestamp,
        latency: started.elapsed().as_millis() as i64,
        path,
        os: context.os().to_string(),
    };
    logger.emit(&record);

    response
}
