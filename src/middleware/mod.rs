pub mod access_log;
pub mod basic_auth;
pub mod client_os;

pub use access_log::{access_log_middleware, AccessLogRecord, AccessLogSink, AccessLogger, StdoutSink};
pub use basic_auth::basic_auth_middleware;
pub use client_os::{client_os_middleware, detect_os};
