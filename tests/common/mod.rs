#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use todo_api_rust::config::AuthConfig;
use todo_api_rust::database::manager::DatabaseManager;
use todo_api_rust::handlers::AppState;
use todo_api_rust::middleware::{AccessLogRecord, AccessLogSink, AccessLogger};
use todo_api_rust::server;
use todo_api_rust::services::TodoService;

pub const USER_ID: &str = "integration";
pub const PASSWORD: &str = "p@ss:word";

/// Collects access-log lines instead of printing them
#[derive(Default)]
pub struct CapturedLog {
    lines: Mutex<Vec<String>>,
}

impl AccessLogSink for CapturedLog {
    fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }
}

impl CapturedLog {
    pub fn records(&self) -> Vec<AccessLogRecord> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|line| serde_json::from_str(line).expect("access log line is not a record"))
            .collect()
    }
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub access_log: Arc<CapturedLog>,
}

impl TestServer {
    /// Start the full router on a free port, backed by a private in-memory database
    async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let pool = DatabaseManager::memory_pool().await?;
        DatabaseManager::init_schema(&pool).await?;

        let access_log = Arc::new(CapturedLog::default());
        let app = server::app(
            AppState::new(TodoService::new(pool)),
            Arc::new(AuthConfig::new(USER_ID, PASSWORD)),
            AccessLogger::new(access_log.clone()),
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { port, base_url, access_log })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/healthz", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Each test gets its own server; the server lives on the test's runtime.
pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}
