use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_PATH: &str = ".sqlite3/todo.db";

/// Development-only credentials. Never rely on these outside a local machine.
pub const DEFAULT_AUTH_USER_ID: &str = "test";
pub const DEFAULT_AUTH_PASSWORD: &str = "test";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub statement_timeout_ms: u64,
    pub max_page_size: i64,
}

/// The single shared basic-auth credential pair.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub user_id: String,
    pub password: String,
}

// Keep the password out of Debug output, it ends up in startup logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

impl AuthConfig {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: password.into(),
        }
    }

    pub fn uses_default_credentials(&self) -> bool {
        self.user_id == DEFAULT_AUTH_USER_ID || self.password == DEFAULT_AUTH_PASSWORD
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_USER_ID, DEFAULT_AUTH_PASSWORD)
    }
}

impl DatabaseConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: DEFAULT_PORT,
                shutdown_grace_secs: 10,
            },
            database: DatabaseConfig {
                path: PathBuf::from(DEFAULT_DB_PATH),
                max_connections: 5,
                statement_timeout_ms: 5_000,
                max_page_size: 100,
            },
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(port) = non_empty_var("PORT").and_then(|v| parse_port(&v)) {
            self.server.port = port;
        }
        if let Some(v) = non_empty_var("SHUTDOWN_GRACE_SECS") {
            self.server.shutdown_grace_secs = v.parse().unwrap_or(self.server.shutdown_grace_secs);
        }

        // Database overrides
        if let Some(v) = non_empty_var("DB_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = non_empty_var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = non_empty_var("DATABASE_STATEMENT_TIMEOUT_MS") {
            self.database.statement_timeout_ms = v.parse().unwrap_or(self.database.statement_timeout_ms);
        }
        if let Some(v) = non_empty_var("TODO_MAX_PAGE_SIZE") {
            self.database.max_page_size = v.parse().unwrap_or(self.database.max_page_size);
        }

        // Auth overrides
        if let Some(v) = non_empty_var("BASIC_AUTH_USER_ID") {
            self.auth.user_id = v;
        }
        if let Some(v) = non_empty_var("BASIC_AUTH_PASSWORD") {
            self.auth.password = v;
        }

        self
    }
}

// An empty variable counts as unset.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Accepts both `8080` and the `:8080` listen-address form.
pub fn parse_port(value: &str) -> Option<u16> {
    value.trim().trim_start_matches(':').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, PathBuf::from(".sqlite3/todo.db"));
        assert_eq!(config.auth, AuthConfig::new("test", "test"));
        assert!(config.auth.uses_default_credentials());
    }

    #[test]
    fn test_parse_port_accepts_listen_address_form() {
        assert_eq!(parse_port("8080"), Some(8080));
        assert_eq!(parse_port(":9090"), Some(9090));
        assert_eq!(parse_port("not-a-port"), None);
    }

    #[test]
    fn test_auth_debug_hides_password() {
        let auth = AuthConfig::new("alice", "s3cret");
        let rendered = format!("{:?}", auth);
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
    }
}
