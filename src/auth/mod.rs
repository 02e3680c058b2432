use axum::http::{header, HeaderMap};
use base64::Engine as _;

use crate::config::AuthConfig;

/// Username/password pair presented with the `Basic` scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BasicAuthError {
    #[error("Missing Authorization header")]
    Missing,
    #[error("Authorization header must use Basic scheme")]
    WrongScheme,
    #[error("Malformed Basic credentials")]
    Malformed,
}

impl BasicCredentials {
    /// Extract credentials from the `Authorization` header
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, BasicAuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(BasicAuthError::Missing)?
            .to_str()
            .map_err(|_| BasicAuthError::Malformed)?;

        Self::parse(value)
    }

    /// Parse an `Authorization` header value such as `Basic dGVzdDp0ZXN0`
    pub fn parse(value: &str) -> Result<Self, BasicAuthError> {
        let (scheme, encoded) = value.trim().split_once(' ').ok_or(BasicAuthError::WrongScheme)?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return Err(BasicAuthError::WrongScheme);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| BasicAuthError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| BasicAuthError::Malformed)?;

        // The password may itself contain ':'
        let (user_id, password) = decoded.split_once(':').ok_or(BasicAuthError::Malformed)?;

        Ok(Self {
            user_id: user_id.to_string(),
            password: password.to_string(),
        })
    }

    /// Verbatim comparison against the configured pair
    pub fn matches(&self, config: &AuthConfig) -> bool {
        self.user_id == config.user_id && self.password == config.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn encode(raw: &str) -> String {
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }

    #[test]
    fn parses_basic_credentials() {
        let creds = BasicCredentials::parse(&encode("test:test")).unwrap();
        assert_eq!(creds.user_id, "test");
        assert_eq!(creds.password, "test");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let value = encode("a:b").replacen("Basic", "basic", 1);
        assert!(BasicCredentials::parse(&value).is_ok());
    }

    #[test]
    fn password_may_contain_colon() {
        let creds = BasicCredentials::parse(&encode("alice:pa:ss")).unwrap();
        assert_eq!(creds.user_id, "alice");
        assert_eq!(creds.password, "pa:ss");
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(BasicCredentials::parse("Bearer abc"), Err(BasicAuthError::WrongScheme));
        assert_eq!(BasicCredentials::parse("Basic"), Err(BasicAuthError::WrongScheme));
        assert_eq!(BasicCredentials::parse("Basic !!!"), Err(BasicAuthError::Malformed));
        assert_eq!(BasicCredentials::parse(&encode("no-colon")), Err(BasicAuthError::Malformed));
    }

    #[test]
    fn missing_header_is_reported() {
        let headers = HeaderMap::new();
        assert_eq!(BasicCredentials::from_headers(&headers), Err(BasicAuthError::Missing));
    }

    #[test]
    fn reads_from_headers_and_matches_config() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&encode("test:test")).unwrap());

        let creds = BasicCredentials::from_headers(&headers).unwrap();
        assert!(creds.matches(&AuthConfig::new("test", "test")));
        assert!(!creds.matches(&AuthConfig::new("test", "TEST")));
        assert!(!creds.matches(&AuthConfig::new("other", "test")));
    }
}
