//! Client configuration.
//!
//! `ClientConfig` holds the base URLs, default request headers and timeout
//! shared by every request. It is built once by the caller and handed to
//! [`FetchClient`](crate::api::FetchClient); nothing here is global.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::{Result, ValidationError};
use crate::notice::Language;

/// Base URL for the Enka.Network showcase API
pub const ENKA_BASE_URL: &str = "https://enka.network/";

/// Base URL for the announcement SDK endpoints
pub const NOTICE_BASE_URL: &str =
    "https://sg-hk4e-api.hoyoverse.com/common/hk4e_global/announcement/api/";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub enka_base_url: Url,
    pub notice_base_url: Url,
    pub default_headers: HeaderMap,
    pub timeout: Duration,
    pub language: Language,
}

impl ClientConfig {
    pub fn default_user_agent() -> String {
        format!("gamedata/{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn with_enka_base_url(mut self, url: &str) -> Result<Self> {
        self.enka_base_url = parse_base_url("enka_base_url", url)?;
        Ok(self)
    }

    pub fn with_notice_base_url(mut self, url: &str) -> Result<Self> {
        self.notice_base_url = parse_base_url("notice_base_url", url)?;
        Ok(self)
    }

    pub fn with_user_agent(self, user_agent: &str) -> Result<Self> {
        self.with_header(header::USER_AGENT, user_agent)
    }

    /// Add or replace a default header sent with every request.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            ValidationError::new(
                format!("default_headers.{}", name),
                "visible ASCII header value",
                format!("{:?}", value),
            )
        })?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&Self::default_user_agent()) {
            default_headers.insert(header::USER_AGENT, value);
        }

        Self {
            enka_base_url: Url::parse(ENKA_BASE_URL).expect("valid constant URL"),
            notice_base_url: Url::parse(NOTICE_BASE_URL).expect("valid constant URL"),
            default_headers,
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            language: Language::default(),
        }
    }
}

/// Parse a base URL, making sure relative joins append to its path.
fn parse_base_url(field: &str, raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)
        .map_err(|e| ValidationError::new(field, "absolute URL", format!("{:?} ({})", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ValidationError::new(field, "base URL", raw).into());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_user_agent() {
        let config = ClientConfig::default();
        let ua = config.default_headers.get(header::USER_AGENT).unwrap();
        assert!(ua.to_str().unwrap().starts_with("gamedata/"));
        assert_eq!(config.enka_base_url.as_str(), ENKA_BASE_URL);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::default()
            .with_enka_base_url("http://localhost:8080/mirror")
            .unwrap();
        assert_eq!(config.enka_base_url.as_str(), "http://localhost:8080/mirror/");
        let joined = config.enka_base_url.join("api/uid/800000000/").unwrap();
        assert_eq!(joined.as_str(), "http://localhost:8080/mirror/api/uid/800000000/");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = ClientConfig::default().with_notice_base_url("not a url").unwrap_err();
        assert!(matches!(err, crate::Error::Validation(ref v) if v.path == "notice_base_url"));
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let err = ClientConfig::default().with_user_agent("bad\nagent").unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }
}
