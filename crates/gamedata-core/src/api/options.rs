use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Result, ValidationError};

/// Per-call request options, layered over the client defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    /// Extra query pairs. When set, replaces the default list entirely.
    pub query: Option<Vec<(String, String)>>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            ValidationError::new(
                format!("headers.{}", name),
                "visible ASCII header value",
                format!("{:?}", value),
            )
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge `self` over `base`. Keys set here win; lists are replaced.
    pub fn merged_over(&self, base: &RequestOptions) -> RequestOptions {
        let mut headers = base.headers.clone();
        for name in self.headers.keys() {
            headers.remove(name);
            for value in self.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        RequestOptions {
            headers,
            query: self.query.clone().or_else(|| base.query.clone()),
            timeout: self.timeout.or(base.timeout),
        }
    }
}
