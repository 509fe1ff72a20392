//! Fetch client for the remote game-data services.
//!
//! `FetchClient` performs one GET per call, merging the process defaults from
//! [`ClientConfig`] with caller-supplied [`RequestOptions`], and classifies
//! non-success statuses into [`NetworkError`]. It never retries.

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::decode::{decode, Decode};
use crate::error::{Error, NetworkError, Result, Service};

use super::options::RequestOptions;
use super::transport::{HttpRequest, ReqwestTransport, Transport};

/// Clone is cheap - the transport and config are shared.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    defaults: RequestOptions,
}

impl FetchClient {
    /// Create a client backed by `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(config.timeout).map_err(|e| Error::Transport(Box::new(e)))?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let defaults = RequestOptions {
            headers: config.default_headers.clone(),
            query: None,
            timeout: Some(config.timeout),
        };

        Self {
            transport,
            config: Arc::new(config),
            defaults,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issue a GET and return the raw body of a successful response.
    pub async fn request(
        &self,
        service: Service,
        url: Url,
        options: &RequestOptions,
    ) -> Result<Vec<u8>> {
        let merged = options.merged_over(&self.defaults);

        let mut url = url;
        if let Some(ref pairs) = merged.query {
            override_query(&mut url, pairs);
        }

        let request = HttpRequest {
            url: url.clone(),
            headers: merged.headers,
            timeout: merged.timeout,
        };

        let response = self
            .transport
            .send(request)
            .await
            .map_err(Error::Transport)?;

        debug!(url = %url, status = response.status, bytes = response.body.len(), "Received response");

        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            warn!(url = %url, status = response.status, "Request failed");
            return Err(NetworkError::from_status(
                service,
                response.status,
                &response.status_text,
                &body,
            )
            .into());
        }

        Ok(response.body)
    }

    /// Issue a GET and decode the body as `T`.
    pub async fn get_decoded<T: Decode>(
        &self,
        service: Service,
        url: Url,
        options: &RequestOptions,
    ) -> Result<T> {
        let body = self.request(service, url, options).await?;
        Ok(decode(&body)?)
    }
}

/// Append `pairs` to the query of `url`, dropping any existing pair whose
/// key the caller supplies.
fn override_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !pairs.iter().any(|(k, _)| k == key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    url.query_pairs_mut()
        .extend_pairs(kept.iter())
        .extend_pairs(pairs.iter());
}
