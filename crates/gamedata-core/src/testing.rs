//! In-memory transport for tests.
//!
//! `MockTransport` answers requests from a table keyed by the full request
//! URL (query included) and records every request it sees. A request for a
//! URL with no scripted answer fails at the transport level.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{HttpRequest, HttpResponse, Transport};
use crate::error::BoxError;

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: Vec<u8> },
    Fail { kind: std::io::ErrorKind, message: String },
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<String, Scripted>,
    requests: Vec<HttpRequest>,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `status` and `body`, replacing any earlier answer.
    pub fn respond_json(&self, url: &str, status: u16, body: &str) {
        self.lock().routes.insert(
            url.to_string(),
            Scripted::Respond {
                status,
                body: body.as_bytes().to_vec(),
            },
        );
    }

    /// Fail requests to `url` with a transport error shaped like `error`.
    pub fn fail_with(&self, url: &str, error: std::io::Error) {
        self.lock().routes.insert(
            url.to_string(),
            Scripted::Fail {
                kind: error.kind(),
                message: error.to_string(),
            },
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BoxError> {
        let scripted = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.routes.get(request.url.as_str()).cloned()
        };

        match scripted {
            Some(Scripted::Respond { status, body }) => Ok(HttpResponse {
                status,
                status_text: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or_default()
                    .to_string(),
                body,
            }),
            Some(Scripted::Fail { kind, message }) => {
                Err(Box::new(std::io::Error::new(kind, message)))
            }
            None => Err(format!("no scripted response for {}", request.url).into()),
        }
    }
}
