use std::fmt;

use thiserror::Error;

/// Boxed transport failure, kept as the original error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    ContentNotFound(#[from] ContentNotFoundError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("Remote API returned retcode {retcode}: {message}")]
    Remote { retcode: i64, message: String },

    /// DNS, connect, TLS or timeout failure from the transport, unchanged.
    #[error(transparent)]
    Transport(BoxError),
}

impl Error {
    /// The underlying transport error, if this is a transport failure.
    pub fn transport_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Transport(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Malformed input to a public entry point or malformed remote payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed at {path}: expected {expected}, got {actual}")]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationError {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Remote service a request was addressed to. Used to describe status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Enka,
    Notice,
    Other,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Enka => write!(f, "Enka.Network"),
            Service::Notice => write!(f, "announcement API"),
            Service::Other => write!(f, "remote API"),
        }
    }
}

/// Non-success HTTP response.
#[derive(Error, Debug, Clone)]
#[error("{service} responded {status} {status_text}: {description}")]
pub struct NetworkError {
    pub service: Service,
    pub status: u16,
    pub status_text: String,
    pub description: String,
    pub body: String,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl NetworkError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(service: Service, status: u16, status_text: &str, body: &str) -> Self {
        let description = match (service, status) {
            (Service::Enka, 400) => "Wrong UID format",
            (Service::Enka, 404) => "Player does not exist",
            (Service::Enka, 424) => "Game maintenance or servers broken after an update",
            (Service::Enka, 429) => "Rate-limited",
            (Service::Enka, 500) => "General server error",
            (Service::Enka, 503) => "Service unavailable",
            (_, 401) => "Unauthorized",
            (_, 403) => "Access denied",
            (_, 404) => "Resource not found",
            (_, 429) => "Rate limited - please wait before retrying",
            (_, 500..=599) => "Server error",
            _ => "Unexpected response status",
        };

        Self {
            service,
            status,
            status_text: status_text.to_string(),
            description: description.to_string(),
            body: Self::truncate_body(body),
        }
    }
}

/// A summary entry references detail content that was not returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Content not found for key {key}")]
pub struct ContentNotFoundError {
    pub key: String,
}

impl ContentNotFoundError {
    pub fn new(key: impl fmt::Display) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

/// Precondition failures raised by a manager before any network access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagerError {
    #[error("The UID format is not correct ({0})")]
    InvalidUid(String),

    #[error("The username format is not correct ({0})")]
    InvalidUsername(String),

    #[error("The profile hash format is not correct ({0})")]
    InvalidHash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_enka_descriptions() {
        let err = NetworkError::from_status(Service::Enka, 424, "Failed Dependency", "");
        assert_eq!(err.status, 424);
        assert!(err.description.contains("maintenance"));

        let err = NetworkError::from_status(Service::Notice, 404, "Not Found", "");
        assert_eq!(err.description, "Resource not found");
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let err = NetworkError::from_status(Service::Other, 500, "Internal Server Error", &long);
        assert!(err.body.contains("truncated"));
        assert!(err.body.contains(&format!("{} total bytes", long.len())));

        let err = NetworkError::from_status(Service::Other, 500, "Internal Server Error", "oops");
        assert_eq!(err.body, "oops");
    }

    #[test]
    fn test_transport_error_is_not_rewrapped() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = Error::Transport(Box::new(io));
        // transparent: message is the original one
        assert_eq!(err.to_string(), "reset by peer");
        let source = err.transport_source().expect("transport error");
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("$.uid", "integer", "string");
        assert_eq!(
            err.to_string(),
            "Validation failed at $.uid: expected integer, got string"
        );
    }
}
