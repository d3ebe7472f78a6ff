use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Could not obtain connection to TED: {0}")]
    Unreachable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single request against the device API.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request failed with status {status} ({reason})")]
    Status { status: u16, reason: String },
    #[error("could not decode response: {message}")]
    Decode { status: u16, message: String },
}

impl TransportError {
    /// HTTP status of the failed call, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } | TransportError::Decode { status, .. } => {
                Some(*status)
            }
            TransportError::InvalidUrl(_) | TransportError::Network(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_status() {
        let err = TransportError::Status {
            status: 503,
            reason: "Service Unavailable".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(
            err.to_string(),
            "request failed with status 503 (Service Unavailable)"
        );

        let err = TransportError::Network("connection refused".into());
        assert_eq!(err.status(), None);
    }
}
