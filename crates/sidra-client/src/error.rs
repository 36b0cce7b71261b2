use thiserror::Error;

/// Failures talking to the IBGE API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-2xx status.
    #[error("Upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport-level failure: connect, timeout, DNS, broken stream.
    #[error("Upstream request failed: {0}")]
    Network(String),

    /// The upstream body was not the JSON we expected.
    #[error("Upstream response could not be decoded: {0}")]
    Decode(String),

    /// The configured base URL is unusable.
    #[error("Invalid upstream base URL: {0}")]
    InvalidBaseUrl(String),
}

impl UpstreamError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn invalid_base_url(message: impl Into<String>) -> Self {
        Self::InvalidBaseUrl(message.into())
    }

    /// Status code carried by the error, when the upstream answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.upstream_status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_carries_code() {
        let err = UpstreamError::status(404, "not there");
        assert_eq!(err.upstream_status(), Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Upstream returned status 404: not there");
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = UpstreamError::network("connection refused");
        assert_eq!(err.upstream_status(), None);
        assert!(!err.is_not_found());
    }
}
