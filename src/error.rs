use thiserror::Error;

/// Failure of a single oracle call. One attempt only; the orchestrator owns retry.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation backend returned an empty response")]
    EmptyResponse,

    #[error("unrecognized response shape: {0}")]
    BadShape(String),

    #[error("backend reported an error: {0}")]
    Backend(String),
}

impl OracleError {
    /// Whether the failure was a transport timeout; retry log lines flag these so slow
    /// backends can be told apart from broken ones.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_can_be_timeouts() {
        assert!(!OracleError::EmptyResponse.is_timeout());
        assert!(!OracleError::BadShape("garbled".to_string()).is_timeout());
        assert!(!OracleError::Backend("down".to_string()).is_timeout());
    }
}
