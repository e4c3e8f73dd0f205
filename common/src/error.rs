use std::time::Duration;

use thiserror::Error;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Upstream backend error: {0}")]
    UpstreamBackend(String),
    #[error("Backend rejected a conflicting request: {0}")]
    BackendConflict(String),
    #[error("Backend call timed out after {0:?}")]
    BackendTimeout(Duration),
    #[error("Backend request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Upstream storage error: {0}")]
    UpstreamStorage(#[from] object_store::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_convert() {
        let err: AppError = object_store::Error::NotFound {
            path: "federal/a.pdf".into(),
            source: "missing".into(),
        }
        .into();
        assert!(matches!(err, AppError::UpstreamStorage(_)));
    }

    #[test]
    fn timeout_message_names_the_bound() {
        let err = AppError::BackendTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Backend call timed out after 30s");
    }
}
