//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Error types for the service registry

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Error type for registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Backend I/O error: {0}")]
    BackendIo(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RegistryError {
    /// Whether the error came from the transport rather than from the data
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendIo(_) | Self::BackendUnavailable(_))
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::BackendIo(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::BackendIo(format!("unexpected backend response: {}", err))
    }
}

impl From<config::ConfigError> for RegistryError {
    fn from(err: config::ConfigError) -> Self {
        RegistryError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RegistryError::NotFound("services/api/10.0.0.1:8080".to_string());
        assert_eq!(error.to_string(), "Not found: services/api/10.0.0.1:8080");

        let error = RegistryError::MalformedMetadata("bad escape".to_string());
        assert_eq!(error.to_string(), "Malformed metadata: bad escape");
    }

    #[test]
    fn test_error_transient() {
        assert!(RegistryError::BackendIo("reset".to_string()).is_transient());
        assert!(RegistryError::BackendUnavailable("refused".to_string()).is_transient());
        assert!(!RegistryError::NotFound("x".to_string()).is_transient());
        assert!(!RegistryError::MalformedMetadata("x".to_string()).is_transient());
    }

    #[test]
    fn test_json_error_maps_to_backend_io() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: RegistryError = err.into();
        assert!(matches!(error, RegistryError::BackendIo(_)));
    }
}
