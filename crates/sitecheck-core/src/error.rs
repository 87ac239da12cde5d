//! Error taxonomy shared by the store, query and detector layers

use std::time::Duration;

/// Failure classes as seen by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ClientInput,
    NotFound,
    Dependency,
    ServerConfiguration,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Required credentials or identifiers are absent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed or missing input fields
    #[error("validation error: {0}")]
    Validation(String),

    /// The detector answered with a non-success status. The body is kept verbatim.
    #[error("detector returned HTTP {status}")]
    Dependency { status: u16, body: String },

    #[error("detector did not answer within {0:?}")]
    DependencyTimeout(Duration),

    /// The detector could not be reached at all
    #[error("detector transport error: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Validation error listing every missing field
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::Validation(format!("Missing required fields: {}", fields.join(", ")))
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration(_) => ErrorClass::ServerConfiguration,
            Self::Validation(_) => ErrorClass::ClientInput,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Dependency { .. } | Self::DependencyTimeout(_) | Self::Transport(_) => {
                ErrorClass::Dependency
            }
        }
    }

    /// HTTP-style status for surfacing the error to a transport layer
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Configuration(_) => 500,
            Self::Dependency { .. } | Self::Transport(_) => 502,
            Self::DependencyTimeout(_) => 504,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_names_fields() {
        let err = CoreError::missing_fields(&["filename", "detections"]);
        assert_eq!(
            err.to_string(),
            "validation error: Missing required fields: filename, detections"
        );
        assert_eq!(err.class(), ErrorClass::ClientInput);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_dependency_keeps_body() {
        let err = CoreError::Dependency {
            status: 403,
            body: "{\"message\":\"Forbidden\"}".to_string(),
        };
        assert_eq!(err.class(), ErrorClass::Dependency);
        assert_eq!(err.status_code(), 502);
        if let CoreError::Dependency { body, .. } = err {
            assert!(body.contains("Forbidden"));
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            CoreError::Configuration("x".into()).class(),
            ErrorClass::ServerConfiguration
        );
        assert_eq!(CoreError::NotFound("det_1".into()).status_code(), 404);
        assert_eq!(
            CoreError::DependencyTimeout(Duration::from_secs(30)).status_code(),
            504
        );
    }
}
