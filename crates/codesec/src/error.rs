//! Error types for code security API calls.
//!
//! Errors are categorized so callers can decide whether a failure should be
//! treated as a skip or should stop a whole batch.

use std::fmt;

/// Result type alias for code security operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors.
    Network,
    /// Organization, configuration or enterprise not found.
    NotFound,
    /// Missing or insufficient credentials.
    Permission,
    /// Response body could not be understood.
    Format,
    /// The requested state already exists.
    Conflict,
    /// A feature the request depends on is not available on this instance.
    Unavailable,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error means the work is effectively already done.
    #[must_use]
    pub fn is_skip_equivalent(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    /// Whether the same failure should be expected for every other
    /// organization on the instance.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::NotFound => "Resource not found",
            Self::Permission => "Permission denied",
            Self::Format => "Unexpected API response",
            Self::Conflict => "Already exists",
            Self::Unavailable => "Feature unavailable",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your connection to the GitHub host and try again",
            Self::NotFound => "Verify the organization and configuration names",
            Self::Permission => "Check that the token has the admin:org scope and you are an owner",
            Self::Format => "The server may be running an unsupported version",
            Self::Conflict => "Use --force to replace the existing configuration",
            Self::Unavailable => {
                "Remove the Dependabot settings, enable Dependabot on the instance, or pass \
                 --dependabot-alerts-available=false / --dependabot-security-updates-available=false"
            }
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors returned by [`crate::CodeSecurityApi`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
    },

    /// The API answered with a non-success status.
    #[error("GitHub API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A configuration with the same name is already present.
    #[error("configuration '{name}' already exists in organization '{org}'")]
    ConfigurationExists {
        /// Configuration name.
        name: String,
        /// Organization login.
        org: String,
    },

    /// The instance rejected a setting because the feature is not enabled.
    #[error("{feature} is not available for organization '{org}'; this GitHub instance does not support it")]
    FeatureUnavailable {
        /// Human readable feature name.
        feature: String,
        /// Organization login.
        org: String,
    },

    /// No usable credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an API status error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { .. } => ErrorCategory::Network,
            Error::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Permission,
                404 => ErrorCategory::NotFound,
                429 | 500..=599 => ErrorCategory::Network,
                _ => ErrorCategory::Other,
            },
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::ConfigurationExists { .. } => ErrorCategory::Conflict,
            Error::FeatureUnavailable { .. } => ErrorCategory::Unavailable,
            Error::Auth(_) => ErrorCategory::Permission,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// HTTP status of the failed call, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[must_use]
    pub fn is_skip_equivalent(&self) -> bool {
        self.category().is_skip_equivalent()
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Api {
                status: code,
                message: format!("HTTP {}", code),
            },
            other => Self::Http {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_flags() {
        assert!(ErrorCategory::Conflict.is_skip_equivalent());
        assert!(!ErrorCategory::Unavailable.is_skip_equivalent());

        assert!(ErrorCategory::Unavailable.is_fatal());
        assert!(!ErrorCategory::Permission.is_fatal());
        assert!(!ErrorCategory::Other.is_fatal());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        for category in [
            ErrorCategory::Network,
            ErrorCategory::NotFound,
            ErrorCategory::Permission,
            ErrorCategory::Format,
            ErrorCategory::Conflict,
            ErrorCategory::Unavailable,
            ErrorCategory::Other,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
        assert!(format!("{}", ErrorCategory::Network).contains("Network"));
    }

    #[test]
    fn test_api_status_categories() {
        assert_eq!(Error::api(401, "Bad credentials").category(), ErrorCategory::Permission);
        assert_eq!(Error::api(403, "Forbidden").category(), ErrorCategory::Permission);
        assert_eq!(Error::api(404, "Not Found").category(), ErrorCategory::NotFound);
        assert_eq!(Error::api(502, "Bad Gateway").category(), ErrorCategory::Network);
        assert_eq!(Error::api(429, "rate limited").category(), ErrorCategory::Network);
        assert_eq!(Error::api(422, "Validation Failed").category(), ErrorCategory::Other);
    }

    #[test]
    fn test_configuration_exists_is_skip_equivalent() {
        let err = Error::ConfigurationExists {
            name: "baseline".to_string(),
            org: "octo-org".to_string(),
        };
        assert!(err.is_skip_equivalent());
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "configuration 'baseline' already exists in organization 'octo-org'"
        );
    }

    #[test]
    fn test_feature_unavailable_is_fatal() {
        let err = Error::FeatureUnavailable {
            feature: "Dependabot Alerts".to_string(),
            org: "octo-org".to_string(),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Dependabot Alerts"));
        assert!(err.to_string().contains("octo-org"));
    }

    #[test]
    fn test_status_and_not_found() {
        assert!(Error::api(404, "Not Found").is_not_found());
        assert!(!Error::api(500, "oops").is_not_found());
        assert_eq!(Error::InvalidResponse("x".into()).status(), None);
        let http = Error::Http {
            message: "reset".to_string(),
        };
        assert_eq!(http.status(), None);
        assert_eq!(http.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = parse.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
