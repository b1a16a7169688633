//! Error types for the geolocate system
//!
//! Every lookup failure surfaces as one of these variants. Adapters never
//! swallow backend errors and never return a half-populated record.

use thiserror::Error;

/// Result type alias for geolocate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the geolocate system
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed IP literal, detected before any I/O
    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    /// A required provider secret is absent from configuration
    #[error("Missing credential for provider {provider}: {field} is required")]
    MissingCredential {
        /// Provider name
        provider: String,
        /// Name of the missing configuration key
        field: String,
    },

    /// The backend answered but signaled failure
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Network-level failure reaching the backend
    #[error("Transport error ({provider}): {message}")]
    Transport {
        /// Provider name
        provider: String,
        /// Human-readable cause
        message: String,
    },

    /// The backend answered successfully but omitted essential fields
    #[error("Incomplete data from {provider}: missing {}", missing.join(", "))]
    IncompleteData {
        /// Provider name
        provider: String,
        /// Canonical names of the missing fields
        missing: Vec<String>,
    },

    /// The address is valid but absent from the local database
    #[error("IP address not found in database: {0}")]
    AddressNotFound(String),

    /// The requested provider name is not configured
    #[error("Geolocation driver [{0}] is not defined.")]
    UndefinedDriver(String),

    /// The configured backend has no registered factory
    #[error("Geolocation driver [{0}] is not supported.")]
    UnsupportedDriver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache store errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(ip: impl Into<String>) -> Self {
        Self::InvalidAddress(ip.into())
    }

    /// Create a missing credential error
    pub fn missing_credential(provider: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.into(),
            field: field.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an incomplete data error
    pub fn incomplete(provider: impl Into<String>, missing: Vec<String>) -> Self {
        Self::IncompleteData {
            provider: provider.into(),
            missing,
        }
    }

    /// Create an address-not-found error
    pub fn address_not_found(ip: impl Into<String>) -> Self {
        Self::AddressNotFound(ip.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Whether the error was raised before any backend was contacted
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::UndefinedDriver(_)
                | Self::UnsupportedDriver(_)
                | Self::Config(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
