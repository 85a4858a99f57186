//! Error types and handling for address-formatter.
//!
//! Only configuration loading and data management can fail. Formatting a
//! set of components against a loaded configuration never returns an error.

/// Result type alias for address-formatter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for address-formatter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is structurally invalid (e.g. no `default` template)
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Error message
        message: String,
    },

    /// Data management errors
    #[error("Data error: {message}")]
    DataError {
        /// Error message
        message: String,
    },

    /// A replacement rule carries a pattern that does not compile
    #[error("Invalid replacement pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The offending pattern as written in the configuration
        pattern: String,
        /// Source error
        source: regex::Error,
    },

    /// YAML decoding errors
    #[error("YAML error: {source}")]
    YamlError {
        /// Source error
        #[from]
        source: serde_yaml::Error,
    },

    /// I/O errors
    #[error("I/O error: {source}")]
    IoError {
        /// Source error
        #[from]
        source: std::io::Error,
    },

    /// Network errors (for data downloads)
    #[cfg(feature = "runtime-data")]
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new data error
    pub fn data_error(message: impl Into<String>) -> Self {
        Self::DataError {
            message: message.into(),
        }
    }

    /// Create a new invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Create a new network error
    #[cfg(feature = "runtime-data")]
    pub fn network_error(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}
