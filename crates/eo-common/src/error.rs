use thiserror::Error;

/// Result type alias for EO store operations
pub type EoResult<T> = Result<T, EoError>;

/// Errors that can occur while exporting, storing or fetching products
#[derive(Error, Debug)]
pub enum EoError {
    // === Storage Errors ===
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // === Export Errors ===
    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // === Fetch Errors ===
    #[error("Fetch failed: {0}")]
    Fetch(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EoError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether retrying the same operation can reasonably succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<std::io::Error> for EoError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for EoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for EoError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML error: {}", err))
    }
}
