use thiserror::Error;

/// Result type for splitter operations
pub type Result<T> = std::result::Result<T, SplitterError>;

/// Errors that can occur while setting up a splitter.
///
/// Decomposition itself never fails; these only cover configuration and
/// oracle construction.
#[derive(Error, Debug)]
pub enum SplitterError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Tokenizer could not be loaded
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SplitterError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a tokenizer error
    pub fn tokenizer(msg: impl Into<String>) -> Self {
        Self::Tokenizer(msg.into())
    }
}
