//! Error handling for ledshows
//!
//! This module defines the error taxonomy shared by the driver, the show
//! lifecycle and the controller, plus a Result alias used throughout the crate.

use thiserror::Error;

/// Main error type for ledshows operations
#[derive(Error, Debug)]
pub enum StripError {
    /// The strip cannot run a show, e.g. it has fewer LEDs than the show needs
    #[error("Invalid strip: {0}")]
    InvalidStrip(String),

    /// A driver or show cannot operate with the given settings
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A show parameter is unknown, missing or out of range
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    /// No show is registered under this name
    #[error("Show \"{0}\" was not found")]
    UnknownShow(String),

    /// Errors related to loading or parsing the configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to the control channel
    #[error("Control channel error: {0}")]
    Channel(String),

    /// The running show was asked to stop, or its hardware lease was revoked
    #[error("Show cancelled")]
    Cancelled,

    /// IO errors, mostly from the SPI bus
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<StripError>,
    },
}

impl StripError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        StripError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (possibly wrapped in context) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            StripError::Cancelled => true,
            StripError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Rejection reasons for a single show parameter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// The show has no parameter with this name
    #[error("Parameter \"{0}\" is unknown!")]
    Unknown(String),

    /// A parameter the show needs has no value
    #[error("Parameter \"{0}\" is missing!")]
    Missing(String),

    /// The value has the wrong shape or is out of range
    #[error("Parameter \"{name}\" {reason} (got: {got})")]
    Invalid {
        name: String,
        reason: String,
        got: String,
    },
}

impl ParameterError {
    pub fn unknown(name: impl Into<String>) -> Self {
        ParameterError::Unknown(name.into())
    }

    pub fn missing(name: impl Into<String>) -> Self {
        ParameterError::Missing(name.into())
    }

    pub fn invalid(name: impl Into<String>, reason: impl Into<String>, got: impl ToString) -> Self {
        ParameterError::Invalid {
            name: name.into(),
            reason: reason.into(),
            got: got.to_string(),
        }
    }

    /// Name of the offending parameter
    pub fn name(&self) -> &str {
        match self {
            ParameterError::Unknown(name) | ParameterError::Missing(name) => name,
            ParameterError::Invalid { name, .. } => name,
        }
    }
}

/// Result type alias for ledshows operations
pub type Result<T> = std::result::Result<T, StripError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| StripError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| StripError::Io(e).with_context(f()))
    }
}
