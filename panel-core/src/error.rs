//! Error types for camera panel operations.
//!
//! All failures are terminal at the operation boundary: callers map them to a
//! status message for the operator and log the cause, they never retry.

/// Error type for camera panel operations.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server returned an error status with an undecodable body
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },
    /// Parameter is not described by the active schema
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
    /// A fetched snapshot contained no parameter the active schema knows
    #[error("Snapshot contains no recognized parameters")]
    EmptySnapshot,
}

#[cfg(target_arch = "wasm32")]
impl From<gloo_net::Error> for PanelError {
    fn from(err: gloo_net::Error) -> Self {
        PanelError::Http(err.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl From<reqwest::Error> for PanelError {
    fn from(err: reqwest::Error) -> Self {
        PanelError::Http(err.to_string())
    }
}
