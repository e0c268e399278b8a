use thiserror::Error;

/// Errors from a model backend.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The model could not be downloaded or loaded.
    #[error("load: {0}")]
    Load(String),

    /// A network error occurred while talking to the backend.
    #[error("network: {0}")]
    Network(String),

    /// The backend returned an error response.
    #[error("backend api: {0}")]
    Api(String),

    /// A backend response could not be parsed.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// The stream terminated with an error after it was opened.
    #[error("stream: {0}")]
    Stream(String),
}
