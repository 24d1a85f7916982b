//! Error types for the engine and the rendering adapters.

/// Failure of a rendering adapter to produce a snapshot.
///
/// A render error fails the whole pipeline; it is never turned into a
/// partial rule-check result and adapters never retry on their own.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("render timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("renderer unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected HTTP status {code}")]
    Status { code: u16 },
}

/// All errors that can occur while configuring or driving the engine.
#[derive(thiserror::Error, Debug)]
pub enum AccessError {
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AccessResult<T> = Result<T, AccessError>;
