use thiserror::Error;

/// Failures reported by a renderer (browser engine) implementation.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Renderer not ready")]
    NotReady,

    #[error("Launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Frame {0} is not accessible")]
    FrameUnavailable(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
