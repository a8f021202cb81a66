/// Convenience result type used across the compositor.
pub type CompositorResult<T> = Result<T, CompositorError>;

/// Top-level error taxonomy used by compositor APIs.
///
/// Degenerate pixel data (empty patches, disjoint extents, ranks without
/// contributions) is never an error; it is skipped as "no contribution".
#[derive(thiserror::Error, Debug)]
pub enum CompositorError {
    /// Invalid caller-provided data (buffer shapes, region maps, tags).
    #[error("validation error: {0}")]
    Validation(String),

    /// The message-passing substrate failed to deliver or decode a message.
    #[error("communication error: {0}")]
    Communication(String),

    /// A peer sent data that disagrees with what it announced.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A strategy was selected that this build does not provide.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The composited image was requested when none is pending.
    #[error("finalize error: {0}")]
    Finalize(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositorError {
    /// Build a [`CompositorError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompositorError::Communication`] value.
    pub fn communication(msg: impl Into<String>) -> Self {
        Self::Communication(msg.into())
    }

    /// Build a [`CompositorError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`CompositorError::Unavailable`] value.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Build a [`CompositorError::Finalize`] value.
    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::Finalize(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
