//! Fullscreen control for exam attempts.
//!
//! Requests go out through [`FullscreenProctor`]; changes the host reports on
//! its own arrive as `SessionCommand::FullscreenChanged` on the driver channel.

use async_trait::async_trait;

use crate::error::ProctorError;

#[async_trait]
pub trait FullscreenProctor: Send + Sync {
    /// Ask the host to enter fullscreen.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError` if the host refuses. Callers treat this as a
    /// degraded exam, not a failure.
    async fn enter(&self) -> Result<(), ProctorError>;

    /// Ask the host to leave fullscreen.
    ///
    /// # Errors
    ///
    /// Returns `ProctorError` if the host refuses.
    async fn exit(&self) -> Result<(), ProctorError>;
}

/// Proctor for hosts without a fullscreen concept; every request succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessProctor;

#[async_trait]
impl FullscreenProctor for HeadlessProctor {
    async fn enter(&self) -> Result<(), ProctorError> {
        Ok(())
    }

    async fn exit(&self) -> Result<(), ProctorError> {
        Ok(())
    }
}
