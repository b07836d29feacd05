//! Platform restriction gateway.
//!
//! The suspension core never talks to the chat platform directly; it is
//! handed an implementation of [`RestrictionGateway`] at construction.
//! Gateway failures are deliberately infectious nowhere: the expiry path
//! downgrades them to a warning outcome and still reconciles the store.

use crate::identifiers::{ScopeId, SubjectId};
use async_trait::async_trait;

/// Failure of the external lift action. Consumed inside the expiry path;
/// never crosses the core's public surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LiftError {
    /// The platform rejected or failed the lift action
    #[error("lift failed: {message}")]
    Failed {
        /// Error message from the platform
        message: String,
    },

    /// The platform did not answer within the bounded timeout
    #[error("lift timed out")]
    TimedOut,
}

impl LiftError {
    /// Create a failure with a platform-supplied message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Capability to remove an active restriction on a subject within a scope.
///
/// Implementations wrap the platform client (for a chat platform this is
/// the "clear the member's timeout" API call). The call should be bounded;
/// the core additionally applies its own timeout.
#[async_trait]
pub trait RestrictionGateway: Send + Sync {
    /// Remove the platform-side restriction on `subject` within `scope`.
    async fn lift_restriction(
        &self,
        scope: ScopeId,
        subject: SubjectId,
    ) -> std::result::Result<(), LiftError>;
}
