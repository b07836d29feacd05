//! Lift events and the notification sink.

use crate::identifiers::{ScopeId, SubjectId, SuspensionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a restriction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiftCause {
    /// The suspension reached its expiry timestamp
    Expired,
    /// An administrative actor lifted it early
    Manual,
}

impl fmt::Display for LiftCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "expired"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Event emitted after a suspension is lifted. Collaborators (log channels,
/// audit panels) consume these; delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiftNotice {
    /// Record id of the lifted suspension
    pub id: SuspensionId,
    /// Scope the restriction applied within
    pub scope: ScopeId,
    /// The formerly restricted member
    pub subject: SubjectId,
    /// Automatic expiry or manual override
    pub cause: LiftCause,
    /// Reason attached to the lift (the original suspension reason for
    /// automatic expiry, the override reason for manual lifts)
    pub reason: String,
    /// When the store recorded the lift
    pub lifted_at: DateTime<Utc>,
}

/// Consumer of lift events. Implementations own any user-facing messaging;
/// the core does not care whether delivery succeeded.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a lift notice. Infallible from the caller's perspective;
    /// implementations swallow and log their own delivery errors.
    async fn notify(&self, notice: LiftNotice);
}
