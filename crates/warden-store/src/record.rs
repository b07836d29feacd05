//! Suspension record type and its row mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use warden_core::{ActorId, Result, ScopeId, SubjectId, SuspensionId, WardenError};

/// A time-bound restriction on a subject within a scope.
///
/// Records are append-only: once `is_active` flips to false the row never
/// changes again, leaving a complete audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspension {
    /// Row id assigned by the store
    pub id: SuspensionId,
    /// Scope the restriction applies within
    pub scope: ScopeId,
    /// The restricted member
    pub subject: SubjectId,
    /// The moderator who imposed the restriction
    pub issuer: ActorId,
    /// Absolute expiry timestamp (already clamped to the platform ceiling)
    pub expires_at: DateTime<Utc>,
    /// Free-text reason supplied by the issuer
    pub reason: String,
    /// False once the restriction has been lifted; never flips back
    pub is_active: bool,
    /// When the suspension was created
    pub created_at: DateTime<Utc>,
    /// When the restriction was lifted, by expiry or override
    pub lifted_at: Option<DateTime<Utc>>,
}

/// Raw row shape; timestamps are unix milliseconds in the database.
#[derive(Debug, FromRow)]
pub(crate) struct SuspensionRow {
    pub id: i64,
    pub scope_id: i64,
    pub subject_id: i64,
    pub issuer_id: i64,
    pub expires_at: i64,
    pub reason: String,
    pub is_active: bool,
    pub created_at: i64,
    pub lifted_at: Option<i64>,
}

fn timestamp(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| WardenError::internal(format!("timestamp out of range: {ms}")))
}

impl SuspensionRow {
    pub(crate) fn decode(self) -> Result<Suspension> {
        Ok(Suspension {
            id: SuspensionId::new(self.id),
            scope: ScopeId::new(self.scope_id),
            subject: SubjectId::new(self.subject_id),
            issuer: ActorId::new(self.issuer_id),
            expires_at: timestamp(self.expires_at)?,
            reason: self.reason,
            is_active: self.is_active,
            created_at: timestamp(self.created_at)?,
            lifted_at: self.lifted_at.map(timestamp).transpose()?,
        })
    }
}
