//! Identifier types used across the Warden core.
//!
//! All identifiers wrap the platform's numeric ids (64-bit integers). The
//! newtypes exist so a scope id can never be passed where a subject id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the container a restriction applies within (a community or
/// server on the platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub i64);

impl ScopeId {
    /// Create from a raw platform id
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw platform id
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ScopeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Identifier of the restricted member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub i64);

impl SubjectId {
    /// Create from a raw platform id
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw platform id
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubjectId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Identifier of the moderator (or other administrative actor) who imposed
/// or lifted a restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub i64);

impl ActorId {
    /// Create from a raw platform id
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw platform id
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ActorId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Opaque row id of a suspension record. Assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuspensionId(pub i64);

impl SuspensionId {
    /// Create from a raw row id
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Get the raw row id
    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SuspensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suspension-{}", self.0)
    }
}

impl From<i64> for SuspensionId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}
