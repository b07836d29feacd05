//! Shared types for the Warden moderation core.
//!
//! This crate holds the identifier newtypes, the unified error type, and the
//! capability traits the suspension subsystem consumes (the platform
//! restriction gateway and the notification sink). Collaborating layers
//! inject implementations of these traits explicitly; nothing in the core
//! reaches for a process-wide singleton.

pub mod duration;
pub mod errors;
pub mod gateway;
pub mod identifiers;
pub mod lift;

pub use duration::parse_duration;
pub use errors::{Result, WardenError};
pub use gateway::{LiftError, RestrictionGateway};
pub use identifiers::{ActorId, ScopeId, SubjectId, SuspensionId};
pub use lift::{LiftCause, LiftNotice, NotificationSink};

use std::time::Duration;

/// Platform ceiling on a single suspension's lifetime (28 days, the
/// platform's maximum timeout). Requested durations are clamped to this
/// before an expiry is ever persisted.
pub const MAX_SUSPENSION: Duration = Duration::from_secs(28 * 24 * 60 * 60);
