//! Suspension scheduling for the Warden moderation core.
//!
//! Ties the durable store to a process-local timer registry and the
//! injected platform capabilities. Timers are an optimization, not a
//! correctness mechanism: they are rebuilt from the store on startup, and
//! every lift path is arbitrated by the store's conditional deactivate so
//! a firing timer and a concurrent manual override can never both act.

pub mod registry;
pub mod service;

pub use registry::TimerRegistry;
pub use service::{
    LiftOutcome, LiftReceipt, RecoveryReport, SchedulerConfig, SuspensionService,
};
