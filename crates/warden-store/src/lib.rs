//! Durable suspension records for the Warden moderation core.
//!
//! The store is the only shared mutable resource in the subsystem. Every
//! operation is a parameterized query against the relational database; no
//! caching happens here. The one concurrency primitive the rest of the
//! core leans on is [`SuspensionStore::deactivate`]: a conditional update
//! that only touches rows still marked active, which makes it an atomic
//! compare-and-swap on the active flag.

pub mod record;
pub mod store;

pub use record::Suspension;
pub use store::SuspensionStore;
