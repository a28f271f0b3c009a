//! # alm-core
//!
//! Core types shared across all Almanac crates:
//! - Analyze job status enum with state machine transitions
//! - Wire entities (report artifacts, entitlements, activation)
//! - Lenient deserialization helpers that substitute defaults for
//!   malformed fields instead of failing
//! - Clock abstraction for testable time handling
//! - Cross-cutting error types

pub mod clock;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod lenient;

pub use clock::{Clock, FakeClock, SystemClock};
pub use entities::{Activation, Entitlement, Insight, Limits, Report, ReportArtifact, RoutineItem};
pub use enums::JobStatus;
pub use errors::CoreError;
