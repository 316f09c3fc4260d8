//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into owner-scoped use-case APIs.
//! - Keep the CLI decoupled from storage details.
//!
//! Services borrow a `Store` implementation handed in at construction.

pub mod activity;
pub mod contacts;
pub mod duplicates;
pub mod merge;
pub mod versions;

pub use activity::ActivityService;
pub use contacts::{ContactService, ContactUpdate, ImportSummary, NewContact, UpdateOutcome};
pub use duplicates::DuplicateDetector;
pub use merge::MergeEngine;
pub use versions::VersionService;
