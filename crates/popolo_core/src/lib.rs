//! Core domain logic for popolo: persons, organizations, memberships and
//! areas, valid over partial-date windows.
//! This crate is the single source of truth for the overlap rules.

pub mod dates;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use dates::interval::{intervals_overlap, Bound, Overlap, PartialDatesInterval};
pub use dates::partial_date::{DatePrecision, PartialDate, PartialDateError};
pub use dates::validity::{find_overlapping, Dateframeable, OverlapDecision, OverlapPolicy};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::membership::{Member, Membership, MembershipId};
pub use model::relation::Owner;
pub use model::validation::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
