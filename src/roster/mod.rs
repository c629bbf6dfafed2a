//! Roster consistency and query engine.
//!
//! [`RosterService`] owns the business rules for the teacher–student relation:
//! transactional registration and suspension, the common-students
//! intersection, and notification recipient resolution. Persistence sits
//! behind the [`RosterStore`] / [`RosterTransaction`] traits, implemented for
//! PostgreSQL by [`PgRosterStore`] and in process by [`MemoryRosterStore`].

pub mod error;
pub mod memory_store;
pub mod mentions;
pub mod pg_store;
pub mod service;
pub mod store;

pub use error::{FailureCause, RosterError, RosterResult, StoreError, StoreResult};
pub use memory_store::MemoryRosterStore;
pub use pg_store::PgRosterStore;
pub use service::RosterService;
pub use store::{RosterStore, RosterTransaction};

/// The service as mounted by the HTTP layer.
pub type PgRosterService = RosterService<PgRosterStore>;
