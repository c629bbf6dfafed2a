//! Entity store interface consumed by the roster engine.
//!
//! Reads that do not need a consistent snapshot go straight through
//! [`RosterStore`]. Every mutation runs on a [`RosterTransaction`] obtained
//! from [`RosterStore::begin`]; dropping a transaction without committing
//! rolls it back.

use crate::models::Student;
use crate::roster::error::StoreResult;

#[rocket::async_trait]
pub trait RosterStore: Send + Sync {
    type Transaction: RosterTransaction;

    /// Check out a connection and open a transaction on it.
    async fn begin(&self) -> StoreResult<Self::Transaction>;

    async fn teacher_exists(&self, teacher: &str) -> StoreResult<bool>;

    /// Emails of every student enrolled to `teacher`, sorted.
    async fn roster(&self, teacher: &str) -> StoreResult<Vec<String>>;

    /// Student records for whichever of `emails` exist. Unknown emails are
    /// skipped.
    async fn students(&self, emails: &[String]) -> StoreResult<Vec<Student>>;
}

#[rocket::async_trait]
pub trait RosterTransaction: Send {
    async fn teacher_exists(&mut self, teacher: &str) -> StoreResult<bool>;

    /// Number of existing students among `emails`. Callers pass a distinct set.
    async fn count_students(&mut self, emails: &[String]) -> StoreResult<usize>;

    /// The subset of `students` already enrolled to `teacher`, sorted.
    async fn enrolled_among(
        &mut self,
        teacher: &str,
        students: &[String],
    ) -> StoreResult<Vec<String>>;

    /// Insert one edge per student. Fails with
    /// [`StoreError::DuplicateEdge`](crate::roster::error::StoreError::DuplicateEdge)
    /// if any edge already exists.
    async fn add_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64>;

    /// Delete whichever of the edges exist; returns how many were removed.
    async fn remove_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64>;

    /// Lock the student row for the rest of the transaction and return its
    /// current `suspended` flag, or `None` if the student does not exist.
    async fn lock_student(&mut self, student: &str) -> StoreResult<Option<bool>>;

    async fn set_suspended(&mut self, student: &str, suspended: bool) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}
