//! Roster operations: registration, suspension and the read-side queries.
//!
//! Mutations follow one shape: open a transaction, run every precondition and
//! the write on it, then commit. Any failure rolls the transaction back before
//! the error is returned, so a caller never observes a partial edge set.

use std::collections::BTreeSet;

use crate::models::Student;
use crate::roster::error::{FailureCause, RosterError, RosterResult};
use crate::roster::mentions::extract_mentions;
use crate::roster::store::{RosterStore, RosterTransaction};

/// The roster engine over an entity store.
#[derive(Debug, Clone)]
pub struct RosterService<S> {
    store: S,
}

impl<S: RosterStore> RosterService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Register (`register = true`) or unregister `students` to `teacher`.
    ///
    /// The teacher and every student must exist. Registration is
    /// all-or-nothing: if any student is already enrolled, nothing is added.
    /// Unregistering a student who is not enrolled is a no-op.
    pub async fn set_enrollment(
        &self,
        teacher: &str,
        students: &[String],
        register: bool,
    ) -> RosterResult<()> {
        let students = distinct(students);

        let outcome: Result<u64, FailureCause> = async {
            let mut tx = self.store.begin().await?;
            let applied = apply_enrollment(&mut tx, teacher, &students, register).await;
            finish(tx, applied).await
        }
        .await;

        match outcome {
            Ok(changed) => {
                log::debug!(
                    "{} {} edge(s) for teacher '{}'",
                    if register { "added" } else { "removed" },
                    changed,
                    teacher
                );
                Ok(())
            }
            Err(cause) => {
                log::warn!("enrollment update for teacher '{}' failed: {}", teacher, cause);
                Err(RosterError::Registration(cause))
            }
        }
    }

    pub async fn register(&self, teacher: &str, students: &[String]) -> RosterResult<()> {
        self.set_enrollment(teacher, students, true).await
    }

    pub async fn unregister(&self, teacher: &str, students: &[String]) -> RosterResult<()> {
        self.set_enrollment(teacher, students, false).await
    }

    /// Set a student's `suspended` flag. Setting the current value succeeds
    /// without writing.
    pub async fn set_suspend_status(&self, student: &str, suspend: bool) -> RosterResult<()> {
        let outcome: Result<bool, FailureCause> = async {
            let mut tx = self.store.begin().await?;
            let applied = apply_suspension(&mut tx, student, suspend).await;
            finish(tx, applied).await
        }
        .await;

        match outcome {
            Ok(changed) => {
                log::debug!(
                    "student '{}' suspended={} ({})",
                    student,
                    suspend,
                    if changed { "updated" } else { "unchanged" }
                );
                Ok(())
            }
            Err(cause) => {
                log::warn!("suspension update for student '{}' failed: {}", student, cause);
                Err(RosterError::Suspension(cause))
            }
        }
    }

    pub async fn suspend(&self, student: &str) -> RosterResult<()> {
        self.set_suspend_status(student, true).await
    }

    pub async fn unsuspend(&self, student: &str) -> RosterResult<()> {
        self.set_suspend_status(student, false).await
    }

    /// Students enrolled to every one of `teachers`, sorted.
    ///
    /// Fails if any teacher does not exist. Order and duplicates in
    /// `teachers` do not affect the result; an empty list yields no students.
    pub async fn common_students(&self, teachers: &[String]) -> RosterResult<Vec<String>> {
        self.intersect_rosters(teachers).await.map_err(|cause| {
            log::warn!("common students query failed: {}", cause);
            RosterError::CommonStudents(cause)
        })
    }

    /// Students who should receive a notification from `teacher`, sorted.
    ///
    /// That is the teacher's roster plus every existing student mentioned in
    /// `notification`, minus suspended students. Unknown mentions are dropped.
    pub async fn recipients_for(
        &self,
        teacher: &str,
        notification: &str,
    ) -> RosterResult<Vec<String>> {
        self.collect_recipients(teacher, notification)
            .await
            .map_err(|cause| {
                log::warn!(
                    "notification recipients for teacher '{}' failed: {}",
                    teacher,
                    cause
                );
                RosterError::Notification(cause)
            })
    }

    async fn intersect_rosters(&self, teachers: &[String]) -> Result<Vec<String>, FailureCause> {
        let mut common: Option<BTreeSet<String>> = None;

        // Every teacher is checked even once the intersection is empty.
        for teacher in distinct(teachers) {
            let roster: BTreeSet<String> = self.load_roster(&teacher).await?.into_iter().collect();
            common = Some(match common {
                None => roster,
                Some(acc) => acc.intersection(&roster).cloned().collect(),
            });
        }

        Ok(common.unwrap_or_default().into_iter().collect())
    }

    async fn collect_recipients(
        &self,
        teacher: &str,
        notification: &str,
    ) -> Result<Vec<String>, FailureCause> {
        let (roster, mentioned) = tokio::join!(
            self.load_roster(teacher),
            self.mentioned_students(notification)
        );

        let candidates: Vec<String> = roster?
            .into_iter()
            .chain(mentioned?.into_iter().map(|student| student.email))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let recipients = self
            .store
            .students(&candidates)
            .await?
            .into_iter()
            .filter(|student| !student.suspended)
            .map(|student| student.email)
            .collect::<BTreeSet<_>>();

        Ok(recipients.into_iter().collect())
    }

    async fn load_roster(&self, teacher: &str) -> Result<Vec<String>, FailureCause> {
        if !self.store.teacher_exists(teacher).await? {
            return Err(FailureCause::TeacherNotFound(teacher.to_string()));
        }

        Ok(self.store.roster(teacher).await?)
    }

    async fn mentioned_students(&self, notification: &str) -> Result<Vec<Student>, FailureCause> {
        let mentions = distinct(&extract_mentions(notification));
        if mentions.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.store.students(&mentions).await?)
    }
}

async fn apply_enrollment<T: RosterTransaction>(
    tx: &mut T,
    teacher: &str,
    students: &[String],
    register: bool,
) -> Result<u64, FailureCause> {
    if !tx.teacher_exists(teacher).await? {
        return Err(FailureCause::TeacherNotFound(teacher.to_string()));
    }

    let found = tx.count_students(students).await?;
    if found < students.len() {
        return Err(FailureCause::StudentsNotFound {
            requested: students.len(),
            missing: students.len() - found,
        });
    }

    if students.is_empty() {
        return Ok(0);
    }

    if !register {
        return Ok(tx.remove_edges(teacher, students).await?);
    }

    let already = tx.enrolled_among(teacher, students).await?;
    if !already.is_empty() {
        return Err(FailureCause::AlreadyRegistered(already));
    }

    tx.add_edges(teacher, students)
        .await
        .map_err(FailureCause::from_registration_store)
}

async fn apply_suspension<T: RosterTransaction>(
    tx: &mut T,
    student: &str,
    suspend: bool,
) -> Result<bool, FailureCause> {
    match tx.lock_student(student).await? {
        None => Err(FailureCause::StudentNotFound(student.to_string())),
        Some(current) if current == suspend => Ok(false),
        Some(_) => {
            tx.set_suspended(student, suspend).await?;
            Ok(true)
        }
    }
}

/// Commit on success, roll back on failure.
async fn finish<T: RosterTransaction, V>(
    tx: T,
    outcome: Result<V, FailureCause>,
) -> Result<V, FailureCause> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(cause) => {
            if let Err(err) = tx.rollback().await {
                log::error!("transaction rollback failed: {}", err);
            }
            Err(cause)
        }
    }
}

fn distinct(emails: &[String]) -> Vec<String> {
    emails
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
