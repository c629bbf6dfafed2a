use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::Student;
use crate::roster::error::{StoreError, StoreResult};
use crate::roster::store::{RosterStore, RosterTransaction};

#[derive(Debug, Clone, Default)]
struct RosterState {
    teachers: BTreeSet<String>,
    /// student email -> suspended
    students: BTreeMap<String, bool>,
    /// (teacher, student)
    edges: BTreeSet<(String, String)>,
}

impl RosterState {
    fn roster(&self, teacher: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(t, _)| t == teacher)
            .map(|(_, student)| student.clone())
            .collect()
    }
}

/// In-process entity store with the same integrity rules as the relational
/// schema. Transactions hold the store lock until they finish, so they run
/// serially.
#[derive(Debug, Clone, Default)]
pub struct MemoryRosterStore {
    state: Arc<Mutex<RosterState>>,
}

impl MemoryRosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_teacher(&self, email: &str) -> bool {
        self.state.lock().await.teachers.insert(email.to_string())
    }

    pub async fn add_student(&self, email: &str, suspended: bool) -> bool {
        let mut state = self.state.lock().await;
        if state.students.contains_key(email) {
            return false;
        }
        state.students.insert(email.to_string(), suspended);
        true
    }

    pub async fn remove_teacher(&self, email: &str) -> bool {
        let mut state = self.state.lock().await;
        state.edges.retain(|(teacher, _)| teacher != email);
        state.teachers.remove(email)
    }

    pub async fn remove_student(&self, email: &str) -> bool {
        let mut state = self.state.lock().await;
        state.edges.retain(|(_, student)| student != email);
        state.students.remove(email).is_some()
    }
}

#[rocket::async_trait]
impl RosterStore for MemoryRosterStore {
    type Transaction = MemoryRosterTransaction;

    async fn begin(&self) -> StoreResult<MemoryRosterTransaction> {
        let committed = Arc::clone(&self.state).lock_owned().await;
        let staged = committed.clone();
        Ok(MemoryRosterTransaction { committed, staged })
    }

    async fn teacher_exists(&self, teacher: &str) -> StoreResult<bool> {
        Ok(self.state.lock().await.teachers.contains(teacher))
    }

    async fn roster(&self, teacher: &str) -> StoreResult<Vec<String>> {
        Ok(self.state.lock().await.roster(teacher))
    }

    async fn students(&self, emails: &[String]) -> StoreResult<Vec<Student>> {
        let state = self.state.lock().await;
        let wanted: BTreeSet<&str> = emails.iter().map(String::as_str).collect();

        Ok(wanted
            .into_iter()
            .filter_map(|email| {
                state.students.get(email).map(|&suspended| Student {
                    email: email.to_string(),
                    suspended,
                })
            })
            .collect())
    }
}

/// Works on a staged copy of the state; `commit` publishes it.
pub struct MemoryRosterTransaction {
    committed: OwnedMutexGuard<RosterState>,
    staged: RosterState,
}

#[rocket::async_trait]
impl RosterTransaction for MemoryRosterTransaction {
    async fn teacher_exists(&mut self, teacher: &str) -> StoreResult<bool> {
        Ok(self.staged.teachers.contains(teacher))
    }

    async fn count_students(&mut self, emails: &[String]) -> StoreResult<usize> {
        Ok(emails
            .iter()
            .filter(|email| self.staged.students.contains_key(email.as_str()))
            .count())
    }

    async fn enrolled_among(
        &mut self,
        teacher: &str,
        students: &[String],
    ) -> StoreResult<Vec<String>> {
        let mut enrolled: Vec<String> = students
            .iter()
            .filter(|student| {
                self.staged
                    .edges
                    .contains(&(teacher.to_string(), student.to_string()))
            })
            .cloned()
            .collect();
        enrolled.sort();
        enrolled.dedup();
        Ok(enrolled)
    }

    async fn add_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64> {
        let mut added = 0;
        for student in students {
            if !self.staged.teachers.contains(teacher)
                || !self.staged.students.contains_key(student)
            {
                return Err(StoreError::MissingEndpoint);
            }
            if !self
                .staged
                .edges
                .insert((teacher.to_string(), student.clone()))
            {
                return Err(StoreError::DuplicateEdge);
            }
            added += 1;
        }
        Ok(added)
    }

    async fn remove_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64> {
        let mut removed = 0;
        for student in students {
            if self
                .staged
                .edges
                .remove(&(teacher.to_string(), student.clone()))
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn lock_student(&mut self, student: &str) -> StoreResult<Option<bool>> {
        Ok(self.staged.students.get(student).copied())
    }

    async fn set_suspended(&mut self, student: &str, suspended: bool) -> StoreResult<()> {
        if let Some(flag) = self.staged.students.get_mut(student) {
            *flag = suspended;
        }
        Ok(())
    }

    async fn commit(mut self) -> StoreResult<()> {
        *self.committed = self.staged;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
