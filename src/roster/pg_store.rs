use std::ops::DerefMut;

use rocket_db_pools::sqlx::{self, PgPool, Postgres, Transaction};

use crate::models::Student;
use crate::roster::error::{StoreError, StoreResult};
use crate::roster::store::{RosterStore, RosterTransaction};

/// PostgreSQL-backed entity store over the `teachers`, `students` and
/// `teacher_students` tables.
#[derive(Debug, Clone)]
pub struct PgRosterStore {
    pool: PgPool,
}

impl PgRosterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Provision a teacher. Returns `false` if the teacher already existed.
    pub async fn add_teacher(&self, email: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("INSERT INTO teachers (email) VALUES ($1) ON CONFLICT (email) DO NOTHING")
                .bind(email)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Provision a student. Returns `false` if the student already existed, in
    /// which case its suspension flag is left untouched.
    pub async fn add_student(&self, email: &str, suspended: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO students (email, suspended) VALUES ($1, $2) ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .bind(suspended)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a teacher together with all of its enrollment edges.
    pub async fn remove_teacher(&self, email: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teachers WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a student together with all of its enrollment edges.
    pub async fn remove_student(&self, email: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM students WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[rocket::async_trait]
impl RosterStore for PgRosterStore {
    type Transaction = PgRosterTransaction;

    async fn begin(&self) -> StoreResult<PgRosterTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PgRosterTransaction { tx })
    }

    async fn teacher_exists(&self, teacher: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teachers WHERE email = $1)")
                .bind(teacher)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn roster(&self, teacher: &str) -> StoreResult<Vec<String>> {
        let students: Vec<String> = sqlx::query_scalar(
            "SELECT student FROM teacher_students WHERE teacher = $1 ORDER BY student",
        )
        .bind(teacher)
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }

    async fn students(&self, emails: &[String]) -> StoreResult<Vec<Student>> {
        let students: Vec<Student> = sqlx::query_as(
            "SELECT email, suspended FROM students WHERE email = ANY($1) ORDER BY email",
        )
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;

        Ok(students)
    }
}

/// An open transaction on a pooled connection. Rolled back on drop unless
/// committed.
pub struct PgRosterTransaction {
    tx: Transaction<'static, Postgres>,
}

#[rocket::async_trait]
impl RosterTransaction for PgRosterTransaction {
    async fn teacher_exists(&mut self, teacher: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teachers WHERE email = $1)")
                .bind(teacher)
                .fetch_one(self.tx.deref_mut())
                .await?;

        Ok(exists)
    }

    async fn count_students(&mut self, emails: &[String]) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE email = ANY($1)")
            .bind(emails)
            .fetch_one(self.tx.deref_mut())
            .await?;

        usize::try_from(count)
            .map_err(|err| StoreError::Database(sqlx::Error::Decode(Box::new(err))))
    }

    async fn enrolled_among(
        &mut self,
        teacher: &str,
        students: &[String],
    ) -> StoreResult<Vec<String>> {
        let enrolled: Vec<String> = sqlx::query_scalar(
            r#"SELECT student FROM teacher_students
               WHERE teacher = $1 AND student = ANY($2)
               ORDER BY student"#,
        )
        .bind(teacher)
        .bind(students)
        .fetch_all(self.tx.deref_mut())
        .await?;

        Ok(enrolled)
    }

    async fn add_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"INSERT INTO teacher_students (teacher, student)
               SELECT $1, UNNEST($2::text[])"#,
        )
        .bind(teacher)
        .bind(students)
        .execute(self.tx.deref_mut())
        .await?;

        Ok(result.rows_affected())
    }

    async fn remove_edges(&mut self, teacher: &str, students: &[String]) -> StoreResult<u64> {
        let result =
            sqlx::query("DELETE FROM teacher_students WHERE teacher = $1 AND student = ANY($2)")
                .bind(teacher)
                .bind(students)
                .execute(self.tx.deref_mut())
                .await?;

        Ok(result.rows_affected())
    }

    async fn lock_student(&mut self, student: &str) -> StoreResult<Option<bool>> {
        let suspended: Option<bool> =
            sqlx::query_scalar("SELECT suspended FROM students WHERE email = $1 FOR UPDATE")
                .bind(student)
                .fetch_optional(self.tx.deref_mut())
                .await?;

        Ok(suspended)
    }

    async fn set_suspended(&mut self, student: &str, suspended: bool) -> StoreResult<()> {
        sqlx::query("UPDATE students SET suspended = $1 WHERE email = $2")
            .bind(suspended)
            .bind(student)
            .execute(self.tx.deref_mut())
            .await?;

        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
