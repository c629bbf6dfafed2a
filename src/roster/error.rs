use rocket_db_pools::sqlx;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;
pub type RosterResult<T> = Result<T, RosterError>;

/// Failures raised by an entity store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("enrollment edge already exists")]
    DuplicateEdge,
    #[error("enrollment references a missing teacher or student")]
    MissingEndpoint,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
            _ => None,
        };

        // 23505 unique_violation, 23503 foreign_key_violation
        match code.as_deref() {
            Some("23505") => StoreError::DuplicateEdge,
            Some("23503") => StoreError::MissingEndpoint,
            _ => StoreError::Database(err),
        }
    }
}

/// The specific reason an operation failed. Kept for logs and tests; callers
/// only ever see the operation-level [`RosterError`] message.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("teacher '{0}' does not exist")]
    TeacherNotFound(String),
    #[error("{missing} of {requested} students do not exist")]
    StudentsNotFound { requested: usize, missing: usize },
    #[error("student '{0}' does not exist")]
    StudentNotFound(String),
    #[error("already registered: {}", .0.join(", "))]
    AlreadyRegistered(Vec<String>),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl FailureCause {
    /// A concurrent registration that slipped past the duplicate probe
    /// surfaces as a uniqueness violation from the store.
    pub(crate) fn from_registration_store(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEdge => FailureCause::AlreadyRegistered(Vec::new()),
            other => FailureCause::Storage(other),
        }
    }
}

/// Operation-level errors surfaced to callers.
///
/// Each variant renders one fixed message regardless of the underlying cause
/// so storage detail never leaks into responses.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error(
        "Failed to update student registrations. Check that the teacher and student emails \
         exist and that the students have not already been registered to the teacher."
    )]
    Registration(FailureCause),
    #[error(
        "Failed to update student suspension. Check that the student email exists and the \
         database is reachable."
    )]
    Suspension(FailureCause),
    #[error(
        "Failed to query students registered under teachers. Check that the teacher emails \
         exist and the database is reachable."
    )]
    CommonStudents(FailureCause),
    #[error(
        "Failed to retrieve notification recipients. Check that the teacher email exists and \
         the database is reachable."
    )]
    Notification(FailureCause),
}

impl RosterError {
    /// The internal reason behind this error.
    pub fn cause(&self) -> &FailureCause {
        match self {
            RosterError::Registration(cause)
            | RosterError::Suspension(cause)
            | RosterError::CommonStudents(cause)
            | RosterError::Notification(cause) => cause,
        }
    }

    /// Short machine-readable kind for response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RosterError::Registration(_) => "RegistrationFailed",
            RosterError::Suspension(_) => "SuspensionFailed",
            RosterError::CommonStudents(_) => "CommonStudentsFailed",
            RosterError::Notification(_) => "NotificationFailed",
        }
    }
}
