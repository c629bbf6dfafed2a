use rocket::State;
use rocket::response::status::NoContent;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::error::ApiError;
use crate::models::{
    CommonStudentsResponse, NotificationRecipientsResponse, NotificationRequest,
    RegisterStudentsRequest, SuspendStudentRequest,
};
use crate::roster::PgRosterService;
use crate::routes::helpers::{require_email, require_emails, single_email};

/// Register students to a teacher. Fails without changes if any student is
/// already registered to that teacher.
#[openapi(tag = "Roster")]
#[post("/register", data = "<request>")]
pub async fn register_students(
    request: Json<RegisterStudentsRequest>,
    roster: &State<PgRosterService>,
) -> Result<NoContent, ApiError> {
    let request = request.into_inner();
    require_email("teacher", &request.teacher)?;
    require_emails("students", &request.students)?;

    roster.register(&request.teacher, &request.students).await?;
    Ok(NoContent)
}

/// Remove students from a teacher's roster. Students not on the roster are
/// ignored.
#[openapi(tag = "Roster")]
#[post("/unregister", data = "<request>")]
pub async fn unregister_students(
    request: Json<RegisterStudentsRequest>,
    roster: &State<PgRosterService>,
) -> Result<NoContent, ApiError> {
    let request = request.into_inner();
    require_email("teacher", &request.teacher)?;
    require_emails("students", &request.students)?;

    roster.unregister(&request.teacher, &request.students).await?;
    Ok(NoContent)
}

/// Students registered to every listed teacher
/// (`?teacher=a@x.com&teacher=b@x.com`).
#[openapi(tag = "Roster")]
#[get("/commonstudents?<teacher>")]
pub async fn common_students(
    teacher: Vec<String>,
    roster: &State<PgRosterService>,
) -> Result<Json<CommonStudentsResponse>, ApiError> {
    if teacher.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one 'teacher' query parameter is required".to_string(),
        ));
    }
    require_emails("teacher", &teacher)?;

    let students = roster.common_students(&teacher).await?;
    Ok(Json(CommonStudentsResponse { students }))
}

#[openapi(tag = "Roster")]
#[post("/suspend", data = "<request>")]
pub async fn suspend_student(
    request: Json<SuspendStudentRequest>,
    roster: &State<PgRosterService>,
) -> Result<NoContent, ApiError> {
    let student = single_email("student", request.into_inner().student)?;

    roster.suspend(&student).await?;
    Ok(NoContent)
}

#[openapi(tag = "Roster")]
#[post("/unsuspend", data = "<request>")]
pub async fn unsuspend_student(
    request: Json<SuspendStudentRequest>,
    roster: &State<PgRosterService>,
) -> Result<NoContent, ApiError> {
    let student = single_email("student", request.into_inner().student)?;

    roster.unsuspend(&student).await?;
    Ok(NoContent)
}

/// Students who should receive a notification: the teacher's roster plus any
/// existing student mentioned as `@@student@example.com`, excluding suspended
/// students.
#[openapi(tag = "Roster")]
#[post("/retrievefornotifications", data = "<request>")]
pub async fn retrieve_for_notifications(
    request: Json<NotificationRequest>,
    roster: &State<PgRosterService>,
) -> Result<Json<NotificationRecipientsResponse>, ApiError> {
    let request = request.into_inner();
    require_email("teacher", &request.teacher)?;

    let recipients = roster
        .recipients_for(&request.teacher, &request.notification)
        .await?;
    Ok(Json(NotificationRecipientsResponse { recipients }))
}
