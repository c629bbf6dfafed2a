use rocket_db_pools::sqlx::FromRow;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Stored Records =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, JsonSchema)]
pub struct Student {
    pub email: String,
    pub suspended: bool,
}

// ===== Request Payloads =====

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegisterStudentsRequest {
    pub teacher: String,
    pub students: Vec<String>,
}

/// Clients send the student either as a bare string or as a one-element array.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SuspendStudentRequest {
    pub student: OneOrMany,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NotificationRequest {
    pub teacher: String,
    #[serde(default)]
    pub notification: String,
}

// ===== Response Payloads =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommonStudentsResponse {
    pub students: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationRecipientsResponse {
    pub recipients: Vec<String>,
}
