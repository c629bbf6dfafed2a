//! Liveness and readiness probes.

use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket_db_pools::sqlx;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::roster::PgRosterService;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// `ok` when the probe passed, `unavailable` otherwise.
    pub status: String,
}

impl HealthResponse {
    fn with_status(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

/// Liveness: the process is up and serving requests.
#[openapi(tag = "Health")]
#[get("/health/live")]
pub fn live_health() -> Json<HealthResponse> {
    HealthResponse::with_status("ok")
}

/// Readiness: the roster database answers queries.
#[openapi(tag = "Health")]
#[get("/health/ready")]
pub async fn ready_health(roster: &State<PgRosterService>) -> Custom<Json<HealthResponse>> {
    match sqlx::query("SELECT 1")
        .execute(roster.store().pool())
        .await
    {
        Ok(_) => Custom(Status::Ok, HealthResponse::with_status("ok")),
        Err(err) => {
            log::error!("readiness probe failed: {}", err);
            Custom(
                Status::ServiceUnavailable,
                HealthResponse::with_status("unavailable"),
            )
        }
    }
}
