use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use rocket_okapi::util::add_schema_response;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::roster::RosterError;

#[derive(Debug)]
pub enum ApiError {
    /// A roster operation failed; the body carries the operation's generic
    /// message, never the underlying cause.
    Roster(RosterError),
    /// The request was well-formed JSON but failed shape validation.
    BadRequest(String),
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (error_type, message) = match self {
            ApiError::Roster(err) => {
                log::debug!("{}: {}", err.kind(), err.cause());
                (err.kind().to_string(), err.to_string())
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                ("BadRequest".to_string(), msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type,
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        Response::build()
            .status(Status::BadRequest)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        let schema = generator.json_schema::<ErrorResponse>();
        add_schema_response(&mut responses, 400, "application/json", schema)?;
        Ok(responses)
    }
}

impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        ApiError::Roster(err)
    }
}
