//! HTTP route handlers.
//!
//! Handlers validate request shape (email syntax, scalar-vs-array
//! normalization) and delegate to the roster engine. They are annotated with
//! `#[openapi]` so `rocket_okapi` can derive an OpenAPI document.

pub mod health;
pub(crate) mod helpers;
pub mod roster;
