use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Logs one line per request: method, path, handler, status and latency.
/// Client and server errors are logged at `warn`.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed_ms = request.local_cache(Instant::now).elapsed().as_secs_f64() * 1000.0;
        let handler = request
            .route()
            .and_then(|route| route.name.as_deref())
            .unwrap_or("-");
        let status = response.status();

        let level = if status.code >= 400 {
            log::Level::Warn
        } else {
            log::Level::Info
        };

        log::log!(
            level,
            "{} {} [{}] -> {} ({:.2}ms)",
            request.method(),
            request.uri().path(),
            handler,
            status.code,
            elapsed_ms
        );
    }
}
