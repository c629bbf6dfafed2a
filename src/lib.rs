#[macro_use]
extern crate rocket;

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod request_logger;
pub mod roster;
pub mod routes;
pub mod test_support;

use crate::config::ServerConfig;
use crate::db::RosterDb;
use crate::request_logger::RequestLogger;
use crate::roster::{PgRosterStore, RosterService};
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::Once;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Roster API routes, ready to mount under a base path.
pub fn api_routes() -> Vec<rocket::Route> {
    openapi_get_routes![
        // Health routes
        routes::health::live_health,
        routes::health::ready_health,
        // Roster routes
        routes::roster::register_students,
        routes::roster::unregister_students,
        routes::roster::common_students,
        routes::roster::suspend_student,
        routes::roster::unsuspend_student,
        routes::roster::retrieve_for_notifications,
    ]
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let config = ServerConfig::from_env();
    log::info!("roster API mounted at {}", config.api_base);

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .to_cors()
        .expect("Error creating CORS");

    let mut rocket = rocket::build()
        .attach(RequestLogger)
        .attach(RosterDb::init())
        .attach(cors);

    if config.run_migrations {
        rocket = rocket.attach(AdHoc::try_on_ignite(
            "Run Migrations",
            |rocket| async move {
                match RosterDb::fetch(&rocket) {
                    Some(db) => match db::run_migrations(&**db).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    },
                    None => {
                        log::error!("database pool not available for migrations");
                        Err(rocket)
                    }
                }
            },
        ));
    } else {
        log::warn!("ROSTER_RUN_MIGRATIONS disabled; assuming schema is current");
    }

    rocket = rocket
        // Each request checks out its own connection or transaction from the
        // shared pool through the roster store.
        .attach(AdHoc::try_on_ignite(
            "Manage Roster Service",
            |rocket| async move {
                match RosterDb::fetch(&rocket) {
                    Some(db) => {
                        let store = PgRosterStore::new((**db).clone());
                        Ok(rocket.manage(RosterService::new(store)))
                    }
                    None => {
                        log::error!("database pool not available for roster service");
                        Err(rocket)
                    }
                }
            },
        ))
        .mount(config.api_base.as_str(), api_routes());

    if config.enable_docs {
        rocket = mount_docs(rocket, &config.api_base);
    }

    rocket
}

/// Swagger UI and RapiDoc, both reading the `openapi.json` that
/// `openapi_get_routes!` serves next to the API routes.
fn mount_docs(rocket: Rocket<Build>, api_base: &str) -> Rocket<Build> {
    let base = api_base.trim_end_matches('/');
    let spec_url = format!("{base}/openapi.json");

    rocket
        .mount(
            format!("{base}/docs/swagger/"),
            make_swagger_ui(&SwaggerUIConfig {
                url: spec_url.clone(),
                ..Default::default()
            }),
        )
        .mount(
            format!("{base}/docs/rapidoc/"),
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Roster API", &spec_url)],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}
