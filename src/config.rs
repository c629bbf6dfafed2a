//! Service settings read from the environment.
//!
//! Database connection settings are not here: they come from Rocket's figment
//! (`Rocket.toml` or `ROCKET_DATABASES`) under the `roster_db` key.

use std::env;

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Mount point for the roster routes, e.g. `/api`.
    pub api_base: String,
    /// Apply pending migrations during ignite.
    pub run_migrations: bool,
    /// Serve the OpenAPI document and Swagger/RapiDoc UIs.
    pub enable_docs: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let api_base = normalize_base(&env_string("ROSTER_API_BASE", "/api"));

        Self {
            api_base,
            run_migrations: env_bool("ROSTER_RUN_MIGRATIONS", true),
            enable_docs: env_bool("ROSTER_ENABLE_DOCS", true),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Leading slash, no trailing slash; the root stays `/`.
fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
