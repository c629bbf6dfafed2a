//! Helpers for integration tests: disposable databases, fixtures and a Rocket
//! builder wired to the roster service.

use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::local::asynchronous::Client as AsyncClient;
use rocket::{Build, Rocket, Route};
use rocket_db_pools::sqlx::{self, PgPool};

use crate::roster::{PgRosterStore, RosterService};

pub use database::{TestDatabase, TestDatabaseError};

/// Seeding and inspection helpers bound to a test pool.
pub struct TestFixtures<'a> {
    pool: &'a PgPool,
}

impl<'a> TestFixtures<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_teachers(&self, emails: &[&str]) -> Result<(), sqlx::Error> {
        for email in emails {
            sqlx::query("INSERT INTO teachers (email) VALUES ($1)")
                .bind(*email)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn insert_students(&self, emails: &[&str]) -> Result<(), sqlx::Error> {
        for email in emails {
            sqlx::query("INSERT INTO students (email, suspended) VALUES ($1, FALSE)")
                .bind(*email)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    /// Insert enrollment edges directly, bypassing the roster engine.
    pub async fn enroll(&self, teacher: &str, students: &[&str]) -> Result<(), sqlx::Error> {
        for student in students {
            sqlx::query("INSERT INTO teacher_students (teacher, student) VALUES ($1, $2)")
                .bind(teacher)
                .bind(*student)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn roster(&self, teacher: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT student FROM teacher_students WHERE teacher = $1 ORDER BY student",
        )
        .bind(teacher)
        .fetch_all(self.pool)
        .await
    }

    pub async fn is_suspended(&self, student: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT suspended FROM students WHERE email = $1")
            .bind(student)
            .fetch_one(self.pool)
            .await
    }

    /// t1 = {}, t2 = {s1, s2, s3}, t3 = {s1, s2}; s4 and s5 unenrolled.
    pub async fn seed_classroom(&self) -> Result<(), sqlx::Error> {
        self.insert_teachers(&["t1@test.com", "t2@test.com", "t3@test.com"])
            .await?;
        self.insert_students(&[
            "s1@test.com",
            "s2@test.com",
            "s3@test.com",
            "s4@test.com",
            "s5@test.com",
        ])
        .await?;
        self.enroll("t2@test.com", &["s1@test.com", "s2@test.com", "s3@test.com"])
            .await?;
        self.enroll("t3@test.com", &["s1@test.com", "s2@test.com"])
            .await
    }
}

pub mod database {
    use log::LevelFilter;
    use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
    use testcontainers_modules::postgres::Postgres;
    use testcontainers_modules::testcontainers::{
        ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
    };
    use thiserror::Error;
    use tokio::runtime::Handle;
    use uuid::Uuid;

    use crate::db::MIGRATOR;

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("migration error: {0}")]
        Migration(#[from] sqlx::migrate::MigrateError),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    impl TestDatabaseError {
        /// No container runtime was available and no `TEST_DATABASE_URL` was
        /// given; callers skip.
        pub fn is_unavailable(&self) -> bool {
            matches!(self, TestDatabaseError::Container(_))
        }
    }

    /// Ephemeral database for integration tests. Each instance creates its own
    /// uniquely named database, migrates it, and drops it on close.
    pub struct TestDatabase {
        pool: Option<PgPool>,
        admin_options: PgConnectOptions,
        database_name: String,
        container: Option<ContainerAsync<Postgres>>,
    }

    impl TestDatabase {
        /// Use the server at `TEST_DATABASE_URL` when set, otherwise launch a
        /// disposable Postgres container.
        pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
            match std::env::var("TEST_DATABASE_URL") {
                Ok(url) => Self::with_server(&url, None).await,
                Err(_) => Self::new().await,
            }
        }

        /// Launch a disposable Postgres container and provision a database on it.
        pub async fn new() -> Result<Self, TestDatabaseError> {
            let container = Postgres::default().start().await?;

            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Self::with_server(&admin_url, Some(container)).await
        }

        async fn with_server(
            url: &str,
            container: Option<ContainerAsync<Postgres>>,
        ) -> Result<Self, TestDatabaseError> {
            let base_options: PgConnectOptions = url.parse().map_err(TestDatabaseError::Sqlx)?;
            let base_options = base_options.log_statements(LevelFilter::Off);

            let base_name = base_options
                .get_database()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "roster".to_string());

            let admin_options = base_options.clone().database("postgres");
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options.clone())
                .await?;

            let database_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
            let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
            sqlx::query(&create_sql).execute(&admin_pool).await?;
            admin_pool.close().await;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_with(base_options.database(&database_name))
                .await?;

            MIGRATOR.run(&pool).await?;

            Ok(Self {
                pool: Some(pool),
                admin_options,
                database_name,
                container,
            })
        }

        pub fn pool(&self) -> &PgPool {
            self.pool.as_ref().expect("test database pool is available")
        }

        pub fn pool_clone(&self) -> PgPool {
            self.pool().clone()
        }

        /// Close pool connections and drop the ephemeral database.
        pub async fn close(mut self) -> Result<(), TestDatabaseError> {
            if let Some(pool) = self.pool.take() {
                pool.close().await;
            }

            drop_database(self.admin_options.clone(), &self.database_name).await?;

            if let Some(container) = self.container.take() {
                drop(container);
            }

            Ok(())
        }
    }

    async fn drop_database(
        admin_options: PgConnectOptions,
        database_name: &str,
    ) -> Result<(), sqlx::Error> {
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(admin_options)
            .await?;

        let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
        sqlx::query(&drop_sql).execute(&admin_pool).await?;
        Ok(())
    }

    impl Drop for TestDatabase {
        fn drop(&mut self) {
            if let Some(pool) = self.pool.take() {
                let admin_options = self.admin_options.clone();
                let db_name = self.database_name.clone();
                if let Ok(handle) = Handle::try_current() {
                    handle.spawn(async move {
                        pool.close().await;
                        let _ = drop_database(admin_options, &db_name).await;
                    });
                }
            }

            if let Some(container) = self.container.take() {
                drop(container);
            }
        }
    }
}

/// Builder for Rocket instances used by route tests.
#[derive(Default)]
pub struct TestRocketBuilder {
    figment: Figment,
    routes: Vec<Route>,
    roster: Option<RosterService<PgRosterStore>>,
}

impl TestRocketBuilder {
    /// Random port, logging disabled.
    pub fn new() -> Self {
        let figment = rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("cli_colors", false));

        Self {
            figment,
            routes: Vec::new(),
            roster: None,
        }
    }

    /// Mount routes under `/api`.
    pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Manage a roster service over `pool`, as the server does at ignite.
    pub fn manage_roster(mut self, pool: PgPool) -> Self {
        self.roster = Some(RosterService::new(PgRosterStore::new(pool)));
        self
    }

    pub fn build(self) -> Rocket<Build> {
        let mut rocket = rocket::custom(self.figment).mount("/api", self.routes);

        if let Some(roster) = self.roster {
            rocket = rocket.manage(roster);
        }

        rocket
    }

    pub async fn async_client(self) -> AsyncClient {
        AsyncClient::tracked(self.build())
            .await
            .expect("valid Rocket instance")
    }
}
