use std::io::{self, Write};

use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use roster_server::db::run_migrations;
use roster_server::roster::mentions::is_valid_email;
use roster_server::roster::{PgRosterStore, RosterService};

#[derive(Parser, Debug)]
#[command(
    name = "provision",
    about = "Create or remove teachers and students in the roster database"
)]
struct Args {
    /// Apply pending migrations before running the command.
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add teachers. Existing teachers are left as they are.
    AddTeacher {
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Add students. Existing students keep their suspension state.
    AddStudent {
        #[arg(required = true)]
        emails: Vec<String>,
        /// Create the students already suspended.
        #[arg(long)]
        suspended: bool,
    },
    /// Remove teachers and all of their enrollments.
    RemoveTeacher {
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Remove students and all of their enrollments.
    RemoveStudent {
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Register students to a teacher (fails if any is already registered).
    Enroll {
        #[arg(long)]
        teacher: String,
        #[arg(required = true)]
        students: Vec<String>,
    },
}

impl Command {
    fn emails(&self) -> Vec<&str> {
        match self {
            Command::AddTeacher { emails }
            | Command::AddStudent { emails, .. }
            | Command::RemoveTeacher { emails }
            | Command::RemoveStudent { emails } => emails.iter().map(String::as_str).collect(),
            Command::Enroll { teacher, students } => std::iter::once(teacher.as_str())
                .chain(students.iter().map(String::as_str))
                .collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    if let Some(bad) = args
        .command
        .emails()
        .into_iter()
        .find(|email| !is_valid_email(email))
    {
        writeln!(io::stderr(), "error: '{bad}' is not a valid email address")?;
        std::process::exit(1);
    }

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    if args.migrate {
        run_migrations(&pool).await?;
    }

    let store = PgRosterStore::new(pool);

    match args.command {
        Command::AddTeacher { emails } => {
            for email in &emails {
                let created = store.add_teacher(email).await?;
                report("teacher", email, if created { "created" } else { "already exists" });
            }
        }
        Command::AddStudent { emails, suspended } => {
            for email in &emails {
                let created = store.add_student(email, suspended).await?;
                report("student", email, if created { "created" } else { "already exists" });
            }
        }
        Command::RemoveTeacher { emails } => {
            for email in &emails {
                let removed = store.remove_teacher(email).await?;
                report("teacher", email, if removed { "removed" } else { "not found" });
            }
        }
        Command::RemoveStudent { emails } => {
            for email in &emails {
                let removed = store.remove_student(email).await?;
                report("student", email, if removed { "removed" } else { "not found" });
            }
        }
        Command::Enroll { teacher, students } => {
            let service = RosterService::new(store);
            if let Err(err) = service.register(&teacher, &students).await {
                writeln!(io::stderr(), "error: {err} ({})", err.cause())?;
                std::process::exit(1);
            }
            log::info!("registered {} student(s) to {}", students.len(), teacher);
        }
    }

    Ok(())
}

fn report(kind: &str, email: &str, outcome: &str) {
    log::info!("{kind} {email}: {outcome}");
}
