//! Command-line front end for the grade pipeline: imports externally hosted
//! exam results into the local results database and prints course standing.

use anyhow::{Context, Result};
use app_utils::{db_url_from_env, init_from_env, init_tracing, InitFromEnv};
use clap::{Parser, Subcommand};
use libcourse::activity::{ExamKind, ExamRecord, HomeworkRecord};
use libcourse::enrollment::CourseEnrollment;
use libcourse::import::ExamResultImporter;
use libcourse::report::course_standing;
use libcourse::types::{CourseId, ExamId, HomeworkId, StudentId, StudentName};
use results_db::SqliteStore;
use sheets_api::types::{Points, StudentKey};
use tracing::debug;

#[derive(Parser)]
#[command(name = "import-results")]
#[command(about = "Import exam results from hosted sheets and report course standing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the results database schema
    InitDb,
    /// Load a small demo course with activities and enrollments
    Seed,
    /// Import exam results from a sheet sharing link, one-shot per exam
    Import {
        #[arg(long)]
        exam: String,
        #[arg(long)]
        link: String,
    },
    /// Print the standing of every student enrolled in a course
    Report {
        #[arg(long)]
        course: String,
        /// Emit the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let store = SqliteStore::connect(&db_url_from_env()?).await?;
    debug!("connected to results database");

    match cli.command {
        Commands::InitDb => {
            store.init_schema().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            store.init_schema().await?;
            seed(&store).await?;
            println!("Demo course seeded.");
        }
        Commands::Import { exam, link } => {
            let InitFromEnv { sheets } = init_from_env()?;
            let importer = ExamResultImporter::new(&sheets, &store);
            let applied = importer
                .import_results(&ExamId::new(exam), &link)
                .await
                .context("import failed; no results were applied")?;
            println!("Applied {applied} results.");
        }
        Commands::Report { course, json } => {
            let report = course_standing(&store, &CourseId::new(course)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
    }

    Ok(())
}

/// One demo course shaped like the system of record would shape it: two
/// exams, one homework, three enrolled students.
async fn seed(store: &SqliteStore) -> Result<()> {
    let course = CourseId::new("ooad");
    let points = |value: f64| Points::new(value);

    store
        .add_exam(&ExamRecord::new(
            ExamId::new("ooad-midterm"),
            course.clone(),
            ExamKind::Midterm,
            points(50.0)?,
            points(25.0)?,
        )?)
        .await?;
    store
        .add_exam(&ExamRecord::new(
            ExamId::new("ooad-final"),
            course.clone(),
            ExamKind::Final,
            points(30.0)?,
            points(15.0)?,
        )?)
        .await?;
    store
        .add_homework(&HomeworkRecord::new(
            HomeworkId::new("ooad-hw1"),
            course.clone(),
            points(20.0)?,
            points(0.0)?,
        )?)
        .await?;

    for (student, name, key) in [
        ("s-17", "Amila Hodzic", 17),
        ("s-21", "Tarik Begic", 21),
        ("s-34", "Lejla Saric", 34),
    ] {
        store
            .enroll(&CourseEnrollment::new(
                StudentId::new(student),
                StudentName::new(name),
                StudentKey::new(key),
                course.clone(),
            ))
            .await?;
    }

    Ok(())
}
