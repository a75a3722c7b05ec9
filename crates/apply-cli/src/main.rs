mod config;
mod telemetry;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use apply_spec::{
    Answer, Application, BudgetItem, Question, ReprMode, SummaryMailer, ValidationResult,
    budget_csv, budget_total, check_submission, export_csv, export_file_name, reconcile,
    represent, validate, visibility_map,
};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use config::CliConfig;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Event application form helper",
    long_about = "Inspects application answers: conditional visibility, canonical text, budgets, submission checks, exports and summary emails"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputMode {
    Plain,
    Csv,
}

impl From<OutputMode> for ReprMode {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Plain => ReprMode::Plain,
            OutputMode::Csv => ReprMode::Csv,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKind {
    Question,
    Answer,
    Application,
    BudgetItem,
}

#[derive(Subcommand)]
enum Command {
    /// Print which answers are currently shown, keyed by answer id.
    Show {
        /// Application JSON (with expanded responses) or a JSON array of answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Mark hidden conditional answers valid and print the updated answers.
    Reconcile {
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Write the reconciled answers here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print the canonical text of every answer, or of a single one.
    Represent {
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputMode::Plain)]
        mode: OutputMode,
        /// Only print this answer's text.
        #[arg(long, value_name = "ID")]
        answer: Option<String>,
    },
    /// Compute a budget payload's grand total or CSV breakdown.
    Budget {
        /// JSON list of budget items.
        #[arg(long, value_name = "BUDGET")]
        input: PathBuf,
        /// Print the CSV breakdown instead of the total.
        #[arg(long)]
        csv: bool,
    },
    /// Check visible answers for missing or malformed values.
    Validate {
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Check whether an application may be submitted.
    Check {
        #[arg(long, value_name = "APPLICATION")]
        application: PathBuf,
    },
    /// Write a spreadsheet with one row per application.
    Export {
        /// Application JSON files; each may hold one application or a list.
        #[arg(long = "application", value_name = "APPLICATION", required = true)]
        applications: Vec<PathBuf>,
        /// Output file (defaults to a dated name inside APPLY_EXPORT_DIR).
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Render the submission summary email as HTML.
    Email {
        #[arg(long, value_name = "APPLICATION")]
        application: PathBuf,
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print the JSON Schema of a record type.
    Schema {
        #[arg(long, value_enum, default_value_t = SchemaKind::Application)]
        kind: SchemaKind,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_env()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Show { answers } => run_show(&answers),
        Command::Reconcile { answers, out } => run_reconcile(&answers, out),
        Command::Represent {
            answers,
            mode,
            answer,
        } => run_represent(&answers, mode.into(), answer),
        Command::Budget { input, csv } => run_budget(&input, csv),
        Command::Validate { answers } => run_validate(&answers),
        Command::Check { application } => run_check(&application),
        Command::Export { applications, out } => run_export(&config, &applications, out),
        Command::Email { application, out } => run_email(&application, out),
        Command::Schema { kind } => run_schema(kind),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersDocument {
    Answers(Vec<Answer>),
    Application(Box<Application>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ApplicationsDocument {
    Many(Vec<Application>),
    One(Box<Application>),
}

fn load_answers(path: &Path) -> CliResult<Vec<Answer>> {
    let json = fs::read_to_string(path)?;
    match serde_json::from_str(&json)? {
        AnswersDocument::Answers(answers) => Ok(answers),
        AnswersDocument::Application(application) => application
            .answers()
            .map(<[Answer]>::to_vec)
            .ok_or_else(|| format!("{} has no expanded responses", path.display()).into()),
    }
}

fn load_application(path: &Path) -> CliResult<Application> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn load_applications(paths: &[PathBuf]) -> CliResult<Vec<Application>> {
    let mut applications = Vec::new();
    for path in paths {
        let json = fs::read_to_string(path)?;
        match serde_json::from_str(&json)? {
            ApplicationsDocument::Many(many) => applications.extend(many),
            ApplicationsDocument::One(one) => applications.push(*one),
        }
    }
    Ok(applications)
}

fn write_output(out: Option<&Path>, contents: &str) -> CliResult<()> {
    match out {
        Some(path) => {
            fs::write(path, contents)?;
            println!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            if !contents.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn run_show(answers_path: &Path) -> CliResult<()> {
    let answers = load_answers(answers_path)?;
    let map = visibility_map(&answers);
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}

fn run_reconcile(answers_path: &Path, out: Option<PathBuf>) -> CliResult<()> {
    let answers = load_answers(answers_path)?;
    let reconciled = reconcile(&answers);
    let changed = answers
        .iter()
        .zip(&reconciled)
        .filter(|(before, after)| before.valid != after.valid)
        .count();
    info!(changed, "reconciled hidden answers");
    write_output(
        out.as_deref(),
        &serde_json::to_string_pretty(&reconciled)?,
    )
}

#[derive(Serialize)]
struct RepresentedAnswer<'a> {
    answer: &'a str,
    question: Option<String>,
    text: String,
}

fn run_represent(answers_path: &Path, mode: ReprMode, only: Option<String>) -> CliResult<()> {
    let answers = load_answers(answers_path)?;
    debug!(mode = mode.as_str(), count = answers.len(), "representing answers");

    if let Some(id) = only {
        let answer = answers
            .iter()
            .find(|answer| answer.id == id)
            .ok_or_else(|| format!("answer '{id}' not found"))?;
        println!("{}", represent(Some(answer), mode));
        return Ok(());
    }

    let rows: Vec<RepresentedAnswer<'_>> = answers
        .iter()
        .map(|answer| RepresentedAnswer {
            answer: &answer.id,
            question: answer.expanded_question().map(Question::plain_title),
            text: represent(Some(answer), mode),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn run_budget(input: &Path, csv: bool) -> CliResult<()> {
    let raw: Value = serde_json::from_str(&fs::read_to_string(input)?)?;
    let text = if csv {
        budget_csv(&raw)
    } else {
        budget_total(&raw)
    };
    println!("{text}");
    Ok(())
}

fn run_validate(answers_path: &Path) -> CliResult<()> {
    let answers = load_answers(answers_path)?;
    let result = validate(&answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {}", error.answer_id, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.skipped.is_empty() {
        println!("Hidden answers skipped: {}", result.skipped.join(", "));
    }
}

fn run_check(application_path: &Path) -> CliResult<()> {
    let application = load_application(application_path)?;
    let next = check_submission(&application)?;
    println!(
        "{} can be submitted: {} -> {}",
        application.reference(),
        application.status.as_str(),
        next.as_str()
    );
    Ok(())
}

fn run_export(config: &CliConfig, paths: &[PathBuf], out: Option<PathBuf>) -> CliResult<()> {
    let applications = load_applications(paths)?;
    let target = match out {
        Some(path) => path,
        None => config.export_dir.join(export_file_name(
            applications.len(),
            Local::now().date_naive(),
        )),
    };

    let file = fs::File::create(&target)?;
    export_csv(&applications, BufWriter::new(file))?;
    info!(count = applications.len(), path = %target.display(), "export written");
    println!(
        "Exported {} applications to {}",
        applications.len(),
        target.display()
    );
    Ok(())
}

fn run_email(application_path: &Path, out: Option<PathBuf>) -> CliResult<()> {
    let application = load_application(application_path)?;
    let html = SummaryMailer::new()?.render(&application)?;
    write_output(out.as_deref(), &html)
}

fn run_schema(kind: SchemaKind) -> CliResult<()> {
    let schema = match kind {
        SchemaKind::Question => schemars::schema_for!(Question),
        SchemaKind::Answer => schemars::schema_for!(Answer),
        SchemaKind::Application => schemars::schema_for!(Application),
        SchemaKind::BudgetItem => schemars::schema_for!(Vec<BudgetItem>),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use serde_json::json;

    const APPLICATION: &str = include_str!("../../apply-spec/tests/fixtures/application.json");
    const SECOND_APPLICATION: &str =
        include_str!("../../apply-spec/tests/fixtures/second_application.json");

    fn workspace() -> Result<assert_fs::TempDir, Box<dyn std::error::Error>> {
        let dir = assert_fs::TempDir::new()?;
        dir.child("application.json").write_str(APPLICATION)?;
        dir.child("second_application.json")
            .write_str(SECOND_APPLICATION)?;
        Ok(dir)
    }

    fn stdout_of(cmd: &mut Command) -> Result<String, Box<dyn std::error::Error>> {
        let output = cmd.output()?;
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8(output.stdout)?)
    }

    #[test]
    fn loads_answer_arrays_and_applications() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let from_application = load_answers(dir.child("application.json").path())?;
        assert_eq!(from_application.len(), 9);

        let list = dir.child("answers.json");
        list.write_str(&serde_json::to_string(&from_application)?)?;
        assert_eq!(load_answers(list.path())?, from_application);

        let bare = dir.child("bare.json");
        bare.write_str(&json!({"id": "rec_app_09"}).to_string())?;
        assert!(load_answers(bare.path()).is_err());
        Ok(())
    }

    #[test]
    fn show_reports_hidden_answers() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let stdout = stdout_of(
            Command::cargo_bin("event-apply")?
                .arg("show")
                .arg("--answers")
                .arg(dir.child("application.json").path()),
        )?;
        let map: Value = serde_json::from_str(&stdout)?;
        assert_eq!(map["a_hw"], json!(false));
        assert_eq!(map["a_team"], json!(true));
        Ok(())
    }

    #[test]
    fn represent_single_answer() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let stdout = stdout_of(
            Command::cargo_bin("event-apply")?
                .args(["represent", "--answer", "a_budget", "--answers"])
                .arg(dir.child("application.json").path()),
        )?;
        assert_eq!(stdout, "385\n");
        Ok(())
    }

    #[test]
    fn budget_command_prints_breakdown() -> Result<(), Box<dyn std::error::Error>> {
        let dir = assert_fs::TempDir::new()?;
        let budget = dir.child("budget.json");
        budget.write_str(
            &json!([
                {"name": "Room", "defaultPrice": 100, "defaultQuantity": 2},
                {"name": "Gear", "defaultPrice": 50, "defaultQuantity": 3}
            ])
            .to_string(),
        )?;
        let total = stdout_of(
            Command::cargo_bin("event-apply")?
                .args(["budget", "--input"])
                .arg(budget.path()),
        )?;
        assert_eq!(total, "350\n");

        let csv = stdout_of(
            Command::cargo_bin("event-apply")?
                .args(["budget", "--csv", "--input"])
                .arg(budget.path()),
        )?;
        assert!(csv.trim_end().ends_with(r#""Grand Total","","","350""#));
        Ok(())
    }

    #[test]
    fn check_blocks_visible_invalid_answers() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let stdout = stdout_of(
            Command::cargo_bin("event-apply")?
                .args(["check", "--application"])
                .arg(dir.child("application.json").path()),
        )?;
        assert_eq!(stdout, "SH-012 can be submitted: draft -> submitted\n");

        Command::cargo_bin("event-apply")?
            .args(["check", "--application"])
            .arg(dir.child("second_application.json").path())
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn export_writes_csv_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let target = dir.child("export.csv");
        Command::cargo_bin("event-apply")?
            .arg("export")
            .arg("--application")
            .arg(dir.child("application.json").path())
            .arg("--application")
            .arg(dir.child("second_application.json").path())
            .arg("--out")
            .arg(target.path())
            .assert()
            .success();

        let written = fs::read_to_string(target.path())?;
        assert!(written.starts_with("Application,Status,Team name,Rules,Track,Hardware needs,"));
        assert!(written.contains("rec_app_02,editsRequested"));
        Ok(())
    }

    #[test]
    fn export_defaults_to_dated_name_in_export_dir() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let exports = dir.child("exports");
        exports.create_dir_all()?;
        Command::cargo_bin("event-apply")?
            .env("APPLY_EXPORT_DIR", exports.path())
            .arg("export")
            .arg("--application")
            .arg(dir.child("application.json").path())
            .assert()
            .success();

        let names: Vec<String> = fs::read_dir(exports.path())?
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("applications_export_1_items_"));
        assert!(names[0].ends_with(".csv"));
        Ok(())
    }

    #[test]
    fn email_writes_html() -> Result<(), Box<dyn std::error::Error>> {
        let dir = workspace()?;
        let target = dir.child("summary.html");
        Command::cargo_bin("event-apply")?
            .args(["email", "--application"])
            .arg(dir.child("application.json").path())
            .arg("--out")
            .arg(target.path())
            .assert()
            .success();
        let html = fs::read_to_string(target.path())?;
        assert!(html.contains("Spring Hackathon"));
        assert!(!html.contains("Hardware needs"));
        Ok(())
    }

    #[test]
    fn schema_describes_answers() -> Result<(), Box<dyn std::error::Error>> {
        let stdout = stdout_of(
            Command::cargo_bin("event-apply")?.args(["schema", "--kind", "answer"]),
        )?;
        let schema: Value = serde_json::from_str(&stdout)?;
        assert_eq!(schema["title"], json!("Answer"));
        assert!(schema["properties"]["id"].is_object());
        Ok(())
    }
}
