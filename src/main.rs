mod calendar;
mod config;
mod dates;
mod db;
mod models;
mod notes;
mod projection;
mod report;
mod tui;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use clap::{Parser, Subcommand};
use config::Settings;
use db::Database;
use models::{ApplicationDraft, ApplicationRecord, Status};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "intrack")]
#[command(about = "Internship and job application tracker - deadlines, exams and outcomes")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "INTRACK_DB")]
    db: Option<PathBuf>,

    /// User whose applications are read and written
    #[arg(long, global = true, env = "INTRACK_USER")]
    user: Option<String>,

    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add an application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        /// Role applied for
        #[arg(short, long)]
        role: String,

        /// Compensation, e.g. "10 LPA" or "30000 /month"
        #[arg(long, default_value = "")]
        ctc: String,

        /// Notes; '#' starts a new block, ',' separates items
        #[arg(long)]
        requirements: Option<String>,

        #[arg(short, long, value_enum, default_value = "to-apply")]
        status: Status,

        /// Last date to apply (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,

        /// Date applied (YYYY-MM-DD)
        #[arg(long)]
        applied: Option<String>,

        /// Exam or interview date (YYYY-MM-DD)
        #[arg(long)]
        exam: Option<String>,
    },

    /// List applications
    List {
        /// Only applications whose company or role contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,

        #[arg(short, long, value_enum)]
        status: Option<Status>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,
    },

    /// Edit an application; pass "" to clear an optional field
    Edit {
        /// Application ID
        id: i64,

        #[arg(short, long)]
        company: Option<String>,

        #[arg(short, long)]
        role: Option<String>,

        #[arg(long)]
        ctc: Option<String>,

        #[arg(long)]
        requirements: Option<String>,

        #[arg(short, long, value_enum)]
        status: Option<Status>,

        #[arg(long)]
        deadline: Option<String>,

        #[arg(long)]
        applied: Option<String>,

        #[arg(long)]
        exam: Option<String>,
    },

    /// Change the status of an application
    Status {
        /// Application ID
        id: i64,

        #[arg(value_enum)]
        status: Status,
    },

    /// Copy an application back to to-apply
    Duplicate {
        /// Application ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Status chart, top packages, latest activity and deadlines
    Overview {
        /// Entries per section
        #[arg(short, long, default_value = "3")]
        limit: usize,

        #[arg(long)]
        json: bool,
    },

    /// All upcoming application deadlines
    Deadlines,

    /// Month calendar of deadlines and exams
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Show the entries for this day of the month
        #[arg(short, long)]
        day: Option<u32>,
    },

    /// Interactive calendar browser
    Browse,

    /// Write all applications as JSON
    Export {
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load applications from a JSON export
    Import {
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "intrack=debug" } else { "intrack=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn date_arg(value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| Some(d.to_string()))
            .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw)),
    }
}

fn text_arg(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::resolve(cli.db, cli.user);
    debug!(?settings, "resolved settings");
    let mut db = Database::open(&settings.db_path, &settings.user_id)?;
    let today = Local::now().date_naive();

    if !matches!(cli.command, Commands::Init) {
        db.ensure_initialized()?;
    }

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            company,
            role,
            ctc,
            requirements,
            status,
            deadline,
            applied,
            exam,
        } => {
            let mut draft = ApplicationDraft::new(&company, &role);
            draft.ctc = ctc.trim().to_string();
            draft.requirements = text_arg(requirements);
            draft.status = Some(status);
            draft.last_date_to_apply = date_arg(deadline.as_deref())?;
            draft.applied_date = date_arg(applied.as_deref())?;
            draft.exam_date = date_arg(exam.as_deref())?;
            let id = db.insert(&draft)?;
            println!("Added application #{}", id);
        }

        Commands::List { search, status, json } => {
            let records = db.list()?;
            let mut shown = projection::search(&records, search.as_deref().unwrap_or(""));
            if let Some(status) = status {
                shown.retain(|r| r.status == Some(status));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                print!("{}", report::record_table(&shown));
            }
        }

        Commands::Show { id } => match db.get(id)? {
            Some(record) => print!("{}", report::record_detail(&record)),
            None => println!("Application #{} not found.", id),
        },

        Commands::Edit {
            id,
            company,
            role,
            ctc,
            requirements,
            status,
            deadline,
            applied,
            exam,
        } => {
            let Some(record) = db.get(id)? else {
                println!("Application #{} not found.", id);
                return Ok(());
            };
            let mut draft = ApplicationDraft::from(&record);
            if let Some(company) = company {
                draft.company_name = company.trim().to_string();
            }
            if let Some(role) = role {
                draft.role = role.trim().to_string();
            }
            if let Some(ctc) = ctc {
                draft.ctc = ctc.trim().to_string();
            }
            if requirements.is_some() {
                draft.requirements = text_arg(requirements);
            }
            if status.is_some() {
                draft.status = status;
            }
            if deadline.is_some() {
                draft.last_date_to_apply = date_arg(deadline.as_deref())?;
            }
            if applied.is_some() {
                draft.applied_date = date_arg(applied.as_deref())?;
            }
            if exam.is_some() {
                draft.exam_date = date_arg(exam.as_deref())?;
            }
            if db.update(id, &draft)? {
                println!("Updated application #{}", id);
            } else {
                println!("Application #{} not found.", id);
            }
        }

        Commands::Status { id, status } => {
            if db.update_status(id, status)? {
                println!("Application #{} is now {}.", id, status);
                if status == Status::Approved {
                    println!("Congratulations on the offer!");
                }
            } else {
                println!("Application #{} not found.", id);
            }
        }

        Commands::Duplicate { id, yes } => {
            let Some(record) = db.get(id)? else {
                println!("Application #{} not found.", id);
                return Ok(());
            };
            let prompt = format!("Duplicate {} at {}?", record.role, record.company_name);
            if !confirm(&prompt, yes)? {
                println!("Cancelled.");
            } else if let Some(new_id) = db.duplicate(id)? {
                println!("Duplicated #{} as #{}", id, new_id);
            }
        }

        Commands::Delete { id, yes } => {
            let Some(record) = db.get(id)? else {
                println!("Application #{} not found.", id);
                return Ok(());
            };
            let prompt = format!("Delete {} at {}?", record.role, record.company_name);
            if !confirm(&prompt, yes)? {
                println!("Cancelled.");
            } else if db.delete(id)? {
                println!("Deleted application #{}", id);
            }
        }

        Commands::Overview { limit, json } => {
            let records = db.list()?;
            let overview = report::Overview::build(&records, limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                print!("{}", overview.render(&settings.user_id, Local::now().hour(), today));
            }
        }

        Commands::Deadlines => {
            let records = db.list()?;
            print!("{}", report::deadline_list(&records, today));
        }

        Commands::Calendar { month, day } => {
            let visible = match month.as_deref() {
                Some(raw) => dates::parse_month(raw)
                    .ok_or_else(|| anyhow!("Invalid month '{}', expected YYYY-MM", raw))?,
                None => dates::first_of_month(today),
            };
            let records = db.list()?;
            let grid = calendar::build_grid(&records, visible, today);
            print!("{}", report::calendar(&grid));

            if let Some(day) = day {
                let date = visible
                    .with_day(day)
                    .ok_or_else(|| anyhow!("{} has no day {}", visible.format("%B %Y"), day))?;
                match calendar::day_detail(&records, date, today) {
                    Some(detail) => print!("\n{}", report::day_detail(&detail)),
                    None => println!("\nNothing due on {}.", date),
                }
            }
        }

        Commands::Browse => {
            tui::run_browse(&db, today)?;
        }

        Commands::Export { output } => {
            let records = db.list()?;
            let json = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write to {}", path.display()))?;
                    println!("Exported {} application(s) to {}", records.len(), path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<ApplicationRecord> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of applications", file.display()))?;
            let imported = db.import(&records)?;
            println!("Imported {} of {} application(s)", imported, records.len());
        }
    }

    Ok(())
}
