//! Command-line front end over a SQLite roster file.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use handover_core::db::open_db;
use handover_core::{
    default_log_level, export_text, handover_summary, init_logging, ExportMode, ExportOptions,
    ParseOptions, PatientEntry, PatientId, RosterService, Section, SqliteRosterStore, TaskId,
    Urgency,
};
use log::info;
use std::io::Read;
use std::path::PathBuf;

const DEFAULT_SHIFT_HOURS: i64 = 12;

#[derive(Parser)]
#[command(name = "handover")]
#[command(about = "Ward handover roster: import sheets, track tasks, render handover text")]
#[command(version = handover_core::core_version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Roster database file
    #[arg(long, global = true, env = "HANDOVER_DB", default_value = "handover.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "HANDOVER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "HANDOVER_LOG_DIR")]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a ward list and merge it into the roster
    Import {
        /// Text file to read; stdin when omitted or `-`
        file: Option<PathBuf>,

        /// Section assumed before the first header line
        #[arg(long, value_enum, default_value_t = SectionArg::SideA)]
        section: SectionArg,

        /// Sheet date, DD/MM/YYYY (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Print the roster with task ids
    List {
        #[arg(long, value_enum)]
        section: Option<SectionArg>,
    },

    /// Mark a task done, or open again
    Toggle {
        patient: PatientId,
        task: TaskId,
    },

    /// Add a manual task to a patient
    AddTask {
        patient: PatientId,
        text: String,

        #[arg(long, value_enum, default_value_t = UrgencyArg::Routine)]
        urgency: UrgencyArg,
    },

    /// Print the end-of-shift summary
    Summary {
        /// Shift start (RFC 3339); patients created since then count as new
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Print the shareable handover message
    Export {
        /// Sections to include (repeatable; default: all)
        #[arg(long = "section", value_enum)]
        sections: Vec<SectionArg>,

        /// Include patients without open tasks
        #[arg(long)]
        all: bool,
    },

    /// Show recent imports
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Remove every patient from the roster
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    SideA,
    SideB,
    SideC,
    Rehab,
}

impl From<SectionArg> for Section {
    fn from(value: SectionArg) -> Self {
        match value {
            SectionArg::SideA => Section::SideA,
            SectionArg::SideB => Section::SideB,
            SectionArg::SideC => Section::SideC,
            SectionArg::Rehab => Section::Rehab,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UrgencyArg {
    Stat,
    Urgent,
    Morning,
    Routine,
}

impl From<UrgencyArg> for Urgency {
    fn from(value: UrgencyArg) -> Self {
        match value {
            UrgencyArg::Stat => Urgency::Stat,
            UrgencyArg::Urgent => Urgency::Urgent,
            UrgencyArg::Morning => Urgency::Morning,
            UrgencyArg::Routine => Urgency::Routine,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open roster database {}", cli.db.display()))?;
    let mut service = RosterService::open(SqliteRosterStore::new(&conn))
        .context("failed to load roster")?;

    match cli.command {
        Commands::Import {
            file,
            section,
            date,
        } => {
            let text = read_input(file)?;
            let mut options = ParseOptions {
                initial_section: section.into(),
                ..ParseOptions::default()
            };
            if let Some(date) = date {
                options.date = date;
            }
            let report = service.import_text(&text, &options)?;
            println!(
                "parsed {} | matched {} | transferred {} | added {} | kept {} | total {}",
                report.parsed,
                report.stats.matched_strict,
                report.stats.matched_loose,
                report.stats.added,
                report.stats.retained,
                service.roster().len()
            );
        }
        Commands::List { section } => {
            let patients: Vec<&PatientEntry> = match section {
                Some(section) => service.patients_in_section(section.into()).collect(),
                None => service.roster().iter().collect(),
            };
            for patient in patients {
                print_patient(patient);
            }
        }
        Commands::Toggle { patient, task } => {
            let done = service.toggle_task(patient, task, Utc::now())?;
            println!("{}", if done { "done" } else { "open" });
        }
        Commands::AddTask {
            patient,
            text,
            urgency,
        } => {
            let task_id = service.add_task(patient, &text, urgency.into())?;
            println!("{task_id}");
        }
        Commands::Summary { since } => {
            let since = since.unwrap_or_else(|| Utc::now() - Duration::hours(DEFAULT_SHIFT_HOURS));
            println!(
                "{}",
                handover_summary(service.roster(), since, Local::now().naive_local())
            );
        }
        Commands::Export { sections, all } => {
            let mut options = ExportOptions::default();
            if !sections.is_empty() {
                options.sections = sections.into_iter().map(Section::from).collect();
            }
            if all {
                options.mode = ExportMode::All;
            }
            println!(
                "{}",
                export_text(service.roster(), &options, Local::now().naive_local())
            );
        }
        Commands::History { limit } => {
            for record in service.scan_history(limit)? {
                println!(
                    "{} parsed={} matched={} added={} retained={}",
                    record.scanned_at.to_rfc3339(),
                    record.parsed,
                    record.matched,
                    record.added,
                    record.retained
                );
            }
        }
        Commands::Clear => {
            service.clear_all()?;
            println!("roster cleared");
        }
    }

    info!("event=cli_exit module=cli status=ok");
    Ok(())
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn print_patient(patient: &PatientEntry) {
    println!(
        "{} [{}] {} {}{}",
        patient.id,
        patient.section.label(),
        patient.room.as_deref().unwrap_or("?"),
        patient.name.as_deref().unwrap_or("-"),
        patient.age.map(|age| format!(" ({age})")).unwrap_or_default()
    );
    for task in patient.all_tasks() {
        println!(
            "    {} [{}] {:<7} {}",
            task.id,
            if task.done { "x" } else { " " },
            task.urgency.as_str(),
            task.text
        );
    }
}
