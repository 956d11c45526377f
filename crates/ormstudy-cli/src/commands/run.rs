//! Run command
//!
//! Usage: ormstudy run <CHAPTER>... [--all] [--config <PATH>] [--db <PATH>] [--json]

use clap::Args;
use ormstudy_chapters::{run_chapter, Chapter};
use ormstudy_core::logging_facility::{init, Profile};
use ormstudy_store::{Outcome, PersistenceUnit};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Chapter ids such as `ch05` or `5`
    #[arg(required_unless_present = "all")]
    pub chapters: Vec<String>,

    /// Run every chapter in order
    #[arg(long, conflicts_with = "chapters")]
    pub all: bool,

    /// Persistence unit YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite file to use instead of the configured database
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// JSON logs and one JSON report per chapter
    #[arg(long)]
    pub json: bool,
}

/// Execute run command
pub fn execute(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    init(if args.json {
        Profile::Production
    } else {
        Profile::Development
    });

    let chapters: Vec<Chapter> = if args.all {
        Chapter::all().to_vec()
    } else {
        args.chapters
            .iter()
            .map(|id| id.parse())
            .collect::<Result<_, _>>()?
    };

    let mut unit = match &args.config {
        Some(path) => PersistenceUnit::load(path)?,
        None => PersistenceUnit::in_memory("ormstudy"),
    };
    if let Some(db) = args.db {
        unit = unit.with_file(db);
    }

    let mut failed = Vec::new();
    for chapter in chapters {
        match run_chapter(chapter, &unit) {
            Outcome::Committed(report) => {
                if args.json {
                    println!("{}", report.to_json()?);
                } else {
                    println!("== {} {}", chapter.id(), chapter.title());
                    for line in &report.lines {
                        println!("{}", line);
                    }
                }
            }
            Outcome::RolledBack(err) => {
                eprintln!("{} rolled back: {}", chapter.id(), err);
                failed.push(chapter.id());
            }
        }
    }

    if !failed.is_empty() {
        return Err(format!("rolled back: {}", failed.join(", ")).into());
    }
    Ok(())
}
