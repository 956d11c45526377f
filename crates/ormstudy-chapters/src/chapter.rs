//! Chapter registry and runner

#![allow(clippy::result_large_err)]

use ormstudy_core::{log_op_end, log_op_error, log_op_start, ExError, ExErrorKind, OrmStudyError};
use ormstudy_store::{
    run_in_transaction, Outcome, PersistenceUnit, Result, SessionFactory, SessionFactoryBuilder,
    SessionTx,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

const OP: &str = "run_chapter";

/// One runnable chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chapter {
    Ch02,
    Ch03,
    Ch05,
    Ch06,
    Ch07,
    Ch08,
    Ch09,
    Ch10,
    Ch14,
}

impl Chapter {
    /// Every chapter in reading order
    pub fn all() -> &'static [Chapter] {
        &[
            Chapter::Ch02,
            Chapter::Ch03,
            Chapter::Ch05,
            Chapter::Ch06,
            Chapter::Ch07,
            Chapter::Ch08,
            Chapter::Ch09,
            Chapter::Ch10,
            Chapter::Ch14,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Chapter::Ch02 => "ch02",
            Chapter::Ch03 => "ch03",
            Chapter::Ch05 => "ch05",
            Chapter::Ch06 => "ch06",
            Chapter::Ch07 => "ch07",
            Chapter::Ch08 => "ch08",
            Chapter::Ch09 => "ch09",
            Chapter::Ch10 => "ch10",
            Chapter::Ch14 => "ch14",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Chapter::Ch02 => "First entity",
            Chapter::Ch03 => "Persistence context",
            Chapter::Ch05 => "Bidirectional many-to-one",
            Chapter::Ch06 => "Association kinds",
            Chapter::Ch07 => "Inheritance and advanced mapping",
            Chapter::Ch08 => "Proxies and cascade",
            Chapter::Ch09 => "Value types",
            Chapter::Ch10 => "Querying",
            Chapter::Ch14 => "Collections, converters, listeners and entity graphs",
        }
    }

    /// Tables owned by this chapter, children before parents
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            Chapter::Ch02 => crate::ch02::TABLES,
            Chapter::Ch03 => crate::ch03::TABLES,
            Chapter::Ch05 => crate::ch05::TABLES,
            Chapter::Ch06 => crate::ch06::TABLES,
            Chapter::Ch07 => crate::ch07::TABLES,
            Chapter::Ch08 => crate::ch08::TABLES,
            Chapter::Ch09 => crate::ch09::TABLES,
            Chapter::Ch10 => crate::ch10::TABLES,
            Chapter::Ch14 => crate::ch14::TABLES,
        }
    }

    /// Session factory carrying this chapter's schema and named mappings
    pub fn factory(&self, unit: PersistenceUnit) -> Result<SessionFactory> {
        let builder = SessionFactory::builder(unit);
        let builder: SessionFactoryBuilder = match self {
            Chapter::Ch02 => builder.schema(crate::ch02::SCHEMA),
            Chapter::Ch03 => builder.schema(crate::ch03::SCHEMA),
            Chapter::Ch05 => builder.schema(crate::ch05::SCHEMA),
            Chapter::Ch06 => builder.schema(crate::ch06::SCHEMA),
            Chapter::Ch07 => builder.schema(crate::ch07::SCHEMA),
            Chapter::Ch08 => builder.schema(crate::ch08::SCHEMA),
            Chapter::Ch09 => builder.schema(crate::ch09::SCHEMA),
            Chapter::Ch10 => crate::ch10::mappings(builder.schema(crate::ch10::SCHEMA)),
            Chapter::Ch14 => crate::ch14::mappings(builder.schema(crate::ch14::SCHEMA)),
        };
        builder.build()
    }

    /// Empty the chapter's tables so every run starts from the same state
    pub fn reset(&self, tx: &SessionTx<'_>) -> Result<()> {
        for table in self.tables() {
            tx.execute(&format!("DELETE FROM {}", table), ())?;
        }
        Ok(())
    }

    /// Run the chapter's demo steps inside `tx`
    pub fn run(&self, tx: &SessionTx<'_>) -> Result<ChapterReport> {
        match self {
            Chapter::Ch02 => crate::ch02::run(tx),
            Chapter::Ch03 => crate::ch03::run(tx),
            Chapter::Ch05 => crate::ch05::run(tx),
            Chapter::Ch06 => crate::ch06::run(tx),
            Chapter::Ch07 => crate::ch07::run(tx),
            Chapter::Ch08 => crate::ch08::run(tx),
            Chapter::Ch09 => crate::ch09::run(tx),
            Chapter::Ch10 => crate::ch10::run(tx),
            Chapter::Ch14 => crate::ch14::run(tx),
        }
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Chapter {
    type Err = ExError;

    /// Accepts `ch05`, `CH05`, `ch5` and the bare numbers `5` or `05`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let number = wanted.strip_prefix("ch").unwrap_or(&wanted);
        let wanted = match number.parse::<u32>() {
            Ok(n) => format!("ch{:02}", n),
            Err(_) => wanted,
        };
        Chapter::all()
            .iter()
            .copied()
            .find(|c| c.id() == wanted)
            .ok_or_else(|| OrmStudyError::UnknownChapter { id: s.to_string() }.into())
    }
}

/// What a chapter printed while it ran
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterReport {
    pub chapter: String,
    pub title: String,
    pub lines: Vec<String>,
}

impl ChapterReport {
    pub fn new(chapter: Chapter) -> Self {
        Self {
            chapter: chapter.id().to_string(),
            title: chapter.title().to_string(),
            lines: Vec::new(),
        }
    }

    /// Record one line of chapter output and emit it as an info event
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(chapter = %self.chapter, "{}", line);
        self.lines.push(line);
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_op("chapter_report")
                .with_message(e.to_string())
        })
    }
}

/// Build the chapter's factory and run it as one unit of work
///
/// A factory that cannot be built is reported as a rolled-back outcome, the
/// same as a failing step.
pub fn run_chapter(chapter: Chapter, unit: &PersistenceUnit) -> Outcome<ChapterReport> {
    let start = Instant::now();
    log_op_start!(OP, chapter = chapter.id());

    let outcome = match chapter.factory(unit.clone()) {
        Ok(factory) => run_in_transaction(factory, |tx| {
            chapter.reset(tx)?;
            chapter.run(tx)
        }),
        Err(err) => Outcome::RolledBack(err),
    };

    match &outcome {
        Outcome::Committed(_) => {
            log_op_end!(
                OP,
                duration_ms = start.elapsed().as_millis() as u64,
                chapter = chapter.id()
            );
        }
        Outcome::RolledBack(err) => {
            log_op_error!(
                OP,
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                chapter = chapter.id()
            );
        }
    }
    outcome
}
