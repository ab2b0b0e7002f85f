use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use std::fmt::Write as _;
use std::io::Read;
use std::path::PathBuf;

use crate::calendar::{MonthGrid, WEEKDAY_HEADERS};
use crate::event::{parse_month_key, Event, EventRequest};
use crate::schedule::parse_schedule;
use crate::state::EventStore;

/// ShiftPaste - turn copy/pasted calendar schedules into calendar events
#[derive(Debug, Parser)]
#[command(name = "shiftpaste")]
#[command(about = "Turn copy/pasted calendar schedules into calendar events", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute (if not specified, enters interactive mode)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Event store file (overrides the config file)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse pasted schedule text and replace the months it covers
    #[command(alias = "import")]
    Paste {
        /// File with the pasted text ("-" or omitted reads stdin)
        file: Option<PathBuf>,

        /// Only print what would be stored
        #[arg(long)]
        dry_run: bool,

        /// Print the parse result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored events
    #[command(alias = "ls")]
    List {
        /// Only events in this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a month as a calendar grid
    Show {
        /// Month to show (YYYY-MM)
        #[arg(required = true)]
        month: String,
    },

    /// Create a single event
    #[command(alias = "create")]
    Add(EventArgs),

    /// Replace an existing event's content
    #[command(alias = "update")]
    Edit {
        /// Event ID
        #[arg(required = true)]
        id: String,

        #[command(flatten)]
        event: EventArgs,
    },

    /// Delete an event
    #[command(alias = "remove")]
    Delete {
        /// Event ID
        #[arg(required = true)]
        id: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EventArgs {
    /// Event title
    #[arg(required = true)]
    pub title: String,

    /// Event date (YYYY-MM-DD)
    #[arg(required = true)]
    pub date: String,

    /// Start time (HH:MM)
    #[arg(required = true)]
    pub start_time: String,

    /// End time (HH:MM)
    #[arg(required = true)]
    pub end_time: String,

    /// Secondary note
    #[arg(long)]
    pub note: Option<String>,

    /// Display color tag
    #[arg(long)]
    pub color: Option<String>,
}

impl From<EventArgs> for EventRequest {
    fn from(args: EventArgs) -> Self {
        EventRequest {
            title: args.title,
            date: args.date,
            start_time: args.start_time,
            end_time: args.end_time,
            note: args.note,
            color: args.color,
        }
    }
}

/// Where `paste` gets its text when no file is named.
pub trait PasteSource {
    fn read_paste(&mut self) -> Result<String>;
}

/// Reads the whole of stdin.
pub struct StdinPaste;

impl PasteSource for StdinPaste {
    fn read_paste(&mut self) -> Result<String> {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read pasted text from stdin")?;
        Ok(text)
    }
}

/// Execute one command against the store, returning what should be printed.
pub fn execute(
    command: Commands,
    store: &EventStore,
    paste: &mut dyn PasteSource,
) -> Result<String> {
    debug!("Executing {:?}", command);
    match command {
        Commands::Paste { file, dry_run, json } => {
            let text = match file {
                Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                _ => paste.read_paste()?,
            };
            let parsed = parse_schedule(&text)?;

            let mut out = if json {
                serde_json::to_string_pretty(&parsed)? + "\n"
            } else {
                let mut out = String::new();
                for event in &parsed.events {
                    writeln!(out, "{}", format_event(event))?;
                }
                out
            };
            if dry_run {
                return Ok(out);
            }

            let months = parsed.affected_months.iter().cloned().collect::<Vec<_>>().join(", ");
            let count = parsed.events.len();
            store.apply_schedule(parsed)?;
            info!("Stored events: {} for {}", count, months);
            if !json {
                let noun = if count == 1 { "event" } else { "events" };
                writeln!(out, "Stored {} {}, replacing {}", count, noun, months)?;
            }
            Ok(out)
        }
        Commands::List { month, json } => {
            let events = match month {
                Some(month) => store.events_in_month(&parse_month_key(&month)?)?,
                None => {
                    let mut events = store.load()?;
                    events.sort_by_key(|event| event.date);
                    events
                }
            };
            if json {
                return Ok(serde_json::to_string_pretty(&events)? + "\n");
            }
            if events.is_empty() {
                return Ok("No events\n".to_string());
            }
            let mut out = String::new();
            for event in &events {
                writeln!(out, "{}", format_event(event))?;
            }
            Ok(out)
        }
        Commands::Show { month } => {
            let key = parse_month_key(&month)?;
            let events = store.events_in_month(&key)?;
            let grid = MonthGrid::for_month_key(&key, &events)?;
            Ok(render_month(&grid))
        }
        Commands::Add(args) => {
            let event = store.create_event(&args.into())?;
            Ok(format!("Created {}\n", format_event(&event)))
        }
        Commands::Edit { id, event } => {
            let event = store.update_event(&id, &event.into())?;
            Ok(format!("Updated {}\n", format_event(&event)))
        }
        Commands::Delete { id } => {
            let event = store.delete_event(&id)?;
            Ok(format!("Deleted {}\n", format_event(&event)))
        }
    }
}

/// One-line listing: `date  title  (note)  [color]  #id`.
pub fn format_event(event: &Event) -> String {
    let mut line = format!("{}  {}", event.date, event.title);
    if let Some(note) = &event.note {
        line.push_str(&format!("  ({})", note));
    }
    if let Some(color) = &event.color {
        line.push_str(&format!("  [{}]", color));
    }
    if let Some(id) = &event.id {
        line.push_str(&format!("  #{}", id));
    }
    line
}

/// Text rendering of a month grid followed by the events of each day.
pub fn render_month(grid: &MonthGrid) -> String {
    let mut out = format!("{:04}-{:02}\n", grid.year, grid.month);
    out.push_str(&WEEKDAY_HEADERS.map(|day| format!("{:>4}", day)).join(""));
    out.push('\n');

    for week in grid.weeks() {
        for cell in week {
            match cell {
                Some(day) if !day.events.is_empty() => {
                    out.push_str(&format!("{:>3}*", day.date.day()))
                }
                Some(day) => out.push_str(&format!("{:>4}", day.date.day())),
                None => out.push_str("    "),
            }
        }
        out.push('\n');
    }

    for day in grid.days.iter().filter(|day| !day.events.is_empty()) {
        out.push('\n');
        out.push_str(&day.date.format("%a %d").to_string());
        out.push('\n');
        for event in &day.events {
            out.push_str(&format!("  {}", event.title));
            if let Some(note) = &event.note {
                out.push_str(&format!(" ({})", note));
            }
            out.push('\n');
        }
    }
    out
}
