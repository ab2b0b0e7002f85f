//! ShiftPaste: turn text copied from a rendered month calendar into dated
//! events, and keep them in a JSON event store where every paste replaces the
//! months it covers.

pub mod calendar;
pub mod cli;
pub mod config;
pub mod event;
pub mod merge;
pub mod repl;
pub mod schedule;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use event::{Event, EventRequest};
pub use schedule::{parse_schedule, ParsedSchedule, ScheduleError};
pub use state::{EventStore, StoreError};
