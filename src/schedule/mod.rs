//! Free-text schedule parsing.
//!
//! Turns text copied from a rendered month calendar into dated events:
//!
//! 1. [`tokenizer`] cleans the pasted lines,
//! 2. [`anchor`] finds the `<Month> <Year>` banner in the raw text,
//! 3. [`extractor`] walks the cleaned lines and emits one [`Event`] per shift.
//!
//! Parsing is a pure function of the input text.

pub mod anchor;
pub mod extractor;
pub mod tokenizer;

use std::collections::BTreeSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::event::Event;

pub use anchor::{resolve_anchor, AnchorMonthYear};
pub use extractor::{classify, extract_events, TokenKind};
pub use tokenizer::tokenize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("No month and year found in the pasted text (expected e.g. \"September 2025\")")]
    MissingMonthAnchor,
}

/// Result of parsing one paste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSchedule {
    /// `YYYY-MM` months this paste replaces in the store.
    pub affected_months: BTreeSet<String>,
    pub events: Vec<Event>,
}

/// Parse pasted calendar text into events plus the months they cover.
pub fn parse_schedule(raw: &str) -> Result<ParsedSchedule, ScheduleError> {
    let anchor = resolve_anchor(raw)?;
    let tokens = tokenize(raw);
    let events = extract_events(&tokens, anchor);
    let affected_months = affected_months(&events, anchor);

    info!(
        "Parsed {} events from {} lines, affecting {:?}",
        events.len(),
        tokens.len(),
        affected_months
    );
    Ok(ParsedSchedule { affected_months, events })
}

/// Months covered by `events`; an empty batch still claims the anchor month
/// so that pasting an empty schedule clears it.
pub fn affected_months(events: &[Event], anchor: AnchorMonthYear) -> BTreeSet<String> {
    if events.is_empty() {
        return BTreeSet::from([anchor.month_key()]);
    }
    events.iter().map(Event::month_key).collect()
}
