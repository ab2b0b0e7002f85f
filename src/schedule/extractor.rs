//! Day-cell extraction over cleaned tokens.
//!
//! Calendar grids are copied column by column, so every shift shows up as
//! `day`, `start`, `end`, `title` and sometimes a trailing note. The grid has no
//! per-cell month marker, so month changes are inferred from the day numbers:
//! a leading high day belongs to the previous month, and a drop after a high day
//! rolls into the next one.

use chrono::NaiveDate;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::anchor::AnchorMonthYear;
use crate::event::Event;

/// Day values above this mark a cell near the end of a month.
const HIGH_DAY: u32 = 20;

static DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}$").expect("day regex is valid"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[01]?\d|2[0-3]):[0-5]\d$").expect("time regex is valid"));

/// Classification of a single cleaned line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    DayNumber(u32),
    TimeOfDay,
    FreeText,
}

pub fn classify(token: &str) -> TokenKind {
    if DAY_RE.is_match(token) {
        // Two ASCII digits always fit in a u32.
        token.parse().map(TokenKind::DayNumber).unwrap_or(TokenKind::FreeText)
    } else if TIME_RE.is_match(token) {
        TokenKind::TimeOfDay
    } else {
        TokenKind::FreeText
    }
}

fn is_time(token: &str) -> bool {
    classify(token) == TokenKind::TimeOfDay
}

fn is_plain_integer(token: &str) -> bool {
    token.trim().parse::<i64>().is_ok()
}

/// A shift recognised right after a day number.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ShiftMatch<'a> {
    start: &'a str,
    end: &'a str,
    title: &'a str,
    note: Option<&'a str>,
    /// Tokens consumed after the day number.
    consumed: usize,
}

/// Try the `start, end, title [, note]` pattern on the tokens following a day number.
fn match_shift(rest: &[String]) -> Option<ShiftMatch<'_>> {
    let [start, end, title, tail @ ..] = rest else {
        return None;
    };
    if !is_time(start) || !is_time(end) || is_plain_integer(title) {
        return None;
    }

    let note = tail
        .first()
        .filter(|candidate| !is_plain_integer(candidate) && !is_time(candidate))
        .map(String::as_str);

    Some(ShiftMatch {
        start: start.as_str(),
        end: end.as_str(),
        title: title.as_str(),
        note,
        consumed: if note.is_some() { 4 } else { 3 },
    })
}

/// Scan state carried from one day number to the next.
#[derive(Debug)]
struct DayTracker {
    current_day: u32,
    month: AnchorMonthYear,
    first_day_found: bool,
}

impl DayTracker {
    fn new(anchor: AnchorMonthYear) -> Self {
        Self { current_day: 0, month: anchor, first_day_found: false }
    }

    /// Record a new day number, moving the month first when the grid wraps.
    fn advance(&mut self, day: u32) {
        if !self.first_day_found {
            self.first_day_found = true;
            if day > HIGH_DAY {
                self.month = self.month.previous();
                debug!("Leading day {} belongs to previous month {}", day, self.month.month_key());
            }
        } else if day < self.current_day && self.current_day > HIGH_DAY {
            self.month = self.month.next();
            debug!(
                "Day {} after {} rolls over into {}",
                day,
                self.current_day,
                self.month.month_key()
            );
        }
        self.current_day = day;
    }

    fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.month.year, self.month.month_number(), self.current_day)
    }
}

/// Walk the token list once and emit an event for every day cell that carries a shift.
///
/// Day numbers without a following shift only update the tracked day. Emitted
/// events never carry an id.
pub fn extract_events(tokens: &[String], anchor: AnchorMonthYear) -> Vec<Event> {
    let mut tracker = DayTracker::new(anchor);
    let mut events = Vec::new();
    let mut cursor = 0;

    while cursor < tokens.len() {
        let TokenKind::DayNumber(day) = classify(&tokens[cursor]) else {
            cursor += 1;
            continue;
        };
        tracker.advance(day);

        let Some(shift) = match_shift(&tokens[cursor + 1..]) else {
            cursor += 1;
            continue;
        };

        match tracker.date() {
            Some(date) => {
                let title = format!("{} {}-{}", shift.title, shift.start, shift.end);
                let mut event = Event::new(date, title);
                event.note = shift.note.map(str::to_string);
                debug!("Extracted '{}' on {}", event.title, date);
                events.push(event);
            }
            None => warn!(
                "Skipping shift '{}': day {} does not exist in {}",
                shift.title,
                day,
                tracker.month.month_key()
            ),
        }
        cursor += 1 + shift.consumed;
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sept_2025() -> AnchorMonthYear {
        AnchorMonthYear::new(2025, 8)
    }

    fn dates(events: &[Event]) -> Vec<String> {
        events.iter().map(|e| e.date.to_string()).collect()
    }

    #[test]
    fn classifies_tokens() {
        assert_eq!(classify("7"), TokenKind::DayNumber(7));
        assert_eq!(classify("31"), TokenKind::DayNumber(31));
        assert_eq!(classify("09:00"), TokenKind::TimeOfDay);
        assert_eq!(classify("9:30"), TokenKind::TimeOfDay);
        assert_eq!(classify("123"), TokenKind::FreeText);
        assert_eq!(classify("-1"), TokenKind::FreeText);
        assert_eq!(classify("1.5"), TokenKind::FreeText);
        assert_eq!(classify("09:75"), TokenKind::FreeText);
        assert_eq!(classify("23:59"), TokenKind::TimeOfDay);
        assert_eq!(classify("0:00"), TokenKind::TimeOfDay);
        assert_eq!(classify("24:00"), TokenKind::FreeText);
        assert_eq!(classify("99:00"), TokenKind::FreeText);
    }

    #[test]
    fn triple_without_note() {
        let events = extract_events(&tokens(&["5", "09:00", "17:00", "Shift A"]), sept_2025());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Shift A 09:00-17:00");
        assert_eq!(events[0].note, None);
        assert_eq!(events[0].id, None);
        assert_eq!(dates(&events), vec!["2025-09-05"]);
    }

    #[test]
    fn triple_with_note() {
        let events =
            extract_events(&tokens(&["5", "09:00", "17:00", "Shift A", "Remote"]), sept_2025());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Shift A 09:00-17:00");
        assert_eq!(events[0].note.as_deref(), Some("Remote"));
    }

    #[test]
    fn numeric_or_time_after_title_is_not_a_note() {
        let events = extract_events(
            &tokens(&["5", "09:00", "17:00", "Early", "6", "10:00", "18:00", "Late", "12:00"]),
            sept_2025(),
        );
        assert_eq!(dates(&events), vec!["2025-09-05", "2025-09-06"]);
        assert!(events.iter().all(|e| e.note.is_none()));
    }

    #[test]
    fn incomplete_cells_emit_nothing() {
        let cases: [&[&str]; 5] = [
            &["5"],
            &["5", "09:00"],
            &["5", "09:00", "17:00"],
            &["5", "Shift", "09:00", "17:00"],
            &["5", "09:00", "17:00", "6"],
        ];
        for case in cases {
            assert!(extract_events(&tokens(case), sept_2025()).is_empty(), "{:?}", case);
        }
    }

    #[test]
    fn high_first_day_belongs_to_previous_month() {
        let events = extract_events(
            &tokens(&["29", "08:00", "16:00", "Early", "30", "31", "1", "08:00", "16:00", "Early"]),
            sept_2025(),
        );
        assert_eq!(dates(&events), vec!["2025-08-29", "2025-09-01"]);
    }

    #[test]
    fn drop_after_high_day_rolls_forward() {
        let events = extract_events(
            &tokens(&[
                "1", "08:00", "16:00", "Early", "30", "08:00", "16:00", "Early", "1", "08:00",
                "16:00", "Late", "2", "08:00", "16:00", "Late",
            ]),
            sept_2025(),
        );
        assert_eq!(dates(&events), vec!["2025-09-01", "2025-09-30", "2025-10-01", "2025-10-02"]);
    }

    #[test]
    fn rollover_wraps_year_both_ways() {
        let january = AnchorMonthYear::new(2026, 0);
        let events = extract_events(&tokens(&["31", "06:00", "14:00", "NYE"]), january);
        assert_eq!(dates(&events), vec!["2025-12-31"]);

        let december = AnchorMonthYear::new(2025, 11);
        let events = extract_events(
            &tokens(&["1", "30", "31", "2", "06:00", "14:00", "New Year"]),
            december,
        );
        assert_eq!(dates(&events), vec!["2026-01-02"]);
    }

    #[test]
    fn small_drop_without_high_day_keeps_month() {
        let events = extract_events(&tokens(&["12", "5", "08:00", "16:00", "Early"]), sept_2025());
        assert_eq!(dates(&events), vec!["2025-09-05"]);
    }

    #[test]
    fn impossible_date_is_skipped_and_consumed() {
        let events = extract_events(
            &tokens(&["3", "08:00", "16:00", "Real", "31", "08:00", "16:00", "Ghost", "Memo"]),
            sept_2025(),
        );
        // September has 30 days.
        assert_eq!(dates(&events), vec!["2025-09-03"]);
        assert_eq!(events[0].title, "Real 08:00-16:00");
    }

    #[test]
    fn consumed_tokens_are_not_reread_as_days() {
        let events =
            extract_events(&tokens(&["1", "08:00", "16:00", "Early", "Room 5"]), sept_2025());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].note.as_deref(), Some("Room 5"));
    }
}
