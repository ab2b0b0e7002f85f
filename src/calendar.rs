//! Month view over stored events.

use chrono::{Datelike, NaiveDate};

use crate::event::{parse_month_key, Event, EventError};

pub const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One day of a month grid with the events that fall on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub events: Vec<Event>,
}

/// A Sunday-first month grid: `leading_blanks` empty cells, then one cell per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    /// 1-based month number.
    pub month: u32,
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

impl MonthGrid {
    /// Build the grid for `year`/`month` (1-based), picking matching events out of `events`.
    pub fn build(year: i32, month: u32, events: &[Event]) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let days = first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| DayCell {
                date,
                events: events.iter().filter(|event| event.date == date).cloned().collect(),
            })
            .collect();

        Some(Self {
            year,
            month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
        })
    }

    /// Build from a `YYYY-MM` key.
    pub fn for_month_key(month: &str, events: &[Event]) -> Result<Self, EventError> {
        let key = parse_month_key(month)?;
        let invalid = || EventError::InvalidMonth(month.to_string());
        let first = NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        Self::build(first.year(), first.month(), events).ok_or_else(invalid)
    }

    pub fn event_count(&self) -> usize {
        self.days.iter().map(|day| day.events.len()).sum()
    }

    /// Rows of seven cells, `None` for padding before the 1st and after the last day.
    pub fn weeks(&self) -> Vec<[Option<&DayCell>; 7]> {
        let mut cells: Vec<Option<&DayCell>> = (0..self.leading_blanks).map(|_| None).collect();
        cells.extend(self.days.iter().map(Some));
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        cells
            .chunks(7)
            .map(|week| {
                let mut row = [None; 7];
                row.copy_from_slice(week);
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, title: &str) -> Event {
        Event::new(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), title)
    }

    #[test]
    fn september_2025_layout() {
        let events = vec![
            event("2025-09-01", "Early"),
            event("2025-09-01", "Late"),
            event("2025-10-01", "Elsewhere"),
        ];
        let grid = MonthGrid::build(2025, 9, &events).unwrap();

        // 2025-09-01 is a Monday.
        assert_eq!(grid.leading_blanks, 1);
        assert_eq!(grid.days.len(), 30);
        assert_eq!(grid.days[0].events.len(), 2);
        assert_eq!(grid.event_count(), 2);

        let weeks = grid.weeks();
        assert_eq!(weeks.len(), 5);
        assert!(weeks[0][0].is_none());
        assert_eq!(weeks[0][1].map(|d| d.date.day()), Some(1));
        assert_eq!(weeks[4][2].map(|d| d.date.day()), Some(30));
        assert!(weeks[4][3].is_none());
    }

    #[test]
    fn leap_february() {
        let grid = MonthGrid::for_month_key("2024-02", &[]).unwrap();
        assert_eq!(grid.days.len(), 29);
        assert_eq!(grid.leading_blanks, 4);
    }

    #[test]
    fn invalid_month() {
        assert!(MonthGrid::build(2025, 13, &[]).is_none());
        assert!(MonthGrid::for_month_key("2025-00", &[]).is_err());
    }
}
