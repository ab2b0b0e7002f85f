//! Month/year banner detection.
//!
//! Pasted calendar widgets carry a banner such as `September 2025` or `März 2025`.
//! The first such banner fixes the month every day cell is resolved against.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ScheduleError;

/// Month names recognised in a banner, mapped to their 0-based month index.
/// English and German, with the unaccented German spellings as separate keys.
pub static MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 0),
    ("januar", 0),
    ("february", 1),
    ("februar", 1),
    ("march", 2),
    ("märz", 2),
    ("maerz", 2),
    ("april", 3),
    ("may", 4),
    ("mai", 4),
    ("june", 5),
    ("juni", 5),
    ("july", 6),
    ("juli", 6),
    ("august", 7),
    ("september", 8),
    ("october", 9),
    ("oktober", 9),
    ("november", 10),
    ("december", 11),
    ("dezember", 11),
];

static BANNER_RE: Lazy<Regex> = Lazy::new(|| {
    // Longest names first so "januar" never shadows "january".
    let mut names: Vec<&str> = MONTH_NAMES.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.chars().count()));
    let alternation = names.iter().map(|name| regex::escape(name)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b({})\s+(\d{{4}})", alternation)).expect("banner regex is valid")
});

/// The month/year every day number in one paste is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMonthYear {
    pub year: i32,
    /// 0-based month index (0 = January).
    pub month: u32,
}

impl AnchorMonthYear {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!(month < 12, "month index out of range: {}", month);
        Self { year, month }
    }

    /// Calendar month number, 1 through 12.
    pub fn month_number(&self) -> u32 {
        self.month + 1
    }

    pub fn previous(self) -> Self {
        if self.month == 0 {
            Self { year: self.year - 1, month: 11 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 11 {
            Self { year: self.year + 1, month: 0 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// `YYYY-MM` key, the same shape used for affected-month sets.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month_number())
    }
}

/// Look up a month name (any case) in the bilingual table.
pub fn month_index(name: &str) -> Option<u32> {
    let lowered = name.to_lowercase();
    MONTH_NAMES.iter().find(|(candidate, _)| *candidate == lowered).map(|(_, index)| *index)
}

/// Text of the first `<month name> <year>` banner in `raw`, exactly as pasted.
///
/// Later month mentions (in titles or notes) are not banners.
pub fn find_banner(raw: &str) -> Option<&str> {
    BANNER_RE.find(raw).map(|m| m.as_str())
}

/// Find the first `<month name> <year>` banner in the raw text.
pub fn resolve_anchor(raw: &str) -> Result<AnchorMonthYear, ScheduleError> {
    let caps = BANNER_RE.captures(raw).ok_or(ScheduleError::MissingMonthAnchor)?;

    let month = month_index(&caps[1]).ok_or(ScheduleError::MissingMonthAnchor)?;
    let year: i32 = caps[2].parse().map_err(|_| ScheduleError::MissingMonthAnchor)?;

    log::debug!("Resolved anchor month {} from banner '{}'", month + 1, &caps[0]);
    Ok(AnchorMonthYear::new(year, month))
}
