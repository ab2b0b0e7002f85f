//! Line cleanup for pasted calendar text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::anchor::find_banner;

/// Navigation arrow that calendar widgets render next to the banner.
const NAV_GLYPH: char = '►';

/// Single-letter column header for calendar-week numbers.
const WEEK_MARKER: &str = "W";

static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:mon|tue|wed|thu|fri|sat|sun|mo|di|mi|do|fr|sa|so)\b")
        .expect("weekday regex is valid")
});

/// Split raw text into trimmed, non-empty lines with widget noise removed.
///
/// Filtering is line-granular: a kept line is never split or edited beyond
/// glyph removal and trimming. Only lines carrying the anchor banner text are
/// dropped as banners; other month mentions stay part of titles and notes.
pub fn tokenize(raw: &str) -> Vec<String> {
    let banner = find_banner(raw);
    raw.lines().filter_map(|line| clean_line(line, banner)).collect()
}

fn clean_line(line: &str, banner: Option<&str>) -> Option<String> {
    let stripped = line.replace(NAV_GLYPH, "");
    let trimmed = stripped.trim();

    if trimmed.is_empty()
        || trimmed == WEEK_MARKER
        || WEEKDAY_RE.is_match(trimmed)
        || banner.is_some_and(|banner| trimmed.contains(banner))
    {
        return None;
    }

    Some(trimmed.to_string())
}
