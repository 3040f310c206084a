//! Opening hours evaluation
//!
//! Hours are kept per day name as `HH:MM-HH:MM` in UTC. A range whose end is
//! not after its start runs past midnight into the next day, and
//! `00:00-24:00` covers the whole day. `Closed`, an empty value or a value
//! that does not parse means closed.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use std::collections::BTreeMap;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Range {
    open: u32,
    close: u32,
}

impl Range {
    fn wraps(&self) -> bool {
        self.close <= self.open
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_minutes(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let (h, m): (u32, u32) = (h.parse().ok()?, m.parse().ok()?);
    if h > 24 || m >= 60 {
        return None;
    }
    let total = h * 60 + m;
    (total <= MINUTES_PER_DAY).then_some(total)
}

fn parse_range(raw: &str) -> Option<Range> {
    let (open, close) = raw.split_once('-')?;
    let range = Range {
        open: parse_minutes(open)?,
        close: parse_minutes(close)?,
    };
    // 24:00 is only meaningful as a closing time
    (range.open < MINUTES_PER_DAY).then_some(range)
}

fn hours_for(hours: &BTreeMap<String, String>, day: Weekday) -> Option<Range> {
    let name = day_name(day);
    hours
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .and_then(|(_, v)| parse_range(v))
}

/// Whether a venue with these hours is open at `at`
pub fn is_open_at(hours: &BTreeMap<String, String>, at: DateTime<Utc>) -> bool {
    let now = at.hour() * 60 + at.minute();
    let today = at.weekday();

    let open_today = hours_for(hours, today).is_some_and(|r| {
        if r.wraps() {
            now >= r.open
        } else {
            now >= r.open && now < r.close
        }
    });

    let spill_from_yesterday = hours_for(hours, today.pred())
        .is_some_and(|r| r.wraps() && now < r.close);

    open_today || spill_from_yesterday
}
