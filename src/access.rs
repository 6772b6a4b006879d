//! Access windows: which days and hours each trigger is honoured.
//!
//! A [`ZoneTable`] maps each [`Zone`] to an [`AccessWindow`].  Evaluation is
//! a pure function of the zone and a local timestamp:
//!
//! | Zone              | Gates                                   |
//! |-------------------|-----------------------------------------|
//! | `primary_code`    | the primary secret code                 |
//! | `immediate_blink` | key press after the short blink count   |
//! | `delayed_blink`   | key press after the long blink count    |
//!
//! The override code has no zone: it is honoured at any time.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use log::warn;
use serde::{Deserialize, Serialize};

/// Named access rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    PrimaryCode,
    ImmediateBlink,
    DelayedBlink,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::PrimaryCode, Zone::ImmediateBlink, Zone::DelayedBlink];
}

/// Which days of the week a window applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayClass {
    /// Monday through Friday.
    Weekdays,
    /// Saturday and Sunday.
    Weekend,
}

impl DayClass {
    pub fn matches(self, day: Weekday) -> bool {
        let weekend = matches!(day, Weekday::Sat | Weekday::Sun);
        match self {
            Self::Weekdays => !weekend,
            Self::Weekend => weekend,
        }
    }
}

/// A day-class plus an inclusive `[start, end]` time-of-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessWindow {
    pub days: DayClass,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl AccessWindow {
    pub fn new(days: DayClass, start: NaiveTime, end: NaiveTime) -> Self {
        Self { days, start, end }
    }

    /// Whether `at` falls inside the window.  Compared at minute
    /// resolution, so `end = 18:59` admits everything up to 18:59:59.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        if !self.days.matches(at.weekday()) {
            return false;
        }
        let minute = minutes_of_day(at.time());
        (minutes_of_day(self.start)..=minutes_of_day(self.end)).contains(&minute)
    }
}

fn minutes_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Zone → window lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneTable(BTreeMap<Zone, AccessWindow>);

impl ZoneTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, zone: Zone, window: AccessWindow) -> Self {
        self.0.insert(zone, window);
        self
    }

    pub fn contains_zone(&self, zone: Zone) -> bool {
        self.0.contains_key(&zone)
    }

    /// Whether `zone` permits access at local time `at`.  A zone missing
    /// from the table never permits access.
    pub fn allowed(&self, zone: Zone, at: NaiveDateTime) -> bool {
        match self.0.get(&zone) {
            Some(window) => window.contains(at),
            None => {
                warn!("Access: no window configured for {:?}, denying", zone);
                false
            }
        }
    }
}

/// `HH:MM` (de)serialisation for [`NaiveTime`].
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
