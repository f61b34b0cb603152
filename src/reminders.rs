//! Reminders for Leaf
//!
//! Reminders are short date/time-tagged notes kept in the settings file
//! under `reminders_dict`. The whole map is written back on every change as
//! a single settings save, and the in-memory copy only changes once that
//! save has succeeded.

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest description accepted, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 150;

const DATE_FORMAT: &str = "%Y-%m-%d";
const SORT_KEY_FORMAT: &str = "%Y-%m-%d %H:%M";

// ─────────────────────────────────────────────────────────────────────────────
// Reminder
// ─────────────────────────────────────────────────────────────────────────────

/// A single reminder.
///
/// Reminders are immutable once stored; editing one means deleting it and
/// adding a replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Creation time in milliseconds since the epoch, unique per store
    pub key: i64,
    /// `yyyy-MM-dd HH:mm`, orders reminders chronologically as text
    pub sort_key: String,
    pub title: String,
    pub description: String,
    /// `yyyy-MM-dd`
    pub date: String,
    /// `h:mm AM` or `h:mm PM`
    pub time: String,
}

impl Reminder {
    /// Build a validated reminder.
    ///
    /// The time is stored in canonical form, so `1:00 pm` becomes `1:00 PM`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidReminder` if the date or time does not parse, the
    /// title is blank, or the description is too long.
    pub fn new(key: i64, date: &str, time: &str, title: &str, description: &str) -> Result<Self> {
        let day = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|e| Error::InvalidReminder(format!("bad date '{}': {}", date, e)))?;
        let (hour, minute) = parse_12_hour(time)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidReminder("title is empty".to_string()));
        }
        let description_len = description.chars().count();
        if description_len > MAX_DESCRIPTION_CHARS {
            return Err(Error::InvalidReminder(format!(
                "description is {} characters, the limit is {}",
                description_len, MAX_DESCRIPTION_CHARS
            )));
        }

        let date = day.format(DATE_FORMAT).to_string();
        Ok(Self {
            key,
            sort_key: format!("{} {:02}:{:02}", date, hour, minute),
            title: title.to_string(),
            description: description.to_string(),
            date,
            time: format_12_hour(hour, minute),
        })
    }

    /// When the reminder is due, if its sort key is well formed.
    pub fn due(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.sort_key, SORT_KEY_FORMAT).ok()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 12/24-Hour Conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Convert `h:mm AM/PM` to zero-padded `HH:mm`.
///
/// `12:xx AM` is just after midnight (`00:xx`) and `12:xx PM` is just after
/// noon (`12:xx`).
pub fn convert_24(time: &str) -> Result<String> {
    let (hour, minute) = parse_12_hour(time)?;
    Ok(format!("{:02}:{:02}", hour, minute))
}

/// Parse `h:mm AM/PM` into a 24-hour `(hour, minute)`.
fn parse_12_hour(time: &str) -> Result<(u32, u32)> {
    let invalid = || Error::InvalidReminder(format!("bad time '{}', expected h:mm AM/PM", time));

    let trimmed = time.trim();
    if trimmed.len() < 2 || !trimmed.is_char_boundary(trimmed.len() - 2) {
        return Err(invalid());
    }
    let (clock, meridiem) = trimmed.split_at(trimmed.len() - 2);
    let is_pm = match meridiem.to_ascii_uppercase().as_str() {
        "AM" => false,
        "PM" => true,
        _ => return Err(invalid()),
    };

    let (hour, minute) = clock.trim_end().split_once(':').ok_or_else(invalid)?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return Err(invalid());
    }
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(invalid());
    }

    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    Ok((hour, minute))
}

fn format_12_hour(hour: u32, minute: u32) -> String {
    let (display, meridiem) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{}:{:02} {}", display, minute, meridiem)
}

// ─────────────────────────────────────────────────────────────────────────────
// Reminder Store
// ─────────────────────────────────────────────────────────────────────────────

/// The reminders map and the settings file it lives in.
#[derive(Debug)]
pub struct ReminderStore {
    config: ConfigStore,
    reminders: BTreeMap<i64, Reminder>,
}

impl ReminderStore {
    /// Load the reminders saved in `config`.
    pub fn load(config: ConfigStore) -> Result<Self> {
        let reminders = config.load()?.reminders;
        debug!("Loaded {} reminder(s)", reminders.len());
        Ok(Self { config, reminders })
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn get(&self, key: i64) -> Option<&Reminder> {
        self.reminders.get(&key)
    }

    /// All reminders, earliest first.
    pub fn list(&self) -> Vec<&Reminder> {
        let mut all: Vec<_> = self.reminders.values().collect();
        all.sort_by(|a, b| a.sort_key.cmp(&b.sort_key).then(a.key.cmp(&b.key)));
        all
    }

    /// Reminders on a `yyyy-MM-dd` day, earliest first.
    pub fn on_date(&self, date: &str) -> Vec<&Reminder> {
        let wanted = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|_| date.to_string());
        self.list()
            .into_iter()
            .filter(|r| r.date == wanted)
            .collect()
    }

    /// Reminders due at or after `now`, earliest first.
    pub fn upcoming(&self, now: NaiveDateTime) -> Vec<&Reminder> {
        self.list()
            .into_iter()
            .filter(|r| r.due().is_some_and(|due| due >= now))
            .collect()
    }

    /// Add a reminder and persist the map.
    ///
    /// Returns the new reminder's key.
    pub fn add_reminder(
        &mut self,
        date: &str,
        time: &str,
        title: &str,
        description: &str,
    ) -> Result<i64> {
        let key = self.next_key();
        let reminder = Reminder::new(key, date, time, title, description)?;

        let mut next = self.reminders.clone();
        next.insert(key, reminder);
        self.commit(next)?;

        info!("Added reminder {} for {} {}", key, date, time);
        Ok(key)
    }

    /// Delete a reminder and persist the map.
    ///
    /// Returns `false`, without writing anything, if `key` is unknown.
    pub fn delete_reminder(&mut self, key: i64) -> Result<bool> {
        if !self.reminders.contains_key(&key) {
            debug!("No reminder with key {}", key);
            return Ok(false);
        }

        let mut next = self.reminders.clone();
        next.remove(&key);
        self.commit(next)?;

        info!("Deleted reminder {}", key);
        Ok(true)
    }

    fn next_key(&self) -> i64 {
        let mut key = Utc::now().timestamp_millis();
        while self.reminders.contains_key(&key) {
            key += 1;
        }
        key
    }

    fn commit(&mut self, next: BTreeMap<i64, Reminder>) -> Result<()> {
        self.config
            .update(|settings| settings.reminders = next.clone())?;
        self.reminders = next;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
