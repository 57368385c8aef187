//! Raw export rows and the typed [`Booking`] parsed from them.
//!
//! The export's `Date & Time` column comes in a few literal shapes:
//!
//! - `Feb 5, 2026 10:00 AM - 12:00 PM` (single-day range; an end time earlier
//!   than the start time means the event runs past midnight)
//! - `Jan 27, 2026 10:00 PM - Jan 28, 2026 1:00 AM` (cross-day range)
//! - `5-Feb-26`, `Feb 5, 2026`, `Feb 5, 2026 - Feb 6, 2026` (all-day)

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::ParseError;
use crate::schedule::Schedule;
use crate::venue::VenueResolver;

pub const EVENT_NAME: &str = "Event Name";
pub const DATE_TIME: &str = "Date & Time";
pub const LOCATION: &str = "Location";
pub const MEETING_TYPE: &str = "Meeting Type";
pub const PROCESS_EVENT: &str = "Process_Event";
pub const SETUP_REQUIREMENTS: &str = "Setup_Requirements";
pub const RESOURCES: &str = "Resources";
pub const ACCOUNT_NUMBER: &str = "Account Number";

/// One row of the export, kept as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    /// Value of `column`, compared case-insensitively and ignoring
    /// whitespace around the header.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(column))
            .map(|(_, value)| value.as_str())
    }

    /// All `(column, value)` pairs in export order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Kind of reservation row. Only main meetings become notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingType {
    MainMeeting,
    Setup,
    Teardown,
    Other(String),
}

impl MeetingType {
    pub fn parse(text: &str) -> Self {
        let normalized: String = text
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "" | "mainmeeting" | "main" | "meeting" => MeetingType::MainMeeting,
            "setup" => MeetingType::Setup,
            "teardown" | "breakdown" => MeetingType::Teardown,
            _ => MeetingType::Other(text.trim().to_string()),
        }
    }

    /// Setup and teardown rows only reserve the room around a real event.
    pub fn is_marker(&self) -> bool {
        matches!(self, MeetingType::Setup | MeetingType::Teardown)
    }
}

/// When a booking happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventWindow {
    Timed {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Date-only rows: no time of day, so no setup/breakdown is derived.
    AllDay {
        first_day: NaiveDate,
        last_day: NaiveDate,
    },
}

impl EventWindow {
    pub fn start_date(&self) -> NaiveDate {
        match self {
            EventWindow::Timed { start, .. } => start.date(),
            EventWindow::AllDay { first_day, .. } => *first_day,
        }
    }

    pub fn timed(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self {
            EventWindow::Timed { start, end } => Some((*start, *end)),
            EventWindow::AllDay { .. } => None,
        }
    }
}

/// One logical event occupying one (possibly merged) venue for one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub event_name: String,
    pub venue_raw: String,
    pub venue_code: String,
    pub venue_label: String,
    /// Venue-table key the location matched, if any.
    #[serde(skip)]
    pub venue_key: Option<String>,
    pub window: EventWindow,
    pub meeting_type: MeetingType,
    pub process_flag: bool,
    pub setup_requirements: String,
    pub account_number: String,
    /// Raw locations absorbed by a triad merge; empty for standalone bookings.
    pub component_venues: Vec<String>,
    /// Zero-based indices of the export rows this booking came from.
    pub source_rows: Vec<usize>,
    pub schedule: Option<Schedule>,
}

impl Booking {
    /// Earliest export row this booking came from.
    pub fn first_row(&self) -> usize {
        self.source_rows.first().copied().unwrap_or(usize::MAX)
    }

    pub fn is_merged(&self) -> bool {
        !self.component_venues.is_empty()
    }
}

/// Parse row number `index` of the export into a [`Booking`].
pub fn parse_row(
    row: &RawRow,
    index: usize,
    venues: &VenueResolver,
) -> Result<Booking, ParseError> {
    let event_name = required(row, EVENT_NAME)?;
    let date_time = required(row, DATE_TIME)?;
    let location = required(row, LOCATION)?;

    let window = parse_date_time(date_time)?;
    let venue = venues.resolve(location);

    let setup_requirements = optional(row, SETUP_REQUIREMENTS)
        .filter(|s| !s.is_empty())
        .or_else(|| optional(row, RESOURCES))
        .unwrap_or_default();

    Ok(Booking {
        event_name: event_name.to_string(),
        venue_raw: location.to_string(),
        venue_code: venue.code,
        venue_label: venue.label,
        venue_key: venue.key,
        window,
        meeting_type: MeetingType::parse(optional(row, MEETING_TYPE).unwrap_or_default()),
        process_flag: parse_flag(optional(row, PROCESS_EVENT).unwrap_or_default()),
        setup_requirements: setup_requirements.to_string(),
        account_number: optional(row, ACCOUNT_NUMBER).unwrap_or_default().to_string(),
        component_venues: Vec::new(),
        source_rows: vec![index],
        schedule: None,
    })
}

fn required<'a>(row: &'a RawRow, column: &'static str) -> Result<&'a str, ParseError> {
    optional(row, column)
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingColumn(column))
}

fn optional<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.get(column).map(str::trim)
}

/// `Process_Event` truthiness.
pub fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_uppercase().as_str(),
        "YES" | "Y" | "TRUE" | "1" | "X"
    )
}

/// Parse the export's `Date & Time` text into an [`EventWindow`].
pub fn parse_date_time(text: &str) -> Result<EventWindow, ParseError> {
    let normalized = text
        .replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let invalid = || ParseError::InvalidDateTime(text.trim().to_string());

    let Some((left, right)) = normalized.split_once(" - ") else {
        let day = parse_date(&normalized).ok_or_else(invalid)?;
        return Ok(EventWindow::AllDay {
            first_day: day,
            last_day: day,
        });
    };

    if let Some(start) = parse_date_time_point(left) {
        let end = match parse_date_time_point(right) {
            Some(end) => end,
            None => {
                let time = parse_time(right).ok_or_else(invalid)?;
                let end = start.date().and_time(time);
                if end < start {
                    end + Duration::days(1)
                } else {
                    end
                }
            }
        };
        if end <= start {
            return Err(ParseError::EmptyWindow(text.trim().to_string()));
        }
        return Ok(EventWindow::Timed { start, end });
    }

    match (parse_date(left), parse_date(right)) {
        (Some(first_day), Some(last_day)) if last_day >= first_day => Ok(EventWindow::AllDay {
            first_day,
            last_day,
        }),
        (Some(_), Some(_)) => Err(ParseError::EmptyWindow(text.trim().to_string())),
        _ => Err(invalid()),
    }
}

fn parse_date_time_point(s: &str) -> Option<NaiveDateTime> {
    ["%b %d, %Y %I:%M %p", "%b %d, %Y %I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    ["%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s.trim(), fmt).ok())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    ["%d-%b-%y", "%b %d, %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok())
}
