//! Render annotated bookings into the fixed note block format:
//!
//! ```text
//! Account Number: 1234-5678
//! Reservation Number: 0127UCCABCPM
//! TechFlex: 60 chairs, podium
//! Please set up on Tuesday, January 27, at 4:30 PM
//! Please break down the next day, Wednesday, January 28, at 8:00 AM
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::record::{Booking, EventWindow};
use crate::schedule::{DerivedInstant, ScheduleRule};

pub const BLOCK_SEPARATOR: &str = "\n\n";

const OVERTIME_MARKER: &str = " [Overtime]";
const FRIDAY_MARKER: &str = " [Friday setup]";
const SETUP_WARNING: &str = " [WARNING: Back-to-back event, verify setup time]";
const BREAKDOWN_WARNING: &str = " [WARNING: Back-to-back event, verify breakdown time]";

/// `MMDD` + venue code + `AM`/`PM` of the start time.
///
/// All-day bookings have no half-day token.
pub fn reservation_number(booking: &Booking) -> String {
    let date = booking.window.start_date().format("%m%d");
    match booking.window {
        EventWindow::Timed { start, .. } => {
            let half = if start.hour() < 12 { "AM" } else { "PM" };
            format!("{date}{}{half}", booking.venue_code)
        }
        EventWindow::AllDay { .. } => format!("{date}{}", booking.venue_code),
    }
}

/// Render one booking as a note block (no trailing newline).
pub fn format_note(booking: &Booking) -> String {
    let mut lines = vec![
        format!("Account Number: {}", booking.account_number).trim_end().to_string(),
        format!("Reservation Number: {}", reservation_number(booking)),
        format!("{}: {}", booking.venue_label, booking.setup_requirements.trim())
            .trim_end()
            .to_string(),
    ];
    if let Some(schedule) = &booking.schedule {
        lines.push(setup_line(&schedule.setup));
        lines.push(breakdown_line(&schedule.breakdown));
    }
    lines.join("\n")
}

/// Render all bookings, in order, separated by blank lines.
pub fn format_notes(bookings: &[Booking]) -> String {
    bookings
        .iter()
        .map(format_note)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn setup_line(setup: &DerivedInstant) -> String {
    let mut line = format!("Please set up on {}", format_instant(setup.at));
    match setup.rule {
        ScheduleRule::EarlyMorning => line.push_str(OVERTIME_MARKER),
        ScheduleRule::Friday => line.push_str(FRIDAY_MARKER),
        _ => {}
    }
    if setup.back_to_back {
        line.push_str(SETUP_WARNING);
    }
    line
}

fn breakdown_line(breakdown: &DerivedInstant) -> String {
    let mut line = if breakdown.is_next_day() {
        format!("Please break down the next day, {}", format_instant(breakdown.at))
    } else {
        format!("Please break down on {}", format_instant(breakdown.at))
    };
    if breakdown.back_to_back {
        line.push_str(BREAKDOWN_WARNING);
    }
    line
}

fn format_instant(at: NaiveDateTime) -> String {
    format!("{}, at {}", format_day(at.date()), format_clock(at.time()))
}

/// `Thursday, February 5`
pub fn format_day(day: NaiveDate) -> String {
    day.format("%A, %B %-d").to_string()
}

/// `9:30 AM`
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}
