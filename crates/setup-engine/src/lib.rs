//! # setup-engine
//!
//! Turns a venue-booking export into facility setup/breakdown notes.
//!
//! Rows flow through four stages: each raw row is parsed into a [`Booking`],
//! bookings for the same event across all three partitions of a split room are
//! merged, setup and breakdown instants are derived from operating rules and
//! neighboring bookings in the same venue, and every flagged booking is
//! rendered into a fixed text block.
//!
//! ## Quick start
//!
//! ```rust
//! use setup_engine::{generate, NotesConfig, RawRow, RunOptions};
//!
//! let row: RawRow = [
//!     ("Event Name", "APO Pinning"),
//!     ("Date & Time", "Jan 27, 2026 6:30 PM - 8:30 PM"),
//!     ("Location", "Babbio 122"),
//!     ("Process_Event", "YES"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let report = generate(&[row], &NotesConfig::default(), &RunOptions::default()).unwrap();
//! assert_eq!(report.notes[0].reservation_number, "0127BC122PM");
//! ```
//!
//! ## Modules
//!
//! - [`record`] — raw rows → typed bookings
//! - [`venue`] — location strings → venue codes and labels
//! - [`grouper`] — marker filtering and triad merging
//! - [`schedule`] — setup/breakdown derivation
//! - [`notes`] — note block rendering
//! - [`pipeline`] — the whole run
//! - [`config`] — venue tables and rule thresholds
//! - [`error`] — error types

pub mod config;
pub mod error;
pub mod grouper;
pub mod notes;
pub mod pipeline;
pub mod record;
pub mod schedule;
pub mod venue;

pub use config::{NotesConfig, RuleProfile, ScheduleRules, Triad, VenueEntry};
pub use error::{ConfigError, NotesError, ParseError};
pub use grouper::{group_bookings, Grouped, Grouping, MergeWarning};
pub use notes::{format_note, format_notes, reservation_number};
pub use pipeline::{generate, prepare, Note, NotesReport, RunOptions, SkippedRow};
pub use record::{parse_date_time, parse_row, Booking, EventWindow, MeetingType, RawRow};
pub use schedule::{derive_schedules, DerivedInstant, Schedule, ScheduleRule};
pub use venue::{VenueResolution, VenueResolver};
