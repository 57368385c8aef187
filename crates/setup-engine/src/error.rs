//! Error types for setup-engine operations.

use thiserror::Error;

/// Why a single booking row could not be turned into a [`Booking`](crate::record::Booking).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("unparseable date/time: {0:?}")]
    InvalidDateTime(String),

    #[error("event window ends before it starts: {0:?}")]
    EmptyWindow(String),
}

/// Errors raised while building or loading a [`NotesConfig`](crate::config::NotesConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid time of day {0:?} (expected \"H:MM\" or \"H:MM AM\")")]
    InvalidTime(String),

    #[error("unknown rule profile {0:?} (available: standard, extended)")]
    UnknownProfile(String),

    #[error("triad {code}: {reason}")]
    InvalidTriad { code: String, reason: String },

    #[error("invalid {name} window: {start} must be before {end}")]
    InvalidWindow {
        name: &'static str,
        start: String,
        end: String,
    },

    #[error("{0} must not be negative")]
    NegativeDuration(&'static str),

    #[error("{name} must be at most {max_minutes} minutes")]
    DurationTooLong {
        name: &'static str,
        max_minutes: i64,
    },

    #[error("venue {0:?} has an empty code")]
    EmptyCode(String),
}

/// Errors that stop a notes run.
#[derive(Error, Debug)]
pub enum NotesError {
    /// A malformed row in strict mode. `row` is zero-based; the message is not.
    #[error("row {}: {source}", .row + 1)]
    Row {
        row: usize,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run completed but nothing was flagged for processing.
    #[error("no processable bookings ({rows} rows read, {skipped} skipped)")]
    NoProcessableBookings { rows: usize, skipped: usize },
}

pub type Result<T> = std::result::Result<T, NotesError>;
