//! End-to-end run: parse → group/merge → derive → format.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::NotesConfig;
use crate::error::{NotesError, ParseError, Result};
use crate::grouper::{group_bookings, Grouping, MergeWarning};
use crate::notes::{format_note, reservation_number, BLOCK_SEPARATOR};
use crate::record::{parse_row, Booking, RawRow};
use crate::schedule::derive_schedules;
use crate::venue::VenueResolver;

/// Knobs the surrounding tool can set per run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Fail on the first malformed row instead of skipping it.
    pub strict: bool,
}

/// A row that could not be parsed and was left out of the run.
///
/// `row` is the zero-based data row index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub row: usize,
    pub error: ParseError,
}

/// Parsed and grouped rows, before schedule derivation.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub rows_read: usize,
    pub skipped: Vec<SkippedRow>,
    pub grouping: Grouping,
}

/// One emitted note together with the booking it was rendered from.
#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub reservation_number: String,
    pub merged: bool,
    pub booking: Booking,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NotesReport {
    pub rows_read: usize,
    pub skipped: Vec<SkippedRow>,
    pub markers_dropped: usize,
    pub warnings: Vec<MergeWarning>,
    pub notes: Vec<Note>,
}

impl NotesReport {
    /// All note blocks joined by blank lines, with a trailing newline.
    pub fn render(&self) -> String {
        let mut out = self
            .notes
            .iter()
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR);
        out.push('\n');
        out
    }

    /// Note text for export row `row`, if that row contributed to a note.
    pub fn note_for_row(&self, row: usize) -> Option<&str> {
        self.notes
            .iter()
            .find(|n| n.booking.source_rows.contains(&row))
            .map(|n| n.text.as_str())
    }
}

/// Parse every row, skipping (or, when strict, failing on) malformed ones.
pub fn parse_rows(
    rows: &[RawRow],
    venues: &VenueResolver,
    options: &RunOptions,
) -> Result<(Vec<Booking>, Vec<SkippedRow>)> {
    let mut bookings = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        match parse_row(row, i, venues) {
            Ok(b) => bookings.push(b),
            Err(error) if options.strict => {
                return Err(NotesError::Row {
                    row: i,
                    source: error,
                });
            }
            Err(error) => {
                warn!(row = i + 1, %error, "skipping malformed row");
                skipped.push(SkippedRow { row: i, error });
            }
        }
    }
    Ok((bookings, skipped))
}

/// Parse and group without deriving schedules.
pub fn prepare(rows: &[RawRow], config: &NotesConfig, options: &RunOptions) -> Result<Prepared> {
    let venues = VenueResolver::new(&config.venues);
    let (bookings, skipped) = parse_rows(rows, &venues, options)?;
    let grouping = group_bookings(bookings, &config.triads);
    Ok(Prepared {
        rows_read: rows.len(),
        skipped,
        grouping,
    })
}

/// Run the whole pipeline over `rows`.
///
/// Returns [`NotesError::NoProcessableBookings`] when nothing is flagged for
/// processing, so an empty result is never silent.
pub fn generate(
    rows: &[RawRow],
    config: &NotesConfig,
    options: &RunOptions,
) -> Result<NotesReport> {
    let Prepared {
        rows_read,
        skipped,
        grouping,
    } = prepare(rows, config, options)?;

    if grouping.bookings.is_empty() {
        return Err(NotesError::NoProcessableBookings {
            rows: rows_read,
            skipped: skipped.len(),
        });
    }

    let merged: Vec<bool> = grouping.bookings.iter().map(|g| g.is_merged()).collect();
    let mut bookings: Vec<Booking> = grouping
        .bookings
        .into_iter()
        .map(|g| g.into_booking())
        .collect();
    derive_schedules(&mut bookings, &grouping.occupancy, &config.rules);

    let notes: Vec<Note> = bookings
        .into_iter()
        .zip(merged)
        .map(|(booking, merged)| Note {
            reservation_number: reservation_number(&booking),
            merged,
            text: format_note(&booking),
            booking,
        })
        .collect();

    info!(
        rows = rows_read,
        skipped = skipped.len(),
        notes = notes.len(),
        warnings = grouping.warnings.len(),
        "generated notes"
    );

    Ok(NotesReport {
        rows_read,
        skipped,
        markers_dropped: grouping.markers_dropped,
        warnings: grouping.warnings,
        notes,
    })
}
