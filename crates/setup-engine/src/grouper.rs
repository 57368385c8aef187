//! Filter marker rows and merge triad partitions into combined bookings.
//!
//! Rows are partitioned by event name and the full event window.
//! Inside a partition, rows booked into all three members of a triad collapse
//! into one [`Grouped::MergedTriad`]; everything else stays
//! [`Grouped::Standalone`]. Output keeps input order, with a merged booking
//! placed at its earliest source row.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::config::Triad;
use crate::record::{Booking, EventWindow, MeetingType};

/// Separator between requirement texts of merged triad members.
pub const REQUIREMENTS_SEPARATOR: &str = "; ";

/// A booking tagged with how the grouper produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouped {
    Standalone(Booking),
    MergedTriad(Booking),
}

impl Grouped {
    pub fn booking(&self) -> &Booking {
        match self {
            Grouped::Standalone(b) | Grouped::MergedTriad(b) => b,
        }
    }

    pub fn into_booking(self) -> Booking {
        match self {
            Grouped::Standalone(b) | Grouped::MergedTriad(b) => b,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Grouped::MergedTriad(_))
    }

    fn is_emitted(&self) -> bool {
        let b = self.booking();
        b.process_flag && b.meeting_type == MeetingType::MainMeeting
    }
}

/// Data-quality issue found while merging. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    /// Members carried different account numbers; `kept` was used.
    AccountMismatch {
        event_name: String,
        triad: String,
        kept: String,
        ignored: Vec<String>,
    },
    /// A triad member was listed more than once, so the merge was refused.
    DuplicateMember {
        event_name: String,
        triad: String,
        member: String,
        rows: Vec<usize>,
    },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeWarning::AccountMismatch {
                event_name,
                triad,
                kept,
                ignored,
            } => write!(
                f,
                "{event_name} ({triad}): differing account numbers, kept {kept:?}, ignored {ignored:?}"
            ),
            MergeWarning::DuplicateMember {
                event_name,
                triad,
                member,
                rows,
            } => write!(
                f,
                "{event_name} ({triad}): {member:?} listed more than once (rows {rows:?}), not merged"
            ),
        }
    }
}

/// Result of grouping a parsed export.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Bookings to write notes for, in input order.
    pub bookings: Vec<Grouped>,
    /// Bookings that are not emitted but still occupy their venue.
    pub occupancy: Vec<Booking>,
    /// Setup/Teardown rows dropped.
    pub markers_dropped: usize,
    pub warnings: Vec<MergeWarning>,
}

impl Grouping {
    pub fn merged_count(&self) -> usize {
        self.bookings.iter().filter(|g| g.is_merged()).count()
    }
}

/// Event name plus the full window, so a same-day and a cross-day row with
/// the same clock times stay apart.
type PartitionKey = (String, EventWindow);

fn partition_key(b: &Booking) -> PartitionKey {
    (b.event_name.clone(), b.window)
}

/// Group parsed bookings into emitted bookings and venue occupancy.
pub fn group_bookings(bookings: Vec<Booking>, triads: &[Triad]) -> Grouping {
    let total = bookings.len();
    let (markers, substantive): (Vec<Booking>, Vec<Booking>) = bookings
        .into_iter()
        .partition(|b| b.meeting_type.is_marker());

    let mut order: Vec<PartitionKey> = Vec::new();
    let mut partitions: HashMap<PartitionKey, Vec<Booking>> = HashMap::new();
    for booking in substantive {
        let key = partition_key(&booking);
        partitions
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(booking);
    }

    let mut warnings = Vec::new();
    let mut grouped: Vec<Grouped> = Vec::new();
    for key in order {
        let Some(rows) = partitions.remove(&key) else {
            continue;
        };
        grouped.extend(collapse_partition(rows, triads, &mut warnings));
    }
    grouped.sort_by_key(|g| g.booking().first_row());

    let (emitted, rest): (Vec<Grouped>, Vec<Grouped>) =
        grouped.into_iter().partition(Grouped::is_emitted);
    let occupancy: Vec<Booking> = rest.into_iter().map(Grouped::into_booking).collect();

    let grouping = Grouping {
        bookings: emitted,
        occupancy,
        markers_dropped: markers.len(),
        warnings,
    };
    debug!(
        rows = total,
        markers = grouping.markers_dropped,
        emitted = grouping.bookings.len(),
        merged = grouping.merged_count(),
        occupancy = grouping.occupancy.len(),
        "grouped bookings"
    );
    grouping
}

/// Collapse one partition: merge complete triads, keep the rest standalone.
fn collapse_partition(
    rows: Vec<Booking>,
    triads: &[Triad],
    warnings: &mut Vec<MergeWarning>,
) -> Vec<Grouped> {
    let mut remaining: Vec<Option<Booking>> = rows.into_iter().map(Some).collect();
    let mut out = Vec::new();

    for triad in triads {
        // (row position in partition, member index)
        let members: Vec<(usize, usize)> = remaining
            .iter()
            .enumerate()
            .filter_map(|(pos, b)| {
                let b = b.as_ref()?;
                triad_member(triad, b).map(|m| (pos, m))
            })
            .collect();

        let mut counts = [0usize; 3];
        for &(_, m) in &members {
            counts[m] += 1;
        }
        if counts.contains(&0) {
            continue;
        }

        if let Some(dup) = counts.iter().position(|&c| c > 1) {
            let event_name = members
                .first()
                .and_then(|&(pos, _)| remaining[pos].as_ref())
                .map(|b| b.event_name.clone())
                .unwrap_or_default();
            let rows = members
                .iter()
                .filter(|&&(_, m)| m == dup)
                .filter_map(|&(pos, _)| remaining[pos].as_ref())
                .map(Booking::first_row)
                .collect();
            let warning = MergeWarning::DuplicateMember {
                event_name,
                triad: triad.code.clone(),
                member: triad.members[dup].clone(),
                rows,
            };
            warn!(%warning, "triad merge refused");
            warnings.push(warning);
            continue;
        }

        let mut parts: Vec<(usize, Booking)> = members
            .iter()
            .filter_map(|&(pos, m)| remaining[pos].take().map(|b| (m, b)))
            .collect();
        parts.sort_by_key(|(m, _)| *m);
        out.push(Grouped::MergedTriad(merge_triad(triad, parts, warnings)));
    }

    out.extend(remaining.into_iter().flatten().map(Grouped::Standalone));
    out
}

/// Member index of `booking` within `triad`, by matched table key or raw location.
fn triad_member(triad: &Triad, booking: &Booking) -> Option<usize> {
    booking
        .venue_key
        .as_deref()
        .and_then(|key| triad.member_index(key))
        .or_else(|| triad.member_index(&booking.venue_raw))
}

/// Merge the three member bookings (sorted by member index) into one.
fn merge_triad(
    triad: &Triad,
    parts: Vec<(usize, Booking)>,
    warnings: &mut Vec<MergeWarning>,
) -> Booking {
    let bookings: Vec<Booking> = parts.into_iter().map(|(_, b)| b).collect();
    let first = &bookings[0];

    let mut requirements: Vec<&str> = Vec::new();
    for b in &bookings {
        let r = b.setup_requirements.trim();
        if !r.is_empty() && !requirements.contains(&r) {
            requirements.push(r);
        }
    }

    let mut accounts = bookings
        .iter()
        .map(|b| b.account_number.trim())
        .filter(|a| !a.is_empty());
    let account_number = accounts.next().unwrap_or_default().to_string();
    let mut ignored: Vec<String> = Vec::new();
    for a in accounts {
        if a != account_number && !ignored.iter().any(|i| i == a) {
            ignored.push(a.to_string());
        }
    }
    if !ignored.is_empty() {
        let warning = MergeWarning::AccountMismatch {
            event_name: first.event_name.clone(),
            triad: triad.code.clone(),
            kept: account_number.clone(),
            ignored,
        };
        warn!(%warning, "inconsistent triad rows");
        warnings.push(warning);
    }

    let meeting_type = if bookings
        .iter()
        .any(|b| b.meeting_type == MeetingType::MainMeeting)
    {
        MeetingType::MainMeeting
    } else {
        first.meeting_type.clone()
    };

    let mut source_rows: Vec<usize> = bookings
        .iter()
        .flat_map(|b| b.source_rows.iter().copied())
        .collect();
    source_rows.sort_unstable();

    Booking {
        event_name: first.event_name.clone(),
        venue_raw: triad.name.clone(),
        venue_code: triad.code.clone(),
        venue_label: triad.label.clone(),
        venue_key: Some(triad.name.clone()),
        window: first.window,
        meeting_type,
        process_flag: bookings.iter().any(|b| b.process_flag),
        setup_requirements: requirements.join(REQUIREMENTS_SEPARATOR),
        account_number,
        component_venues: bookings.iter().map(|b| b.venue_raw.clone()).collect(),
        source_rows,
        schedule: None,
    }
}
