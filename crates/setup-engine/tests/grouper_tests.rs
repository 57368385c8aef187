//! Tests for marker filtering, triad merging, and occupancy partitioning.

use setup_engine::config::NotesConfig;
use setup_engine::grouper::{group_bookings, Grouped, MergeWarning};
use setup_engine::record::{parse_row, Booking, MeetingType, RawRow};
use setup_engine::venue::VenueResolver;

const TECHFLEX_A: &str = "UCC Tech Flex Space A";
const TECHFLEX_B: &str = "UCC Tech Flex Space B";
const TECHFLEX_C: &str = "UCC Tech Flex Space C";
const EVENING: &str = "Jan 27, 2026 6:30 PM - 8:30 PM";

struct Row<'a> {
    name: &'a str,
    when: &'a str,
    location: &'a str,
    meeting_type: &'a str,
    process: &'a str,
    requirements: &'a str,
    account: &'a str,
}

impl Default for Row<'_> {
    fn default() -> Self {
        Row {
            name: "Student Affairs Monthly Meeting",
            when: EVENING,
            location: TECHFLEX_A,
            meeting_type: "Main Meeting",
            process: "YES",
            requirements: "",
            account: "",
        }
    }
}

fn parse(rows: &[Row<'_>]) -> Vec<Booking> {
    let resolver = VenueResolver::new(&NotesConfig::default().venues);
    rows.iter()
        .enumerate()
        .map(|(i, r)| {
            let raw: RawRow = [
                ("Event Name", r.name),
                ("Date & Time", r.when),
                ("Location", r.location),
                ("Meeting Type", r.meeting_type),
                ("Process_Event", r.process),
                ("Setup_Requirements", r.requirements),
                ("Account Number", r.account),
            ]
            .into_iter()
            .collect();
            parse_row(&raw, i, &resolver).unwrap()
        })
        .collect()
}

fn group(rows: &[Row<'_>]) -> setup_engine::Grouping {
    group_bookings(parse(rows), &NotesConfig::default().triads)
}

fn techflex<'a>(location: &'a str, requirements: &'static str, account: &'static str) -> Row<'a> {
    Row {
        location,
        requirements,
        account,
        ..Row::default()
    }
}

// ── Markers and occupancy ───────────────────────────────────────────────────

#[test]
fn setup_and_teardown_rows_are_dropped() {
    let grouping = group(&[
        Row {
            meeting_type: "Setup",
            location: "Babbio 122",
            ..Row::default()
        },
        Row {
            location: "Babbio 122",
            ..Row::default()
        },
        Row {
            meeting_type: "Teardown",
            location: "Babbio 122",
            ..Row::default()
        },
    ]);

    assert_eq!(grouping.markers_dropped, 2);
    assert_eq!(grouping.bookings.len(), 1);
    assert!(grouping.occupancy.is_empty());
    assert_eq!(grouping.bookings[0].booking().source_rows, vec![1]);
}

#[test]
fn unflagged_and_other_types_become_occupancy() {
    let grouping = group(&[
        Row {
            location: "Babbio 122",
            process: "NO",
            ..Row::default()
        },
        Row {
            location: "Babbio 122",
            meeting_type: "Rehearsal",
            ..Row::default()
        },
    ]);

    assert!(grouping.bookings.is_empty());
    assert_eq!(grouping.occupancy.len(), 2);
    assert_eq!(
        grouping.occupancy[1].meeting_type,
        MeetingType::Other("Rehearsal".to_string())
    );
}

// ── Triad merging ───────────────────────────────────────────────────────────

#[test]
fn complete_triad_merges_into_one_booking() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "60 chairs", "1234"),
        techflex(TECHFLEX_B, "Podium", "1234"),
        Row {
            process: "NO",
            ..techflex(TECHFLEX_C, "", "")
        },
    ]);

    assert_eq!(grouping.bookings.len(), 1);
    assert_eq!(grouping.merged_count(), 1);
    assert!(grouping.warnings.is_empty());

    let Grouped::MergedTriad(b) = &grouping.bookings[0] else {
        panic!("expected a merged triad, got {:?}", grouping.bookings[0]);
    };
    assert_eq!(b.venue_code, "UCCABC");
    assert_eq!(b.venue_label, "TechFlex");
    assert_eq!(b.venue_raw, "UCC Tech Flex Space ABC");
    assert_eq!(b.setup_requirements, "60 chairs; Podium");
    assert_eq!(b.account_number, "1234");
    assert!(b.process_flag, "any flagged member flags the merge");
    assert_eq!(b.source_rows, vec![0, 1, 2]);
    assert_eq!(b.component_venues, vec![TECHFLEX_A, TECHFLEX_B, TECHFLEX_C]);
}

#[test]
fn merge_follows_member_order_not_row_order() {
    let grouping = group(&[
        techflex(TECHFLEX_C, "Stage", ""),
        techflex(TECHFLEX_A, "60 chairs", "1234"),
        techflex(TECHFLEX_B, "Podium", "1234"),
    ]);

    let b = grouping.bookings[0].booking();
    assert_eq!(b.setup_requirements, "60 chairs; Podium; Stage");
    assert_eq!(b.account_number, "1234");
    assert_eq!(b.source_rows, vec![0, 1, 2]);
}

#[test]
fn repeated_requirement_text_appears_once() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "Podium", ""),
        techflex(TECHFLEX_B, " Podium ", ""),
        techflex(TECHFLEX_C, "", ""),
    ]);

    assert_eq!(grouping.bookings[0].booking().setup_requirements, "Podium");
}

#[test]
fn partial_triad_stays_standalone() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "60 chairs", "1234"),
        techflex(TECHFLEX_B, "Podium", "1234"),
    ]);

    assert_eq!(grouping.bookings.len(), 2);
    assert_eq!(grouping.merged_count(), 0);
    let codes: Vec<&str> = grouping
        .bookings
        .iter()
        .map(|g| g.booking().venue_code.as_str())
        .collect();
    assert_eq!(codes, vec!["UCCA", "UCCB"]);
}

#[test]
fn members_at_different_times_do_not_merge() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_B, "", ""),
        Row {
            when: "Jan 27, 2026 6:30 PM - 9:00 PM",
            ..techflex(TECHFLEX_C, "", "")
        },
    ]);

    assert_eq!(grouping.merged_count(), 0);
    assert_eq!(grouping.bookings.len(), 3);
}

#[test]
fn cross_day_member_with_same_clock_times_does_not_merge() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_B, "", ""),
        Row {
            when: "Jan 27, 2026 6:30 PM - Jan 28, 2026 8:30 PM",
            ..techflex(TECHFLEX_C, "", "")
        },
    ]);

    assert_eq!(grouping.merged_count(), 0);
    assert_eq!(grouping.bookings.len(), 3);
}

#[test]
fn different_event_names_do_not_merge() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_B, "", ""),
        Row {
            name: "Career Fair",
            ..techflex(TECHFLEX_C, "", "")
        },
    ]);

    assert_eq!(grouping.merged_count(), 0);
}

#[test]
fn duplicate_member_refuses_merge_with_warning() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_B, "", ""),
        techflex(TECHFLEX_C, "", ""),
    ]);

    assert_eq!(grouping.merged_count(), 0);
    assert_eq!(grouping.bookings.len(), 4);
    assert_eq!(
        grouping.warnings,
        vec![MergeWarning::DuplicateMember {
            event_name: "Student Affairs Monthly Meeting".to_string(),
            triad: "UCCABC".to_string(),
            member: TECHFLEX_A.to_string(),
            rows: vec![0, 1],
        }]
    );
}

#[test]
fn account_mismatch_keeps_first_and_warns() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", "1234"),
        techflex(TECHFLEX_B, "", "9999"),
        techflex(TECHFLEX_C, "", "1234"),
    ]);

    assert_eq!(grouping.bookings[0].booking().account_number, "1234");
    assert_eq!(
        grouping.warnings,
        vec![MergeWarning::AccountMismatch {
            event_name: "Student Affairs Monthly Meeting".to_string(),
            triad: "UCCABC".to_string(),
            kept: "1234".to_string(),
            ignored: vec!["9999".to_string()],
        }]
    );
    assert!(grouping.warnings[0].to_string().contains("differing account numbers"));
}

#[test]
fn non_member_in_same_partition_stays_separate() {
    let grouping = group(&[
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_B, "", ""),
        Row {
            location: "Babbio 122",
            ..Row::default()
        },
        techflex(TECHFLEX_C, "", ""),
    ]);

    assert_eq!(grouping.bookings.len(), 2);
    assert!(grouping.bookings[0].is_merged());
    assert_eq!(grouping.bookings[1].booking().venue_code, "BC122");
}

// ── Ordering ────────────────────────────────────────────────────────────────

#[test]
fn output_keeps_input_order_with_merge_at_first_row() {
    let grouping = group(&[
        Row {
            name: "APO Pining",
            when: "Jan 27, 2026 6:00 PM - 9:00 PM",
            location: "Babbio 122",
            ..Row::default()
        },
        techflex(TECHFLEX_B, "", ""),
        Row {
            name: "Chess Club",
            location: "Howe 404",
            ..Row::default()
        },
        techflex(TECHFLEX_A, "", ""),
        techflex(TECHFLEX_C, "", ""),
    ]);

    let order: Vec<(&str, &str)> = grouping
        .bookings
        .iter()
        .map(|g| (g.booking().event_name.as_str(), g.booking().venue_code.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("APO Pining", "BC122"),
            ("Student Affairs Monthly Meeting", "UCCABC"),
            ("Chess Club", "SKYLINE"),
        ]
    );
}
