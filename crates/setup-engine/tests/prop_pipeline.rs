//! Property-based tests for the notes pipeline using proptest.
//!
//! These check invariants that should hold for *any* export, not just the
//! hand-written cases in the other test files.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use setup_engine::{generate, NotesConfig, NotesError, RawRow, RunOptions};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

const VENUES: [&str; 6] = [
    "UCC Tech Flex Space A",
    "UCC Tech Flex Space B",
    "UCC Tech Flex Space C",
    "Babbio 122",
    "Howe 404",
    "Walker Gym",
];

const MEETING_TYPES: [&str; 4] = ["Main Meeting", "Main Meeting", "Setup", "Teardown"];

#[derive(Debug, Clone)]
struct GenRow {
    name: usize,
    start: NaiveDateTime,
    minutes: i64,
    venue: usize,
    meeting_type: usize,
    process: bool,
    requirements: String,
}

/// A start instant in the two weeks around 2026-02-01, on a quarter hour.
fn arb_start() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..14, 0u32..=22, 0u32..4).prop_map(|(day, hour, quarter)| {
        NaiveDate::from_ymd_opt(2026, 1, 26)
            .unwrap()
            .and_hms_opt(hour, quarter * 15, 0)
            .unwrap()
            + Duration::days(day)
    })
}

fn arb_row() -> impl Strategy<Value = GenRow> {
    (
        0usize..3,
        arb_start(),
        15i64..=300,
        0usize..VENUES.len(),
        0usize..MEETING_TYPES.len(),
        any::<bool>(),
        "[a-z]{0,8}",
    )
        .prop_map(
            |(name, start, minutes, venue, meeting_type, process, requirements)| GenRow {
                name,
                start,
                minutes,
                venue,
                meeting_type,
                process,
                requirements,
            },
        )
}

fn arb_rows() -> impl Strategy<Value = Vec<GenRow>> {
    prop::collection::vec(arb_row(), 1..25)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn format_point(at: NaiveDateTime) -> String {
    at.format("%b %d, %Y %I:%M %p").to_string()
}

fn to_raw(row: &GenRow) -> RawRow {
    let end = row.start + Duration::minutes(row.minutes);
    let when = format!("{} - {}", format_point(row.start), format_point(end));
    [
        ("Event Name", format!("Event {}", row.name)),
        ("Date & Time", when),
        ("Location", VENUES[row.venue].to_string()),
        ("Meeting Type", MEETING_TYPES[row.meeting_type].to_string()),
        ("Process_Event", if row.process { "YES" } else { "NO" }.to_string()),
        ("Setup_Requirements", row.requirements.clone()),
        ("Account Number", format!("{}", 1000 + row.name)),
    ]
    .into_iter()
    .collect()
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: Derived instants respect the lunch blackout and the event window
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn derived_instants_are_well_placed(rows in arb_rows()) {
        let raw: Vec<RawRow> = rows.iter().map(to_raw).collect();
        let config = NotesConfig::default();

        match generate(&raw, &config, &RunOptions::default()) {
            Ok(report) => {
                for note in &report.notes {
                    let (start, end) = note.booking.window.timed().unwrap();
                    let schedule = note.booking.schedule.unwrap();
                    prop_assert!(
                        !config.rules.in_lunch(schedule.setup.at.time()),
                        "setup {} inside lunch", schedule.setup.at
                    );
                    prop_assert!(
                        schedule.setup.at <= start,
                        "setup {} after start {}", schedule.setup.at, start
                    );
                    prop_assert!(
                        schedule.breakdown.at >= end,
                        "breakdown {} before end {}", schedule.breakdown.at, end
                    );
                }
            }
            Err(NotesError::NoProcessableBookings { .. }) => {}
            Err(e) => {
                prop_assert!(false, "unexpected error: {}", e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: Setup/Teardown rows never produce notes
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn marker_rows_never_produce_notes(rows in arb_rows()) {
        let raw: Vec<RawRow> = rows.iter().map(to_raw).collect();

        if let Ok(report) = generate(&raw, &NotesConfig::default(), &RunOptions::default()) {
            for note in &report.notes {
                for &row in &note.booking.source_rows {
                    let meeting_type = MEETING_TYPES[rows[row].meeting_type];
                    prop_assert_eq!(meeting_type, "Main Meeting");
                }
            }
            let markers = rows
                .iter()
                .filter(|r| MEETING_TYPES[r.meeting_type] != "Main Meeting")
                .count();
            prop_assert_eq!(report.markers_dropped, markers);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: Running twice over the same export gives the same notes
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn generation_is_idempotent(rows in arb_rows()) {
        let raw: Vec<RawRow> = rows.iter().map(to_raw).collect();
        let config = NotesConfig::default();

        let first = generate(&raw, &config, &RunOptions::default()).map(|r| r.render());
        let second = generate(&raw, &config, &RunOptions::default()).map(|r| r.render());
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a, b);
            }
            (Err(_), Err(_)) => {}
            _ => {
                prop_assert!(false, "runs disagreed on success");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property 4: Triad merge does not depend on member row order
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn triad_merge_is_order_invariant(
        start in arb_start(),
        minutes in 15i64..=300,
        requirements in prop::collection::vec("[a-z]{0,6}", 3),
        accounts in prop::collection::vec(prop_oneof![Just(""), Just("1234"), Just("5678")], 3),
        flags in prop::collection::vec(any::<bool>(), 3),
        order in Just(vec![0usize, 1, 2]).prop_shuffle(),
    ) {
        let member = |i: usize| {
            let end = start + Duration::minutes(minutes);
            let row: RawRow = [
                ("Event Name", "Triad Event".to_string()),
                ("Date & Time", format!("{} - {}", format_point(start), format_point(end))),
                ("Location", VENUES[i].to_string()),
                ("Process_Event", if flags[i] { "YES" } else { "NO" }.to_string()),
                ("Setup_Requirements", requirements[i].clone()),
                ("Account Number", accounts[i].to_string()),
            ]
            .into_iter()
            .collect();
            row
        };
        // Keep at least one flagged row so the run never comes back empty.
        let anchor: RawRow = [
            ("Event Name", "Anchor"),
            ("Date & Time", "Feb 5, 2026 10:00 AM - 11:00 AM"),
            ("Location", "Howe 404"),
            ("Process_Event", "YES"),
        ]
        .into_iter()
        .collect();

        let canonical: Vec<RawRow> = vec![anchor.clone(), member(0), member(1), member(2)];
        let shuffled: Vec<RawRow> = std::iter::once(anchor)
            .chain(order.iter().map(|&i| member(i)))
            .collect();

        let config = NotesConfig::default();
        let a = generate(&canonical, &config, &RunOptions::default()).unwrap();
        let b = generate(&shuffled, &config, &RunOptions::default()).unwrap();

        prop_assert_eq!(a.render(), b.render());
        prop_assert_eq!(a.warnings, b.warnings);
    }
}
