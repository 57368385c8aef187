//! Derive setup and breakdown instants for bookings.
//!
//! Bookings are grouped by venue code and sorted by `(start, end, source row)`
//! before scanning, so the result never depends on export order. Neighbors
//! include venue occupancy: bookings that are not written out but still hold
//! the room. All-day bookings are skipped and are not neighbors.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use tracing::debug;

use crate::config::ScheduleRules;
use crate::record::Booking;

/// Which rule fixed a derived instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Setup: event start minus the default lead.
    DefaultLead,
    /// Setup: pulled into work hours.
    WorkHours,
    /// Setup: early event, fixed early-morning instant (overtime). Events
    /// starting before that instant use the previous day's.
    EarlyMorning,
    /// Setup: evening event with nothing earlier that day.
    LateMorning,
    /// Setup: weekend event, set up the Friday before.
    Friday,
    /// Moved out of the lunch blackout.
    Lunch,
    /// Setup: waits for the prior booking in the venue to end.
    AfterPrior,
    /// Breakdown: right after the event.
    EventEnd,
    /// Breakdown: late event, next morning.
    NextMorning,
    /// Breakdown: next day is a free weekend day, afternoon slot on the end
    /// day, or on the weekend day once the event runs past it.
    WeekendAfternoon,
    /// Breakdown: must finish before the following booking's setup.
    BeforeFollowing,
}

/// A derived setup or breakdown instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedInstant {
    pub at: NaiveDateTime,
    /// Calendar days from the event's start date (negative for earlier days).
    pub day_offset: i64,
    /// A neighbor in the venue is closer than the back-to-back gap.
    pub back_to_back: bool,
    pub rule: ScheduleRule,
}

impl DerivedInstant {
    fn new(
        at: NaiveDateTime,
        event_day: NaiveDate,
        back_to_back: bool,
        rule: ScheduleRule,
    ) -> Self {
        Self {
            at,
            day_offset: (at.date() - event_day).num_days(),
            back_to_back,
            rule,
        }
    }

    /// Falls on the calendar day after the event's start date.
    pub fn is_next_day(&self) -> bool {
        self.day_offset == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub setup: DerivedInstant,
    pub breakdown: DerivedInstant,
}

/// A timed booking as seen by the per-venue scan.
#[derive(Debug, Clone, Copy)]
struct Slot {
    start: NaiveDateTime,
    end: NaiveDateTime,
    row: usize,
    /// Index into the emitted bookings, `None` for occupancy.
    target: Option<usize>,
}

/// Attach a [`Schedule`] to every timed booking in `bookings`.
///
/// `occupancy` contributes neighbors only and is never annotated.
pub fn derive_schedules(bookings: &mut [Booking], occupancy: &[Booking], rules: &ScheduleRules) {
    let mut venues: BTreeMap<&str, Vec<Slot>> = BTreeMap::new();
    let targets = bookings.iter().enumerate().map(|(i, b)| (Some(i), b));
    let others = occupancy.iter().map(|b| (None, b));
    for (target, booking) in targets.chain(others) {
        let Some((start, end)) = booking.window.timed() else {
            continue;
        };
        venues.entry(booking.venue_code.as_str()).or_default().push(Slot {
            start,
            end,
            row: booking.first_row(),
            target,
        });
    }

    let mut derived: Vec<(usize, Schedule)> = Vec::new();
    for (venue, slots) in venues.iter_mut() {
        slots.sort_by_key(|s| (s.start, s.end, s.row));
        let slots: &[Slot] = slots;
        let setups: Vec<DerivedInstant> = (0..slots.len())
            .map(|i| derive_setup(slots, i, rules))
            .collect();
        for (i, slot) in slots.iter().enumerate() {
            let Some(target) = slot.target else {
                continue;
            };
            let breakdown = derive_breakdown(slots, i, &setups, rules);
            derived.push((
                target,
                Schedule {
                    setup: setups[i],
                    breakdown,
                },
            ));
        }
        debug!(venue = *venue, bookings = slots.len(), "derived venue schedule");
    }

    for (target, schedule) in derived {
        bookings[target].schedule = Some(schedule);
    }
}

fn derive_setup(slots: &[Slot], i: usize, rules: &ScheduleRules) -> DerivedInstant {
    let slot = slots[i];
    let start = slot.start;
    let day = start.date();
    let prior_end = slots[..i].iter().map(|s| s.end).max();

    let mut rule = ScheduleRule::DefaultLead;
    let mut candidate = start - rules.setup_lead;

    if start.time() < rules.early_event_cutoff {
        candidate = day.and_time(rules.early_setup_time);
        if candidate > start {
            candidate = (day - Duration::days(1)).and_time(rules.early_setup_time);
        }
        rule = ScheduleRule::EarlyMorning;
    } else {
        let clamped = clamp_to_work_hours(candidate, rules);
        if clamped != candidate {
            candidate = clamped;
            rule = ScheduleRule::WorkHours;
        }
    }

    if start.time() >= rules.evening_cutoff {
        let earlier_that_day = slots
            .iter()
            .enumerate()
            .any(|(j, o)| j != i && o.end.date() == day && o.end <= start);
        if !earlier_that_day {
            candidate = day.and_time(rules.late_morning_setup_time);
            rule = ScheduleRule::LateMorning;
        }
    }

    let back_to_back_prior = prior_end.is_some_and(|end| start - end < rules.back_to_back_gap);
    if is_weekend(day) && !back_to_back_prior {
        candidate = preceding_friday(day).and_time(rules.friday_setup_time);
        rule = ScheduleRule::Friday;
    }

    if rules.in_lunch(candidate.time()) {
        candidate = candidate.date().and_time(rules.lunch_end);
        rule = ScheduleRule::Lunch;
    }

    let mut back_to_back = false;
    if let Some(end) = prior_end {
        if end > candidate {
            candidate = end.min(start);
            rule = ScheduleRule::AfterPrior;
            back_to_back = start - end < rules.back_to_back_gap;
        }
    }

    if candidate > start {
        candidate = start;
    }
    if rules.in_lunch(candidate.time()) {
        let after_lunch = candidate.date().and_time(rules.lunch_end);
        if after_lunch <= start {
            candidate = after_lunch;
        } else {
            // Lunch end is past the start: set up before lunch instead.
            candidate = candidate.date().and_time(rules.late_morning_setup_time);
            back_to_back |= prior_end.is_some_and(|end| end > candidate);
        }
        rule = ScheduleRule::Lunch;
    }

    DerivedInstant::new(candidate, day, back_to_back, rule)
}

fn derive_breakdown(
    slots: &[Slot],
    i: usize,
    setups: &[DerivedInstant],
    rules: &ScheduleRules,
) -> DerivedInstant {
    let slot = slots[i];
    let end = slot.end;
    let event_day = slot.start.date();

    let mut rule = ScheduleRule::EventEnd;
    let mut candidate = end;

    if end.time() >= rules.late_afternoon_cutoff {
        let next_day = end.date() + Duration::days(1);
        let afternoon = end.date().and_time(rules.weekend_breakdown_time);
        let next_day_free = !slots
            .iter()
            .any(|o| o.start.date() <= next_day && o.end.date() >= next_day);
        if is_weekend(next_day) && next_day_free {
            // Past the afternoon slot: take the same slot on the free day.
            candidate = if afternoon >= end {
                afternoon
            } else {
                next_day.and_time(rules.weekend_breakdown_time)
            };
            rule = ScheduleRule::WeekendAfternoon;
        } else {
            candidate = next_day.and_time(rules.next_morning_breakdown_time);
            rule = ScheduleRule::NextMorning;
        }
    }

    if rules.in_lunch(candidate.time()) {
        candidate = candidate.date().and_time(rules.lunch_end);
        rule = ScheduleRule::Lunch;
    }

    let mut back_to_back = false;
    if let Some(following) = slots.get(i + 1) {
        let following_setup = setups[i + 1].at;
        if following_setup < candidate {
            candidate = following_setup.max(end);
            rule = ScheduleRule::BeforeFollowing;
            back_to_back = following.start - end < rules.back_to_back_gap;
        }
    }

    DerivedInstant::new(candidate, event_day, back_to_back, rule)
}

fn clamp_to_work_hours(at: NaiveDateTime, rules: &ScheduleRules) -> NaiveDateTime {
    let time: NaiveTime = at.time();
    if time < rules.work_start {
        at.date().and_time(rules.work_start)
    } else if time > rules.work_end {
        at.date().and_time(rules.work_end)
    } else {
        at
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The Friday before a Saturday or Sunday.
fn preceding_friday(day: NaiveDate) -> NaiveDate {
    let weekday = day.weekday().num_days_from_monday() as i64;
    let friday = Weekday::Fri.num_days_from_monday() as i64;
    let back = (weekday - friday).rem_euclid(7);
    day - Duration::days(back)
}
