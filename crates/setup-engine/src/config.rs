//! Immutable configuration consumed by the engine: venue table, triad
//! membership, and schedule thresholds.
//!
//! A config is built from a [`RuleProfile`] plus the built-in campus venue
//! table, optionally extended by a TOML file:
//!
//! ```toml
//! profile = "extended"
//!
//! [rules]
//! setup_lead_minutes = 90
//! lunch_start = "12:00"
//! lunch_end = "1:00 PM"
//!
//! [[venues]]
//! key = "Babbio 400"
//! code = "BC400"
//! label = "Babbio 400"
//!
//! [[triads]]
//! code = "UCCABC"
//! name = "UCC Tech Flex Space ABC"
//! label = "TechFlex"
//! members = ["UCC Tech Flex Space A", "UCC Tech Flex Space B", "UCC Tech Flex Space C"]
//! ```

use std::path::Path;
use std::str::FromStr;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for the setup lead and the back-to-back gap (one week).
pub const MAX_RULE_MINUTES: i64 = 7 * 24 * 60;

/// One row of the venue table: a location string and its canonical code/label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueEntry {
    /// Location text as it appears (or is contained) in the export.
    pub key: String,
    pub code: String,
    /// Label used on the requirements line of a note.
    pub label: String,
}

/// Three sub-venues that together form one physical room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triad {
    /// Combined venue code, e.g. `UCCABC`.
    pub code: String,
    /// Combined location name, e.g. `UCC Tech Flex Space ABC`.
    pub name: String,
    pub label: String,
    /// Member venue keys, in canonical order.
    pub members: [String; 3],
}

impl Triad {
    /// Position of `venue` within this triad, matching case-insensitively.
    pub fn member_index(&self, venue: &str) -> Option<usize> {
        let venue = venue.trim();
        self.members
            .iter()
            .position(|m| m.eq_ignore_ascii_case(venue))
    }
}

/// Thresholds and fixed instants used by the schedule deriver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRules {
    /// Default lead between setup and event start.
    pub setup_lead: Duration,
    /// Events starting before this get the early setup instant.
    pub early_event_cutoff: NaiveTime,
    pub early_setup_time: NaiveTime,
    /// Events starting at/after this with no earlier booking get set up in the late morning.
    pub evening_cutoff: NaiveTime,
    pub late_morning_setup_time: NaiveTime,
    /// Setup instant on the Friday before a weekend event.
    pub friday_setup_time: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub work_start: NaiveTime,
    pub work_end: NaiveTime,
    /// Events ending at/after this are broken down the next morning.
    pub late_afternoon_cutoff: NaiveTime,
    pub next_morning_breakdown_time: NaiveTime,
    /// Same-day breakdown instant when the next day is a free weekend day.
    pub weekend_breakdown_time: NaiveTime,
    /// Gaps shorter than this between neighbors are flagged back-to-back.
    pub back_to_back_gap: Duration,
}

impl ScheduleRules {
    /// Whether `time` falls inside the half-open lunch blackout window.
    pub fn in_lunch(&self, time: NaiveTime) -> bool {
        time >= self.lunch_start && time < self.lunch_end
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lunch_start >= self.lunch_end {
            return Err(ConfigError::InvalidWindow {
                name: "lunch",
                start: self.lunch_start.to_string(),
                end: self.lunch_end.to_string(),
            });
        }
        if self.work_start >= self.work_end {
            return Err(ConfigError::InvalidWindow {
                name: "work-hours",
                start: self.work_start.to_string(),
                end: self.work_end.to_string(),
            });
        }
        if self.late_morning_setup_time >= self.lunch_start {
            return Err(ConfigError::InvalidWindow {
                name: "late-morning",
                start: self.late_morning_setup_time.to_string(),
                end: self.lunch_start.to_string(),
            });
        }
        if self.setup_lead < Duration::zero() {
            return Err(ConfigError::NegativeDuration("setup_lead_minutes"));
        }
        if self.back_to_back_gap < Duration::zero() {
            return Err(ConfigError::NegativeDuration("back_to_back_minutes"));
        }
        let max = Duration::minutes(MAX_RULE_MINUTES);
        if self.setup_lead > max {
            return Err(too_long("setup_lead_minutes"));
        }
        if self.back_to_back_gap > max {
            return Err(too_long("back_to_back_minutes"));
        }
        Ok(())
    }
}

/// Named threshold sets. They differ only in the early-morning cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleProfile {
    /// Events before 9:00 AM get a 6:00 AM setup.
    #[default]
    Standard,
    /// Events before 10:00 AM get a 6:00 AM setup.
    Extended,
}

impl RuleProfile {
    pub fn rules(self) -> ScheduleRules {
        let early_event_cutoff = match self {
            RuleProfile::Standard => hm(9, 0),
            RuleProfile::Extended => hm(10, 0),
        };
        ScheduleRules {
            setup_lead: Duration::hours(2),
            early_event_cutoff,
            early_setup_time: hm(6, 0),
            evening_cutoff: hm(17, 0),
            late_morning_setup_time: hm(11, 0),
            friday_setup_time: hm(11, 0),
            lunch_start: hm(12, 0),
            lunch_end: hm(13, 0),
            work_start: hm(8, 0),
            work_end: hm(17, 0),
            late_afternoon_cutoff: hm(15, 0),
            next_morning_breakdown_time: hm(8, 0),
            weekend_breakdown_time: hm(16, 0),
            back_to_back_gap: Duration::minutes(30),
        }
    }
}

impl FromStr for RuleProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(RuleProfile::Standard),
            "extended" => Ok(RuleProfile::Extended),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

/// Everything the engine needs besides the rows themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesConfig {
    pub venues: Vec<VenueEntry>,
    pub triads: Vec<Triad>,
    pub rules: ScheduleRules,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self::builtin(RuleProfile::default())
    }
}

impl NotesConfig {
    /// The built-in campus venue table with the given rule profile.
    pub fn builtin(profile: RuleProfile) -> Self {
        Self {
            venues: builtin_venues(),
            triads: builtin_triads(),
            rules: profile.rules(),
        }
    }

    /// Look up the triad whose combined code is `code`.
    pub fn triad(&self, code: &str) -> Option<&Triad> {
        self.triads.iter().find(|t| t.code == code)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_profile(path, None)
    }

    /// Read a TOML config file, forcing `profile` over the file's own choice.
    pub fn load_with_profile(
        path: impl AsRef<Path>,
        profile: Option<RuleProfile>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_with_profile(&content, profile)
    }

    /// Parse a TOML document into a resolved, validated config.
    pub fn parse_with_profile(
        toml_str: &str,
        profile: Option<RuleProfile>,
    ) -> Result<Self, ConfigError> {
        let raw: NotesConfigRaw = toml::from_str(toml_str)?;

        let profile = match (profile, raw.profile.as_deref()) {
            (Some(p), _) => p,
            (None, Some(name)) => name.parse()?,
            (None, None) => RuleProfile::default(),
        };
        let rules = raw.rules.apply(profile.rules())?;

        let (mut venues, mut triads) = if raw.replace_builtin_venues {
            (Vec::new(), Vec::new())
        } else {
            (builtin_venues(), builtin_triads())
        };

        for entry in raw.venues {
            if entry.code.trim().is_empty() {
                return Err(ConfigError::EmptyCode(entry.key));
            }
            match venues
                .iter_mut()
                .find(|v| v.key.eq_ignore_ascii_case(&entry.key))
            {
                Some(existing) => *existing = entry,
                None => venues.push(entry),
            }
        }

        for triad in raw.triads {
            let triad = triad.resolve()?;
            match triads.iter_mut().find(|t| t.code == triad.code) {
                Some(existing) => *existing = triad,
                None => triads.push(triad),
            }
        }

        let config = NotesConfig {
            venues,
            triads,
            rules,
        };
        config.rules.validate()?;
        Ok(config)
    }
}

impl FromStr for NotesConfig {
    type Err = ConfigError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        Self::parse_with_profile(toml_str, None)
    }
}

// ---------------------------------------------------------------------------
// Raw TOML structure
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotesConfigRaw {
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    rules: RulesOverride,
    #[serde(default)]
    venues: Vec<VenueEntry>,
    #[serde(default)]
    triads: Vec<TriadRaw>,
    #[serde(default)]
    replace_builtin_venues: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RulesOverride {
    setup_lead_minutes: Option<i64>,
    early_event_cutoff: Option<String>,
    early_setup_time: Option<String>,
    evening_cutoff: Option<String>,
    late_morning_setup_time: Option<String>,
    friday_setup_time: Option<String>,
    lunch_start: Option<String>,
    lunch_end: Option<String>,
    work_start: Option<String>,
    work_end: Option<String>,
    late_afternoon_cutoff: Option<String>,
    next_morning_breakdown_time: Option<String>,
    weekend_breakdown_time: Option<String>,
    back_to_back_minutes: Option<i64>,
}

impl RulesOverride {
    fn apply(self, mut rules: ScheduleRules) -> Result<ScheduleRules, ConfigError> {
        fn set(slot: &mut NaiveTime, value: Option<String>) -> Result<(), ConfigError> {
            if let Some(v) = value {
                *slot = parse_clock(&v)?;
            }
            Ok(())
        }

        if let Some(m) = self.setup_lead_minutes {
            rules.setup_lead =
                Duration::try_minutes(m).ok_or_else(|| too_long("setup_lead_minutes"))?;
        }
        if let Some(m) = self.back_to_back_minutes {
            rules.back_to_back_gap =
                Duration::try_minutes(m).ok_or_else(|| too_long("back_to_back_minutes"))?;
        }
        set(&mut rules.early_event_cutoff, self.early_event_cutoff)?;
        set(&mut rules.early_setup_time, self.early_setup_time)?;
        set(&mut rules.evening_cutoff, self.evening_cutoff)?;
        set(&mut rules.late_morning_setup_time, self.late_morning_setup_time)?;
        set(&mut rules.friday_setup_time, self.friday_setup_time)?;
        set(&mut rules.lunch_start, self.lunch_start)?;
        set(&mut rules.lunch_end, self.lunch_end)?;
        set(&mut rules.work_start, self.work_start)?;
        set(&mut rules.work_end, self.work_end)?;
        set(&mut rules.late_afternoon_cutoff, self.late_afternoon_cutoff)?;
        set(
            &mut rules.next_morning_breakdown_time,
            self.next_morning_breakdown_time,
        )?;
        set(&mut rules.weekend_breakdown_time, self.weekend_breakdown_time)?;
        Ok(rules)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TriadRaw {
    code: String,
    name: String,
    label: String,
    members: Vec<String>,
}

impl TriadRaw {
    fn resolve(self) -> Result<Triad, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTriad {
            code: self.code.clone(),
            reason: reason.to_string(),
        };
        if self.code.trim().is_empty() {
            return Err(ConfigError::EmptyCode(self.name.clone()));
        }
        let members: [String; 3] = match self.members.clone().try_into() {
            Ok(m) => m,
            Err(_) => return Err(invalid("must list exactly three members")),
        };
        for (i, a) in members.iter().enumerate() {
            if members[i + 1..].iter().any(|b| a.eq_ignore_ascii_case(b)) {
                return Err(invalid("members must be distinct"));
            }
        }
        Ok(Triad {
            code: self.code,
            name: self.name,
            label: self.label,
            members,
        })
    }
}

/// Parse a time of day written as `"13:00"`, `"1:00 PM"` or `"1:00PM"`.
pub fn parse_clock(s: &str) -> Result<NaiveTime, ConfigError> {
    let s = s.trim();
    ["%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| ConfigError::InvalidTime(s.to_string()))
}

fn too_long(name: &'static str) -> ConfigError {
    ConfigError::DurationTooLong {
        name,
        max_minutes: MAX_RULE_MINUTES,
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Built-in campus tables
// ---------------------------------------------------------------------------

/// (location key, venue code, setup label)
const BUILTIN_VENUES: &[(&str, &str, &str)] = &[
    ("UCC Tech Flex Space A", "UCCA", "TechFlex"),
    ("UCC Tech Flex Space B", "UCCB", "TechFlex"),
    ("UCC Tech Flex Space C", "UCCC", "TechFlex"),
    ("UCC 106", "UCCG", "Gallery"),
    ("UCC The Commons", "UCCCOMMONS", "UCC The Commons"),
    ("UCC 1st Floor Lobby", "UCCLOBBY", "UCC 1st Floor Lobby"),
    ("UCC Pi Kitchen", "UCCPI", "UCC PI Kitchen"),
    ("UCC Pre-function", "UCCPRE", "UCC Pre-function"),
    ("Babbio 100", "BC100", "Babbio 100"),
    ("Babbio 104", "BC104", "Babbio 104"),
    ("Babbio 122", "BC122", "Babbio 122"),
    ("Babbio 202", "BC202", "Babbio 202"),
    ("Babbio 203", "BC203", "Babbio 203"),
    ("Babbio 210", "BC210", "Babbio 210"),
    ("Babbio 212", "BC212", "Babbio 212"),
    ("Babbio 219", "BC219", "Babbio 219"),
    ("Babbio 220", "BC220", "Babbio 220"),
    ("Babbio 221", "BC221", "Babbio 221"),
    ("Babbio 304", "BC304", "Babbio 304"),
    ("Babbio 310", "BC310", "Babbio 310"),
    ("Babbio 312", "BC312", "Babbio 312"),
    ("Babbio 319", "BC319", "Babbio 319"),
    ("Babbio 320", "BC320", "Babbio 320"),
    ("Babbio 321", "BC321", "Babbio 321"),
    ("Babbio East Patio", "BCEASTPATIO", "Babbio East Patio"),
    ("Howe 102", "HOWE102", "HOWE 102"),
    ("Howe 104", "HOWE104", "HOWE 104"),
    ("Howe 303", "HOWE303", "HOWE 303"),
    ("Howe 404", "SKYLINE", "SKYLINE"),
    ("Howe 409", "BISSINGER", "BISSINGER"),
    ("Howe 1017", "HOWE1017", "HOWE 1017"),
    ("Howe 4th Floor", "HOWE4", "HOWE 4th Floor"),
    ("Walker Gym", "WALKERGYM", "Walker Gym"),
    ("Walker 102", "WALKER102", "Walker 102"),
    ("Gateway South", "GWS", "GATEWAY SOUTH"),
    ("Gateway North", "GWN", "GATEWAY NORTH"),
    ("Schaefer Swimming Pool", "SCHPOOL", "Schaefer Swimming Pool"),
    ("Schaefer Wrestling Room", "SCHWRESTLING", "Schaefer Wrestling Room"),
    ("Schaefer Canavan Arena", "SCHCANAVAN", "Schaefer Canavan Arena"),
    ("Schaefer Athletic Training", "SCHATC", "Schaefer Athletic Training"),
    ("Schaefer DeBaun Field", "SCHFIELD", "Schaefer DeBaun Field"),
    ("Schaefer 309", "SCH309", "Schaefer 309"),
    ("DeBaun Auditorium", "DEBAUN", "DeBaun Auditorium"),
    ("Burchard", "BURCH", "Burchard"),
    ("Carnegie", "CARN", "Carnegie"),
    ("Edwin A. Stevens", "EAS", "Edwin A. Stevens"),
    ("McLean", "MCLEAN", "McLean"),
    ("Morton", "MORTON", "Morton"),
    ("Peirce", "PEIRCE", "Peirce"),
    ("North Building", "NORTH", "North Building"),
    ("Martha Bayard Stevens", "MBS", "Martha Bayard Stevens"),
    ("Griffith", "GRIFF", "Griffith"),
    ("Library", "LIB", "Library"),
    ("Kidde", "KIDDE", "Kidde"),
];

fn builtin_venues() -> Vec<VenueEntry> {
    BUILTIN_VENUES
        .iter()
        .map(|&(key, code, label)| VenueEntry {
            key: key.to_string(),
            code: code.to_string(),
            label: label.to_string(),
        })
        .collect()
}

fn builtin_triads() -> Vec<Triad> {
    vec![Triad {
        code: "UCCABC".to_string(),
        name: "UCC Tech Flex Space ABC".to_string(),
        label: "TechFlex".to_string(),
        members: [
            "UCC Tech Flex Space A".to_string(),
            "UCC Tech Flex Space B".to_string(),
            "UCC Tech Flex Space C".to_string(),
        ],
    }]
}
