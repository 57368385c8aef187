//! Map raw location strings to canonical venue codes and labels.
//!
//! Lookup order: exact key match, then the longest table key contained in the
//! raw string, then a fallback code synthesized from the raw string itself.
//! Longest-match matters because short keys are prefixes of longer ones
//! ("UCC" vs "UCC Tech Flex Space A").

use tracing::warn;

use crate::config::VenueEntry;

/// Number of leading characters of the raw location kept in a fallback code.
const FALLBACK_PREFIX_CHARS: usize = 10;

/// How a venue was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueResolution {
    Exact,
    Contains,
    /// Not in the table; code synthesized from the raw string.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVenue {
    pub code: String,
    pub label: String,
    /// Table key that matched, `None` for fallbacks.
    pub key: Option<String>,
    pub resolution: VenueResolution,
}

/// Case-insensitive lookup over a venue table.
#[derive(Debug, Clone)]
pub struct VenueResolver {
    entries: Vec<VenueEntry>,
    lowered_keys: Vec<String>,
}

impl VenueResolver {
    pub fn new(entries: &[VenueEntry]) -> Self {
        Self {
            entries: entries.to_vec(),
            lowered_keys: entries.iter().map(|e| e.key.trim().to_lowercase()).collect(),
        }
    }

    /// Resolve `raw` without logging.
    pub fn lookup(&self, raw: &str) -> ResolvedVenue {
        let needle = raw.trim().to_lowercase();

        if let Some(i) = self.lowered_keys.iter().position(|k| *k == needle) {
            return self.hit(i, VenueResolution::Exact);
        }

        // Ties on length keep the earlier table entry.
        let mut best: Option<usize> = None;
        for (i, key) in self.lowered_keys.iter().enumerate() {
            if key.is_empty() || !needle.contains(key.as_str()) {
                continue;
            }
            if best.is_none_or(|b| key.len() > self.lowered_keys[b].len()) {
                best = Some(i);
            }
        }
        if let Some(i) = best {
            return self.hit(i, VenueResolution::Contains);
        }

        ResolvedVenue {
            code: fallback_code(raw),
            label: raw.trim().to_string(),
            key: None,
            resolution: VenueResolution::Fallback,
        }
    }

    /// Resolve `raw`, logging a warning when it falls back.
    pub fn resolve(&self, raw: &str) -> ResolvedVenue {
        let venue = self.lookup(raw);
        if venue.resolution == VenueResolution::Fallback {
            warn!(venue = raw.trim(), code = %venue.code, "venue not in table, using fallback code");
        }
        venue
    }

    fn hit(&self, i: usize, resolution: VenueResolution) -> ResolvedVenue {
        let entry = &self.entries[i];
        ResolvedVenue {
            code: entry.code.clone(),
            label: entry.label.clone(),
            key: Some(entry.key.clone()),
            resolution,
        }
    }
}

/// Upper-cased alphanumerics of the first few characters of `raw`.
pub fn fallback_code(raw: &str) -> String {
    let code: String = raw
        .trim()
        .chars()
        .take(FALLBACK_PREFIX_CHARS)
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect();
    if code.is_empty() {
        "UNKNOWN".to_string()
    } else {
        code
    }
}
