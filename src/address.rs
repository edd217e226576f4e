//! Shortens verbose reverse-geocoded addresses for display.
//!
//! Reverse geocoders return everything from house number to country. The
//! formatter keeps the first few meaningful segments and drops
//! administrative noise (postal codes, country, province, region).

/// Segments kept after filtering.
const MAX_SEGMENTS: usize = 3;

/// Raw segments used when filtering removed everything.
const FALLBACK_SEGMENTS: usize = 2;

#[derive(Debug, Clone)]
pub struct AddressFormatter {
    /// Segments dropped when they match exactly (case-insensitive).
    noise: Vec<String>,
}

impl Default for AddressFormatter {
    fn default() -> Self {
        Self::new([
            "Philippines",
            "Pilipinas",
            "Cebu",
            "Bohol",
            "Negros Oriental",
            "Siquijor",
            "Central Visayas",
        ])
    }
}

impl AddressFormatter {
    pub fn new<I, S>(noise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            noise: noise.into_iter().map(Into::into).collect(),
        }
    }

    /// Normalizes `raw` into a short display form.
    ///
    /// Returns `None` only for blank input. When filtering leaves nothing
    /// the first two raw segments are used, and failing that `raw` itself.
    pub fn format(&self, raw: &str) -> Option<String> {
        if raw.trim().is_empty() {
            return None;
        }

        let segments: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let kept: Vec<&str> = segments
            .iter()
            .copied()
            .filter(|s| !self.is_noise(s))
            .take(MAX_SEGMENTS)
            .collect();

        if !kept.is_empty() {
            return Some(kept.join(", "));
        }

        let fallback = segments
            .iter()
            .take(FALLBACK_SEGMENTS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        if fallback.is_empty() {
            Some(raw.to_string())
        } else {
            Some(fallback)
        }
    }

    fn is_noise(&self, segment: &str) -> bool {
        is_postal_code(segment)
            || is_region(segment)
            || self.noise.iter().any(|n| n.eq_ignore_ascii_case(segment))
    }
}

fn is_postal_code(segment: &str) -> bool {
    segment.len() >= 4 && segment.bytes().all(|b| b.is_ascii_digit())
}

/// "Region VII", "Bangsamoro Autonomous Region", ...
fn is_region(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.starts_with("region ") || lower.ends_with(" region")
}

/// Formats with the default noise list.
pub fn format_address(raw: &str) -> Option<String> {
    AddressFormatter::default().format(raw)
}
