//! Route classification into admission lanes.

use ledgerline_core::ConfigError;
use regex::Regex;
use serde::Serialize;
use std::fmt;

/// An independent concurrency budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionLane {
    Standard,
    /// Expensive lookups, serialized through a lane of size one.
    HeavyLookup,
}

impl AdmissionLane {
    pub const ALL: [AdmissionLane; 2] = [AdmissionLane::Standard, AdmissionLane::HeavyLookup];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionLane::Standard => "standard",
            AdmissionLane::HeavyLookup => "heavy_lookup",
        }
    }
}

impl fmt::Display for AdmissionLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a request path to its lane using a list of regexes.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    heavy: Vec<Regex>,
}

impl RouteClassifier {
    /// Compile the heavy route patterns. An empty list sends everything to
    /// the standard lane.
    pub fn new<S: AsRef<str>>(heavy_patterns: &[S]) -> Result<Self, ConfigError> {
        let heavy = heavy_patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| ConfigError::InvalidValue {
                    field: "LEDGERLINE_HEAVY_ROUTE_PATTERNS".to_string(),
                    value: p.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { heavy })
    }

    pub fn classify(&self, path: &str) -> AdmissionLane {
        if self.heavy.iter().any(|re| re.is_match(path)) {
            AdmissionLane::HeavyLookup
        } else {
            AdmissionLane::Standard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_HEAVY_ROUTE_PATTERNS;

    fn default_classifier() -> RouteClassifier {
        RouteClassifier::new(&[DEFAULT_HEAVY_ROUTE_PATTERNS]).expect("default pattern compiles")
    }

    #[test]
    fn test_adjacent_flip_routes_are_heavy() {
        let classifier = default_classifier();
        assert_eq!(
            classifier.classify("/api/flip/0xabc/epoch/adjacentflips"),
            AdmissionLane::HeavyLookup
        );
        assert_eq!(
            classifier.classify("/api/Flip/0xabc/Address/AdjacentFlips"),
            AdmissionLane::HeavyLookup
        );
    }

    #[test]
    fn test_other_routes_are_standard() {
        let classifier = default_classifier();
        assert_eq!(classifier.classify("/api/epoch/last"), AdmissionLane::Standard);
        assert_eq!(
            classifier.classify("/api/flip/0xabc/adjacentflips/extra"),
            AdmissionLane::Standard
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RouteClassifier::new(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_no_patterns_means_standard_only() {
        let classifier = RouteClassifier::new::<&str>(&[]).expect("empty list");
        assert_eq!(
            classifier.classify("/api/flip/0xabc/epoch/adjacentflips"),
            AdmissionLane::Standard
        );
    }
}
