//! Core data models for Fountain Map
//!
//! This module contains the canonical water source record shared by every
//! stage of the pipeline, plus the fetcher and normalizer that produce it.

pub mod fetcher;
pub mod normalize;

pub use fetcher::{
    DataSource, DataUnavailable, FetchError, FetchStage, FetchedPayload, SourceFetcher,
};
pub use normalize::normalize;

use serde::{Deserialize, Serialize};

/// Geographic position of a water source
///
/// Both coordinates are optional because upstream payloads are not always
/// complete. A record is only drawn on the map when both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

impl Location {
    /// Creates a location with both coordinates present
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Returns `(latitude, longitude)` when both coordinates are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Operational state derived from the free-text `status` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Source is working
    Operational,
    /// Source is explicitly marked as out of service
    NonOperational,
    /// Status text is missing or unrecognized
    Unknown,
}

impl StatusKind {
    /// Classifies a free-text status
    ///
    /// "non-operational" must be tested first since it contains "operational".
    pub fn classify(status: &str) -> Self {
        let lower = status.to_lowercase();
        if lower.contains("non-operational") {
            StatusKind::NonOperational
        } else if lower.contains("operational") {
            StatusKind::Operational
        } else {
            StatusKind::Unknown
        }
    }

    /// Short label used in legends and list output
    pub fn label(&self) -> &'static str {
        match self {
            StatusKind::Operational => "operational",
            StatusKind::NonOperational => "non-operational",
            StatusKind::Unknown => "unknown",
        }
    }
}

/// A public drinking-water source in canonical form
///
/// Every field deserializes with a default so that already-canonical arrays
/// never fail on a missing attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSourceRecord {
    /// Upstream identifier, if the source provides one
    pub id: Option<String>,
    /// Display label
    pub name: String,
    /// Category or classification label
    #[serde(rename = "type")]
    pub kind: String,
    /// Administrative area, used as a filter facet
    pub district: String,
    /// Free-text operational state
    pub status: String,
    /// Position on the map
    pub location: Location,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional image URL
    pub image: Option<String>,
}

impl WaterSourceRecord {
    /// Returns the classified status of this record
    pub fn status_kind(&self) -> StatusKind {
        StatusKind::classify(&self.status)
    }

    /// Whether the record is operational according to its status text
    pub fn is_operational(&self) -> bool {
        self.status_kind() == StatusKind::Operational
    }

    /// Whether the record has both coordinates and can be drawn as a marker
    pub fn is_mappable(&self) -> bool {
        self.location.coordinates().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_operational() {
        assert_eq!(StatusKind::classify("Operational"), StatusKind::Operational);
        assert_eq!(StatusKind::classify("OPERATIONAL"), StatusKind::Operational);
        assert_eq!(
            StatusKind::classify("fully operational since May"),
            StatusKind::Operational
        );
    }

    #[test]
    fn test_classify_non_operational_wins_over_operational() {
        assert_eq!(
            StatusKind::classify("Non-operational"),
            StatusKind::NonOperational
        );
        assert_eq!(
            StatusKind::classify("NON-OPERATIONAL (repairs)"),
            StatusKind::NonOperational
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(StatusKind::classify(""), StatusKind::Unknown);
        assert_eq!(StatusKind::classify("closed"), StatusKind::Unknown);
    }

    #[test]
    fn test_location_coordinates_requires_both() {
        assert_eq!(Location::new(40.41, -3.70).coordinates(), Some((40.41, -3.70)));

        let half = Location {
            latitude: Some(40.41),
            longitude: None,
        };
        assert!(half.coordinates().is_none());
        assert!(Location::default().coordinates().is_none());
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let record: WaterSourceRecord =
            serde_json::from_str(r#"{"name": "Fuente B"}"#).unwrap();

        assert_eq!(record.name, "Fuente B");
        assert!(record.id.is_none());
        assert_eq!(record.kind, "");
        assert!(!record.is_mappable());
        assert_eq!(record.status_kind(), StatusKind::Unknown);
    }

    #[test]
    fn test_record_type_field_is_renamed() {
        let record: WaterSourceRecord =
            serde_json::from_str(r#"{"type": "Fuente de beber"}"#).unwrap();
        assert_eq!(record.kind, "Fuente de beber");

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"type\""));
        assert!(!json.contains("\"kind\""));
    }

    #[test]
    fn test_is_operational() {
        let mut record = WaterSourceRecord {
            status: "Operational".to_string(),
            ..Default::default()
        };
        assert!(record.is_operational());

        record.status = "Non-operational".to_string();
        assert!(!record.is_operational());
    }
}
