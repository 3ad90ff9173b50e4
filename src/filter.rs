//! Attribute-based filtering of water source records
//!
//! Filtering is pure: it never mutates the full record set and always returns
//! an order-preserving subsequence. Facet vocabularies (the selectable
//! district and type options) are derived from the same set.

use std::collections::BTreeSet;

use crate::data::WaterSourceRecord;

/// User-selected filter criteria
///
/// Empty sets mean "no restriction" for that attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Districts to keep
    pub districts: BTreeSet<String>,
    /// Types to keep
    pub types: BTreeSet<String>,
    /// Only keep records whose status classifies as operational
    pub operational_only: bool,
}

impl FilterCriteria {
    /// Criteria produced by the reset action: no selections, operational only
    pub fn reset() -> Self {
        Self {
            districts: BTreeSet::new(),
            types: BTreeSet::new(),
            operational_only: true,
        }
    }

    /// Whether these criteria keep every record
    pub fn is_pass_through(&self) -> bool {
        self.districts.is_empty() && self.types.is_empty() && !self.operational_only
    }

    /// Whether a single record passes these criteria
    ///
    /// Coordinates are never consulted.
    pub fn matches(&self, record: &WaterSourceRecord) -> bool {
        (self.districts.is_empty() || self.districts.contains(&record.district))
            && (self.types.is_empty() || self.types.contains(&record.kind))
            && (!self.operational_only || record.is_operational())
    }

    /// Adds `value` to the set if absent, removes it otherwise
    pub fn toggle_district(&mut self, value: &str) {
        toggle(&mut self.districts, value);
    }

    /// Adds `value` to the set if absent, removes it otherwise
    pub fn toggle_type(&mut self, value: &str) {
        toggle(&mut self.types, value);
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

/// Returns the records passing `criteria`, in their original order
pub fn apply(records: &[WaterSourceRecord], criteria: &FilterCriteria) -> Vec<WaterSourceRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}

/// Sorted distinct non-empty districts across `records`
pub fn districts(records: &[WaterSourceRecord]) -> Vec<String> {
    vocabulary(records.iter().map(|r| r.district.as_str()))
}

/// Sorted distinct non-empty types across `records`
pub fn types(records: &[WaterSourceRecord]) -> Vec<String> {
    vocabulary(records.iter().map(|r| r.kind.as_str()))
}

fn vocabulary<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Location;

    fn record(name: &str, district: &str, kind: &str, status: &str) -> WaterSourceRecord {
        WaterSourceRecord {
            name: name.to_string(),
            district: district.to_string(),
            kind: kind.to_string(),
            status: status.to_string(),
            location: Location::new(40.4, -3.7),
            ..Default::default()
        }
    }

    fn sample() -> Vec<WaterSourceRecord> {
        vec![
            record("a", "Centro", "Fuente", "Operational"),
            record("b", "Retiro", "Fuente", "Non-operational"),
            record("c", "Centro", "Mascotas", ""),
            record("d", "", "Fuente", "operational"),
            record("e", "Retiro", "Mascotas", "Operational"),
        ]
    }

    fn names(records: &[WaterSourceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_empty_criteria_is_identity() {
        let records = sample();
        let criteria = FilterCriteria::default();

        assert!(criteria.is_pass_through());
        assert_eq!(apply(&records, &criteria), records);
    }

    #[test]
    fn test_district_filter() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.toggle_district("Centro");

        assert_eq!(names(&apply(&records, &criteria)), vec!["a", "c"]);
    }

    #[test]
    fn test_type_filter() {
        let records = sample();
        let mut criteria = FilterCriteria::default();
        criteria.toggle_type("Mascotas");

        assert_eq!(names(&apply(&records, &criteria)), vec!["c", "e"]);
    }

    #[test]
    fn test_operational_only_excludes_non_operational_and_unknown() {
        let records = sample();
        let criteria = FilterCriteria {
            operational_only: true,
            ..Default::default()
        };

        assert_eq!(names(&apply(&records, &criteria)), vec!["a", "d", "e"]);
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let records = sample();
        let mut criteria = FilterCriteria {
            operational_only: true,
            ..Default::default()
        };
        criteria.toggle_district("Retiro");
        criteria.toggle_type("Fuente");

        assert!(apply(&records, &criteria).is_empty());

        criteria.toggle_type("Mascotas");
        assert_eq!(names(&apply(&records, &criteria)), vec!["e"]);
    }

    #[test]
    fn test_output_is_subsequence_for_many_criteria() {
        let records = sample();
        let districts_options = ["Centro", "Retiro", "Nowhere"];
        let type_options = ["Fuente", "Mascotas"];

        for district_mask in 0..(1 << districts_options.len()) {
            for type_mask in 0..(1 << type_options.len()) {
                for operational_only in [false, true] {
                    let mut criteria = FilterCriteria {
                        operational_only,
                        ..Default::default()
                    };
                    for (i, d) in districts_options.iter().enumerate() {
                        if district_mask & (1 << i) != 0 {
                            criteria.toggle_district(d);
                        }
                    }
                    for (i, t) in type_options.iter().enumerate() {
                        if type_mask & (1 << i) != 0 {
                            criteria.toggle_type(t);
                        }
                    }

                    let output = apply(&records, &criteria);
                    let mut remaining = records.iter();
                    for kept in &output {
                        assert!(
                            remaining.any(|r| r == kept),
                            "output must be an order-preserving subsequence"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_filter_ignores_coordinates() {
        let mut unmapped = record("x", "Centro", "Fuente", "Operational");
        unmapped.location.longitude = None;
        let mut criteria = FilterCriteria::reset();
        criteria.toggle_district("Centro");

        assert_eq!(names(&apply(&[unmapped.clone()], &criteria)), vec!["x"]);

        criteria.toggle_district("Centro");
        criteria.toggle_district("Retiro");
        assert!(apply(&[unmapped], &criteria).is_empty());
    }

    #[test]
    fn test_reset_criteria() {
        let criteria = FilterCriteria::reset();
        assert!(criteria.districts.is_empty());
        assert!(criteria.types.is_empty());
        assert!(criteria.operational_only);
        assert!(!criteria.is_pass_through());
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_district("Centro");
        assert!(criteria.districts.contains("Centro"));
        criteria.toggle_district("Centro");
        assert!(criteria.districts.is_empty());
    }

    #[test]
    fn test_districts_sorted_distinct_non_empty() {
        let records = sample();
        assert_eq!(districts(&records), vec!["Centro", "Retiro"]);
    }

    #[test]
    fn test_districts_is_idempotent() {
        let records = sample();
        assert_eq!(districts(&records), districts(&records));
    }

    #[test]
    fn test_districts_sort_is_lexicographic_by_bytes() {
        let records = vec![
            record("1", "chamberí", "", ""),
            record("2", "Retiro", "", ""),
            record("3", "Arganzuela", "", ""),
            record("4", "Retiro", "", ""),
        ];
        assert_eq!(districts(&records), vec!["Arganzuela", "Retiro", "chamberí"]);
    }

    #[test]
    fn test_types_vocabulary() {
        assert_eq!(types(&sample()), vec!["Fuente", "Mascotas"]);
        assert!(types(&[]).is_empty());
    }
}
