//! Payload normalization into canonical water source records
//!
//! Upstream datasets come in two shapes: a JSON-LD style document with the
//! items under `"@graph"`, or a bare array that is already canonical. Graph
//! items are mapped through a table of field aliases; each canonical field
//! lists candidate paths in priority order and the first non-empty value wins.

use serde_json::Value;
use tracing::{debug, warn};

use super::{Location, WaterSourceRecord};

/// Keys under which an array of items is recognized
const GRAPH_KEYS: &[&str] = &["@graph"];

/// A JSON path expressed as object keys to follow in order
type FieldPath = &'static [&'static str];

/// Ordered candidate paths for each canonical field
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub id: &'static [FieldPath],
    pub name: &'static [FieldPath],
    pub kind: &'static [FieldPath],
    pub district: &'static [FieldPath],
    pub status: &'static [FieldPath],
    pub latitude: &'static [FieldPath],
    pub longitude: &'static [FieldPath],
    pub description: &'static [FieldPath],
    pub image: &'static [FieldPath],
}

/// Alias table used for graph-shaped payloads
pub const DEFAULT_ALIASES: FieldAliases = FieldAliases {
    id: &[&["id"], &["@id"]],
    name: &[&["title"], &["name"]],
    kind: &[&["type"], &["category"], &["@type"]],
    district: &[
        &["address", "district-id"],
        &["address", "district", "@id"],
        &["district"],
    ],
    status: &[&["condition"], &["status"], &["state"]],
    latitude: &[&["location", "latitude"], &["latitude"], &["lat"]],
    longitude: &[
        &["location", "longitude"],
        &["longitude"],
        &["lon"],
        &["lng"],
    ],
    description: &[&["description"], &["notes"]],
    image: &[&["image"], &["image", "url"], &["photo"]],
};

/// Canonical field names, used for array items that do not deserialize as-is
const CANONICAL_ALIASES: FieldAliases = FieldAliases {
    id: &[&["id"]],
    name: &[&["name"]],
    kind: &[&["type"]],
    district: &[&["district"]],
    status: &[&["status"]],
    latitude: &[&["location", "latitude"]],
    longitude: &[&["location", "longitude"]],
    description: &[&["description"]],
    image: &[&["image"]],
};

/// Converts a raw payload into canonical records
///
/// Never fails: unrecognized shapes produce an empty set, and missing fields
/// become empty or absent values on the record.
pub fn normalize(payload: &Value) -> Vec<WaterSourceRecord> {
    normalize_with(payload, &DEFAULT_ALIASES)
}

/// Converts a raw payload using a caller-supplied alias table
pub fn normalize_with(payload: &Value, aliases: &FieldAliases) -> Vec<WaterSourceRecord> {
    if let Some(items) = graph_items(payload) {
        debug!(count = items.len(), "Normalizing graph payload");
        return items.iter().map(|item| map_item(item, aliases)).collect();
    }

    match payload {
        Value::Array(items) => {
            debug!(count = items.len(), "Payload is already canonical");
            items
                .iter()
                .map(|item| {
                    serde_json::from_value(item.clone()).unwrap_or_else(|e| {
                        debug!(error = %e, "Reading canonical item field by field");
                        map_item(item, &CANONICAL_ALIASES)
                    })
                })
                .collect()
        }
        _ => {
            warn!("Unrecognized payload shape, no records produced");
            Vec::new()
        }
    }
}

/// Returns the item array under the first recognized graph key
fn graph_items(payload: &Value) -> Option<&Vec<Value>> {
    let object = payload.as_object()?;
    GRAPH_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
}

/// Maps one graph item through the alias table
fn map_item(item: &Value, aliases: &FieldAliases) -> WaterSourceRecord {
    WaterSourceRecord {
        id: first_text(item, aliases.id),
        name: first_text(item, aliases.name).unwrap_or_default(),
        kind: first_text(item, aliases.kind).unwrap_or_default(),
        district: first_text(item, aliases.district).unwrap_or_default(),
        status: first_text(item, aliases.status).unwrap_or_default(),
        location: Location {
            latitude: first_number(item, aliases.latitude),
            longitude: first_number(item, aliases.longitude),
        },
        description: first_text(item, aliases.description),
        image: first_text(item, aliases.image),
    }
}

/// Follows a path of object keys
fn lookup<'a>(item: &'a Value, path: FieldPath) -> Option<&'a Value> {
    path.iter().try_fold(item, |value, key| value.get(*key))
}

/// Renders a scalar as text; objects, arrays, null and blank strings yield nothing
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads a coordinate from a number or a numeric string
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn first_text(item: &Value, candidates: &[FieldPath]) -> Option<String> {
    candidates
        .iter()
        .find_map(|path| lookup(item, path).and_then(as_text))
}

fn first_number(item: &Value, candidates: &[FieldPath]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|path| lookup(item, path).and_then(as_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_item_maps_to_canonical_record() {
        let payload = json!({
            "@graph": [{
                "id": "1",
                "title": "Fuente A",
                "address": {"district-id": "Centro"},
                "condition": "Operational",
                "location": {"latitude": 40.41, "longitude": -3.70}
            }]
        });

        let records = normalize(&payload);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id.as_deref(), Some("1"));
        assert_eq!(record.name, "Fuente A");
        assert_eq!(record.district, "Centro");
        assert_eq!(record.status, "Operational");
        assert_eq!(record.location, Location::new(40.41, -3.70));
        assert!(record.description.is_none());
        assert!(record.image.is_none());
    }

    #[test]
    fn test_graph_preserves_count_and_order() {
        let payload = json!({
            "@graph": [
                {"title": "first"},
                {},
                {"title": "third"},
                {"name": "fourth"}
            ]
        });

        let names: Vec<String> = normalize(&payload).into_iter().map(|r| r.name).collect();

        assert_eq!(names, vec!["first", "", "third", "fourth"]);
    }

    #[test]
    fn test_title_takes_priority_over_name() {
        let payload = json!({"@graph": [{"title": "Title", "name": "Name"}]});
        assert_eq!(normalize(&payload)[0].name, "Title");
    }

    #[test]
    fn test_empty_candidate_falls_through_to_next() {
        let payload = json!({"@graph": [{"title": "   ", "name": "Name", "condition": null, "status": "Operational"}]});
        let record = &normalize(&payload)[0];
        assert_eq!(record.name, "Name");
        assert_eq!(record.status, "Operational");
    }

    #[test]
    fn test_nested_district_id_alias() {
        let payload = json!({"@graph": [{"address": {"district": {"@id": "Retiro"}}}]});
        assert_eq!(normalize(&payload)[0].district, "Retiro");
    }

    #[test]
    fn test_numeric_values_become_text_and_coordinates_accept_strings() {
        let payload = json!({"@graph": [{
            "id": 42,
            "latitude": "40.5",
            "lng": -3.6
        }]});
        let record = &normalize(&payload)[0];
        assert_eq!(record.id.as_deref(), Some("42"));
        assert_eq!(record.location.latitude, Some(40.5));
        assert_eq!(record.location.longitude, Some(-3.6));
    }

    #[test]
    fn test_missing_longitude_is_kept_absent() {
        let payload = json!({"@graph": [{"title": "Half", "location": {"latitude": 40.41}}]});
        let records = normalize(&payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location.latitude, Some(40.41));
        assert!(records[0].location.longitude.is_none());
        assert!(!records[0].is_mappable());
    }

    #[test]
    fn test_bare_array_is_identity() {
        let canonical = vec![
            WaterSourceRecord {
                id: Some("a".to_string()),
                name: "Alpha".to_string(),
                kind: "Fountain".to_string(),
                district: "Centro".to_string(),
                status: "Operational".to_string(),
                location: Location::new(40.0, -3.0),
                description: Some("by the gate".to_string()),
                image: None,
            },
            WaterSourceRecord {
                name: "Beta".to_string(),
                ..Default::default()
            },
        ];
        let payload = serde_json::to_value(&canonical).unwrap();

        assert_eq!(normalize(&payload), canonical);
    }

    #[test]
    fn test_bare_array_does_not_apply_aliases() {
        let payload = json!([{"title": "ignored", "name": "kept"}]);
        let records = normalize(&payload);
        assert_eq!(records[0].name, "kept");
    }

    #[test]
    fn test_bare_array_keeps_items_with_loose_field_types() {
        let payload = json!([
            {"id": 7, "name": "numeric id"},
            {"name": null, "district": "Centro"},
            {"name": "string coords", "location": {"latitude": "40.4", "longitude": "-3.7"}},
            {"name": "ok"},
            "not an object"
        ]);

        let records = normalize(&payload);

        assert_eq!(records.len(), 5);
        assert_eq!(records[0].id.as_deref(), Some("7"));
        assert_eq!(records[0].name, "numeric id");
        assert_eq!(records[1].name, "");
        assert_eq!(records[1].district, "Centro");
        assert_eq!(records[2].location, Location::new(40.4, -3.7));
        assert_eq!(records[3].name, "ok");
        assert_eq!(records[4], WaterSourceRecord::default());
    }

    #[test]
    fn test_unrecognized_shapes_yield_empty() {
        assert!(normalize(&json!({"results": []})).is_empty());
        assert!(normalize(&json!("text")).is_empty());
        assert!(normalize(&Value::Null).is_empty());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let payload = json!({"@graph": [{"title": "A", "status": "x"}, {"title": "B"}]});
        assert_eq!(normalize(&payload), normalize(&payload));
    }
}
