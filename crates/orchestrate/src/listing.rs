//! The extractor-facing listing document.
//!
//! Values arrive as free-form strings from the upstream language-model
//! extractor; unknown fields are preserved verbatim through `extra` maps so
//! canonicalization never drops information it does not understand.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub subintent: String,
    #[serde(default)]
    pub domain: Vec<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub item_exclusions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_party_preferences: Option<Preferences>,
    #[serde(default)]
    pub other_party_exclusions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_attributes: Option<Preferences>,
    #[serde(default)]
    pub self_exclusions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_location: Option<Location>,
    #[serde(default)]
    pub location_exclusions: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "type", default)]
    pub item_type: String,
    /// key → free-form value at the boundary; key → concept_id after
    /// canonicalization.
    #[serde(default)]
    pub categorical: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min: Constraints,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub max: Constraints,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub range: Constraints,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// axis (e.g. `cost`, `storage`) → constraint attributes.
pub type Constraints = BTreeMap<String, Vec<ConstraintAttr>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintAttr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub identity: Vec<TypedValue>,
    #[serde(default)]
    pub lifestyle: Vec<TypedValue>,
    /// Yes/no flags, not ontological; passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub habits: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min: Constraints,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub max: Constraints,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub range: Constraints,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_canonical: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_canonical: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_round_trips_with_unknown_fields() {
        let raw = json!({
            "intent": "buy",
            "domain": ["electronics"],
            "items": [{
                "type": "Laptop",
                "categorical": {"Condition": "Pre-Owned"},
                "min": {"storage": [{"value": "512 gb"}]},
                "mystery_field": 42
            }],
            "pipeline_debug": {"run": 7}
        });
        let listing: Listing = serde_json::from_value(raw.clone()).expect("deserializes");
        assert_eq!(listing.items[0].item_type, "Laptop");
        assert_eq!(listing.items[0].extra["mystery_field"], 42);
        assert_eq!(listing.extra["pipeline_debug"]["run"], 7);

        let back = serde_json::to_value(&listing).expect("serializes");
        assert_eq!(back["items"][0]["mystery_field"], 42);
        assert_eq!(back["pipeline_debug"]["run"], 7);
    }
}
