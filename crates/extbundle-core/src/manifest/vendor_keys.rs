//! Vendor-prefixed key resolution.
//!
//! `{"__firefox__background": {...}}` becomes `{"background": {...}}` when
//! building for firefox and disappears for every other vendor. Resolution
//! walks nested objects and objects inside arrays.

use crate::vendor::{Vendor, VendorKey};
use serde_json::{Map, Value};

/// Resolve every vendor-prefixed key in `object` for `vendor`, recursively.
///
/// A matching key's value replaces the unprefixed key. When several keys
/// match the same base key, the one naming the fewest vendors wins, then the
/// last in key order. All vendor-prefixed keys are removed.
pub fn resolve_vendor_keys(object: &mut Map<String, Value>, vendor: Vendor) {
    let prefixed: Vec<String> = object
        .keys()
        .filter(|key| VendorKey::parse(key).is_some())
        .cloned()
        .collect();

    // (base, vendor count, value) of the current winner per base key
    let mut promoted: Vec<(String, usize, Value)> = Vec::new();
    for key in prefixed {
        let Some(value) = object.remove(&key) else {
            continue;
        };
        let Some(parsed) = VendorKey::parse(&key) else {
            continue;
        };
        if !parsed.applies_to(vendor) {
            continue;
        }
        let specificity = parsed.vendors.len();
        match promoted.iter_mut().find(|(base, _, _)| base == parsed.base) {
            Some(slot) if specificity <= slot.1 => {
                slot.1 = specificity;
                slot.2 = value;
            }
            Some(_) => {}
            None => promoted.push((parsed.base.to_string(), specificity, value)),
        }
    }

    for (base, _, value) in promoted {
        object.insert(base, value);
    }

    for value in object.values_mut() {
        resolve_value(value, vendor);
    }
}

fn resolve_value(value: &mut Value, vendor: Vendor) {
    match value {
        Value::Object(object) => resolve_vendor_keys(object, vendor),
        Value::Array(items) => {
            for item in items {
                resolve_value(item, vendor);
            }
        }
        _ => {}
    }
}

/// Whether any vendor-prefixed key remains anywhere in `object`.
#[must_use]
pub fn has_vendor_keys(object: &Map<String, Value>) -> bool {
    object
        .iter()
        .any(|(key, value)| VendorKey::parse(key).is_some() || value_has_vendor_keys(value))
}

fn value_has_vendor_keys(value: &Value) -> bool {
    match value {
        Value::Object(object) => has_vendor_keys(object),
        Value::Array(items) => items.iter().any(value_has_vendor_keys),
        _ => false,
    }
}
