//! Manifest transformation pipeline.
//!
//! ```text
//! manifest.json
//!   → parse            (ManifestParse on malformed JSON)
//!   → merge defaults   (manifest keys win)
//!   → resolve vendor-prefixed keys
//!   → validate         (ManifestValidation, unless skipped)
//!   → inject reload client (+ optional worker wrapper)
//!   → serialize        (sorted keys, 2-space indent)
//! ```

pub mod background;
pub mod validate;
pub mod vendor_keys;

pub use background::{inject_client, GeneratedAsset, WRAPPER_ASSET};
pub use validate::validate_manifest;
pub use vendor_keys::{has_vendor_keys, resolve_vendor_keys};

use crate::error::{Error, Result};
use crate::vendor::Vendor;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// A manifest document: string keys to JSON values.
pub type Manifest = Map<String, Value>;

/// Options for [`transform_manifest`].
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions<'a> {
    pub vendor: Vendor,
    /// Overlay that fills keys missing from the manifest.
    pub defaults: &'a Manifest,
    pub skip_validation: bool,
    /// Output path of the reload client to register as a background entry.
    pub inject_client: Option<&'a str>,
}

/// Result of a successful transform.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedManifest {
    pub manifest: Manifest,
    /// Background wrapper generated by client injection, if one was needed.
    pub wrapper: Option<GeneratedAsset>,
}

impl TransformedManifest {
    /// Deterministic serialization: sorted keys, 2-space indent, trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.manifest)
            .map_err(|e| Error::other(format!("Failed to serialize manifest: {e}")))?;
        out.push('\n');
        Ok(out)
    }
}

/// Read the manifest source from disk.
pub async fn read_manifest(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })
}

/// Start from `defaults` and apply every key of `manifest` on top.
#[must_use]
pub fn merge_defaults(defaults: &Manifest, manifest: Manifest) -> Manifest {
    let mut merged = defaults.clone();
    for (key, value) in manifest {
        merged.insert(key, value);
    }
    merged
}

/// Run the full transform over the manifest `source` read from `path`.
///
/// `path` is only used to name the file in errors.
pub fn transform_manifest(
    path: &Path,
    source: &str,
    options: &TransformOptions<'_>,
) -> Result<TransformedManifest> {
    let parsed: Manifest = serde_json::from_str(source).map_err(|source| Error::ManifestParse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut manifest = merge_defaults(options.defaults, parsed);
    if has_vendor_keys(&manifest) {
        resolve_vendor_keys(&mut manifest, options.vendor);
        debug!(vendor = %options.vendor, "vendor keys resolved");
    }

    if options.skip_validation {
        debug!(path = %path.display(), "manifest validation skipped");
    } else {
        let violations = validate_manifest(&manifest, options.vendor);
        if !violations.is_empty() {
            return Err(Error::ManifestValidation {
                path: path.to_path_buf(),
                violations,
            });
        }
    }

    let wrapper = match options.inject_client {
        Some(client) => inject_client(&mut manifest, options.vendor, client),
        None => None,
    };

    Ok(TransformedManifest { manifest, wrapper })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(vendor: Vendor, defaults: &Manifest) -> TransformOptions<'_> {
        TransformOptions {
            vendor,
            defaults,
            skip_validation: false,
            inject_client: None,
        }
    }

    fn object(value: Value) -> Manifest {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    const BASE: &str = r#"{"manifest_version": 3, "name": "X", "version": "1.0.0""#;

    #[test]
    fn test_malformed_json_names_file() {
        let defaults = Manifest::new();
        let err = transform_manifest(
            Path::new("app/manifest.json"),
            r#"{"name": }"#,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap_err();

        assert!(matches!(err, Error::ManifestParse { .. }));
        assert!(err.to_string().contains("app/manifest.json"));
    }

    #[test]
    fn test_non_object_manifest_is_parse_error() {
        let defaults = Manifest::new();
        let err = transform_manifest(
            Path::new("manifest.json"),
            "[1, 2]",
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ManifestParse { .. }));
    }

    #[test]
    fn test_defaults_fill_gaps_only() {
        let defaults = object(json!({"version": "9.9.9", "description": "from defaults"}));
        let source = format!(r#"{BASE}, "description": "mine"}}"#);
        let out = transform_manifest(
            Path::new("manifest.json"),
            &source,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();

        assert_eq!(out.manifest["version"], "1.0.0");
        assert_eq!(out.manifest["description"], "mine");
    }

    #[test]
    fn test_defaults_supply_missing_required_field() {
        let defaults = object(json!({"version": "0.1.0"}));
        let out = transform_manifest(
            Path::new("manifest.json"),
            r#"{"manifest_version": 3, "name": "X"}"#,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();
        assert_eq!(out.manifest["version"], "0.1.0");
    }

    #[test]
    fn test_vendor_specific_background() {
        let defaults = Manifest::new();
        let source = r#"{"manifest_version": 3, "name": "X", "version": "1.0", "__firefox__background": {"scripts": ["a.js"]}}"#;

        let chrome = transform_manifest(
            Path::new("manifest.json"),
            source,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();
        assert!(!chrome.manifest.contains_key("background"));
        assert!(!chrome.manifest.contains_key("__firefox__background"));

        let firefox = transform_manifest(
            Path::new("manifest.json"),
            source,
            &options(Vendor::Firefox, &defaults),
        )
        .unwrap();
        assert_eq!(firefox.manifest["background"], json!({"scripts": ["a.js"]}));
        assert!(!firefox.manifest.contains_key("__firefox__background"));
    }

    #[test]
    fn test_validation_failure_lists_all_violations() {
        let defaults = Manifest::new();
        let err = transform_manifest(
            Path::new("manifest.json"),
            r#"{"manifest_version": 3, "icons": []}"#,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap_err();

        match err {
            Error::ManifestValidation { violations, .. } => {
                assert_eq!(violations.len(), 3);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_skip_validation_accepts_missing_fields() {
        let defaults = Manifest::new();
        let mut opts = options(Vendor::Chrome, &defaults);
        opts.skip_validation = true;

        let out = transform_manifest(Path::new("manifest.json"), r#"{"name": "X"}"#, &opts)
            .unwrap();
        assert_eq!(out.manifest, object(json!({"name": "X"})));
    }

    #[test]
    fn test_skip_validation_keeps_malformed_scripts() {
        let defaults = Manifest::new();
        let mut opts = options(Vendor::Firefox, &defaults);
        opts.skip_validation = true;
        opts.inject_client = Some("toolbox/client.js");

        let source = r#"{"manifest_version": 3, "background": {"scripts": "bg.js"}}"#;
        let out = transform_manifest(Path::new("manifest.json"), source, &opts).unwrap();
        assert_eq!(out.manifest["background"], json!({"scripts": "bg.js"}));
        assert!(out.wrapper.is_none());
    }

    #[test]
    fn test_injection_with_wrapper() {
        let defaults = Manifest::new();
        let mut opts = options(Vendor::Chrome, &defaults);
        opts.inject_client = Some("toolbox/client.js");

        let source = format!(r#"{BASE}, "background": {{"service_worker": "sw.js"}}}}"#);
        let out = transform_manifest(Path::new("manifest.json"), &source, &opts).unwrap();

        assert_eq!(out.manifest["background"]["service_worker"], WRAPPER_ASSET);
        assert_eq!(out.wrapper.unwrap().name, WRAPPER_ASSET);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let defaults = object(json!({"description": "d"}));
        let a = transform_manifest(
            Path::new("manifest.json"),
            r#"{"version": "1.0", "name": "X", "manifest_version": 3}"#,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();
        let b = transform_manifest(
            Path::new("manifest.json"),
            r#"{"manifest_version": 3, "name": "X", "version": "1.0"}"#,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();

        let json = a.to_json().unwrap();
        assert_eq!(json, b.to_json().unwrap());
        assert!(json.ends_with("}\n"));
        assert!(json.contains("\n  \"description\": \"d\",\n"));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let defaults = Manifest::new();
        let source = format!(
            r#"{BASE}, "__chrome__action": {{"default_popup": "p.html"}}, "__edge__action": {{}}}}"#
        );
        let once = transform_manifest(
            Path::new("manifest.json"),
            &source,
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();
        let twice = transform_manifest(
            Path::new("manifest.json"),
            &once.to_json().unwrap(),
            &options(Vendor::Chrome, &defaults),
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_read_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let err = read_manifest(&path).await.unwrap_err();
        assert!(matches!(err, Error::ManifestRead { .. }));
        assert!(err.to_string().contains("manifest.json"));
    }
}
