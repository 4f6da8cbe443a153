//! Reload-client injection into the manifest's background entry.

use crate::vendor::{BackgroundFormat, Vendor};
use serde_json::{Map, Value};
use std::fmt::Write;
use tracing::warn;

/// Output path of the generated service-worker wrapper.
pub const WRAPPER_ASSET: &str = "toolbox/background-wrapper.js";

/// A file generated alongside the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAsset {
    /// Output identifier, relative to the output root.
    pub name: String,
    pub content: String,
}

/// Register `client_path` as a background entry of `manifest`.
///
/// - existing `scripts` get the client appended when the vendor loads
///   `scripts`, or when there is no `service_worker`
/// - otherwise an existing `service_worker` is replaced by a generated
///   wrapper that loads the client and then the original worker; the
///   wrapper is returned
/// - `scripts` that is not an array is left alone
/// - a `page` background is left alone
/// - without a background entry, the vendor's format for the manifest
///   version decides between a `service_worker` and a `scripts` list
///
/// Injecting twice is a no-op.
pub fn inject_client(
    manifest: &mut Map<String, Value>,
    vendor: Vendor,
    client_path: &str,
) -> Option<GeneratedAsset> {
    let manifest_version = manifest
        .get("manifest_version")
        .and_then(Value::as_u64)
        .unwrap_or(2);

    let background = manifest
        .entry("background")
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(background) = background else {
        warn!("manifest `background` is not an object, reload client not injected");
        return None;
    };

    let format = vendor.background_format(manifest_version);
    let worker = background
        .get("service_worker")
        .and_then(Value::as_str)
        .map(str::to_string);

    // Vendors loading `scripts` ignore `service_worker`, so a wrapper would
    // never run there.
    let has_scripts = background.contains_key("scripts");
    if has_scripts && (format == BackgroundFormat::Scripts || worker.is_none()) {
        let Some(Value::Array(scripts)) = background.get_mut("scripts") else {
            warn!("manifest `background.scripts` is not an array, reload client not injected");
            return None;
        };
        if !scripts.iter().any(|s| s.as_str() == Some(client_path)) {
            scripts.push(Value::String(client_path.to_string()));
        }
        return None;
    }

    if let Some(worker) = worker {
        if worker == WRAPPER_ASSET || worker == client_path {
            return None;
        }
        let module = background.get("type").and_then(Value::as_str) == Some("module");
        let wrapper = GeneratedAsset {
            name: WRAPPER_ASSET.to_string(),
            content: wrapper_script(&[client_path, &worker], module),
        };
        background.insert(
            "service_worker".to_string(),
            Value::String(WRAPPER_ASSET.to_string()),
        );
        return Some(wrapper);
    }

    if background.contains_key("page") {
        warn!("background page detected, reload client must be loaded by the page itself");
        return None;
    }

    match format {
        BackgroundFormat::ServiceWorker => {
            background.insert(
                "service_worker".to_string(),
                Value::String(client_path.to_string()),
            );
        }
        BackgroundFormat::Scripts => {
            background.insert(
                "scripts".to_string(),
                Value::Array(vec![Value::String(client_path.to_string())]),
            );
        }
    }
    None
}

/// Worker wrapper loading each of `scripts` in order.
fn wrapper_script(scripts: &[&str], module: bool) -> String {
    let urls: Vec<String> = scripts
        .iter()
        .map(|s| {
            let absolute = format!("/{}", s.trim_start_matches('/'));
            serde_json::to_string(&absolute).unwrap_or_default()
        })
        .collect();

    if module {
        let mut out = String::from("// Generated by extbundle\n");
        for url in &urls {
            let _ = writeln!(out, "import {url};");
        }
        out
    } else {
        format!(
            "// Generated by extbundle\ntry {{\n  importScripts({});\n}} catch (e) {{\n  console.error(e);\n}}\n",
            urls.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CLIENT: &str = "toolbox/client.js";

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_appends_to_existing_scripts() {
        let mut manifest = object(json!({"background": {"scripts": ["bg.js"]}}));
        assert!(inject_client(&mut manifest, Vendor::Firefox, CLIENT).is_none());
        assert_eq!(
            manifest["background"]["scripts"],
            json!(["bg.js", "toolbox/client.js"])
        );

        inject_client(&mut manifest, Vendor::Firefox, CLIENT);
        assert_eq!(
            manifest["background"]["scripts"],
            json!(["bg.js", "toolbox/client.js"])
        );
    }

    #[test]
    fn test_scripts_vendor_prefers_scripts_over_worker() {
        let cross = json!({
            "manifest_version": 3,
            "background": {"scripts": ["bg.js"], "service_worker": "sw.js"}
        });

        let mut firefox = object(cross.clone());
        assert!(inject_client(&mut firefox, Vendor::Firefox, CLIENT).is_none());
        assert_eq!(
            firefox["background"],
            json!({"scripts": ["bg.js", CLIENT], "service_worker": "sw.js"})
        );

        let mut chrome = object(cross);
        let wrapper = inject_client(&mut chrome, Vendor::Chrome, CLIENT).unwrap();
        assert_eq!(wrapper.name, WRAPPER_ASSET);
        assert_eq!(chrome["background"]["scripts"], json!(["bg.js"]));
        assert_eq!(chrome["background"]["service_worker"], WRAPPER_ASSET);
    }

    #[test]
    fn test_worker_only_gets_wrapper_for_scripts_vendor() {
        let mut manifest = object(json!({
            "manifest_version": 3,
            "background": {"service_worker": "sw.js"}
        }));
        assert!(inject_client(&mut manifest, Vendor::Safari, CLIENT).is_some());
        assert_eq!(manifest["background"]["service_worker"], WRAPPER_ASSET);
    }

    #[test]
    fn test_non_array_scripts_left_alone() {
        let mut manifest = object(json!({
            "manifest_version": 3,
            "background": {"scripts": "bg.js"}
        }));
        assert!(inject_client(&mut manifest, Vendor::Firefox, CLIENT).is_none());
        assert_eq!(manifest["background"], json!({"scripts": "bg.js"}));
    }

    #[test]
    fn test_service_worker_gets_wrapper() {
        let mut manifest = object(json!({
            "manifest_version": 3,
            "background": {"service_worker": "sw.js"}
        }));
        let wrapper = inject_client(&mut manifest, Vendor::Chrome, CLIENT).unwrap();

        assert_eq!(wrapper.name, WRAPPER_ASSET);
        assert!(wrapper
            .content
            .contains(r#"importScripts("/toolbox/client.js", "/sw.js");"#));
        assert_eq!(manifest["background"]["service_worker"], WRAPPER_ASSET);

        assert!(inject_client(&mut manifest, Vendor::Chrome, CLIENT).is_none());
    }

    #[test]
    fn test_module_service_worker_wrapper_uses_imports() {
        let mut manifest = object(json!({
            "manifest_version": 3,
            "background": {"service_worker": "/sw.js", "type": "module"}
        }));
        let wrapper = inject_client(&mut manifest, Vendor::Edge, CLIENT).unwrap();
        assert!(wrapper.content.contains("import \"/toolbox/client.js\";\n"));
        assert!(wrapper.content.contains("import \"/sw.js\";\n"));
        assert!(!wrapper.content.contains("importScripts"));
    }

    #[test]
    fn test_missing_background_follows_vendor_format() {
        let mut chrome = object(json!({"manifest_version": 3}));
        inject_client(&mut chrome, Vendor::Chrome, CLIENT);
        assert_eq!(chrome["background"], json!({"service_worker": CLIENT}));

        let mut firefox = object(json!({"manifest_version": 3}));
        inject_client(&mut firefox, Vendor::Firefox, CLIENT);
        assert_eq!(firefox["background"], json!({"scripts": [CLIENT]}));

        let mut mv2 = object(json!({"manifest_version": 2}));
        inject_client(&mut mv2, Vendor::Chrome, CLIENT);
        assert_eq!(mv2["background"], json!({"scripts": [CLIENT]}));
    }

    #[test]
    fn test_background_page_left_alone() {
        let mut manifest = object(json!({"background": {"page": "bg.html"}}));
        assert!(inject_client(&mut manifest, Vendor::Chrome, CLIENT).is_none());
        assert_eq!(manifest["background"], json!({"page": "bg.html"}));
    }
}
