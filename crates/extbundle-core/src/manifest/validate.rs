//! Structural validation of a resolved manifest.
//!
//! Checks the subset of the WebExtension manifest schema that decides
//! whether a browser will load the bundle at all. Every violation is
//! collected; nothing stops at the first one.

use crate::error::Violation;
use crate::vendor::Vendor;
use serde_json::{Map, Value};

const MAX_NAME_LEN: usize = 75;
const MAX_DESCRIPTION_LEN: usize = 132;

/// Validate `manifest` for `vendor`, returning every violated rule.
#[must_use]
pub fn validate_manifest(manifest: &Map<String, Value>, vendor: Vendor) -> Vec<Violation> {
    let mut v = Validator::default();
    let mv = v.manifest_version(manifest, vendor);

    v.name(manifest);
    v.version(manifest);
    v.description(manifest);
    v.icons(manifest);

    v.string_array_field(manifest, "permissions");
    v.string_array_field(manifest, "optional_permissions");
    if manifest.contains_key("host_permissions") {
        if mv < 3 {
            v.push("host_permissions", "requires manifest_version 3");
        } else {
            v.string_array_field(manifest, "host_permissions");
        }
    }

    if mv >= 3 {
        for key in ["browser_action", "page_action"] {
            if manifest.contains_key(key) {
                v.push(key, "is not allowed in manifest_version 3, use `action`");
            }
        }
    }

    v.background(manifest, mv);
    v.content_scripts(manifest);
    v.web_accessible_resources(manifest, mv);
    v.content_security_policy(manifest, mv);

    v.violations
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    /// Returns the version the remaining rules are checked against.
    fn manifest_version(&mut self, manifest: &Map<String, Value>, vendor: Vendor) -> u64 {
        match manifest.get("manifest_version") {
            None => {
                self.push("manifest_version", "is required");
                2
            }
            Some(value) => match value.as_u64() {
                Some(mv) if vendor.supports_manifest_version(mv) => mv,
                Some(mv) => {
                    self.push(
                        "manifest_version",
                        format!("{mv} is not supported by {vendor}"),
                    );
                    mv
                }
                None => {
                    self.push("manifest_version", "must be an integer");
                    2
                }
            },
        }
    }

    fn name(&mut self, manifest: &Map<String, Value>) {
        match manifest.get("name") {
            None => self.push("name", "is required"),
            Some(Value::String(name)) if name.trim().is_empty() => {
                self.push("name", "must not be empty");
            }
            Some(Value::String(name)) if name.chars().count() > MAX_NAME_LEN => {
                self.push("name", format!("must be at most {MAX_NAME_LEN} characters"));
            }
            Some(Value::String(_)) => {}
            Some(_) => self.push("name", "must be a string"),
        }
    }

    fn version(&mut self, manifest: &Map<String, Value>) {
        match manifest.get("version") {
            None => self.push("version", "is required"),
            Some(Value::String(version)) => {
                if !is_valid_version(version) {
                    self.push(
                        "version",
                        format!("`{version}` must be 1-4 dot-separated integers between 0 and 65535"),
                    );
                }
            }
            Some(_) => self.push("version", "must be a string"),
        }
    }

    fn description(&mut self, manifest: &Map<String, Value>) {
        match manifest.get("description") {
            None => {}
            Some(Value::String(text)) if text.chars().count() > MAX_DESCRIPTION_LEN => {
                self.push(
                    "description",
                    format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
                );
            }
            Some(Value::String(_)) => {}
            Some(_) => self.push("description", "must be a string"),
        }
    }

    fn icons(&mut self, manifest: &Map<String, Value>) {
        match manifest.get("icons") {
            None => {}
            Some(Value::Object(icons)) => {
                for (size, path) in icons {
                    if !path.is_string() {
                        self.push(format!("icons.{size}"), "must be a string path");
                    }
                }
            }
            Some(_) => self.push("icons", "must be an object"),
        }
    }

    fn string_array_field(&mut self, object: &Map<String, Value>, key: &str) {
        if let Some(value) = object.get(key) {
            self.string_array(key, value);
        }
    }

    fn string_array(&mut self, path: &str, value: &Value) {
        let Value::Array(items) = value else {
            self.push(path, "must be an array of strings");
            return;
        };
        for (i, item) in items.iter().enumerate() {
            if !item.is_string() {
                self.push(format!("{path}[{i}]"), "must be a string");
            }
        }
    }

    fn background(&mut self, manifest: &Map<String, Value>, mv: u64) {
        let Some(background) = manifest.get("background") else {
            return;
        };
        let Value::Object(background) = background else {
            self.push("background", "must be an object");
            return;
        };

        if let Some(scripts) = background.get("scripts") {
            self.string_array("background.scripts", scripts);
        }
        if let Some(worker) = background.get("service_worker") {
            if !worker.is_string() {
                self.push("background.service_worker", "must be a string");
            } else if mv < 3 {
                self.push("background.service_worker", "requires manifest_version 3");
            }
        }
        if let Some(page) = background.get("page") {
            if !page.is_string() {
                self.push("background.page", "must be a string");
            }
            if background.contains_key("scripts") || background.contains_key("service_worker") {
                self.push(
                    "background.page",
                    "cannot be combined with `scripts` or `service_worker`",
                );
            }
        }
        if background.get("persistent").is_some_and(|p| !p.is_boolean()) {
            self.push("background.persistent", "must be a boolean");
        }
        match background.get("type") {
            None => {}
            Some(Value::String(kind)) if kind == "classic" || kind == "module" => {}
            Some(_) => self.push("background.type", "must be \"classic\" or \"module\""),
        }
    }

    fn content_scripts(&mut self, manifest: &Map<String, Value>) {
        let Some(scripts) = manifest.get("content_scripts") else {
            return;
        };
        let Value::Array(scripts) = scripts else {
            self.push("content_scripts", "must be an array");
            return;
        };
        for (i, entry) in scripts.iter().enumerate() {
            let path = format!("content_scripts[{i}]");
            let Value::Object(entry) = entry else {
                self.push(path, "must be an object");
                continue;
            };
            match entry.get("matches") {
                None => self.push(format!("{path}.matches"), "is required"),
                Some(Value::Array(matches)) if matches.is_empty() => {
                    self.push(format!("{path}.matches"), "must not be empty");
                }
                Some(matches) => self.string_array(&format!("{path}.matches"), matches),
            }
            for key in ["js", "css", "exclude_matches"] {
                if let Some(value) = entry.get(key) {
                    self.string_array(&format!("{path}.{key}"), value);
                }
            }
        }
    }

    fn web_accessible_resources(&mut self, manifest: &Map<String, Value>, mv: u64) {
        let Some(resources) = manifest.get("web_accessible_resources") else {
            return;
        };
        if mv < 3 {
            self.string_array("web_accessible_resources", resources);
            return;
        }
        let Value::Array(entries) = resources else {
            self.push("web_accessible_resources", "must be an array of objects");
            return;
        };
        for (i, entry) in entries.iter().enumerate() {
            let path = format!("web_accessible_resources[{i}]");
            let Value::Object(entry) = entry else {
                self.push(path, "must be an object in manifest_version 3");
                continue;
            };
            match entry.get("resources") {
                Some(resources) => self.string_array(&format!("{path}.resources"), resources),
                None => self.push(format!("{path}.resources"), "is required"),
            }
            match (entry.get("matches"), entry.get("extension_ids")) {
                (None, None) => {
                    self.push(path, "requires `matches` or `extension_ids`");
                }
                (matches, ids) => {
                    if let Some(matches) = matches {
                        self.string_array(&format!("{path}.matches"), matches);
                    }
                    if let Some(ids) = ids {
                        self.string_array(&format!("{path}.extension_ids"), ids);
                    }
                }
            }
        }
    }

    fn content_security_policy(&mut self, manifest: &Map<String, Value>, mv: u64) {
        let Some(csp) = manifest.get("content_security_policy") else {
            return;
        };
        if mv < 3 {
            if !csp.is_string() {
                self.push("content_security_policy", "must be a string in manifest_version 2");
            }
            return;
        }
        let Value::Object(policies) = csp else {
            self.push(
                "content_security_policy",
                "must be an object in manifest_version 3",
            );
            return;
        };
        for (key, policy) in policies {
            if !policy.is_string() {
                self.push(format!("content_security_policy.{key}"), "must be a string");
            }
        }
    }
}

/// `1` to `4` dot-separated integers in `0..=65535`, no leading zeros.
fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return false;
    }
    parts.iter().all(|part| {
        !part.is_empty()
            && part.bytes().all(|b| b.is_ascii_digit())
            && (part.len() == 1 || !part.starts_with('0'))
            && part.parse::<u32>().is_ok_and(|n| n <= 65535)
    })
}
