//! Vendor key table.
//!
//! Static data describing the browser runtimes a manifest can target: how
//! vendor-prefixed manifest keys are spelled, which manifest versions each
//! vendor loads, and which background format each expects.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Revision of the table below. Bump when a row changes meaning.
pub const VENDOR_TABLE_VERSION: u32 = 1;

/// A target browser runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Chrome,
    Firefox,
    Opera,
    Edge,
    Safari,
}

/// How a vendor runs the extension's background context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFormat {
    /// `background.scripts`: a list of classic scripts (event page).
    Scripts,
    /// `background.service_worker`: a single worker entry.
    ServiceWorker,
}

/// One row of the vendor key table.
#[derive(Debug, Clone, Copy)]
pub struct VendorRule {
    pub vendor: Vendor,
    /// Manifest versions this vendor loads.
    pub manifest_versions: &'static [u64],
    /// Background format on manifest version 3 (MV2 is always `Scripts`).
    pub mv3_background: BackgroundFormat,
}

const VENDOR_TABLE: &[VendorRule] = &[
    VendorRule {
        vendor: Vendor::Chrome,
        manifest_versions: &[2, 3],
        mv3_background: BackgroundFormat::ServiceWorker,
    },
    VendorRule {
        vendor: Vendor::Firefox,
        manifest_versions: &[2, 3],
        mv3_background: BackgroundFormat::Scripts,
    },
    VendorRule {
        vendor: Vendor::Opera,
        manifest_versions: &[2, 3],
        mv3_background: BackgroundFormat::ServiceWorker,
    },
    VendorRule {
        vendor: Vendor::Edge,
        manifest_versions: &[2, 3],
        mv3_background: BackgroundFormat::ServiceWorker,
    },
    VendorRule {
        vendor: Vendor::Safari,
        manifest_versions: &[2, 3],
        mv3_background: BackgroundFormat::Scripts,
    },
];

impl Vendor {
    pub const ALL: [Vendor; 5] = [
        Vendor::Chrome,
        Vendor::Firefox,
        Vendor::Opera,
        Vendor::Edge,
        Vendor::Safari,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Opera => "opera",
            Self::Edge => "edge",
            Self::Safari => "safari",
        }
    }

    /// The table row for this vendor.
    #[must_use]
    pub fn rule(self) -> &'static VendorRule {
        VENDOR_TABLE
            .iter()
            .find(|rule| rule.vendor == self)
            .unwrap_or(&VENDOR_TABLE[0])
    }

    #[must_use]
    pub fn supports_manifest_version(self, version: u64) -> bool {
        self.rule().manifest_versions.contains(&version)
    }

    #[must_use]
    pub fn background_format(self, manifest_version: u64) -> BackgroundFormat {
        if manifest_version >= 3 {
            self.rule().mv3_background
        } else {
            BackgroundFormat::Scripts
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Vendor::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| Error::UnknownVendor(s.to_string()))
    }
}

/// A manifest key of the form `__<vendor>[|<vendor>...]__<base>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorKey<'a> {
    pub vendors: Vec<Vendor>,
    pub base: &'a str,
}

impl<'a> VendorKey<'a> {
    /// Parse a manifest key; `None` when it is not vendor-prefixed.
    ///
    /// Keys that have the `__x__` shape but name an unknown vendor are
    /// ordinary keys and are returned as `None`.
    #[must_use]
    pub fn parse(key: &'a str) -> Option<Self> {
        let rest = key.strip_prefix("__")?;
        let (prefix, base) = rest.split_once("__")?;
        if prefix.is_empty() || base.is_empty() {
            return None;
        }
        let vendors = prefix
            .split('|')
            .map(|name| name.parse::<Vendor>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { vendors, base })
    }

    #[must_use]
    pub fn applies_to(&self, vendor: Vendor) -> bool {
        self.vendors.contains(&vendor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_parse_roundtrip() {
        for vendor in Vendor::ALL {
            assert_eq!(vendor.as_str().parse::<Vendor>().unwrap(), vendor);
        }
        assert!(matches!(
            "netscape".parse::<Vendor>(),
            Err(Error::UnknownVendor(name)) if name == "netscape"
        ));
    }

    #[test]
    fn test_vendor_key_single() {
        let key = VendorKey::parse("__chrome__background").unwrap();
        assert_eq!(key.vendors, vec![Vendor::Chrome]);
        assert_eq!(key.base, "background");
        assert!(key.applies_to(Vendor::Chrome));
        assert!(!key.applies_to(Vendor::Firefox));
    }

    #[test]
    fn test_vendor_key_multiple() {
        let key = VendorKey::parse("__chrome|opera__minimum_chrome_version").unwrap();
        assert_eq!(key.vendors, vec![Vendor::Chrome, Vendor::Opera]);
        assert_eq!(key.base, "minimum_chrome_version");
    }

    #[test]
    fn test_vendor_key_rejects_non_vendor_keys() {
        assert_eq!(VendorKey::parse("background"), None);
        assert_eq!(VendorKey::parse("__MSG_appName__"), None);
        assert_eq!(VendorKey::parse("__netscape__background"), None);
        assert_eq!(VendorKey::parse("__chrome__"), None);
        assert_eq!(VendorKey::parse("____name"), None);
    }

    #[test]
    fn test_background_format_by_manifest_version() {
        assert_eq!(Vendor::Chrome.background_format(2), BackgroundFormat::Scripts);
        assert_eq!(Vendor::Chrome.background_format(3), BackgroundFormat::ServiceWorker);
        assert_eq!(Vendor::Firefox.background_format(3), BackgroundFormat::Scripts);
        assert!(Vendor::Edge.supports_manifest_version(3));
        assert!(!Vendor::Edge.supports_manifest_version(1));
    }
}
