use crate::vendor::VENDOR_TABLE_VERSION;
use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line printed by `extbundle version`: crate version, vendor table
/// revision and the build hash when one was baked in.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("extbundle {VERSION} (vendor table v{VENDOR_TABLE_VERSION})");

    if let Some(hash) = option_env!("EXTBUNDLE_BUILD_GIT_HASH") {
        let _ = write!(s, " [{hash}]");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_contains_version() {
        let vs = version_string();
        assert!(vs.contains(VERSION));
        assert!(vs.starts_with("extbundle "));
        assert!(vs.contains(&format!("vendor table v{VENDOR_TABLE_VERSION}")));
    }
}
