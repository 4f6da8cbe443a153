//! Change tracking between incremental builds.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Whether the manifest at `manifest` is among `modified`.
///
/// `None` means the host could not report modified files (the first build),
/// in which case the manifest is treated as changed.
#[must_use]
pub fn manifest_changed(modified: Option<&BTreeSet<PathBuf>>, manifest: &Path) -> bool {
    let Some(modified) = modified else {
        return true;
    };
    let target = normalize(manifest);
    modified.iter().any(|path| normalize(path) == target)
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Output identifiers (re-)emitted by one build, sorted and de-duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(Vec<String>);

impl ChangeSet {
    pub fn from_emitted<I, S>(emitted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut files: Vec<String> = emitted.into_iter().map(Into::into).collect();
        files.sort();
        files.dedup();
        Self(files)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_unknown_modifications_mean_changed() {
        assert!(manifest_changed(None, Path::new("/p/app/manifest.json")));
    }

    #[test]
    fn test_manifest_in_modified_set() {
        let manifest = Path::new("/p/app/manifest.json");
        assert!(manifest_changed(
            Some(&set(&["/p/app/popup.js", "/p/app/manifest.json"])),
            manifest
        ));
        assert!(!manifest_changed(Some(&set(&["/p/app/popup.js"])), manifest));
        assert!(!manifest_changed(Some(&BTreeSet::new()), manifest));
    }

    #[test]
    fn test_paths_are_normalized() {
        let manifest = Path::new("/p/app/manifest.json");
        assert!(manifest_changed(
            Some(&set(&["/p/app/./sub/../manifest.json"])),
            manifest
        ));
    }

    #[test]
    fn test_change_set_sorted_unique() {
        let changes = ChangeSet::from_emitted(["popup.js", "manifest.json", "popup.js"]);
        assert_eq!(changes.as_slice(), ["manifest.json", "popup.js"]);
        assert_eq!(changes.len(), 2);
        assert!(ChangeSet::from_emitted(Vec::<String>::new()).is_empty());
    }
}
