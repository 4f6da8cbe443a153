//! Build lifecycle: the hooks a host pipeline drives and the extension plugin
//! that implements them.
//!
//! A host runs each build as
//!
//! ```text
//! on_build_setup → on_build_assets → (copy + write outputs) → on_after_build → on_build_complete
//! ```
//!
//! with `on_watch_start` called once before the first build of a watch session.

pub mod hooks;
pub mod pipeline;
pub mod plugin;
pub mod session;
pub mod tracker;

pub use hooks::BuildHooks;
pub use pipeline::{BuildReport, DirPipeline};
pub use plugin::ExtensionPlugin;
pub use session::{ClientState, ManifestState, SessionState};
pub use tracker::{manifest_changed, ChangeSet};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// State of one build, shared between the host and its hooks.
#[derive(Debug, Default)]
pub struct Compilation {
    watch: bool,
    modified_files: Option<BTreeSet<PathBuf>>,
    assets: BTreeMap<String, Vec<u8>>,
    preserve: BTreeSet<String>,
    claimed: BTreeSet<PathBuf>,
    file_dependencies: BTreeSet<PathBuf>,
    emitted: Vec<String>,
}

impl Compilation {
    /// `modified_files` is `None` when the host cannot tell what changed,
    /// which is always the case for the first build.
    #[must_use]
    pub fn new(watch: bool, modified_files: Option<BTreeSet<PathBuf>>) -> Self {
        Self {
            watch,
            modified_files,
            ..Default::default()
        }
    }

    /// Whether this build belongs to a watch session.
    #[must_use]
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    #[must_use]
    pub fn modified_files(&self) -> Option<&BTreeSet<PathBuf>> {
        self.modified_files.as_ref()
    }

    /// Add an output. A later asset with the same name replaces the earlier one.
    pub fn emit_asset(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.assets.insert(name.into(), content.into());
    }

    #[must_use]
    pub fn asset(&self, name: &str) -> Option<&[u8]> {
        self.assets.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.assets
    }

    pub(crate) fn assets_mut(&mut self) -> &mut BTreeMap<String, Vec<u8>> {
        &mut self.assets
    }

    /// Keep output `name` when cleaning, even if this build did not emit it.
    pub fn preserve(&mut self, name: impl Into<String>) {
        self.preserve.insert(name.into());
    }

    #[must_use]
    pub fn is_preserved(&self, name: &str) -> bool {
        self.preserve.contains(name)
    }

    /// Tell the host a hook produces the output for `source`, so the host
    /// must not copy it verbatim.
    pub fn claim_source(&mut self, source: impl Into<PathBuf>) {
        self.claimed.insert(source.into());
    }

    #[must_use]
    pub fn is_claimed(&self, source: &Path) -> bool {
        self.claimed.contains(source)
    }

    /// Register a file whose edits should trigger a rebuild.
    pub fn add_file_dependency(&mut self, path: impl Into<PathBuf>) {
        self.file_dependencies.insert(path.into());
    }

    #[must_use]
    pub fn file_dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.file_dependencies
    }

    /// Outputs written to disk by this build. Filled in by the host.
    #[must_use]
    pub fn emitted(&self) -> &[String] {
        &self.emitted
    }

    pub(crate) fn set_emitted(&mut self, emitted: Vec<String>) {
        self.emitted = emitted;
    }
}
