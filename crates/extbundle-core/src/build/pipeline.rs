//! A minimal host pipeline: copy a source directory into an output
//! directory, letting hooks add generated outputs.

use super::hooks::BuildHooks;
use super::Compilation;
use crate::error::Result;
use extbundle_util::fs::{asset_id, atomic_write, list_files};
use extbundle_util::hash::{digest_bytes, digest_file};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summary of one build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Outputs written by this build, sorted.
    pub emitted: Vec<String>,
    /// Stale outputs deleted while cleaning, sorted.
    pub removed: Vec<String>,
    /// Outputs whose content did not change.
    pub unchanged: usize,
    pub file_dependencies: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Static-copy host pipeline.
///
/// Every source file is an output under the same relative name. Outputs are
/// rewritten only when their blake3 digest differs from what is on disk, so
/// the emitted list doubles as the change set.
/// Stale outputs are removed on every build unless a hook preserved them.
#[derive(Debug)]
pub struct DirPipeline {
    src: PathBuf,
    dist: PathBuf,
    watch: bool,
    digests: BTreeMap<String, String>,
    builds: u64,
}

impl DirPipeline {
    #[must_use]
    pub fn new(src: impl Into<PathBuf>, dist: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dist: dist.into(),
            watch: false,
            digests: BTreeMap::new(),
            builds: 0,
        }
    }

    #[must_use]
    pub fn src(&self) -> &Path {
        &self.src
    }

    #[must_use]
    pub fn dist(&self) -> &Path {
        &self.dist
    }

    #[must_use]
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    /// Switch to watch mode and notify `hooks`. Idempotent.
    pub async fn start_watch<H: BuildHooks>(&mut self, hooks: &mut H) -> Result<()> {
        if self.watch {
            return Ok(());
        }
        hooks.on_watch_start().await?;
        self.watch = true;
        Ok(())
    }

    /// Run one build.
    ///
    /// `modified` lists source files changed since the previous build;
    /// `None` when unknown. Nothing is written if a hook fails before the
    /// write phase.
    pub async fn run<H: BuildHooks>(
        &mut self,
        hooks: &mut H,
        modified: Option<BTreeSet<PathBuf>>,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let mut compilation = Compilation::new(self.watch, modified);

        hooks.on_build_setup(&mut compilation)?;
        hooks.on_build_assets(&mut compilation).await?;
        self.collect_sources(&mut compilation)?;

        let mut report = BuildReport::default();
        for (name, content) in compilation.assets() {
            let digest = digest_bytes(content);
            let target = self.dist.join(name);
            // Outputs left by an earlier process are compared on disk.
            let unchanged = match self.digests.get(name) {
                Some(previous) => *previous == digest && target.is_file(),
                None => digest_file(&target).is_ok_and(|on_disk| on_disk == digest),
            };
            if unchanged {
                self.digests.insert(name.clone(), digest);
                report.unchanged += 1;
                continue;
            }
            atomic_write(&target, content)?;
            self.digests.insert(name.clone(), digest);
            report.emitted.push(name.clone());
        }
        report.removed = self.clean(&compilation)?;

        compilation.set_emitted(report.emitted.clone());
        hooks.on_after_build(&mut compilation)?;
        hooks.on_build_complete(&compilation)?;

        self.builds += 1;
        report.file_dependencies = compilation.file_dependencies().iter().cloned().collect();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            build = self.builds,
            emitted = report.emitted.len(),
            unchanged = report.unchanged,
            removed = report.removed.len(),
            duration_ms = report.duration_ms,
            "build complete"
        );
        Ok(report)
    }

    /// Add every unclaimed source file not already emitted by a hook.
    fn collect_sources(&self, compilation: &mut Compilation) -> Result<()> {
        if !self.src.is_dir() {
            warn!(src = %self.src.display(), "source directory does not exist");
            return Ok(());
        }
        for path in list_files(&self.src)? {
            if path.starts_with(&self.dist) || compilation.is_claimed(&path) {
                continue;
            }
            let Some(name) = asset_id(&self.src, &path) else {
                continue;
            };
            if compilation.asset(&name).is_some() {
                debug!(asset = %name, "source shadowed by generated output");
                continue;
            }
            let content = std::fs::read(&path)?;
            compilation.assets_mut().insert(name, content);
        }
        Ok(())
    }

    /// Delete outputs this build neither produced nor preserved.
    fn clean(&mut self, compilation: &Compilation) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        if !self.dist.is_dir() {
            return Ok(removed);
        }
        for path in list_files(&self.dist)? {
            let Some(name) = asset_id(&self.dist, &path) else {
                continue;
            };
            if compilation.asset(&name).is_some() || compilation.is_preserved(&name) {
                continue;
            }
            std::fs::remove_file(&path)?;
            self.digests.remove(&name);
            debug!(asset = %name, "removed stale output");
            removed.push(name);
        }
        Ok(removed)
    }
}
