//! Lifecycle hooks a host build pipeline calls.

use super::Compilation;
use crate::error::Result;

/// Named build phases, independent of any particular host.
///
/// Every hook defaults to a no-op. An error from any hook aborts the current
/// build before outputs are written (or, for the later phases, before the
/// build is reported as complete).
#[allow(async_fn_in_trait)]
pub trait BuildHooks {
    /// Called once, before the first build of a watch session.
    async fn on_watch_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Register preserve rules and claim sources before anything is emitted.
    fn on_build_setup(&mut self, _compilation: &mut Compilation) -> Result<()> {
        Ok(())
    }

    /// Add generated outputs.
    async fn on_build_assets(&mut self, _compilation: &mut Compilation) -> Result<()> {
        Ok(())
    }

    /// Outputs are on disk; register file dependencies.
    fn on_after_build(&mut self, _compilation: &mut Compilation) -> Result<()> {
        Ok(())
    }

    /// The build finished. `compilation.emitted()` lists what was written.
    fn on_build_complete(&mut self, _compilation: &Compilation) -> Result<()> {
        Ok(())
    }
}
