//! Build session state.
//!
//! Client: `Idle → Pending → Emitted`. A failed build while `Pending` falls
//! back to `Idle` so the next build retries; `Emitted` is final for the
//! session.
//!
//! Manifest: `Unknown → Changed | Unchanged` at build setup, back to
//! `Unknown` when the build completes.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    Idle,
    Pending,
    Emitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestState {
    #[default]
    Unknown,
    Changed,
    Unchanged,
}

/// Process-scoped state for one attachment to a host pipeline.
#[derive(Debug, Default)]
pub struct SessionState {
    watch: bool,
    client: ClientState,
    manifest: ManifestState,
    manifest_built: bool,
    build_started: Option<Instant>,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_watch(&self) -> bool {
        self.watch
    }

    #[must_use]
    pub fn client(&self) -> ClientState {
        self.client
    }

    #[must_use]
    pub fn manifest(&self) -> ManifestState {
        self.manifest
    }

    pub fn enter_watch(&mut self) {
        self.watch = true;
    }

    /// Start a build. The manifest counts as changed until one transform
    /// has succeeded, whatever the host reports.
    pub fn begin_build(&mut self, manifest_changed: bool) {
        self.build_started = Some(Instant::now());
        self.manifest = if manifest_changed || !self.manifest_built {
            ManifestState::Changed
        } else {
            ManifestState::Unchanged
        };
    }

    /// Claim the client for emission. Returns `false` unless it was idle.
    pub fn client_pending(&mut self) -> bool {
        if self.client == ClientState::Idle {
            self.client = ClientState::Pending;
            true
        } else {
            false
        }
    }

    pub fn client_emitted(&mut self) {
        self.client = ClientState::Emitted;
    }

    pub fn client_failed(&mut self) {
        if self.client == ClientState::Pending {
            self.client = ClientState::Idle;
        }
    }

    pub fn manifest_emitted(&mut self) {
        self.manifest_built = true;
    }

    /// End the build, returning how long it took.
    pub fn finish_build(&mut self) -> Option<Duration> {
        self.manifest = ManifestState::Unknown;
        self.build_started.take().map(|start| start.elapsed())
    }
}
