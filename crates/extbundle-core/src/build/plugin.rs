//! The extension plugin: manifest, reload client and notifier wired into the
//! build lifecycle.

use super::hooks::BuildHooks;
use super::session::{ManifestState, SessionState};
use super::tracker::{manifest_changed, ChangeSet};
use super::Compilation;
use crate::config::{ExtensionConfig, DEFAULT_MANIFEST};
use crate::error::Result;
use crate::manifest::{
    read_manifest, transform_manifest, TransformOptions, TransformedManifest, WRAPPER_ASSET,
};
use crate::reload::{ClientCompiler, ClientSettings, ReloadEvent, ReloadNotifier, CLIENT_ASSET};
use extbundle_util::fs::asset_id;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct ExtensionPlugin {
    config: ExtensionConfig,
    manifest_path: PathBuf,
    manifest_asset: String,
    client: ClientCompiler,
    notifier: Option<ReloadNotifier>,
    session: SessionState,
}

impl ExtensionPlugin {
    /// Plugin for a project rooted at `root`.
    #[must_use]
    pub fn new(root: &Path, config: ExtensionConfig) -> Self {
        let manifest_path = config.manifest_path(root);
        let manifest_asset = asset_id(&config.src_dir(root), &manifest_path)
            .unwrap_or_else(|| DEFAULT_MANIFEST.to_string());

        let mut client = ClientCompiler::new(ClientSettings::from_config(&config));
        if let Some(template) = &config.client_template {
            client = client.with_template(root.join(template));
        }

        Self {
            config,
            manifest_path,
            manifest_asset,
            client,
            notifier: None,
            session: SessionState::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The running notifier; `None` outside watch mode or with reload off.
    #[must_use]
    pub fn notifier(&self) -> Option<&ReloadNotifier> {
        self.notifier.as_ref()
    }

    fn reload_active(&self) -> bool {
        self.session.is_watch() && self.config.autoreload
    }

    async fn build_manifest(&self, inject: bool) -> Result<TransformedManifest> {
        let source = read_manifest(&self.manifest_path).await?;
        let options = TransformOptions {
            vendor: self.config.vendor,
            defaults: &self.config.manifest_defaults,
            skip_validation: self.config.skip_manifest_validation,
            inject_client: inject.then_some(CLIENT_ASSET),
        };
        transform_manifest(&self.manifest_path, &source, &options)
    }
}

impl BuildHooks for ExtensionPlugin {
    async fn on_watch_start(&mut self) -> Result<()> {
        self.session.enter_watch();
        if self.config.autoreload && self.notifier.is_none() {
            let notifier = ReloadNotifier::start(&self.config.host, self.config.port).await?;
            self.notifier = Some(notifier);
        }
        Ok(())
    }

    fn on_build_setup(&mut self, compilation: &mut Compilation) -> Result<()> {
        let changed = manifest_changed(compilation.modified_files(), &self.manifest_path);
        self.session.begin_build(changed);

        compilation.claim_source(self.manifest_path.clone());
        compilation.preserve(self.manifest_asset.clone());
        if self.reload_active() {
            compilation.preserve(CLIENT_ASSET);
            compilation.preserve(WRAPPER_ASSET);
        }
        Ok(())
    }

    async fn on_build_assets(&mut self, compilation: &mut Compilation) -> Result<()> {
        let reload = self.reload_active();
        let emit_manifest = self.session.manifest() == ManifestState::Changed;
        let emit_client = reload && self.session.client_pending();

        let this = &*self;
        let (manifest, client) = tokio::join!(
            async {
                if emit_manifest {
                    this.build_manifest(reload).await.map(Some)
                } else {
                    Ok(None)
                }
            },
            async {
                if emit_client {
                    this.client.compile().await.map(Some)
                } else {
                    Ok::<Option<Arc<str>>, _>(None)
                }
            },
        );

        let (manifest, client) = match (manifest, client) {
            (Ok(manifest), Ok(client)) => (manifest, client),
            (Err(e), _) | (_, Err(e)) => {
                self.session.client_failed();
                return Err(e);
            }
        };

        if let Some(transformed) = manifest {
            compilation.emit_asset(self.manifest_asset.clone(), transformed.to_json()?);
            if let Some(wrapper) = transformed.wrapper {
                compilation.emit_asset(wrapper.name, wrapper.content);
            }
            self.session.manifest_emitted();
            info!(vendor = %self.config.vendor, "manifest emitted");
        } else {
            debug!("manifest unchanged, not re-emitted");
        }

        if let Some(script) = client {
            compilation.emit_asset(CLIENT_ASSET, script.as_bytes());
            self.session.client_emitted();
            debug!(asset = CLIENT_ASSET, "reload client emitted");
        }
        Ok(())
    }

    fn on_after_build(&mut self, compilation: &mut Compilation) -> Result<()> {
        compilation.add_file_dependency(self.manifest_path.clone());
        Ok(())
    }

    fn on_build_complete(&mut self, compilation: &Compilation) -> Result<()> {
        if let Some(elapsed) = self.session.finish_build() {
            debug!(elapsed_ms = elapsed.as_millis(), "extension build finished");
        }

        let changes = ChangeSet::from_emitted(compilation.emitted().iter().cloned());
        if changes.is_empty() {
            debug!("no outputs changed, nothing to reload");
            return Ok(());
        }
        if let Some(notifier) = &self.notifier {
            notifier.broadcast(&ReloadEvent::reload(changes.into_vec()));
        }
        Ok(())
    }
}
