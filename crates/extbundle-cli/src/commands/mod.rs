pub mod build;
pub mod dev;
pub mod version;

use extbundle_core::config::load_config;
use extbundle_core::{ExtensionConfig, Vendor};
use std::path::{Path, PathBuf};

/// Project configuration with CLI overrides applied.
pub struct Project {
    pub root: PathBuf,
    pub config_file: Option<PathBuf>,
    pub config: ExtensionConfig,
}

impl Project {
    /// Load the config file under `root` (or `config_path`) and apply
    /// `vendor` on top. Flags always win over file values.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        vendor: Option<Vendor>,
    ) -> extbundle_core::Result<Self> {
        let (config_file, mut config) = load_config(root, config_path)?;
        if let Some(vendor) = vendor {
            config.vendor = vendor;
        }
        Ok(Self {
            root: root.to_path_buf(),
            config_file,
            config,
        })
    }

    pub fn src_dir(&self) -> PathBuf {
        self.config.src_dir(&self.root)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.config.dist_dir(&self.root)
    }

    /// `path` relative to the project root, for display.
    pub fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }
}
