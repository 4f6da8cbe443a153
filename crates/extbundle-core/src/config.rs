//! Runtime and project configuration.
//!
//! [`Config`] carries the CLI-level settings (working directory, log output).
//! [`ExtensionConfig`] is the project file `extbundle.config.json` (or
//! `extbundle.json`), every field optional:
//!
//! ```json
//! {
//!   "src": "app",
//!   "vendor": "firefox",
//!   "port": 35729,
//!   "host": "localhost",
//!   "reconnectTime": 3000,
//!   "autoreload": true,
//!   "manifestDefaults": { "version": "1.0.0" },
//!   "skipManifestValidation": false
//! }
//! ```

use crate::error::{Error, Result};
use crate::vendor::Vendor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Runtime configuration for the extbundle CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

pub const DEFAULT_PORT: u16 = 35729;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_RECONNECT_TIME_MS: u64 = 3000;
pub const DEFAULT_MANIFEST: &str = "manifest.json";
pub const DEFAULT_SRC: &str = "app";

/// Project configuration consumed by the packaging and reload core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Source directory (build context root), relative to the project root.
    pub src: PathBuf,
    /// Output directory. Defaults to `dist/<vendor>`.
    pub dist: Option<PathBuf>,
    /// Manifest file name inside `src`.
    pub manifest: PathBuf,
    /// Reload server port.
    pub port: u16,
    /// Reload server host.
    pub host: String,
    /// Client reconnect backoff in milliseconds.
    pub reconnect_time: u64,
    /// Inject the reload client and run the notifier in watch mode.
    pub autoreload: bool,
    /// Target vendor.
    pub vendor: Vendor,
    /// Overlay applied under the manifest (fills gaps only).
    pub manifest_defaults: Map<String, Value>,
    /// Skip structural manifest validation.
    pub skip_manifest_validation: bool,
    /// Custom reload-listener template, replacing the built-in one.
    pub client_template: Option<PathBuf>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from(DEFAULT_SRC),
            dist: None,
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            reconnect_time: DEFAULT_RECONNECT_TIME_MS,
            autoreload: true,
            vendor: Vendor::default(),
            manifest_defaults: Map::new(),
            skip_manifest_validation: false,
            client_template: None,
        }
    }
}

impl ExtensionConfig {
    /// Absolute source directory for a project rooted at `root`.
    #[must_use]
    pub fn src_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.src)
    }

    /// Absolute output directory for a project rooted at `root`.
    #[must_use]
    pub fn dist_dir(&self, root: &Path) -> PathBuf {
        match &self.dist {
            Some(dist) => root.join(dist),
            None => root.join("dist").join(self.vendor.as_str()),
        }
    }

    /// Absolute manifest path for a project rooted at `root`.
    #[must_use]
    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        self.src_dir(root).join(&self.manifest)
    }
}

/// Config file names in priority order.
const CONFIG_FILES: &[&str] = &["extbundle.config.json", "extbundle.json"];

/// Find a config file in the given root directory.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Load project configuration.
///
/// An explicit `config_path` must exist. Without one, the root is searched
/// for a config file and defaults are used when none is found. Returns the
/// file the configuration came from, if any.
pub fn load_config(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<(Option<PathBuf>, ExtensionConfig)> {
    let path = match config_path {
        Some(p) => {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok((None, ExtensionConfig::default())),
        },
    };

    let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;
    let config = serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;
    Ok((Some(path), config))
}
