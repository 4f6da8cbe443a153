#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::return_self_not_must_use)]

//! Packaging and live-reload coordination for browser-extension builds.
//!
//! - [`manifest`]: vendor key resolution, validation and reload injection
//! - [`reload`]: the in-extension listener script and the socket notifier
//! - [`build`]: change tracking, session state and the lifecycle hooks a
//!   host build pipeline drives

pub mod build;
pub mod config;
pub mod error;
pub mod manifest;
pub mod reload;
pub mod vendor;
pub mod version;

pub use build::{BuildHooks, DirPipeline, ExtensionPlugin};
pub use config::{Config, ExtensionConfig};
pub use error::{Error, Result};
pub use manifest::{transform_manifest, TransformOptions, TransformedManifest};
pub use reload::{ClientCompiler, ReloadEvent, ReloadNotifier};
pub use vendor::Vendor;
pub use version::VERSION;
