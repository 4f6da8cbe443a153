//! Live reload: the listener script shipped inside the extension and the
//! socket server that tells it to reload.

pub mod client;
pub mod notifier;
pub mod protocol;

pub use client::{ClientCompiler, ClientSettings, CLIENT_ASSET};
pub use notifier::{ConnectionState, ReloadNotifier};
pub use protocol::{ReloadAction, ReloadEvent};
