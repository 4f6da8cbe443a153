//! Reload-listener script compiled into the extension.

use crate::config::ExtensionConfig;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Output path of the compiled listener.
pub const CLIENT_ASSET: &str = "toolbox/client.js";

const HOST_PLACEHOLDER: &str = "__RELOAD_HOST__";
const PORT_PLACEHOLDER: &str = "__RELOAD_PORT__";
const RECONNECT_PLACEHOLDER: &str = "__RELOAD_RECONNECT_TIME__";

/// Connection parameters baked into the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub host: String,
    pub port: u16,
    /// Delay before reconnecting after the socket closes, in milliseconds.
    pub reconnect_time: u64,
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &ExtensionConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            reconnect_time: config.reconnect_time,
        }
    }
}

/// Compiles the listener once per build session.
///
/// The first successful [`compile`](Self::compile) caches its output; later
/// calls return the same `Arc` without touching the template again.
#[derive(Debug)]
pub struct ClientCompiler {
    settings: ClientSettings,
    template: Option<PathBuf>,
    compiled: OnceCell<Arc<str>>,
}

impl ClientCompiler {
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            template: None,
            compiled: OnceCell::new(),
        }
    }

    /// Use a template file instead of the built-in listener.
    #[must_use]
    pub fn with_template(mut self, path: PathBuf) -> Self {
        self.template = Some(path);
        self
    }

    #[cfg(test)]
    fn is_compiled(&self) -> bool {
        self.compiled.initialized()
    }

    pub async fn compile(&self) -> Result<Arc<str>> {
        self.compiled
            .get_or_try_init(|| async {
                let template = self.load_template().await?;
                render_client(&template, &self.settings).map(Arc::from)
            })
            .await
            .map(Arc::clone)
    }

    async fn load_template(&self) -> Result<String> {
        match &self.template {
            None => Ok(CLIENT_TEMPLATE.to_string()),
            Some(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| Error::ClientCompile {
                        message: format!("cannot read template {}: {e}", path.display()),
                    })
            }
        }
    }
}

/// Substitute connection settings into a listener template.
///
/// Every placeholder must appear in the template; a template missing one
/// would produce a client that can never reach the notifier.
pub fn render_client(template: &str, settings: &ClientSettings) -> Result<String> {
    let missing: Vec<&str> = [HOST_PLACEHOLDER, PORT_PLACEHOLDER, RECONNECT_PLACEHOLDER]
        .into_iter()
        .filter(|p| !template.contains(p))
        .collect();
    if !missing.is_empty() {
        return Err(Error::ClientCompile {
            message: format!("template is missing placeholder(s): {}", missing.join(", ")),
        });
    }

    let host = serde_json::to_string(&settings.host).map_err(|e| Error::ClientCompile {
        message: format!("cannot encode host: {e}"),
    })?;

    Ok(template
        .replace(HOST_PLACEHOLDER, &host)
        .replace(PORT_PLACEHOLDER, &settings.port.to_string())
        .replace(RECONNECT_PLACEHOLDER, &settings.reconnect_time.to_string()))
}

/// Built-in listener. Runs in background scripts and service workers alike,
/// so it only relies on `self`, `WebSocket` and the runtime API.
const CLIENT_TEMPLATE: &str = r"// extbundle reload client
(function () {
  const host = __RELOAD_HOST__;
  const port = __RELOAD_PORT__;
  const reconnectTime = __RELOAD_RECONNECT_TIME__;
  const api = typeof browser !== 'undefined' ? browser : chrome;

  function connect() {
    let socket;
    try {
      socket = new WebSocket(`ws://${host}:${port}`);
    } catch (err) {
      self.setTimeout(connect, reconnectTime);
      return;
    }

    socket.onopen = () => {
      console.info('[extbundle] reload client connected');
    };

    socket.onmessage = (event) => {
      let msg;
      try {
        msg = JSON.parse(event.data);
      } catch (err) {
        return;
      }
      if (msg && msg.action === 'reload') {
        console.info('[extbundle] changed:', (msg.changedFiles || []).join(', '));
        api.runtime.reload();
      }
    };

    socket.onclose = () => {
      self.setTimeout(connect, reconnectTime);
    };
  }

  connect();
})();
";
