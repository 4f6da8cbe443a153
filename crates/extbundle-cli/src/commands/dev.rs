//! `extbundle dev`: watch the source directory, rebuild on change and tell
//! connected extensions to reload.

use super::Project;
use extbundle_core::build::DirPipeline;
use extbundle_core::{BuildHooks, ExtensionPlugin, Vendor};
use miette::{IntoDiagnostic, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Quiet period after the last file event before a rebuild starts.
const DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct DevAction {
    pub cwd: PathBuf,
    pub vendor: Option<Vendor>,
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub no_reload: bool,
}

pub async fn run(action: DevAction) -> Result<()> {
    let cwd = action.cwd.canonicalize().into_diagnostic()?;
    let mut project =
        Project::load(&cwd, action.config.as_deref(), action.vendor).into_diagnostic()?;
    if let Some(file) = &project.config_file {
        println!("  Loaded config from {}", project.display(file));
    }

    // CLI flags override the config file.
    if let Some(port) = action.port {
        project.config.port = port;
    }
    if let Some(host) = action.host {
        project.config.host = host;
    }
    if action.no_reload {
        project.config.autoreload = false;
    }

    let src = project.src_dir();
    let dist = project.dist_dir();
    let mut plugin = ExtensionPlugin::new(&project.root, project.config.clone());
    let mut pipeline = DirPipeline::new(&src, &dist);

    // A bind failure ends the session before anything is built.
    if let Err(e) = pipeline.start_watch(&mut plugin).await {
        if let Some(addr) = e.bind_addr() {
            eprintln!("  hint: port {} is taken, pick another with --port", addr.port());
        }
        return Err(e).into_diagnostic();
    }
    match plugin.notifier() {
        Some(notifier) => println!("  Reload server: ws://{}", notifier.local_addr()),
        None => println!("  Live reload disabled"),
    }
    println!(
        "  Watching {} -> {}",
        project.display(&src),
        project.display(&dist)
    );

    rebuild(&mut pipeline, &mut plugin, None).await;

    let (change_tx, mut change_rx) = mpsc::channel::<BTreeSet<PathBuf>>(16);
    let watch_src = src.clone();
    let ignore_dist = dist.clone();
    std::thread::spawn(move || {
        if let Err(e) = watch_files(&watch_src, &ignore_dist, &change_tx) {
            error!(error = %e, "file watcher stopped");
        }
    });

    loop {
        tokio::select! {
            changed = change_rx.recv() => {
                let Some(changed) = changed else { break };
                for path in &changed {
                    debug!(path = %project.display(path), "file changed");
                }
                rebuild(&mut pipeline, &mut plugin, Some(changed)).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n  Shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Run one build. Failures are reported and the session keeps watching.
async fn rebuild<H: BuildHooks>(
    pipeline: &mut DirPipeline,
    hooks: &mut H,
    modified: Option<BTreeSet<PathBuf>>,
) {
    match pipeline.run(hooks, modified).await {
        Ok(report) => {
            if !report.emitted.is_empty() || !report.removed.is_empty() {
                println!(
                    "  Rebuilt in {}ms: {} written, {} removed",
                    report.duration_ms,
                    report.emitted.len(),
                    report.removed.len()
                );
            }
        }
        Err(e) => {
            error!(code = e.code(), "{e}");
            info!("waiting for changes");
        }
    }
}

/// Forward batches of changed source paths until the receiver goes away.
fn watch_files(
    src: &Path,
    dist: &Path,
    change_tx: &mpsc::Sender<BTreeSet<PathBuf>>,
) -> notify::Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(src, RecursiveMode::Recursive)?;

    let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        match rx.recv_timeout(DEBOUNCE) {
            Ok(Ok(event)) => {
                pending.extend(
                    event
                        .paths
                        .into_iter()
                        .filter(|p| !should_ignore(p, dist)),
                );
            }
            Ok(Err(e)) => error!(error = %e, "watch error"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if pending.is_empty() {
                    continue;
                }
                if change_tx.blocking_send(std::mem::take(&mut pending)).is_err() {
                    break;
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    Ok(())
}

/// Hidden files, editor droppings and anything under the output directory.
fn should_ignore(path: &Path, dist: &Path) -> bool {
    if path.starts_with(dist) {
        return true;
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return true;
    };
    name.starts_with('.') || name.ends_with('~') || name.ends_with(".swp")
}
