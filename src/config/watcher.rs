//! Configuration file watcher for hot reload of the handler list.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_handlers;
use crate::routing::RouteTable;

/// Watches the config file and emits freshly compiled route tables.
pub struct ConfigWatcher {
    path: PathBuf,
    approot: PathBuf,
    has_interpreter: bool,
    update_tx: mpsc::UnboundedSender<RouteTable>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for route table updates.
    pub fn new(
        path: &Path,
        approot: &Path,
        has_interpreter: bool,
    ) -> (Self, mpsc::UnboundedReceiver<RouteTable>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                approot: approot.to_path_buf(),
                has_interpreter,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching in a background thread. Drop the returned watcher to stop.
    ///
    /// The parent directory is watched so editors that replace the file on
    /// save are still picked up.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            approot,
            has_interpreter,
            update_tx,
        } = self;
        let watch_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
        let file = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p == &file);
                    if !relevant {
                        return;
                    }

                    tracing::info!(
                        path = %file.display(),
                        "Config file change detected, reloading handlers"
                    );
                    match reload(&file, &approot, has_interpreter) {
                        Ok(table) => {
                            tracing::info!(handlers = table.len(), "Handlers reloaded");
                            let _ = update_tx.send(table);
                        }
                        Err(e) => {
                            tracing::error!(
                                error = %e,
                                "Failed to reload config, keeping current handlers"
                            );
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Load, validate and compile the handler list from `path`.
pub fn reload(
    path: &Path,
    approot: &Path,
    has_interpreter: bool,
) -> Result<RouteTable, ConfigError> {
    let config = load_config(path)?;

    let errors = validate_handlers(&config, has_interpreter);
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(RouteTable::compile(&config.handlers, approot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Dispatch;

    #[test]
    fn test_reload_compiles_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, "[[handlers]]\nurl = '^/(.*)$'\nscript = '\\1.cgi'\n").unwrap();

        let table = reload(&path, Path::new("/srv"), true).unwrap();
        assert_eq!(table.dispatch("/run"), Some(Dispatch::Script("/srv/run.cgi".into())));
    }

    #[test]
    fn test_reload_rejects_scripts_without_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(&path, "[[handlers]]\nurl = '/'\nscript = 'index.php'\n").unwrap();

        assert!(matches!(reload(&path, Path::new("/srv"), false), Err(ConfigError::Validation(_))));
    }
}
