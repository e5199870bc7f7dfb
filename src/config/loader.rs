//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::RouteError;

/// Error type for configuration loading. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("invalid handler: {0}")]
    Route(#[from] RouteError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Read and parse a TOML config file. No semantic checks.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Fully resolved startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute path of the config file.
    pub config_path: PathBuf,
    /// Absolute application root.
    pub approot: PathBuf,
    /// Merged and validated config.
    pub config: AppConfig,
}

impl Settings {
    /// Load the config named by `cli`, apply overrides and validate.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = absolute(&cli.config)?;
        let mut config = load_config(&config_path)?;
        cli.apply(&mut config);

        let config_dir = config_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let approot = match (&cli.approot, &config.server.approot) {
            (Some(flag), _) => absolute(flag)?,
            (None, Some(from_file)) => config_dir.join(from_file),
            (None, None) => config_dir,
        };

        Self::new(config_path, approot, config)
    }

    /// Validate an already merged config.
    pub fn new(
        config_path: PathBuf,
        approot: PathBuf,
        config: AppConfig,
    ) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(Self {
            config_path,
            approot,
            config,
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_for(path: &Path) -> Cli {
        Cli {
            port: None,
            cgi: None,
            config: path.to_path_buf(),
            approot: None,
            watch: false,
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[handlers]]\nurl = ").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_approot_defaults_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[[handlers]]\nurl = '^/(.*)$'\nstatic_files = 'www/\\1'\n").unwrap();

        let settings = Settings::load(&cli_for(&path)).unwrap();
        assert_eq!(settings.approot, dir.path());
        assert_eq!(settings.config.handlers.len(), 1);
    }

    #[test]
    fn test_approot_from_file_is_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[server]\napproot = 'site'\n").unwrap();

        let settings = Settings::load(&cli_for(&path)).unwrap();
        assert_eq!(settings.approot, dir.path().join("site"));
    }

    #[test]
    fn test_cli_interpreter_satisfies_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[[handlers]]\nurl = '/'\nscript = 'index.php'\n").unwrap();

        let err = Settings::load(&cli_for(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("no CGI binary"));

        let mut cli = cli_for(&path);
        cli.cgi = Some("/usr/bin/php-cgi".into());
        assert!(Settings::load(&cli).is_ok());
    }
}
