//! Command-line flags.
//!
//! Every flag can also come from the environment; both override the config
//! file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "cgi-devserver")]
#[command(
    version,
    about = "Development HTTP server dispatching to CGI scripts and static files",
    long_about = None
)]
pub struct Cli {
    /// Set port to host on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// CGI interpreter to run for script handlers
    #[arg(long, env = "CGI")]
    pub cgi: Option<PathBuf>,

    /// Select the config file to use
    #[arg(long, env = "CONFIG", default_value = "app.toml")]
    pub config: PathBuf,

    /// Set custom approot, defaults to the config's directory
    #[arg(long, env = "APPROOT")]
    pub approot: Option<PathBuf>,

    /// Reload handlers when the config file changes
    #[arg(long)]
    pub watch: bool,
}

impl Cli {
    /// Apply flag overrides on top of a loaded config.
    ///
    /// `approot` is not applied here: a flag value is relative to the working
    /// directory, not to the config file.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(cgi) = &self.cgi {
            config.cgi.binary = Some(cgi.clone());
        }
        if self.watch {
            config.server.watch = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_file() {
        let cli = Cli::try_parse_from([
            "cgi-devserver",
            "--port",
            "9000",
            "--cgi",
            "/opt/php-cgi",
            "--watch",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        config.cgi.binary = Some("/usr/bin/php-cgi".into());

        cli.apply(&mut config);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cgi.binary, Some(PathBuf::from("/opt/php-cgi")));
        assert!(config.server.watch);
    }

    #[test]
    fn test_absent_flags_keep_file_values() {
        let cli = Cli {
            port: None,
            cgi: None,
            config: "app.toml".into(),
            approot: None,
            watch: false,
        };
        let mut config = AppConfig::default();
        config.server.port = 3000;

        cli.apply(&mut config);
        assert_eq!(config.server.port, 3000);
        assert!(config.cgi.binary.is_none());
    }
}
