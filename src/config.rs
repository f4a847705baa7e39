//! Configuration management for the simulator console
//!
//! Settings come from an optional TOML file, then command line flags are
//! layered on top, then everything is validated.

use crate::{cli::Args, error::ConfigError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const HOSTNAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9-]{0,62}$";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Enable debug logging
    pub debug: bool,
    /// Initial device hostname, shown in the prompt
    pub hostname: String,
    /// Script to execute instead of reading a terminal
    pub script: Option<PathBuf>,
    /// Continue a script after a failing line
    pub keep_going: bool,
    /// Echo each script line after its prompt
    pub echo: bool,
    /// First-token prefixes that mark a comment line
    pub comment_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            hostname: "router".to_string(),
            script: None,
            keep_going: false,
            echo: false,
            comment_prefixes: vec!["!".to_string(), "#".to_string()],
        }
    }
}

impl Config {
    /// Read a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        config.debug |= args.debug;
        if let Some(hostname) = &args.hostname {
            config.hostname = hostname.clone();
        }

        // Override with command-specific options
        if let crate::cli::Command::Run {
            script,
            keep_going,
            echo,
        } = &args.command
        {
            config.script = Some(script.clone());
            config.keep_going |= *keep_going;
            config.echo |= *echo;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_hostname(&self.hostname)?;

        if let Some(script) = &self.script {
            if !script.exists() {
                return Err(ConfigError::invalid(format!(
                    "script file not found: {}",
                    script.display()
                )));
            }
        }

        if self.comment_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::invalid("comment prefixes must not be empty"));
        }

        Ok(())
    }
}

/// Check a hostname against the router naming rules
pub fn validate_hostname(hostname: &str) -> Result<(), ConfigError> {
    let re = Regex::new(HOSTNAME_PATTERN)
        .map_err(|e| ConfigError::invalid(format!("Failed to compile regex: {e}")))?;
    if !re.is_match(hostname) {
        return Err(ConfigError::invalid(format!(
            "invalid hostname '{hostname}': must start with a letter and contain only letters, digits and '-' (max 63)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_hostname_rules() {
        assert!(validate_hostname("core-sw1").is_ok());
        assert!(validate_hostname("1router").is_err());
        assert!(validate_hostname("bad_name").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("console.toml");
        fs::write(&path, "hostname = \"edge1\"\nkeep_going = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.hostname, "edge1");
        assert!(config.keep_going);
        assert_eq!(config.comment_prefixes, vec!["!", "#"]);
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("console.toml");
        fs::write(&path, "hostname = [").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_flags_override_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("console.toml");
        fs::write(&path, "hostname = \"edge1\"\n").unwrap();

        let args = Args::try_parse_from([
            "simcli",
            "--config",
            path.to_str().unwrap(),
            "--hostname",
            "core1",
            "tree",
        ])
        .unwrap();
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.hostname, "core1");
    }

    #[test]
    fn test_debug_from_file_survives_args() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("console.toml");
        fs::write(&path, "debug = true\n").unwrap();

        let args = Args::try_parse_from(["simcli", "--config", path.to_str().unwrap(), "tree"]).unwrap();
        assert!(!args.debug);
        assert!(Config::from_args(&args).unwrap().debug);
    }

    #[test]
    fn test_missing_script_rejected() {
        let args = Args::try_parse_from(["simcli", "run", "/nonexistent/script.cfg"]).unwrap();
        assert!(Config::from_args(&args).is_err());
    }
}
