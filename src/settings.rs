use serde::Deserialize;

use std::env;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use backtrace::Backtrace;
use log::{error, warn};
use thiserror::Error;

pub const DEFAULT_SETTINGS_PATH: &str = "src/resources/settings.yaml";
pub const OUTPUT_DIR_ENV: &str = "DOM_ONBOARDING_OUTPUT_DIR";
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot deserialize settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

// Main configuration struct
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub onboarding: OnboardingConfig,
    pub probe: ProbeConfig,
}

// REST server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// Where accepted submissions are written.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OnboardingConfig {
    pub output_dir: PathBuf,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("onboarding_output"),
        }
    }
}

/// Bounds and TLS policy for the mailbox connectivity probe.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConfig {
    /// Covers TCP connect plus the TLS handshake.
    pub connect_timeout_secs: u64,
    /// Applied to LOGIN and to EXAMINE separately.
    pub auth_timeout_secs: u64,
    /// Skip certificate and hostname verification.
    pub accept_invalid_certs: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            auth_timeout_secs: 10,
            accept_invalid_certs: true,
        }
    }
}

impl Config {
    /// Environment overrides win over the settings file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env::var(OUTPUT_DIR_ENV).ok(), env::var(PORT_ENV).ok());
    }

    pub(crate) fn apply_overrides(&mut self, output_dir: Option<String>, port: Option<String>) {
        if let Some(dir) = output_dir.filter(|dir| !dir.trim().is_empty()) {
            self.onboarding.output_dir = PathBuf::from(dir);
        }
        if let Some(port) = port {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(err) => warn!("Ignoring {}={:?}: {}", PORT_ENV, port, err),
            }
        }
    }
}

pub fn load_settings(path: &Path) -> Result<Config, SettingsError> {
    // Open the YAML file
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Settings file {} not found, using defaults", path.display());
            let mut config = Config::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        Err(err) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    let reader = BufReader::new(file);

    // Parse the YAML file into the Config struct
    let mut config: Config = match serde_yaml::from_reader(reader) {
        Ok(config) => config,
        Err(err) => {
            error!("Error: {}", err);

            // Capture and print the backtrace
            let backtrace = Backtrace::new();
            error!("Backtrace:\n{:?}", backtrace);
            return Err(SettingsError::Parse {
                path: path.to_path_buf(),
                source: err,
            });
        }
    };

    config.apply_env_overrides();
    Ok(config)
}
