// config.rs
//! Config code

use std::{
    env,
    fs,
    path::PathBuf,
    sync::LazyLock,
};

use serde::Deserialize;

use crate::storage::profile::UploadProfile;

pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::load);

const DEFAULT_CONFIG_PATH: &str = "/etc/tunedrop/config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (from trace to off, case insensitive)
    pub log_level:             String,
    /// Whether to log to the console
    pub log_to_console:        bool,
    /// Log file path
    pub log_file:              PathBuf,
    /// Max log size in bytes
    pub log_max_size:          u64,
    /// Address to bind to
    pub host:                  String,
    /// Port to listen on, overridden by `PORT`
    pub port:                  u16,
    /// Directory holding uploaded files
    pub storage_dir:           PathBuf,
    /// Which audio types are accepted, and the default upload ceiling
    pub upload_profile:        UploadProfile,
    /// Upload ceiling in bytes, overriding the profile's default
    pub max_upload_size:       Option<u64>,
    /// Ceiling for JSON and URL-encoded bodies
    pub max_form_size:         usize,
    /// Whether to take the URL scheme from `X-Forwarded-Proto`
    pub trust_forwarded_proto: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level:             "debug".to_string(),
            log_to_console:        true,
            log_file:              PathBuf::from("/var/log/tunedrop.log"),
            log_max_size:          64 * 1024 * 1024, // 64 MiB
            host:                  "0.0.0.0".to_string(),
            port:                  5000,
            storage_dir:           PathBuf::from("uploads"),
            upload_profile:        UploadProfile::Base,
            max_upload_size:       None,
            max_form_size:         100 * 1024, // 100 KiB
            trust_forwarded_proto: false,
        }
    }
}

impl Config {
    /// # Loads the config
    ///
    /// Reads `$TUNEDROP_CONFIG`, falling back to `/etc/tunedrop/config.toml`, then applies
    /// environment overrides. This runs before logging is set up, so problems go to stderr.
    pub fn load() -> Self {
        let config_path =
            env::var("TUNEDROP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = match fs::read_to_string(&config_path) {
            | Ok(c) => Self::parse(&c),
            | Err(e) => {
                eprintln!("Failed to read config file at {config_path}: {e}");
                eprintln!("The default config will be used");
                Self::default()
            },
        };

        config.apply_env(|k| env::var(k).ok());
        config
    }

    fn parse(s: &str) -> Self {
        match toml::from_str(s) {
            | Ok(c) => c,
            | Err(e) => {
                eprintln!("\x1b[31;1mInvalid config: {e}\x1b[0m");
                eprintln!("\x1b[31;1mThe default config will be used\x1b[0m");
                Self::default()
            },
        }
    }

    /// Applies environment overrides, reading variables through `var`
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                | Ok(p) => self.port = p,
                | Err(e) => eprintln!("Ignoring invalid PORT '{port}': {e}"),
            }
        }
    }

    /// The effective upload ceiling in bytes
    pub fn upload_limit(&self) -> u64 {
        self.max_upload_size
            .unwrap_or_else(|| self.upload_profile.default_max_size())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.storage_dir, PathBuf::from("uploads"));
        assert_eq!(config.upload_limit(), 50 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::parse(
            r#"
            port = 8080
            upload_profile = "extended"
            "#,
        );

        assert_eq!(config.port, 8080);
        assert_eq!(config.upload_profile, UploadProfile::Extended);
        assert_eq!(config.upload_limit(), 150 * 1024 * 1024);
        assert_eq!(config.max_form_size, 100 * 1024);
    }

    #[test]
    fn explicit_ceiling_wins() {
        let config = Config::parse("max_upload_size = 1024");
        assert_eq!(config.upload_limit(), 1024);
    }

    #[test]
    fn invalid_toml_falls_back() {
        let config = Config::parse("port = \"not a number\"");
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn port_from_env() {
        let mut config = Config::default();
        config.apply_env(|k| (k == "PORT").then(|| "7020".to_string()));
        assert_eq!(config.port, 7020);

        config.apply_env(|_| Some("nope".to_string()));
        assert_eq!(config.port, 7020);
    }
}
