use crate::{
    configuration::{
        CHECK_CONNECTION_TIMEOUT, CHECK_TIMEOUT, CONFIG_PATHS, DEFAULT_CONCURRENCY,
        DEFAULT_SITES_DIR,
    },
    evaluators::keyword::KeywordPolicy,
    products::unexpected::ConfigError,
    utilities::read_text_file,
    *,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::level_filters::LevelFilter;


#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
/// Configuration read once at startup
pub struct Config {
    /// Directory holding site records
    pub sites_dir: Option<String>,

    /// Log level, overridden by RUST_LOG
    pub log_level: Option<String>,

    /// Amount of sites evaluated in parallel
    pub concurrency: Option<usize>,

    /// Total request timeout in seconds
    pub timeout: Option<u64>,

    /// Connection timeout in seconds
    pub connection_timeout: Option<u64>,

    /// User agent sent with each request
    pub user_agent: Option<String>,

    /// How the required substring combines with the status verdict
    pub keyword_policy: Option<KeywordPolicy>,
}


impl Config {
    /// Load configuration. An explicitly given file has to exist, otherwise the first existing
    /// default path is used, and with none of them present defaults apply.
    pub fn load(explicit: Option<&str>) -> Result<Config, ConfigError> {
        let config = match explicit {
            Some(file) => file,
            None => {
                match CONFIG_PATHS.iter().find(|file| Path::new(file).exists()) {
                    Some(file) => *file,
                    None => {
                        debug!("No configuration file found. Using defaults.");
                        return Ok(Config::default());
                    }
                }
            }
        };
        Config::from_file(config)
    }


    /// Read configuration from given JSON file
    pub fn from_file(config: &str) -> Result<Config, ConfigError> {
        let file_contents =
            read_text_file(config).map_err(|err| ConfigError::Io(config.to_string(), err))?;
        let loaded = serde_json::from_str(&file_contents).map_err(|err| {
            error!("Configuration error: {} in file: {}", err, config);
            ConfigError::Parse(config.to_string(), err)
        })?;
        debug!("Loaded configuration from: {}", config);
        Ok(loaded)
    }


    /// Get LevelFilter (log level) from configuration
    pub fn get_log_level(&self) -> LevelFilter {
        let level = self.log_level.clone().unwrap_or_default();
        match &level.to_uppercase()[..] {
            "OFF" => LevelFilter::OFF,
            "ERROR" => LevelFilter::ERROR,
            "WARN" => LevelFilter::WARN,
            "INFO" => LevelFilter::INFO,
            "DEBUG" => LevelFilter::DEBUG,
            "TRACE" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }


    /// Directory holding site records
    pub fn get_sites_dir(&self) -> String {
        self.sites_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_SITES_DIR.to_string())
    }


    /// Worker pool size, never below 1
    pub fn get_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }


    /// Total request timeout in seconds
    pub fn get_timeout(&self) -> u64 {
        self.timeout.unwrap_or(CHECK_TIMEOUT)
    }


    /// Connection timeout in seconds
    pub fn get_connection_timeout(&self) -> u64 {
        self.connection_timeout.unwrap_or(CHECK_CONNECTION_TIMEOUT)
    }


    /// Required substring policy
    pub fn get_keyword_policy(&self) -> KeywordPolicy {
        self.keyword_policy.unwrap_or_default()
    }
}
