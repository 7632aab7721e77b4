//! Server configuration, layered from defaults, an optional config file,
//! and CLI overrides. A plain struct deserialized via the `config`
//! crate, built with `config::Config::builder().add_source(...)`.

use std::net::{IpAddr, Ipv4Addr};

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// Which upstream strategy the server uses to answer a cache miss.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Recursive,
    Forwarder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_host: IpAddr,
    pub bind_port: u16,
    pub root_server: IpAddr,
    pub forwarder: String,
    pub cache_path: String,
    pub mode: Mode,
    pub snapshot_interval_secs: u64,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            bind_port: 53,
            // a.root-servers.net
            root_server: IpAddr::V4(Ipv4Addr::new(199, 7, 83, 42)),
            forwarder: "ns.hsdrn.ru".to_string(),
            cache_path: "cache.db".to_string(),
            mode: Mode::Recursive,
            snapshot_interval_secs: 30,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings with defaults as the base layer and, if given, a
    /// config file layered on top. A missing `config_file` path is not an
    /// error: the server runs on defaults alone.
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&Settings::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = config_file {
            builder = builder.add_source(File::with_name(path));
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_config_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(53, settings.bind_port);
        assert_eq!(Mode::Recursive, settings.mode);
    }
}
