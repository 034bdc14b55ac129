//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use stomp_relay_core::RelayConfig;

/// STOMP relay: multiplexes logical client sessions over independent TCP
/// connections to an upstream broker.
#[derive(Parser, Debug)]
#[command(name = "stomp-relay", version, about)]
pub struct Cli {
    /// Path to a JSON config file. The flags below override its values.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "STOMP_RELAY_HOST")]
    pub relay_host: Option<String>,

    #[arg(long, env = "STOMP_RELAY_PORT")]
    pub relay_port: Option<u16>,

    #[arg(long, env = "STOMP_RELAY_CLIENT_LOGIN")]
    pub client_login: Option<String>,

    #[arg(long, env = "STOMP_RELAY_CLIENT_PASSCODE")]
    pub client_passcode: Option<String>,

    #[arg(long, env = "STOMP_RELAY_SYSTEM_LOGIN")]
    pub system_login: Option<String>,

    #[arg(long, env = "STOMP_RELAY_SYSTEM_PASSCODE")]
    pub system_passcode: Option<String>,

    #[arg(long, env = "STOMP_RELAY_VIRTUAL_HOST")]
    pub virtual_host: Option<String>,

    /// Tracing filter directive, e.g. "info" or "stomp_relay_core=debug".
    #[arg(long, env = "STOMP_RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Applies these flags (and their `env` fallbacks) on top of a base
    /// config, typically one loaded from `--config` or defaulted.
    #[must_use]
    pub fn apply_overrides(&self, mut config: RelayConfig) -> RelayConfig {
        if let Some(v) = &self.relay_host {
            config.relay_host = v.clone();
        }
        if let Some(v) = self.relay_port {
            config.relay_port = v;
        }
        if let Some(v) = &self.client_login {
            config.client_login = v.clone();
        }
        if let Some(v) = &self.client_passcode {
            config.client_passcode = v.clone();
        }
        if let Some(v) = &self.system_login {
            config.system_login = v.clone();
        }
        if let Some(v) = &self.system_passcode {
            config.system_passcode = v.clone();
        }
        if let Some(v) = &self.virtual_host {
            config.virtual_host = Some(v.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_touch_fields_that_were_set() {
        let cli = Cli {
            config: None,
            relay_host: Some("broker.internal".to_string()),
            relay_port: None,
            client_login: None,
            client_passcode: None,
            system_login: None,
            system_passcode: None,
            virtual_host: None,
            log_level: "info".to_string(),
        };
        let config = cli.apply_overrides(RelayConfig::default());
        assert_eq!(config.relay_host, "broker.internal");
        assert_eq!(config.relay_port, RelayConfig::default().relay_port);
    }
}
