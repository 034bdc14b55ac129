//! Loads `RelayConfig` from an optional JSON file, falling back to defaults.

use std::path::Path;

use anyhow::{Context, Result};
use stomp_relay_core::RelayConfig;

pub fn load(path: Option<&Path>) -> Result<RelayConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(RelayConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_falls_back_to_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config.relay_host, RelayConfig::default().relay_host);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = load(Some(Path::new("/nonexistent/stomp-relay.json")));
        assert!(result.is_err());
    }
}
