//! Environment configuration for the mock backend.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

/// Backend settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// JSON file with the initial collections.
    pub seed_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Read `STOCKPILE_BIND`, `PORT` (falling back to `STOCKPILE_PORT`) and
    /// `STOCKPILE_SEED`.
    pub fn from_env() -> ServerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let host = lookup("STOCKPILE_BIND").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT").or_else(|| lookup("STOCKPILE_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ServerError::Config(format!("Invalid port value: {}", raw)))?,
            None => DEFAULT_PORT,
        };

        let addr = format!("{}:{}", host, port);
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| ServerError::Config(format!("Invalid bind address {}: {}", addr, e)))?;

        Ok(Self {
            addr,
            seed_path: lookup("STOCKPILE_SEED")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:3001".parse().unwrap());
        assert!(config.seed_path.is_none());
    }

    #[test]
    fn test_port_precedence() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("STOCKPILE_PORT", "9090"),
            ("STOCKPILE_BIND", "127.0.0.1"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());

        let fallback = ServerConfig::from_lookup(lookup(&[("STOCKPILE_PORT", "9090")])).unwrap();
        assert_eq!(fallback.addr.port(), 9090);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("PORT", "http")])),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("STOCKPILE_BIND", "not a host")])),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_seed_path() {
        let config =
            ServerConfig::from_lookup(lookup(&[("STOCKPILE_SEED", "/tmp/db.json")])).unwrap();
        assert_eq!(config.seed_path, Some(PathBuf::from("/tmp/db.json")));
    }
}
