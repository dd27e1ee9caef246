//! Runtime configuration read from the environment.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `UNSPLASH_ACCESS_KEY` | unset | Unsplash client id; the proxy reports "not configured" without it |
//! | `BIND_ADDR` | `127.0.0.1` | Interface to listen on |
//! | `PORT` | `3001` | Port to listen on |
//! | `DEBOUNCE_MS` | `800` | Quiet period after typing before a search starts |

use std::env;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;

#[derive(Debug, Clone)]
pub struct Config {
    pub access_key: Option<String>,
    pub bind_addr: String,
    pub port: u16,
    pub debounce: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source. Unparseable numbers fall back
    /// to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key = lookup("UNSPLASH_ACCESS_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let bind_addr = lookup("BIND_ADDR")
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let debounce_ms = lookup("DEBOUNCE_MS")
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS);

        Self {
            access_key,
            bind_addr,
            port,
            debounce: Duration::from_millis(debounce_ms),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
