//! Server configuration.
//!
//! Layered with figment: built-in defaults, then an optional `quill.json`
//! file, then `QUILL_*` environment variables (`__` separates nesting, e.g.
//! `QUILL_SERVER__PORT=9400`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};

use quill_session::SessionConfig;

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
        }
    }
}

impl ServerConfig {
    /// The `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Full server configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuillConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Session-layer settings (timeouts, idle window, round cap).
    pub session: SessionConfig,
}

impl QuillConfig {
    /// Load configuration from defaults, an optional JSON file, and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let file = path.map_or_else(|| Json::file("quill.json"), Json::file);
        Figment::from(Serialized::defaults(Self::default()))
            .merge(file)
            .merge(Env::prefixed("QUILL_").split("__"))
            .extract()
    }
}
