//! Configuration surface.
//!
//! Mirrors the JSON wire config the host hands to the inbound:
//!
//! ```json
//! {
//!   "clients": [
//!     { "id": "uuid-string", "policy": "mimic-http2-api" }
//!   ],
//!   "fallback": { "dest": 8080 },
//!   "profile": "http2-api"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single accepted client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client UUID in canonical string form
    pub id: String,
    /// Requested morphing policy label (echoed, not enforced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

/// Where non-REFLEX traffic is forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Loopback TCP port of the fallback web server
    pub dest: u16,
}

/// Inbound handler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundConfig {
    /// Accepted clients; immutable for the handler's lifetime
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    /// Optional fallback target; without it non-REFLEX traffic is an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackConfig>,
    /// Default traffic profile name; `http2-api` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl InboundConfig {
    /// Validate fields that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(fallback) = &self.fallback {
            if fallback.dest == 0 {
                return Err(Error::config("fallback dest must be in 1..65535"));
            }
        }
        Ok(())
    }
}

/// Configuration for the `reflex-server` binary: a listen address plus the
/// inbound settings, flattened into one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Listen port
    pub listen_port: u16,
    /// Inbound handler settings
    #[serde(flatten)]
    pub inbound: InboundConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0".to_string()
}
