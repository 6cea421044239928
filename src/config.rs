use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Everything a session needs to know before it opens the wire.
///
/// The session takes its own copy at construction; mutating the value
/// afterwards has no effect on a running session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nickname candidates, tried front to back as the server rejects
    /// them. An empty list fails registration without sending a NICK.
    pub nicknames: Vec<String>,
    pub username: String,
    pub realname: String,
    /// Server password, sent as PASS before capability negotiation.
    #[serde(default)]
    pub password: Option<String>,
    /// WEBIRC introduction, sent first when present.
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Capability negotiation is entered only when this is present.
    #[serde(default)]
    pub capabilities: Option<CapabilityConfig>,
    #[serde(default)]
    pub sasl: Option<SaslConfig>,
    /// Idle threshold for the two-phase keepalive watchdog.
    #[serde(default = "default_timeout", with = "duration_millis")]
    pub timeout: Duration,
    /// Opaque options forwarded to the transport connector, overlaid
    /// with `host` and `port` at connect time.
    #[serde(default)]
    pub connect_options: BTreeMap<String, String>,
}

/// WEBIRC credentials: a trusted front-end proxy asserting the real
/// client's hostname and IP to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub password: String,
    pub username: String,
    pub hostname: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Capabilities the session cannot operate without. Registration
    /// fails if the server does not offer and acknowledge all of them.
    #[serde(default)]
    pub requires: BTreeSet<String>,
    /// Capabilities requested opportunistically when the server offers
    /// them; rejections are tolerated.
    #[serde(default)]
    pub wants: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaslConfig {
    /// Account name; falls back to the session username when absent.
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

impl SessionConfig {
    pub fn new(server: impl Into<String>, nicknames: Vec<String>) -> Self {
        Self {
            server: server.into(),
            port: default_port(),
            nicknames,
            username: String::new(),
            realname: String::new(),
            password: None,
            proxy: None,
            capabilities: None,
            sasl: None,
            timeout: default_timeout(),
            connect_options: BTreeMap::new(),
        }
    }

    /// Effective SASL account name for this config.
    pub fn sasl_username(&self) -> Option<&str> {
        self.sasl
            .as_ref()
            .map(|sasl| sasl.username.as_deref().unwrap_or(&self.username))
    }
}

fn default_port() -> u16 {
    6667
}

fn default_timeout() -> Duration {
    Duration::from_millis(300_000)
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
