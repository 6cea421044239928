//! Client-side IRC session adapter: turns an established byte-stream
//! into a registered RFC 1459 / IRCv3 line session.

pub mod caps;
pub mod config;
pub mod error;
pub mod framing;
pub mod sasl;
pub mod session;
pub mod startup;
pub mod transport;
pub mod watchdog;

pub use config::{CapabilityConfig, ProxyConfig, SaslConfig, SessionConfig};
pub use error::{ConnectFailure, SessionError, Status};
pub use session::{ConnectResult, Events, IrcSession, Outbound, Outcome, SessionEvent};
pub use startup::Welcome;
pub use transport::{ConnectOptions, Connector, TcpConnector, TlsConnector};
