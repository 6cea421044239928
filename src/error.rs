use std::fmt;

/// Lifecycle of a session. Transitions are monotone left-to-right,
/// except that every state may transition directly to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Initialized,
    Connecting,
    Starting,
    Running,
    Closed,
}

impl Status {
    /// Outbound writes are accepted only while the transport is live.
    pub fn is_writable(self) -> bool {
        matches!(self, Status::Connecting | Status::Starting | Status::Running)
    }
}

/// Why a connection attempt did not reach the ready state.
///
/// These are reported solely through the settlement of the connect
/// outcome, never as panics or event-stream errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The transport closed while the handshake was still pending.
    Killed,
    /// Every configured nickname was rejected by the server.
    NicknamesUnavailable,
    /// The server answered the WEBIRC introduction with an ERROR line.
    BadProxyConfiguration,
    /// A required capability was absent from CAP LS or NAKed.
    MissingRequiredCapabilities,
    /// The server rejected PASS (464) or reported a failed login.
    BadPassword,
    /// `end()` was called before the handshake settled.
    SocketEnded,
}

#[derive(Debug)]
pub enum SessionError {
    /// `connect()` on a session that is not in the `Initialized` state.
    /// Sessions are single-use.
    AlreadyConnected,
    /// An outbound message contained a raw `\n`. Messages are single
    /// IRC lines; the session appends the CRLF itself.
    EmbeddedNewline,
    Io(std::io::Error),
    Tls(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Initialized => write!(f, "Initialized"),
            Status::Connecting => write!(f, "Connecting"),
            Status::Starting => write!(f, "Starting"),
            Status::Running => write!(f, "Running"),
            Status::Closed => write!(f, "Closed"),
        }
    }
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectFailure::Killed => write!(f, "connection closed during startup"),
            ConnectFailure::NicknamesUnavailable => {
                write!(f, "all configured nicknames were rejected")
            }
            ConnectFailure::BadProxyConfiguration => {
                write!(f, "server rejected the WEBIRC introduction")
            }
            ConnectFailure::MissingRequiredCapabilities => {
                write!(f, "server lacks a required capability")
            }
            ConnectFailure::BadPassword => write!(f, "server rejected the password"),
            ConnectFailure::SocketEnded => write!(f, "session ended before registration"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyConnected => {
                write!(f, "connect() called on a session that is already in use")
            }
            SessionError::EmbeddedNewline => {
                write!(f, "outbound message contains a newline")
            }
            SessionError::Io(err) => write!(f, "IO error: {}", err),
            SessionError::Tls(msg) => write!(f, "TLS error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectFailure {}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
