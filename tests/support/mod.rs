//! Shared harness for the session integration tests: a scripted
//! server on the far side of an in-memory duplex pipe.

use std::time::Duration;

use ironlink::session::PipeConnector;
use ironlink::{Events, IrcSession, Outcome, SessionConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

pub struct ScriptedServer {
    stream: DuplexStream,
    buffer: Vec<u8>,
}

impl ScriptedServer {
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
        }
    }

    /// Next outbound line the client wrote, terminator stripped.
    pub async fn expect_line(&mut self) -> String {
        loop {
            if let Some(pos) = self
                .buffer
                .windows(2)
                .position(|pair| pair == b"\r\n")
            {
                let line = String::from_utf8(self.buffer.drain(..pos + 2).collect())
                    .expect("client wrote valid UTF-8");
                return line.trim_end_matches("\r\n").to_string();
            }

            let mut chunk = [0u8; 1024];
            let n = tokio::time::timeout(Duration::from_secs(5), self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for a client line")
                .expect("read from client");
            assert!(n > 0, "client closed while a line was expected");
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Send one line to the client, CRLF appended.
    pub async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .expect("write to client");
    }

    /// Send raw bytes, exactly as given.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("write to client");
        self.stream.flush().await.expect("flush to client");
    }

    /// Waits until the client has shut its write side down.
    pub async fn expect_eof(&mut self) {
        loop {
            let mut chunk = [0u8; 1024];
            let n = tokio::time::timeout(Duration::from_secs(5), self.stream.read(&mut chunk))
                .await
                .expect("timed out waiting for client EOF")
                .expect("read from client");
            if n == 0 {
                return;
            }
        }
    }
}

pub fn base_config() -> SessionConfig {
    let mut config = SessionConfig::new(
        "irc.test.net",
        vec!["testbot".to_string(), "testbot_".to_string()],
    );
    config.username = "testuser".to_string();
    config.realname = "realbot".to_string();
    config
}

/// Session connected over an in-memory pipe, plus the far side.
pub fn connect(config: SessionConfig) -> (IrcSession, Outcome, Events, ScriptedServer) {
    let (client_side, server_side) = tokio::io::duplex(4096);
    let session = IrcSession::new(config);
    let (outcome, events) = session
        .connect(PipeConnector::new(client_side))
        .expect("fresh session connects");
    (session, outcome, events, ScriptedServer::new(server_side))
}
