use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::{ConnectFailure, Result, SessionError, Status};
use crate::framing::LineFramer;
use crate::startup::{Action, StartupHandler, Welcome};
use crate::transport::{ConnectOptions, Connector};
use crate::watchdog::{Expiry, Watchdog};

/// How a connection attempt settled: the registered identity, or the
/// reason it never got there. Settles exactly once per session.
pub type ConnectResult = std::result::Result<Welcome, ConnectFailure>;

/// The session's event stream, handed out by [`IrcSession::connect`].
pub type Events = mpsc::UnboundedReceiver<SessionEvent>;

/// Everything a consumer can observe from a session, in order.
#[derive(Debug)]
pub enum SessionEvent {
    /// The transport is established; registration is starting.
    Connected,
    /// One complete inbound line, terminators stripped, NFC-normalized.
    /// Emitted for every line, including the 001.
    Data(String),
    /// Registration succeeded. Emitted exactly once, immediately
    /// before the connect outcome settles Ok.
    Ready(Welcome),
    /// A transport fault after registration completed. Faults during
    /// startup settle the connect outcome instead of raising this.
    /// The session closes after either.
    Error(SessionError),
    /// The keepalive watchdog gave up; a graceful end follows.
    TimedOut,
    /// The server closed its side of the stream.
    Ended,
    /// Terminal. No further events follow.
    Closed,
}

/// Future side of the one-shot connect outcome. Multiple awaits are
/// unnecessary — the result is final — but the value is biased so a
/// driver that dies without settling reads as `Killed`.
#[derive(Debug)]
pub struct Outcome {
    receiver: oneshot::Receiver<ConnectResult>,
}

impl Future for Outcome {
    type Output = ConnectResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(ConnectFailure::Killed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A single outbound IRC line. Sequences are joined with single
/// spaces; no colon is prefixed — trailing parameters must carry
/// their own leading `:`.
pub struct Outbound(String);

impl From<&str> for Outbound {
    fn from(line: &str) -> Self {
        Outbound(line.to_string())
    }
}

impl From<String> for Outbound {
    fn from(line: String) -> Self {
        Outbound(line)
    }
}

impl From<&[&str]> for Outbound {
    fn from(parts: &[&str]) -> Self {
        Outbound(parts.join(" "))
    }
}

impl From<Vec<&str>> for Outbound {
    fn from(parts: Vec<&str>) -> Self {
        Outbound(parts.join(" "))
    }
}

impl From<Vec<String>> for Outbound {
    fn from(parts: Vec<String>) -> Self {
        Outbound(parts.join(" "))
    }
}

enum Command {
    Write(String),
    End,
}

struct Shared {
    status: Mutex<Status>,
    nickname: Mutex<Option<String>>,
}

/// A single-use IRC client session.
///
/// Owns its transport for the lifetime of the connection and runs all
/// protocol state on one spawned driver task; the facade's methods
/// only inspect status and enqueue commands, so they never block.
pub struct IrcSession {
    config: SessionConfig,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    driver_input: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
}

impl IrcSession {
    pub fn new(config: SessionConfig) -> Self {
        let (commands, driver_input) = mpsc::unbounded_channel();
        Self {
            config,
            shared: Arc::new(Shared {
                status: Mutex::new(Status::Initialized),
                nickname: Mutex::new(None),
            }),
            commands,
            driver_input: Mutex::new(Some(driver_input)),
        }
    }

    /// Starts the connection. Errors synchronously when the session
    /// has already been used; otherwise returns the one-shot outcome
    /// and the event stream, and drives registration to completion in
    /// the background.
    pub fn connect<C: Connector>(&self, connector: C) -> Result<(Outcome, Events)> {
        let command_rx = self
            .driver_input
            .lock()
            .expect("driver input lock")
            .take()
            .ok_or(SessionError::AlreadyConnected)?;

        *self.shared.status.lock().expect("status lock") = Status::Connecting;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let driver = Driver {
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            events: event_tx,
            outcome: Some(outcome_tx),
        };
        tokio::spawn(driver.run(connector, command_rx));

        Ok((Outcome { receiver: outcome_rx }, event_rx))
    }

    /// Queues one line for the wire. A sequence is joined with single
    /// spaces. Rejects embedded newlines synchronously; quietly does
    /// nothing when the session is not connected. The CRLF terminator
    /// is appended on the way out.
    pub fn write(&self, message: impl Into<Outbound>) -> Result<()> {
        let Outbound(line) = message.into();
        if line.contains('\n') {
            return Err(SessionError::EmbeddedNewline);
        }
        if !self.status().is_writable() {
            return Ok(());
        }
        if line.len() > 512 {
            warn!("outbound line is {} bytes, over the usual 512", line.len());
        }
        let _ = self.commands.send(Command::Write(line));
        Ok(())
    }

    /// Requests a graceful end. Idempotent; a no-op when the session
    /// is not connected. If registration is still pending, the
    /// outcome settles `SocketEnded` before the transport goes down.
    pub fn end(&self) {
        if !self.status().is_writable() {
            return;
        }
        let _ = self.commands.send(Command::End);
    }

    pub fn status(&self) -> Status {
        *self.shared.status.lock().expect("status lock")
    }

    /// The session has left `Initialized`.
    pub fn is_started(&self) -> bool {
        self.status() != Status::Initialized
    }

    /// The transport is live (connecting, registering, or running).
    pub fn is_connected(&self) -> bool {
        self.status().is_writable()
    }

    /// Registration has completed.
    pub fn is_ready(&self) -> bool {
        self.status() == Status::Running
    }

    pub fn server(&self) -> &str {
        &self.config.server
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn realname(&self) -> &str {
        &self.config.realname
    }

    /// The most recently sent nickname; the registered one once ready.
    pub fn current_nickname(&self) -> Option<String> {
        self.shared.nickname.lock().expect("nickname lock").clone()
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Flow {
    Continue,
    Stop,
}

struct Driver {
    config: SessionConfig,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<SessionEvent>,
    outcome: Option<oneshot::Sender<ConnectResult>>,
}

impl Driver {
    async fn run<C: Connector>(
        mut self,
        mut connector: C,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let options = ConnectOptions::from_config(&self.config);
        let stream = match connector.connect(&options).await {
            Ok(stream) => stream,
            Err(err) => {
                // The outcome is still pending, so this failure reports
                // through its settlement alone; close() settles Killed.
                warn!("transport connect failed: {}", err);
                self.close();
                return;
            }
        };

        self.set_status(Status::Starting);
        self.emit(SessionEvent::Connected);

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut framer = LineFramer::new();
        let mut watchdog = Watchdog::new(self.config.timeout, Instant::now());
        let mut startup = Some(StartupHandler::new(&self.config));

        let burst = startup
            .as_mut()
            .map(StartupHandler::on_connected)
            .unwrap_or_default();
        self.sync_nickname(&startup);
        if self.apply(burst, &mut startup, &mut writer).await == Flow::Stop {
            let _ = writer.shutdown().await;
            self.close();
            return;
        }

        let mut chunk = [0u8; 4096];
        loop {
            tokio::select! {
                read = reader.read(&mut chunk) => match read {
                    Ok(0) => {
                        if self.pending() {
                            self.settle(Err(ConnectFailure::Killed));
                        }
                        self.emit(SessionEvent::Ended);
                        break;
                    }
                    Ok(n) => {
                        watchdog.touch(Instant::now());
                        let mut flow = Flow::Continue;
                        for line in framer.push(&chunk[..n]) {
                            flow = self.on_line(line, &mut startup, &mut writer).await;
                            if flow == Flow::Stop {
                                break;
                            }
                        }
                        if flow == Flow::Stop {
                            break;
                        }
                    }
                    Err(err) => {
                        if self.pending() {
                            self.settle(Err(ConnectFailure::Killed));
                        } else {
                            self.emit(SessionEvent::Error(err.into()));
                        }
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(Command::Write(line)) => {
                        if let Err(err) = write_line(&mut writer, &line).await {
                            if self.pending() {
                                self.settle(Err(ConnectFailure::Killed));
                            } else {
                                self.emit(SessionEvent::Error(err.into()));
                            }
                            break;
                        }
                    }
                    Some(Command::End) | None => {
                        if self.pending() {
                            self.settle(Err(ConnectFailure::SocketEnded));
                        }
                        break;
                    }
                },
                _ = tokio::time::sleep_until(watchdog.deadline()) => {
                    match watchdog.expire(Instant::now()) {
                        Expiry::SendPing => {
                            if let Err(err) = write_line(&mut writer, "PING :ignored").await {
                                if self.pending() {
                                    self.settle(Err(ConnectFailure::Killed));
                                } else {
                                    self.emit(SessionEvent::Error(err.into()));
                                }
                                break;
                            }
                        }
                        Expiry::TimedOut => {
                            self.emit(SessionEvent::TimedOut);
                            if self.pending() {
                                self.settle(Err(ConnectFailure::SocketEnded));
                            }
                            break;
                        }
                    }
                }
            }
        }

        let _ = writer.shutdown().await;
        self.close();
    }

    /// One complete inbound line: auto-PONG, then the startup handler
    /// (which detaches itself on settlement), then the consumer.
    async fn on_line<W: AsyncWrite + Unpin>(
        &mut self,
        line: String,
        startup: &mut Option<StartupHandler>,
        writer: &mut W,
    ) -> Flow {
        let mut flow = Flow::Continue;

        if let Some(reply) = pong_reply(&line) {
            if let Err(err) = write_line(writer, &reply).await {
                if self.pending() {
                    self.settle(Err(ConnectFailure::Killed));
                } else {
                    self.emit(SessionEvent::Error(err.into()));
                }
                flow = Flow::Stop;
            }
        }

        if flow == Flow::Continue {
            if let Some(handler) = startup.as_mut() {
                let actions = handler.on_line(&line);
                self.sync_nickname(startup);
                flow = self.apply(actions, startup, writer).await;
            }
        }

        self.emit(SessionEvent::Data(line));
        flow
    }

    async fn apply<W: AsyncWrite + Unpin>(
        &mut self,
        actions: Vec<Action>,
        startup: &mut Option<StartupHandler>,
        writer: &mut W,
    ) -> Flow {
        let mut flow = Flow::Continue;
        for action in actions {
            match action {
                Action::Send(line) => {
                    if let Err(err) = write_line(writer, &line).await {
                        if self.pending() {
                            self.settle(Err(ConnectFailure::Killed));
                        } else {
                            self.emit(SessionEvent::Error(err.into()));
                        }
                        *startup = None;
                        return Flow::Stop;
                    }
                }
                Action::Settle(Ok(welcome)) => {
                    self.set_status(Status::Running);
                    self.emit(SessionEvent::Ready(welcome.clone()));
                    self.settle(Ok(welcome));
                    *startup = None;
                }
                Action::Settle(Err(failure)) => {
                    self.settle(Err(failure));
                    *startup = None;
                    flow = Flow::Stop;
                }
            }
        }
        flow
    }

    fn sync_nickname(&self, startup: &Option<StartupHandler>) {
        if let Some(handler) = startup {
            if let Some(nickname) = handler.current_nickname() {
                *self.shared.nickname.lock().expect("nickname lock") =
                    Some(nickname.to_string());
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn pending(&self) -> bool {
        self.outcome.is_some()
    }

    fn settle(&mut self, result: ConnectResult) {
        if let Some(sender) = self.outcome.take() {
            let _ = sender.send(result);
        }
    }

    fn set_status(&self, status: Status) {
        *self.shared.status.lock().expect("status lock") = status;
    }

    /// Terminal cleanup. Settles `Killed` as a backstop if nothing
    /// else settled first.
    fn close(&mut self) {
        if self.pending() {
            self.settle(Err(ConnectFailure::Killed));
        }
        self.set_status(Status::Closed);
        self.emit(SessionEvent::Closed);
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    debug!("Sending: {}", line);
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}

/// `PONG :<trailing>` for any line whose first token is `PING`.
fn pong_reply(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "PING" {
        return None;
    }
    let text = match line.find(':') {
        Some(pos) => &line[pos + 1..],
        None => tokens.next().unwrap_or(""),
    };
    Some(format!("PONG :{}", text))
}

// Used by the integration tests to drive a session over an in-memory
// pipe without a real socket.
#[doc(hidden)]
pub struct PipeConnector<S> {
    stream: Option<S>,
}

impl<S> PipeConnector<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send + 'static> Connector for PipeConnector<S> {
    type Stream = S;

    async fn connect(&mut self, _options: &ConnectOptions) -> Result<S> {
        self.stream.take().ok_or_else(|| {
            SessionError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "pipe already consumed",
            ))
        })
    }
}
