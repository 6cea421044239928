use std::time::Duration;

use tokio::time::Instant;

/// Two-phase idle watchdog.
///
/// Phase one waits out the configured silence window; when it expires
/// the session sends a client-originated `PING :ignored` and the
/// watchdog enters phase two. If nothing arrives within a second
/// window, phase two expires and the session times out. Inbound data
/// at the chunk level resets either phase back to phase one, so any
/// server traffic — not just a PONG — keeps the session alive.
///
/// There is exactly one live deadline at a time; re-arming replaces it.
#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    phase: Phase,
    deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for the silence window to elapse.
    Watching,
    /// Probe PING sent; waiting for any response.
    AwaitingPong,
}

/// What the session must do when the current deadline fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Silence window elapsed: send the probe PING.
    SendPing,
    /// No response to the probe: the session has timed out.
    TimedOut,
}

impl Watchdog {
    /// Arms phase one. Called at transport-connect, not construction.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            phase: Phase::Watching,
            deadline: now + timeout,
        }
    }

    /// Any inbound chunk — even a partial line — resets to phase one.
    pub fn touch(&mut self, now: Instant) {
        self.phase = Phase::Watching;
        self.deadline = now + self.timeout;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Advances the phase machine once the deadline has been reached.
    pub fn expire(&mut self, now: Instant) -> Expiry {
        match self.phase {
            Phase::Watching => {
                self.phase = Phase::AwaitingPong;
                self.deadline = now + self.timeout;
                Expiry::SendPing
            }
            Phase::AwaitingPong => {
                self.phase = Phase::Watching;
                self.deadline = now + self.timeout;
                Expiry::TimedOut
            }
        }
    }
}
