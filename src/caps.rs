use std::collections::BTreeSet;

use crate::config::CapabilityConfig;

/// Request/response accounting for one CAP negotiation.
///
/// Alive only between `CAP LS` and the point the counters balance;
/// the startup handler owns one of these while the negotiation runs
/// and extracts the acknowledged list when it settles.
#[derive(Debug)]
pub struct CapNegotiation {
    requires: BTreeSet<String>,
    wants: BTreeSet<String>,
    server_caps: BTreeSet<String>,
    acked: Vec<String>,
    sent_requests: u32,
    responded_requests: u32,
}

/// Result of processing the server's `CAP * LS` advertisement.
#[derive(Debug, PartialEq, Eq)]
pub enum LsOutcome {
    /// A required capability is absent; registration must fail.
    MissingRequired,
    /// `CAP REQ` payloads to send, in order.
    Requests(Vec<String>),
}

impl CapNegotiation {
    pub fn new(config: &CapabilityConfig) -> Self {
        Self {
            requires: config.requires.clone(),
            wants: config.wants.clone(),
            server_caps: BTreeSet::new(),
            acked: Vec::new(),
            sent_requests: 0,
            responded_requests: 0,
        }
    }

    /// Records the advertised capability list and decides what to
    /// request. Advertised `name=value` entries match on the name.
    ///
    /// Required capabilities go out as one joint `CAP REQ`; wanted
    /// capabilities the server offers go out one `CAP REQ` each. A
    /// capability listed as both required and wanted rides the joint
    /// request only — its ACK still lands in the acknowledged list.
    pub fn on_ls(&mut self, advertised: &str) -> LsOutcome {
        self.server_caps = advertised
            .split_whitespace()
            .map(|cap| cap.split('=').next().unwrap_or(cap).to_string())
            .collect();

        if !self.requires.iter().all(|cap| self.server_caps.contains(cap)) {
            return LsOutcome::MissingRequired;
        }

        let mut requests = Vec::new();
        if !self.requires.is_empty() {
            let joint: Vec<&str> = self.requires.iter().map(String::as_str).collect();
            requests.push(joint.join(" "));
            self.sent_requests += 1;
        }
        for want in &self.wants {
            if self.server_caps.contains(want) && !self.requires.contains(want) {
                requests.push(want.clone());
                self.sent_requests += 1;
            }
        }
        LsOutcome::Requests(requests)
    }

    /// One ACK line answers one request, joint or single; every
    /// acknowledged capability that is wanted lands in the reported
    /// list, so an overlap folded into the joint request is not lost.
    pub fn on_ack(&mut self, caps: &[&str]) {
        self.responded_requests += 1;
        for cap in caps {
            if self.wants.contains(*cap) {
                self.acked.push((*cap).to_string());
            }
        }
    }

    /// Returns true when any rejected capability was required, which
    /// is fatal to registration.
    pub fn on_nak(&mut self, caps: &[&str]) -> bool {
        self.responded_requests += 1;
        caps.iter().any(|cap| self.requires.contains(*cap))
    }

    /// True once every request sent has been answered.
    pub fn settled(&self) -> bool {
        self.sent_requests == self.responded_requests
    }

    pub fn has_requirements(&self) -> bool {
        !self.requires.is_empty()
    }

    /// The acknowledged wanted capabilities, in ACK order.
    pub fn into_acked(self) -> Vec<String> {
        self.acked
    }
}
