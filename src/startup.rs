use std::collections::VecDeque;

use secrecy::SecretString;
use tracing::warn;

use crate::caps::{CapNegotiation, LsOutcome};
use crate::config::{CapabilityConfig, ProxyConfig, SessionConfig};
use crate::error::ConnectFailure;
use crate::sasl;

/// Payload of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    /// Acknowledged wanted capabilities, in acknowledgement order.
    pub capabilities: Vec<String>,
    /// The nickname the server accepted.
    pub nickname: String,
}

/// What the session driver must do in response to one inbound line.
/// Actions are applied strictly in order.
#[derive(Debug, PartialEq)]
pub enum Action {
    /// Write one line to the wire (terminator appended by the writer).
    Send(String),
    /// Settle the connect outcome. The driver detaches the handler
    /// before dispatching any further inbound line.
    Settle(std::result::Result<Welcome, ConnectFailure>),
}

/// The registration state machine.
///
/// Runs the post-connect script — WEBIRC, PASS, CAP negotiation, SASL
/// PLAIN, USER/NICK, 001 — as a pure transition function over inbound
/// lines. It performs no IO of its own: `on_connected` and `on_line`
/// return the actions for the driver to apply, which keeps every
/// handshake scenario testable as plain data.
#[derive(Debug)]
pub struct StartupHandler {
    username: String,
    realname: String,
    password: Option<String>,
    proxy: Option<ProxyConfig>,
    capability_config: Option<CapabilityConfig>,
    sasl: Option<SaslCredentials>,
    remaining_nicknames: VecDeque<String>,
    current_nickname: Option<String>,
    capabilities: Vec<String>,
    phase: Phase,
}

#[derive(Debug)]
struct SaslCredentials {
    username: String,
    password: SecretString,
}

#[derive(Debug)]
enum Phase {
    /// CAP LS sent; accounting requests against responses.
    Negotiating(CapNegotiation),
    /// AUTHENTICATE PLAIN sent; waiting for the server's `+`.
    SaslChallenge,
    /// Credentials sent; waiting for numeric 903.
    SaslOutcome,
    /// USER/NICK sent (or about to be); waiting for 001.
    AwaitingWelcome,
    /// Outcome settled; the handler is inert.
    Done,
}

impl StartupHandler {
    pub fn new(config: &SessionConfig) -> Self {
        let sasl = config.sasl.as_ref().map(|cfg| SaslCredentials {
            username: cfg
                .username
                .clone()
                .unwrap_or_else(|| config.username.clone()),
            password: SecretString::new(cfg.password.clone()),
        });

        Self {
            username: config.username.clone(),
            realname: config.realname.clone(),
            password: config.password.clone(),
            proxy: config.proxy.clone(),
            capability_config: config.capabilities.clone(),
            sasl,
            remaining_nicknames: config.nicknames.iter().cloned().collect(),
            current_nickname: None,
            capabilities: Vec::new(),
            phase: Phase::AwaitingWelcome,
        }
    }

    /// The last NICK sent, promoted to final on 001.
    pub fn current_nickname(&self) -> Option<&str> {
        self.current_nickname.as_deref()
    }

    /// Opening burst, emitted once the transport reports connected.
    pub fn on_connected(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        if let Some(proxy) = &self.proxy {
            actions.push(Action::Send(format!(
                "WEBIRC {} {} {} {}",
                proxy.password, proxy.username, proxy.hostname, proxy.ip
            )));
        }
        if let Some(password) = &self.password {
            actions.push(Action::Send(format!("PASS {}", password)));
        }

        match &self.capability_config {
            Some(config) => {
                actions.push(Action::Send("CAP LS".to_string()));
                self.phase = Phase::Negotiating(CapNegotiation::new(config));
            }
            None => self.register(&mut actions),
        }
        actions
    }

    /// Feed one complete inbound line (terminators already stripped).
    pub fn on_line(&mut self, line: &str) -> Vec<Action> {
        let mut actions = Vec::new();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = tokens.first() else {
            return actions;
        };

        // The facade's auto-PONG answers these; registration does not.
        if first == "PING" {
            return actions;
        }
        if first == "ERROR" {
            self.fail(&mut actions, ConnectFailure::BadProxyConfiguration);
            return actions;
        }

        let command = if first.starts_with(':') {
            tokens.get(1).copied().unwrap_or("")
        } else {
            first
        };

        match command {
            "464" => self.fail(&mut actions, ConnectFailure::BadPassword),
            // Twitch reports a bad token this way and keeps the
            // connection open.
            "NOTICE" if line.ends_with("Login unsuccessful") => {
                self.fail(&mut actions, ConnectFailure::BadPassword)
            }
            "CAP" => self.on_cap(line, &tokens, &mut actions),
            // The server rejected CAP outright (ERR_INVALIDCAPCMD /
            // ERR_UNKNOWNCOMMAND). Without hard requirements the
            // handshake proceeds as if CAP were never attempted.
            "410" | "421" => self.on_cap_unsupported(&mut actions),
            "AUTHENTICATE" => self.on_authenticate(tokens.get(1).copied(), &mut actions),
            "903" => self.on_sasl_success(&mut actions),
            // SASL failure has no failure discriminant; what happens
            // next is the server's call (ERROR, close, or nothing).
            "904" => warn!("SASL authentication failed"),
            "431" | "432" | "433" | "436" | "437" | "484" => {
                // Meaningless until a NICK has actually gone out.
                if self.current_nickname.is_some() {
                    self.advance_nick(&mut actions);
                }
            }
            "001" => self.on_welcome(&mut actions),
            _ => {}
        }
        actions
    }

    fn on_cap(&mut self, line: &str, tokens: &[&str], actions: &mut Vec<Action>) {
        let subcommand = tokens.get(3).copied().unwrap_or("");
        // LS, ACK, and NAK all carry their capabilities in the
        // trailing field; an ACK of the joint request names several.
        let trailing = trailing_field(line, 4).unwrap_or("");

        let Phase::Negotiating(negotiation) = &mut self.phase else {
            return;
        };

        let mut fatal = false;
        match subcommand {
            "LS" => match negotiation.on_ls(trailing) {
                LsOutcome::MissingRequired => fatal = true,
                LsOutcome::Requests(requests) => {
                    for request in requests {
                        actions.push(Action::Send(format!("CAP REQ :{}", request)));
                    }
                }
            },
            "ACK" => {
                let caps: Vec<&str> = trailing.split_whitespace().collect();
                negotiation.on_ack(&caps);
            }
            "NAK" => {
                let caps: Vec<&str> = trailing.split_whitespace().collect();
                fatal = negotiation.on_nak(&caps);
            }
            _ => return,
        }

        if fatal {
            actions.push(Action::Send("QUIT".to_string()));
            self.fail(actions, ConnectFailure::MissingRequiredCapabilities);
        } else if negotiation.settled() {
            self.finish_negotiation(actions);
        }
    }

    fn on_cap_unsupported(&mut self, actions: &mut Vec<Action>) {
        let Phase::Negotiating(negotiation) = &self.phase else {
            return;
        };
        if negotiation.has_requirements() {
            actions.push(Action::Send("QUIT".to_string()));
            self.fail(actions, ConnectFailure::MissingRequiredCapabilities);
        } else {
            // No CAP END: the server has already disowned CAP.
            self.register(actions);
        }
    }

    fn finish_negotiation(&mut self, actions: &mut Vec<Action>) {
        let Phase::Negotiating(negotiation) =
            std::mem::replace(&mut self.phase, Phase::AwaitingWelcome)
        else {
            return;
        };
        self.capabilities = negotiation.into_acked();

        let sasl_ready =
            self.sasl.is_some() && self.capabilities.iter().any(|cap| cap == "sasl");
        if sasl_ready {
            actions.push(Action::Send("AUTHENTICATE PLAIN".to_string()));
            self.phase = Phase::SaslChallenge;
        } else {
            actions.push(Action::Send("CAP END".to_string()));
            self.register(actions);
        }
    }

    fn on_authenticate(&mut self, param: Option<&str>, actions: &mut Vec<Action>) {
        if !matches!(self.phase, Phase::SaslChallenge) || param != Some("+") {
            return;
        }
        let Some(credentials) = &self.sasl else {
            return;
        };
        let payload = sasl::plain_payload(&credentials.username, &credentials.password);
        for chunk in sasl::authenticate_params(&payload) {
            actions.push(Action::Send(format!("AUTHENTICATE {}", chunk)));
        }
        self.phase = Phase::SaslOutcome;
    }

    fn on_sasl_success(&mut self, actions: &mut Vec<Action>) {
        if !matches!(self.phase, Phase::SaslOutcome) {
            return;
        }
        // CAP END only now that 903 confirmed the login.
        actions.push(Action::Send("CAP END".to_string()));
        self.register(actions);
    }

    fn on_welcome(&mut self, actions: &mut Vec<Action>) {
        // Salvage any acknowledged capabilities if the server jumped
        // straight to 001 mid-negotiation.
        if let Phase::Negotiating(negotiation) =
            std::mem::replace(&mut self.phase, Phase::Done)
        {
            self.capabilities = negotiation.into_acked();
        }
        actions.push(Action::Settle(Ok(Welcome {
            capabilities: self.capabilities.clone(),
            nickname: self.current_nickname.clone().unwrap_or_default(),
        })));
    }

    /// USER plus the first nickname candidate.
    fn register(&mut self, actions: &mut Vec<Action>) {
        actions.push(Action::Send(format!(
            "USER {} 8 * :{}",
            self.username, self.realname
        )));
        self.phase = Phase::AwaitingWelcome;
        self.advance_nick(actions);
    }

    /// Sends the next candidate, or gives up when the list is dry.
    fn advance_nick(&mut self, actions: &mut Vec<Action>) {
        match self.remaining_nicknames.pop_front() {
            Some(nickname) => {
                actions.push(Action::Send(format!("NICK {}", nickname)));
                self.current_nickname = Some(nickname);
            }
            None => {
                actions.push(Action::Send("QUIT".to_string()));
                self.fail(actions, ConnectFailure::NicknamesUnavailable);
            }
        }
    }

    fn fail(&mut self, actions: &mut Vec<Action>, failure: ConnectFailure) {
        self.phase = Phase::Done;
        actions.push(Action::Settle(Err(failure)));
    }
}

/// The nth space-delimited field and everything after it, with a
/// leading `:` stripped — the trailing parameter of a CAP reply.
fn trailing_field(line: &str, index: usize) -> Option<&str> {
    line.splitn(index + 1, ' ')
        .nth(index)
        .map(|field| field.strip_prefix(':').unwrap_or(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaslConfig;

    fn base_config() -> SessionConfig {
        let mut config = SessionConfig::new(
            "irc.test.net",
            vec!["testbot".to_string(), "testbot_".to_string()],
        );
        config.username = "testuser".to_string();
        config.realname = "realbot".to_string();
        config
    }

    fn sends(actions: &[Action]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::Send(line) => Some(line.as_str()),
                Action::Settle(_) => None,
            })
            .collect()
    }

    fn settlement(actions: &[Action]) -> Option<&std::result::Result<Welcome, ConnectFailure>> {
        actions.iter().find_map(|action| match action {
            Action::Settle(result) => Some(result),
            Action::Send(_) => None,
        })
    }

    #[test]
    fn minimal_handshake() {
        let mut handler = StartupHandler::new(&base_config());
        let burst = handler.on_connected();
        assert_eq!(
            sends(&burst),
            vec!["USER testuser 8 * :realbot", "NICK testbot"]
        );

        let actions = handler.on_line(":irc.test.net 001 testbot :Welcome to the test net");
        assert_eq!(
            settlement(&actions),
            Some(&Ok(Welcome {
                capabilities: vec![],
                nickname: "testbot".to_string(),
            }))
        );
    }

    #[test]
    fn nickname_collision_walks_the_candidate_list() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();

        let retry = handler.on_line(":s 433 * testbot :Nickname is already in use");
        assert_eq!(sends(&retry), vec!["NICK testbot_"]);

        let actions = handler.on_line(":s 001 testbot_ :Welcome");
        match settlement(&actions) {
            Some(Ok(welcome)) => assert_eq!(welcome.nickname, "testbot_"),
            other => panic!("unexpected settlement: {:?}", other),
        }
    }

    #[test]
    fn nickname_exhaustion_fails_with_quit() {
        let mut config = base_config();
        config.nicknames = vec!["testbot".to_string()];
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let actions = handler.on_line(":s 433 * testbot :in use");
        assert_eq!(sends(&actions), vec!["QUIT"]);
        assert_eq!(
            settlement(&actions),
            Some(&Err(ConnectFailure::NicknamesUnavailable))
        );
    }

    #[test]
    fn empty_nickname_list_fails_without_sending_nick() {
        let mut config = base_config();
        config.nicknames.clear();
        let mut handler = StartupHandler::new(&config);

        let burst = handler.on_connected();
        assert_eq!(sends(&burst), vec!["USER testuser 8 * :realbot", "QUIT"]);
        assert_eq!(
            settlement(&burst),
            Some(&Err(ConnectFailure::NicknamesUnavailable))
        );
    }

    #[test]
    fn all_rejection_numerics_advance_the_list() {
        for numeric in ["431", "432", "433", "436", "437", "484"] {
            let mut handler = StartupHandler::new(&base_config());
            handler.on_connected();
            let actions = handler.on_line(&format!(":s {} * testbot :rejected", numeric));
            assert_eq!(sends(&actions), vec!["NICK testbot_"], "numeric {}", numeric);
        }
    }

    #[test]
    fn rejection_numeric_before_any_nick_is_inert() {
        let mut config = base_config();
        config.capabilities = Some(CapabilityConfig::default());
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();
        // Still negotiating; no NICK has gone out.
        assert!(handler.on_line(":s 433 * ghost :in use").is_empty());
    }

    #[test]
    fn webirc_goes_out_first() {
        let mut config = base_config();
        config.proxy = Some(ProxyConfig {
            password: "pword".to_string(),
            username: "uname".to_string(),
            hostname: "hostname.net".to_string(),
            ip: "111.11.11.11".to_string(),
        });
        config.password = Some("secret".to_string());
        let mut handler = StartupHandler::new(&config);

        let burst = handler.on_connected();
        assert_eq!(
            sends(&burst),
            vec![
                "WEBIRC pword uname hostname.net 111.11.11.11",
                "PASS secret",
                "USER testuser 8 * :realbot",
                "NICK testbot",
            ]
        );
    }

    #[test]
    fn error_line_means_bad_proxy() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();
        let actions = handler.on_line("ERROR :Closing Link: 127.0.0.1 (Invalid WEBIRC password)");
        assert_eq!(
            settlement(&actions),
            Some(&Err(ConnectFailure::BadProxyConfiguration))
        );
    }

    #[test]
    fn numeric_464_means_bad_password() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();
        let actions = handler.on_line(":s 464 * :Password incorrect");
        assert_eq!(settlement(&actions), Some(&Err(ConnectFailure::BadPassword)));
    }

    #[test]
    fn twitch_login_notice_means_bad_password() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();
        let actions = handler.on_line(":tmi.twitch.tv NOTICE * :Login unsuccessful");
        assert_eq!(settlement(&actions), Some(&Err(ConnectFailure::BadPassword)));
    }

    #[test]
    fn ping_and_noise_are_inert() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();
        assert!(handler.on_line("PING :irc.test.net").is_empty());
        assert!(handler.on_line(":s NOTICE * :*** Looking up your hostname").is_empty());
        assert!(handler.on_line(":s 372 * :motd line").is_empty());
        assert!(handler.on_line("").is_empty());
    }

    fn cap_config(requires: &[&str], wants: &[&str]) -> Option<CapabilityConfig> {
        Some(CapabilityConfig {
            requires: requires.iter().map(|s| s.to_string()).collect(),
            wants: wants.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn capability_negotiation_requests_then_registers() {
        let mut config = base_config();
        config.capabilities = cap_config(&["account-tag"], &["server-time"]);
        let mut handler = StartupHandler::new(&config);

        let burst = handler.on_connected();
        assert_eq!(sends(&burst), vec!["CAP LS"]);

        let requests = handler.on_line(":s CAP * LS :account-tag server-time sasl");
        assert_eq!(
            sends(&requests),
            vec!["CAP REQ :account-tag", "CAP REQ :server-time"]
        );

        assert!(handler.on_line(":s CAP * ACK :account-tag").is_empty());
        let done = handler.on_line(":s CAP * ACK :server-time");
        assert_eq!(
            sends(&done),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );

        let actions = handler.on_line(":s 001 testbot :Welcome");
        match settlement(&actions) {
            Some(Ok(welcome)) => {
                // Only wanted capabilities are reported.
                assert_eq!(welcome.capabilities, vec!["server-time"]);
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
    }

    #[test]
    fn joint_ack_keeps_the_wanted_overlap() {
        let mut config = base_config();
        config.capabilities = cap_config(&["batch", "sasl"], &["sasl"]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let requests = handler.on_line(":s CAP * LS :batch sasl server-time");
        assert_eq!(sends(&requests), vec!["CAP REQ :batch sasl"]);

        // One multi-cap ACK answers the joint request.
        let done = handler.on_line(":s CAP * ACK :batch sasl");
        assert_eq!(
            sends(&done),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );

        let actions = handler.on_line(":s 001 testbot :Welcome");
        match settlement(&actions) {
            Some(Ok(welcome)) => assert_eq!(welcome.capabilities, vec!["sasl"]),
            other => panic!("unexpected settlement: {:?}", other),
        }
    }

    #[test]
    fn missing_required_capability_quits() {
        let mut config = base_config();
        config.capabilities = cap_config(&["sasl"], &[]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let actions = handler.on_line(":s CAP * LS :multi-prefix server-time");
        assert_eq!(sends(&actions), vec!["QUIT"]);
        assert_eq!(
            settlement(&actions),
            Some(&Err(ConnectFailure::MissingRequiredCapabilities))
        );
    }

    #[test]
    fn nak_of_required_capability_quits() {
        let mut config = base_config();
        config.capabilities = cap_config(&["a"], &[]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let requests = handler.on_line(":s CAP * LS :a b");
        assert_eq!(sends(&requests), vec!["CAP REQ :a"]);

        let actions = handler.on_line(":s CAP * NAK :a");
        assert_eq!(sends(&actions), vec!["QUIT"]);
        assert_eq!(
            settlement(&actions),
            Some(&Err(ConnectFailure::MissingRequiredCapabilities))
        );
    }

    #[test]
    fn nak_of_wanted_capability_is_tolerated() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["server-time"]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();
        handler.on_line(":s CAP * LS :server-time");

        let actions = handler.on_line(":s CAP * NAK :server-time");
        assert_eq!(
            sends(&actions),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );
        assert!(settlement(&actions).is_none());
    }

    #[test]
    fn no_matching_offers_registers_immediately() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["server-time"]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let actions = handler.on_line(":s CAP * LS :batch multi-prefix");
        assert_eq!(
            sends(&actions),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );
    }

    #[test]
    fn cap_rejection_numeric_without_requirements_falls_through() {
        for numeric in ["410", "421"] {
            let mut config = base_config();
            config.capabilities = cap_config(&[], &["server-time"]);
            let mut handler = StartupHandler::new(&config);
            handler.on_connected();

            let actions = handler.on_line(&format!(":s {} * CAP :Unknown command", numeric));
            // No CAP END: the server does not speak CAP at all.
            assert_eq!(
                sends(&actions),
                vec!["USER testuser 8 * :realbot", "NICK testbot"],
                "numeric {}",
                numeric
            );
        }
    }

    #[test]
    fn cap_rejection_numeric_with_requirements_quits() {
        let mut config = base_config();
        config.capabilities = cap_config(&["sasl"], &[]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        let actions = handler.on_line(":s 421 * CAP :Unknown command");
        assert_eq!(sends(&actions), vec!["QUIT"]);
        assert_eq!(
            settlement(&actions),
            Some(&Err(ConnectFailure::MissingRequiredCapabilities))
        );
    }

    #[test]
    fn sasl_runs_between_ack_and_cap_end() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["sasl"]);
        config.sasl = Some(SaslConfig {
            username: Some("jilles".to_string()),
            password: "sesame".to_string(),
        });
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();
        handler.on_line(":s CAP * LS :sasl server-time");

        let actions = handler.on_line(":s CAP * ACK :sasl");
        assert_eq!(sends(&actions), vec!["AUTHENTICATE PLAIN"]);

        let credentials = handler.on_line("AUTHENTICATE +");
        assert_eq!(
            sends(&credentials),
            vec!["AUTHENTICATE amlsbGVzAGppbGxlcwBzZXNhbWU="]
        );

        let finish = handler.on_line(":s 903 testbot :SASL authentication successful");
        assert_eq!(
            sends(&finish),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );
    }

    #[test]
    fn sasl_username_defaults_to_session_username() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["sasl"]);
        config.sasl = Some(SaslConfig {
            username: None,
            password: "sesame".to_string(),
        });
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();
        handler.on_line(":s CAP * LS :sasl");
        handler.on_line(":s CAP * ACK :sasl");

        let credentials = handler.on_line("AUTHENTICATE +");
        let expected = sasl::plain_payload(
            "testuser",
            &SecretString::new("sesame".to_string()),
        );
        assert_eq!(
            sends(&credentials),
            vec![format!("AUTHENTICATE {}", expected).as_str()]
        );
    }

    #[test]
    fn sasl_skipped_when_server_never_acks_it() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["sasl"]);
        config.sasl = Some(SaslConfig {
            username: None,
            password: "sesame".to_string(),
        });
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        // Server does not offer sasl, so the negotiation settles with
        // nothing acknowledged and SASL never starts.
        let actions = handler.on_line(":s CAP * LS :server-time");
        assert_eq!(
            sends(&actions),
            vec!["CAP END", "USER testuser 8 * :realbot", "NICK testbot"]
        );
    }

    #[test]
    fn stray_authenticate_outside_sasl_is_inert() {
        let mut handler = StartupHandler::new(&base_config());
        handler.on_connected();
        assert!(handler.on_line("AUTHENTICATE +").is_empty());
    }

    #[test]
    fn welcome_mid_negotiation_still_settles() {
        let mut config = base_config();
        config.capabilities = cap_config(&[], &["server-time"]);
        let mut handler = StartupHandler::new(&config);
        handler.on_connected();

        // Some servers ignore CAP LS and register the client anyway.
        let actions = handler.on_line(":s 001 testbot :Welcome");
        match settlement(&actions) {
            Some(Ok(welcome)) => assert!(welcome.capabilities.is_empty()),
            other => panic!("unexpected settlement: {:?}", other),
        }
    }
}
