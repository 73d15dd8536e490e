use std::sync::OnceLock;

use regex::Regex;

use crate::error::AirctlError;
use crate::interface::{InterfaceProbe, Mode};
use crate::mode::{MacChange, ModeController};
use crate::session::{SessionController, BROADCAST_SENTINEL};

/// Renders one titled result message. The core never reads anything back.
pub trait Present {
    fn show(&self, text: &str, title: &str);
}

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&self, question: &str) -> bool;
}

/// Keyword-context collaborator; consulted only as a fallback for input
/// the dispatcher doesn't recognize.
pub trait Advise {
    fn advise(&self, input: &str, previous_output: Option<&str>) -> Option<String>;
}

/// Adviser that knows nothing. Stands in when no keyword dictionary is
/// wired up.
pub struct NullAdviser;

impl Advise for NullAdviser {
    fn advise(&self, _input: &str, _previous_output: Option<&str>) -> Option<String> {
        None
    }
}

/// One structured user command. Arguments ride inside the variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ListInterfaces,
    SetMonitorMode {
        interface: String,
    },
    SetManagedMode {
        interface: String,
    },
    ScanNetworks {
        interface: String,
    },
    StartCapture {
        interface: String,
        bssid: String,
        channel: String,
    },
    StopCapture,
    DeauthAttack {
        interface: String,
        bssid: String,
        client: String,
        count: u32,
    },
    ChangeMac {
        interface: String,
        change: MacChange,
    },
    Help,
    Exit,
    /// Not part of the vocabulary; handed to the adviser fallback.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub operation: Operation,
    pub explanation: Option<&'static str>,
}

impl ParsedCommand {
    fn new(operation: Operation, explanation: &'static str) -> Self {
        ParsedCommand {
            operation,
            explanation: Some(explanation),
        }
    }

    fn bare(operation: Operation) -> Self {
        ParsedCommand {
            operation,
            explanation: None,
        }
    }
}

/// Tokenizes one line of input against the fixed vocabulary. Missing or
/// malformed arguments come back as `Err` with a reportable message and
/// no controller is ever invoked for them.
pub fn parse(line: &str) -> Result<ParsedCommand, AirctlError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&first) = tokens.first() else {
        return Err(AirctlError::MissingParameter);
    };

    match first {
        "interface" => match tokens.get(1).copied() {
            Some("list") => Ok(ParsedCommand::new(
                Operation::ListInterfaces,
                "Listing wireless interfaces",
            )),
            Some("monitor") => {
                let interface = required(&tokens, 2)?;
                Ok(ParsedCommand::new(
                    Operation::SetMonitorMode { interface },
                    "Enabling monitor mode on wireless interface",
                ))
            }
            Some("managed") => {
                let interface = required(&tokens, 2)?;
                Ok(ParsedCommand::new(
                    Operation::SetManagedMode { interface },
                    "Disabling monitor mode on wireless interface",
                ))
            }
            _ => Err(AirctlError::MissingParameter),
        },
        "scan" => match tokens.get(1).copied() {
            Some("networks") => {
                let interface = required(&tokens, 2)?;
                Ok(ParsedCommand::new(
                    Operation::ScanNetworks { interface },
                    "Capturing wireless packets",
                ))
            }
            _ => Err(AirctlError::MissingParameter),
        },
        "capture" => match tokens.get(1).copied() {
            Some("start") => {
                let interface = required(&tokens, 2)?;
                let bssid = required_mac(&tokens, 3)?;
                let channel = required_channel(&tokens, 4)?;
                Ok(ParsedCommand::new(
                    Operation::StartCapture {
                        interface,
                        bssid,
                        channel,
                    },
                    "Capturing packets for a specific access point and saving to file",
                ))
            }
            Some("stop") => Ok(ParsedCommand::bare(Operation::StopCapture)),
            _ => Err(AirctlError::MissingParameter),
        },
        "attack" => match tokens.get(1).copied() {
            Some("deauth") => {
                let interface = required(&tokens, 2)?;
                let bssid = required_mac(&tokens, 3)?;
                let client = match tokens.get(4) {
                    Some(&c) if c.eq_ignore_ascii_case(BROADCAST_SENTINEL) => c.to_string(),
                    Some(&c) if is_mac(c) => c.to_string(),
                    Some(&c) => {
                        return Err(AirctlError::InvalidCommand(format!(
                            "bad client address '{}'",
                            c
                        )))
                    }
                    None => BROADCAST_SENTINEL.to_string(),
                };
                let count = match tokens.get(5) {
                    Some(&n) => n
                        .parse::<u32>()
                        .map_err(|_| AirctlError::InvalidCommand(format!("bad count '{}'", n)))?,
                    None => 0,
                };
                Ok(ParsedCommand::new(
                    Operation::DeauthAttack {
                        interface,
                        bssid,
                        client,
                        count,
                    },
                    "Performing deauthentication attack",
                ))
            }
            _ => Err(AirctlError::MissingParameter),
        },
        "macchanger" => match tokens.get(1).copied() {
            Some("random") => {
                let interface = required(&tokens, 2)?;
                Ok(ParsedCommand::new(
                    Operation::ChangeMac {
                        interface,
                        change: MacChange::Random,
                    },
                    "Setting a fully random hardware address",
                ))
            }
            Some("permanent") => {
                let interface = required(&tokens, 2)?;
                Ok(ParsedCommand::new(
                    Operation::ChangeMac {
                        interface,
                        change: MacChange::Permanent,
                    },
                    "Restoring the permanent hardware address",
                ))
            }
            Some("mac") => {
                let address = required_mac(&tokens, 2)?;
                let interface = required(&tokens, 3)?;
                Ok(ParsedCommand::new(
                    Operation::ChangeMac {
                        interface,
                        change: MacChange::Specific(address),
                    },
                    "Setting a specific hardware address",
                ))
            }
            _ => Err(AirctlError::MissingParameter),
        },
        "help" => Ok(ParsedCommand::bare(Operation::Help)),
        "exit" | "quit" => Ok(ParsedCommand::bare(Operation::Exit)),
        _ => Ok(ParsedCommand::bare(Operation::Unknown)),
    }
}

fn required(tokens: &[&str], index: usize) -> Result<String, AirctlError> {
    tokens
        .get(index)
        .map(|t| t.to_string())
        .ok_or(AirctlError::MissingParameter)
}

fn required_mac(tokens: &[&str], index: usize) -> Result<String, AirctlError> {
    let value = required(tokens, index)?;
    if is_mac(&value) {
        Ok(value)
    } else {
        Err(AirctlError::InvalidCommand(format!(
            "bad hardware address '{}'",
            value
        )))
    }
}

fn required_channel(tokens: &[&str], index: usize) -> Result<String, AirctlError> {
    let value = required(tokens, index)?;
    if value.parse::<u16>().is_ok() {
        Ok(value)
    } else {
        Err(AirctlError::InvalidCommand(format!(
            "bad channel '{}'",
            value
        )))
    }
}

pub fn is_mac(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").unwrap())
        .is_match(value)
}

const HELP_TEXT: &str = "\
interface list                                    list wireless interfaces
interface monitor <iface>                         put an interface into monitor mode
interface managed <iface>                         return an interface to managed mode
scan networks <iface>                             survey nearby networks (Ctrl+C to stop)
capture start <iface> <bssid> <channel>           capture one access point to a file
capture stop                                      stop the running capture
attack deauth <iface> <bssid> [client] [count]    deauthenticate a client (0/omitted count = until Ctrl+C)
macchanger random|permanent <iface>               rewrite the hardware address
macchanger mac <address> <iface>
help                                              this text
exit | quit                                       leave";

/// Turns parsed commands into controller calls and exactly one titled
/// result message each. Owns no state beyond the previous command output
/// kept for the adviser fallback.
pub struct CommandDispatcher {
    probe: InterfaceProbe,
    modes: ModeController,
    sessions: SessionController,
    presenter: Box<dyn Present>,
    confirmer: Box<dyn Confirm>,
    adviser: Box<dyn Advise>,
    last_output: Option<String>,
}

impl CommandDispatcher {
    pub fn new(
        probe: InterfaceProbe,
        modes: ModeController,
        sessions: SessionController,
        presenter: Box<dyn Present>,
        confirmer: Box<dyn Confirm>,
        adviser: Box<dyn Advise>,
    ) -> Self {
        CommandDispatcher {
            probe,
            modes,
            sessions,
            presenter,
            confirmer,
            adviser,
            last_output: None,
        }
    }

    /// Handles one line of input. Returns false when the operator asked
    /// to leave.
    pub fn handle(&mut self, line: &str) -> bool {
        let ParsedCommand {
            operation,
            explanation,
        } = match parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.present(&e.to_string(), "error");
                return true;
            }
        };

        let (text, title) = match operation {
            Operation::ListInterfaces => {
                let interfaces = self.probe.list_interfaces();
                let text = if interfaces.is_empty() {
                    "No wireless interfaces found.".to_string()
                } else {
                    interfaces
                        .iter()
                        .map(|i| {
                            let mut line = format!(
                                "{:<12} mode {:<8} {}",
                                i.name,
                                i.mode.as_str(),
                                i.hardware_address.as_deref().unwrap_or("-")
                            );
                            if i.is_spoofed() {
                                line.push_str(" (spoofed)");
                            }
                            line
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                (text, "interfaces")
            }
            Operation::SetMonitorMode { interface } => {
                (self.modes.enable_monitor(&interface).message, "monitor mode")
            }
            Operation::SetManagedMode { interface } => {
                (self.modes.set_managed(&interface).message, "managed mode")
            }
            Operation::ScanNetworks { interface } => {
                let (interface, note) = self.ensure_monitor(&interface);
                (with_note(note, self.sessions.run_scan(&interface)), "scan")
            }
            Operation::StartCapture {
                interface,
                bssid,
                channel,
            } => {
                let (interface, note) = self.ensure_monitor(&interface);
                let result = self.sessions.start_capture(&interface, &bssid, &channel);
                (with_note(note, result), "capture")
            }
            Operation::StopCapture => (self.sessions.stop(), "capture"),
            Operation::DeauthAttack {
                interface,
                bssid,
                client,
                count,
            } => {
                let (interface, note) = self.ensure_monitor(&interface);
                let result = self
                    .sessions
                    .start_attack(&interface, &bssid, &client, count);
                (with_note(note, result), "attack")
            }
            Operation::ChangeMac { interface, change } => {
                (self.modes.change_mac(&interface, change), "macchanger")
            }
            Operation::Help => (HELP_TEXT.to_string(), "commands"),
            Operation::Exit => {
                // Leaving normally carries the same cleanup obligation as
                // an interrupt: no orphaned child, no interface left in
                // monitor mode.
                self.sessions.terminate_active();
                self.modes.restore_all(&self.probe);
                return false;
            }
            Operation::Unknown => {
                let advice = self.adviser.advise(line, self.last_output.as_deref());
                match advice {
                    Some(text) => (text, "advice"),
                    None => (
                        "Unrecognized command. Type 'help' for the command list.".to_string(),
                        "error",
                    ),
                }
            }
        };

        let text = match explanation {
            Some(explanation) => format!("{}\n{}", explanation, text),
            None => text,
        };
        self.present(&text, title);
        true
    }

    /// Mode gate for operations that need monitor mode: queries the probe
    /// and only switches after the operator agrees, returning whichever
    /// interface name the operation should proceed on plus a note for the
    /// operation's result message. Never switches silently.
    fn ensure_monitor(&self, interface: &str) -> (String, Option<String>) {
        match self.probe.mode_of(interface) {
            Some(Mode::Monitor) => (interface.to_string(), None),
            current => {
                let question = match current {
                    Some(mode) => format!(
                        "{} is in {} mode, not monitor mode. Enable monitor mode now?",
                        interface,
                        mode.as_str()
                    ),
                    None => format!(
                        "{} was not found by discovery. Try to enable monitor mode on it anyway?",
                        interface
                    ),
                };
                if self.confirmer.confirm(&question) {
                    let change = self.modes.enable_monitor(interface);
                    (change.name, Some(change.message))
                } else {
                    (
                        interface.to_string(),
                        Some(format!(
                            "Proceeding on {} without switching modes.",
                            interface
                        )),
                    )
                }
            }
        }
    }

    fn present(&mut self, text: &str, title: &str) {
        // Silence itself is reported; see the session controller's
        // "Command executed successfully." contract for empty tool output.
        let text = if text.is_empty() {
            "Command executed successfully."
        } else {
            text
        };
        self.presenter.show(text, title);
        self.last_output = Some(text.to_string());
    }
}

/// Folds a mode-gate note into an operation's result so the command still
/// yields a single message.
fn with_note(note: Option<String>, result: String) -> String {
    match note {
        Some(note) => format!("{}\n{}", note, result),
        None => result,
    }
}
