use std::process::Command;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

use crate::error::{AirctlError, Result};
use crate::interface::{InterfaceProbe, Mode};

/// Suffix airmon-ng conventionally appends to an interface it puts into
/// monitor mode.
const MONITOR_SUFFIX: &str = "mon";

pub const BROADCAST_MAC: &str = "FF:FF:FF:FF:FF:FF";

/// Result of a mode transition. `certain` is false when the utility's
/// output matched no known pattern and the caller should verify the state
/// with a fresh discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub name: String,
    pub message: String,
    pub certain: bool,
}

/// What a mode-switch utility's output told us about the resulting
/// interface name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Confirmation phrase with an explicit resulting name.
    Renamed(String),
    /// Confirmation phrase but no name; the suffix convention applies.
    Confirmed,
    /// No recognized phrase at all.
    Uncertain,
}

/// Requested macchanger behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacChange {
    Random,
    Permanent,
    Specific(String),
}

/// Drives interfaces between managed and monitor mode through airmon-ng,
/// and rewrites hardware addresses through macchanger. Stateless; the
/// utilities are the source of truth.
#[derive(Debug, Clone)]
pub struct ModeController {
    switch_program: String,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        ModeController {
            switch_program: "airmon-ng".to_string(),
        }
    }

    /// Substitutes the mode-switch utility. Used by tests to observe which
    /// interfaces a restoration pass actually touches.
    pub fn with_program(switch: &str) -> Self {
        ModeController {
            switch_program: switch.to_string(),
        }
    }

    /// Puts `name` into monitor mode. Returns the (possibly renamed)
    /// interface and a status message; never lets an OS-level error out.
    pub fn enable_monitor(&self, name: &str) -> ModeChange {
        if !tool_available(&self.switch_program) {
            return ModeChange {
                name: name.to_string(),
                message: "airmon-ng is not installed. Install the aircrack-ng suite first."
                    .to_string(),
                certain: false,
            };
        }

        // Neutralize NetworkManager and friends before switching.
        if let Err(e) = run_quiet(&self.switch_program, &["check", "kill"]) {
            warn!("airmon-ng check kill failed: {}", e);
        }

        match run_combined(&self.switch_program, &["start", name]) {
            Ok(output) => {
                debug!("airmon-ng start output: {}", output.trim());
                interpret_switch(name, &output, Mode::Monitor)
            }
            Err(e) => ModeChange {
                name: name.to_string(),
                message: format!("Error enabling monitor mode: {}", e),
                certain: false,
            },
        }
    }

    /// Returns `name` to managed mode and restarts NetworkManager, which
    /// `check kill` will have stopped earlier.
    pub fn set_managed(&self, name: &str) -> ModeChange {
        if !tool_available(&self.switch_program) {
            return ModeChange {
                name: name.to_string(),
                message: "airmon-ng is not installed. Install the aircrack-ng suite first."
                    .to_string(),
                certain: false,
            };
        }

        let change = match run_combined(&self.switch_program, &["stop", name]) {
            Ok(output) => {
                debug!("airmon-ng stop output: {}", output.trim());
                interpret_switch(name, &output, Mode::Managed)
            }
            Err(e) => ModeChange {
                name: name.to_string(),
                message: format!("Error setting managed mode: {}", e),
                certain: false,
            },
        };

        if let Err(e) = run_quiet("service", &["NetworkManager", "start"]) {
            debug!("couldn't restart NetworkManager: {}", e);
        }
        change
    }

    /// Returns every interface currently in monitor mode to managed mode.
    /// A failure on one interface must not stop the others from being
    /// attempted.
    pub fn restore_all(&self, probe: &InterfaceProbe) {
        for iface in probe.list_interfaces() {
            if iface.mode == Mode::Monitor {
                let change = self.set_managed(&iface.name);
                if !change.certain {
                    warn!("restoring {}: {}", iface.name, change.message);
                }
            }
        }
        if let Err(e) = run_quiet("service", &["NetworkManager", "start"]) {
            debug!("couldn't restart NetworkManager: {}", e);
        }
    }

    /// Rewrites the hardware address of `name` through macchanger. The
    /// interface is taken down first and brought back up afterwards, also
    /// when macchanger itself fails.
    pub fn change_mac(&self, name: &str, change: MacChange) -> String {
        if !tool_available("macchanger") {
            return "macchanger is not installed. Install with: sudo apt-get install macchanger"
                .to_string();
        }

        if let Err(e) = run_quiet("ip", &["link", "set", name, "down"]) {
            return format!("Couldn't take {} down: {}", name, e);
        }

        let result = match &change {
            MacChange::Random => run_combined("macchanger", &["-r", name]),
            MacChange::Permanent => run_combined("macchanger", &["-p", name]),
            MacChange::Specific(mac) => run_combined("macchanger", &["-m", mac.as_str(), name]),
        };

        // Bring the interface back up regardless of the outcome.
        if let Err(e) = run_quiet("ip", &["link", "set", name, "up"]) {
            warn!("couldn't bring {} back up: {}", name, e);
        }

        match result {
            Ok(output) => match parse_macchanger_new(&output) {
                Some(mac) => format!("MAC address of {} changed to {}", name, mac),
                None => "MAC address change failed or couldn't confirm new MAC".to_string(),
            },
            Err(e) => format!("Error changing MAC address: {}", e),
        }
    }
}

/// Classifies a mode-switch utility's output. Exposed separately so it can
/// be tested against captured samples.
pub fn parse_switch_output(output: &str, target: Mode) -> SwitchOutcome {
    // "(mac80211 monitor mode vif enabled for [phy0]wlan0 on [phy0]wlan0mon)"
    // "(mac80211 station mode vif enabled on [phy0]wlan0)"
    static RENAME: OnceLock<Regex> = OnceLock::new();
    let rename = RENAME
        .get_or_init(|| Regex::new(r"vif enabled (?:for \S+ )?on (?:\[[^\]]+\])?(\S+?)\)").unwrap());
    if let Some(cap) = rename.captures(output) {
        return SwitchOutcome::Renamed(cap[1].to_string());
    }

    let lower = output.to_lowercase();
    let confirmed = match target {
        Mode::Monitor => lower.contains("monitor mode enabled"),
        Mode::Managed => {
            lower.contains("monitor mode disabled")
                || lower.contains("station mode")
                || lower.contains("removed")
        }
        Mode::Unknown => false,
    };
    if confirmed {
        SwitchOutcome::Confirmed
    } else {
        SwitchOutcome::Uncertain
    }
}

/// Applies the documented suffix convention for a confirmed switch that
/// named no interface.
pub fn conventional_name(name: &str, target: Mode) -> String {
    match target {
        Mode::Monitor if !name.ends_with(MONITOR_SUFFIX) => format!("{}{}", name, MONITOR_SUFFIX),
        Mode::Managed => name.strip_suffix(MONITOR_SUFFIX).unwrap_or(name).to_string(),
        _ => name.to_string(),
    }
}

fn interpret_switch(name: &str, output: &str, target: Mode) -> ModeChange {
    match parse_switch_output(output, target) {
        SwitchOutcome::Renamed(new_name) => ModeChange {
            message: format!("{} mode enabled on {}", target.as_str(), new_name),
            name: new_name,
            certain: true,
        },
        SwitchOutcome::Confirmed => {
            let new_name = conventional_name(name, target);
            ModeChange {
                message: format!("{} mode enabled on {}", target.as_str(), new_name),
                name: new_name,
                certain: true,
            }
        }
        SwitchOutcome::Uncertain => ModeChange {
            name: name.to_string(),
            message: format!(
                "{} mode may be enabled on {}, but couldn't confirm; check `iw dev`",
                target.as_str(),
                name
            ),
            certain: false,
        },
    }
}

/// Extracts the resulting address from macchanger output ("New MAC: ...").
pub fn parse_macchanger_new(output: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"New MAC:\s+([0-9A-Fa-f:]{17})").unwrap());
    re.captures(output).map(|cap| cap[1].to_string())
}

pub fn tool_available(program: &str) -> bool {
    // `which` only resolves bare names; explicit paths are checked directly.
    if program.contains('/') {
        return std::path::Path::new(program).exists();
    }
    Command::new("which")
        .arg(program)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_quiet(program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(map_spawn_error(program))?;
    if !status.success() {
        return Err(AirctlError::Subprocess(format!(
            "{} exited with {}",
            program, status
        )));
    }
    Ok(())
}

/// Runs a utility and returns its stdout and stderr joined, since the
/// aircrack tools spread their confirmation text across both streams.
fn run_combined(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(map_spawn_error(program))?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}

fn map_spawn_error(program: &str) -> impl Fn(std::io::Error) -> AirctlError + '_ {
    move |e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AirctlError::ToolUnavailable(program.to_string())
        } else {
            AirctlError::Io(e)
        }
    }
}
