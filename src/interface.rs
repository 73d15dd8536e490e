use std::process::Command;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::Regex;

/// Operating mode of a wireless interface as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Managed,
    Monitor,
    Unknown,
}

impl Mode {
    fn from_token(token: &str) -> Mode {
        match token {
            "managed" | "station" => Mode::Managed,
            "monitor" => Mode::Monitor,
            _ => Mode::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Managed => "managed",
            Mode::Monitor => "monitor",
            Mode::Unknown => "unknown",
        }
    }
}

/// One wireless adapter known to the OS at the time of a discovery call.
///
/// The name is unique within a single discovery but is not stable across
/// mode transitions; a transition may rename the interface.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub hardware_address: Option<String>,
    pub permanent_address: Option<String>,
    pub mode: Mode,
}

impl Interface {
    pub fn is_spoofed(&self) -> bool {
        match (&self.hardware_address, &self.permanent_address) {
            (Some(cur), Some(perm)) => !cur.eq_ignore_ascii_case(perm),
            _ => false,
        }
    }
}

/// Discovers wireless interfaces by shelling out to the OS query tools.
#[derive(Debug, Clone)]
pub struct InterfaceProbe {
    query_program: String,
}

impl Default for InterfaceProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceProbe {
    pub fn new() -> Self {
        InterfaceProbe {
            query_program: "iw".to_string(),
        }
    }

    /// Substitutes the discovery utility. Used by tests to feed the probe
    /// scripted listings instead of querying real hardware.
    pub fn with_program(query: &str) -> Self {
        InterfaceProbe {
            query_program: query.to_string(),
        }
    }

    /// Lists the wireless interfaces currently present. Never fails: if
    /// every underlying utility is missing or errors out, the list is
    /// simply empty.
    pub fn list_interfaces(&self) -> Vec<Interface> {
        let mut interfaces = self.discover();
        for iface in &mut interfaces {
            let (current, permanent) = resolve_hardware_address(&iface.name);
            if iface.hardware_address.is_none() {
                iface.hardware_address = current;
            }
            iface.permanent_address = permanent;
        }
        interfaces
    }

    /// Mode of a single named interface, if it is present at all.
    pub fn mode_of(&self, name: &str) -> Option<Mode> {
        self.list_interfaces()
            .into_iter()
            .find(|i| i.name == name)
            .map(|i| i.mode)
    }

    #[cfg(not(windows))]
    fn discover(&self) -> Vec<Interface> {
        match run_for_stdout(&self.query_program, &["dev"]) {
            Ok(output) => {
                let found = parse_iw_dev(&output);
                if !found.is_empty() {
                    return found;
                }
                debug!("iw dev reported no interfaces, falling back to ip link");
                self.discover_fallback()
            }
            Err(e) => {
                warn!("couldn't query wireless interfaces: {}", e);
                self.discover_fallback()
            }
        }
    }

    #[cfg(not(windows))]
    fn discover_fallback(&self) -> Vec<Interface> {
        match run_for_stdout("ip", &["-o", "link", "show"]) {
            Ok(output) => parse_ip_link(&output),
            Err(e) => {
                warn!("interface discovery fallback failed: {}", e);
                Vec::new()
            }
        }
    }

    #[cfg(windows)]
    fn discover(&self) -> Vec<Interface> {
        match run_for_stdout("netsh", &["wlan", "show", "interfaces"]) {
            Ok(output) => parse_netsh(&output),
            Err(e) => {
                warn!("couldn't query wireless interfaces: {}", e);
                Vec::new()
            }
        }
    }
}

fn run_for_stdout(program: &str, args: &[&str]) -> std::io::Result<String> {
    let output = Command::new(program).args(args).output()?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parses `iw dev` output. Entries are emitted only once a name has been
/// seen; lines that don't match a known shape are skipped.
pub fn parse_iw_dev(output: &str) -> Vec<Interface> {
    let mut interfaces = Vec::new();
    let mut current: Option<Interface> = None;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Interface ") {
            if let Some(done) = current.take() {
                interfaces.push(done);
            }
            current = Some(Interface {
                name: rest.trim().to_string(),
                hardware_address: None,
                permanent_address: None,
                mode: Mode::Unknown,
            });
        } else if let Some(iface) = current.as_mut() {
            if let Some(rest) = line.strip_prefix("type ") {
                iface.mode = Mode::from_token(rest.trim());
            } else if let Some(rest) = line.strip_prefix("addr ") {
                iface.hardware_address = Some(rest.trim().to_string());
            }
        }
    }
    if let Some(done) = current.take() {
        interfaces.push(done);
    }
    interfaces
}

/// Name patterns that indicate a wireless device in generic link listings.
const WIRELESS_HINTS: [&str; 5] = ["wlan", "wl", "mon", "wifi", "ath"];

/// Parses `ip -o link show` output, keeping only wireless-looking names.
/// The mode cannot be recovered from a link listing.
pub fn parse_ip_link(output: &str) -> Vec<Interface> {
    let mut interfaces = Vec::new();
    for line in output.lines() {
        // "3: wlan0: <BROADCAST,...> ... link/ether aa:bb:cc:dd:ee:ff ..."
        let mut parts = line.split(':');
        let name = match parts.nth(1) {
            Some(field) => {
                let name = field.trim();
                // VLAN-style "wlan0@eth0" names keep only the device part
                name.split('@').next().unwrap_or(name).to_string()
            }
            None => continue,
        };
        if name.is_empty() || !WIRELESS_HINTS.iter().any(|h| name.contains(h)) {
            continue;
        }
        let hardware_address = line
            .split_whitespace()
            .skip_while(|t| *t != "link/ether")
            .nth(1)
            .map(|m| m.to_string());
        interfaces.push(Interface {
            name,
            hardware_address,
            permanent_address: None,
            mode: Mode::Unknown,
        });
    }
    interfaces
}

/// Parses `netsh wlan show interfaces` output. Windows adapters never
/// expose monitor mode through this path, so they report as managed.
#[allow(dead_code)]
pub fn parse_netsh(output: &str) -> Vec<Interface> {
    let mut interfaces = Vec::new();
    let mut current: Option<Interface> = None;

    for line in output.lines() {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key == "Name" {
            if let Some(done) = current.take() {
                interfaces.push(done);
            }
            current = Some(Interface {
                name: value.to_string(),
                hardware_address: None,
                permanent_address: None,
                mode: Mode::Managed,
            });
        } else if key == "Physical address" {
            if let Some(iface) = current.as_mut() {
                iface.hardware_address = Some(value.to_string());
            }
        }
    }
    if let Some(done) = current.take() {
        interfaces.push(done);
    }
    interfaces
}

/// Tries `macchanger -s` first (which also reveals the permanent address),
/// then `ip link show`. A missing address is not an error.
fn resolve_hardware_address(name: &str) -> (Option<String>, Option<String>) {
    if let Ok(output) = run_for_stdout("macchanger", &["-s", name]) {
        let (current, permanent) = parse_macchanger_show(&output);
        if current.is_some() {
            return (current, permanent);
        }
    }
    if let Ok(output) = run_for_stdout("ip", &["link", "show", name]) {
        let current = output
            .split_whitespace()
            .skip_while(|t| *t != "link/ether")
            .nth(1)
            .map(|m| m.to_string());
        return (current, None);
    }
    (None, None)
}

/// Extracts the current and permanent addresses from `macchanger -s` output.
pub fn parse_macchanger_show(output: &str) -> (Option<String>, Option<String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"(Current|Permanent)\s+MAC:\s+([0-9A-Fa-f:]{17})").unwrap());
    let mut current = None;
    let mut permanent = None;
    for cap in re.captures_iter(output) {
        match &cap[1] {
            "Current" => current = Some(cap[2].to_string()),
            "Permanent" => permanent = Some(cap[2].to_string()),
            _ => {}
        }
    }
    (current, permanent)
}
