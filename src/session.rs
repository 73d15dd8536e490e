use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};

use crate::mode::BROADCAST_MAC;

/// Sentinel a caller may pass as the client address to mean "every
/// associated station".
pub const BROADCAST_SENTINEL: &str = "broadcast";

const WAIT_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Capture,
    Attack,
}

/// The single tracked child process. Owned exclusively by the controller;
/// nobody else signals it.
#[derive(Debug)]
pub struct Session {
    pub child: Child,
    pub kind: SessionKind,
    pub target_file: Option<String>,
    pub interface: String,
    pub started: SystemTime,
}

/// Supervises at most one capture or injection child at a time.
///
/// Clones share the session slot, so the dispatcher and the shutdown path
/// can both reach the same child. The Idle->Active transition happens
/// under the slot lock.
#[derive(Debug, Clone)]
pub struct SessionController {
    slot: Arc<Mutex<Option<Session>>>,
    capture_program: String,
    inject_program: String,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        SessionController {
            slot: Arc::new(Mutex::new(None)),
            capture_program: "airodump-ng".to_string(),
            inject_program: "aireplay-ng".to_string(),
        }
    }

    /// Substitutes the external programs. Used by tests to supervise
    /// innocuous children instead of the real tools.
    pub fn with_programs(capture: &str, inject: &str) -> Self {
        SessionController {
            slot: Arc::new(Mutex::new(None)),
            capture_program: capture.to_string(),
            inject_program: inject.to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }

    /// Starts a background capture against one access point. The caller is
    /// responsible for having put the interface into monitor mode first.
    pub fn start_capture(&self, interface: &str, bssid: &str, channel: &str) -> String {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            return "A session is already active. Stop it first with 'capture stop'.".to_string();
        }

        let prefix = capture_prefix(bssid);
        let spawned = Command::new(&self.capture_program)
            .args(["-c", channel, "--bssid", bssid, "-w", prefix.as_str(), interface])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                info!(
                    "capture started on {} (pid {}), writing {}",
                    interface,
                    child.id(),
                    prefix
                );
                *slot = Some(Session {
                    child,
                    kind: SessionKind::Capture,
                    target_file: Some(prefix.clone()),
                    interface: interface.to_string(),
                    started: SystemTime::now(),
                });
                format!(
                    "Capture started on {} for {} (channel {}). Output file prefix: {}",
                    interface, bssid, channel, prefix
                )
            }
            Err(e) => spawn_failure(&self.capture_program, e),
        }
    }

    /// Runs a deauthentication burst and blocks until the child exits or
    /// the session is terminated out from under us (interrupt path).
    /// `count` of zero means an unbounded run.
    pub fn start_attack(&self, interface: &str, bssid: &str, client: &str, count: u32) -> String {
        let client = if client.eq_ignore_ascii_case(BROADCAST_SENTINEL) {
            BROADCAST_MAC
        } else {
            client
        };

        {
            let mut slot = self.slot.lock().unwrap();
            if slot.is_some() {
                return "A session is already active. Stop it first with 'capture stop'."
                    .to_string();
            }

            let count_arg = count.to_string();
            let spawned = Command::new(&self.inject_program)
                .args([
                    "--deauth",
                    count_arg.as_str(),
                    "-a",
                    bssid,
                    "-c",
                    client,
                    interface,
                ])
                .spawn();

            match spawned {
                Ok(child) => {
                    info!("deauth attack started on {} (pid {})", interface, child.id());
                    *slot = Some(Session {
                        child,
                        kind: SessionKind::Attack,
                        target_file: None,
                        interface: interface.to_string(),
                        started: SystemTime::now(),
                    });
                }
                Err(e) => return spawn_failure(&self.inject_program, e),
            }
        }

        self.wait_foreground("Deauth attack finished.")
    }

    /// Foreground network survey on the interface; output streams to the
    /// terminal until the child exits or is interrupted.
    pub fn run_scan(&self, interface: &str) -> String {
        {
            let mut slot = self.slot.lock().unwrap();
            if slot.is_some() {
                return "A session is already active. Stop it first with 'capture stop'."
                    .to_string();
            }

            let spawned = Command::new(&self.capture_program).arg(interface).spawn();
            match spawned {
                Ok(child) => {
                    info!("network scan started on {} (pid {})", interface, child.id());
                    *slot = Some(Session {
                        child,
                        kind: SessionKind::Capture,
                        target_file: None,
                        interface: interface.to_string(),
                        started: SystemTime::now(),
                    });
                }
                Err(e) => return spawn_failure(&self.capture_program, e),
            }
        }

        self.wait_foreground("Scan finished.")
    }

    /// Stops the tracked background capture. A no-op status from Idle.
    /// Attack sessions are foreground-only and don't stop on demand.
    pub fn stop(&self) -> String {
        let mut slot = self.slot.lock().unwrap();
        if matches!(slot.as_ref(), Some(s) if s.kind == SessionKind::Attack) {
            return "Attack sessions run in the foreground; interrupt with Ctrl+C.".to_string();
        }
        match slot.take() {
            Some(mut session) => {
                if session.child.kill().is_err() {
                    debug!("capture child had already exited");
                }
                let _ = session.child.wait();
                match session.target_file {
                    Some(prefix) => format!(
                        "Capture stopped. Output saved under prefix {} (look for {}-01.cap)",
                        prefix, prefix
                    ),
                    None => "Session stopped.".to_string(),
                }
            }
            None => "No active session.".to_string(),
        }
    }

    /// Unconditional kill-and-clear used by the shutdown path. Must never
    /// fail; a dead child is already what we want.
    pub fn terminate_active(&self) {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut session) = slot.take() {
            warn!(
                "terminating active {:?} session on {}",
                session.kind, session.interface
            );
            let _ = session.child.kill();
            let _ = session.child.wait();
        }
    }

    /// Blocks until the tracked child exits or the slot is emptied by a
    /// concurrent `terminate_active`. The lock is only held briefly per
    /// poll so the shutdown path can always get in.
    fn wait_foreground(&self, done_message: &str) -> String {
        loop {
            {
                let mut slot = self.slot.lock().unwrap();
                let status = match slot.as_mut() {
                    Some(session) => session.child.try_wait(),
                    // Terminated out from under us by stop() or the
                    // interrupt path.
                    None => return "Session stopped by user.".to_string(),
                };
                match status {
                    Ok(Some(code)) => {
                        debug!("foreground child exited with {}", code);
                        *slot = None;
                        return done_message.to_string();
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("lost track of foreground child: {}", e);
                        *slot = None;
                        return format!("Session ended unexpectedly: {}", e);
                    }
                }
            }
            std::thread::sleep(WAIT_POLL);
        }
    }
}

/// Deterministic output-file prefix for a capture against one target.
pub fn capture_prefix(bssid: &str) -> String {
    format!("capture-{}", bssid.replace(':', "").to_lowercase())
}

fn spawn_failure(program: &str, e: std::io::Error) -> String {
    if e.kind() == std::io::ErrorKind::NotFound {
        format!(
            "Error: Command '{}' not found. Make sure it's installed.",
            program
        )
    } else {
        format!("Error executing {}: {}", program, e)
    }
}
