// Session lifecycle tests. The external capture/injection tools are stood
// in for by a generated shell script that records its arguments and then
// sleeps, so the controller supervises a real child process.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use airctl::session::{capture_prefix, SessionController};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("airctl-test-{}-{}", std::process::id(), name))
}

/// Writes an executable script that logs "$@" to `args_log` and sleeps.
fn fake_tool(name: &str, args_log: &PathBuf) -> PathBuf {
    let path = scratch_path(name);
    fs::write(
        &path,
        format!("#!/bin/sh\necho \"$@\" > {}\nexec sleep 30\n", args_log.display()),
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn wait_for_file(path: &PathBuf) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(contents) = fs::read_to_string(path) {
            if !contents.is_empty() {
                return contents;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    panic!("child never wrote {}", path.display());
}

#[test]
fn second_capture_start_is_rejected_and_first_stays_tracked() {
    let log = scratch_path("cap1.args");
    let tool = fake_tool("cap1.sh", &log);
    let sessions = SessionController::with_programs(tool.to_str().unwrap(), "true");

    let first = sessions.start_capture("wlan0mon", "AA:BB:CC:DD:EE:FF", "6");
    assert!(first.contains(&capture_prefix("AA:BB:CC:DD:EE:FF")));
    wait_for_file(&log);

    let second = sessions.start_capture("wlan0mon", "11:22:33:44:55:66", "1");
    assert!(second.contains("already active"));

    // Stopping reports the first session's file, not the second's.
    let stopped = sessions.stop();
    assert!(stopped.contains(&capture_prefix("AA:BB:CC:DD:EE:FF")));
    assert!(!stopped.contains(&capture_prefix("11:22:33:44:55:66")));
    assert!(!sessions.is_active());

    let _ = fs::remove_file(log);
    let _ = fs::remove_file(tool);
}

#[test]
fn stop_from_idle_is_a_non_fatal_status() {
    let sessions = SessionController::with_programs("true", "true");
    assert_eq!(sessions.stop(), "No active session.");
}

#[test]
fn attack_translates_broadcast_sentinel_and_stops_on_terminate() {
    let log = scratch_path("atk.args");
    let tool = fake_tool("atk.sh", &log);
    let sessions = SessionController::with_programs("true", tool.to_str().unwrap());

    let worker = {
        let sessions = sessions.clone();
        std::thread::spawn(move || {
            sessions.start_attack("wlan0mon", "AA:BB:CC:DD:EE:FF", "broadcast", 0)
        })
    };

    let args = wait_for_file(&log);
    assert!(args.contains("FF:FF:FF:FF:FF:FF"));
    assert!(!args.contains("broadcast"));
    assert!(args.contains("--deauth 0"));

    // Interrupt path: the shutdown thread empties the slot under the
    // blocking caller.
    sessions.terminate_active();
    let result = worker.join().unwrap();
    assert!(result.contains("stopped by user"));
    assert!(!sessions.is_active());

    let _ = fs::remove_file(log);
    let _ = fs::remove_file(tool);
}

#[test]
fn attack_rejects_when_a_session_is_active() {
    let log = scratch_path("cap2.args");
    let tool = fake_tool("cap2.sh", &log);
    let sessions = SessionController::with_programs(tool.to_str().unwrap(), tool.to_str().unwrap());

    sessions.start_capture("wlan0mon", "AA:BB:CC:DD:EE:FF", "6");
    wait_for_file(&log);

    let rejected = sessions.start_attack("wlan0mon", "11:22:33:44:55:66", "broadcast", 5);
    assert!(rejected.contains("already active"));
    assert!(sessions.is_active());

    sessions.terminate_active();
    let _ = fs::remove_file(log);
    let _ = fs::remove_file(tool);
}

#[test]
fn missing_tool_reports_and_leaves_the_slot_idle() {
    let sessions = SessionController::with_programs("/nonexistent/airodump-ng", "true");
    let result = sessions.start_capture("wlan0mon", "AA:BB:CC:DD:EE:FF", "6");
    assert!(result.contains("not found"));
    assert!(!sessions.is_active());
}

#[test]
fn foreground_wait_returns_when_the_child_exits_on_its_own() {
    // "true" exits immediately; the blocking call should come back with a
    // normal completion, not hang.
    let sessions = SessionController::with_programs("true", "true");
    let result = sessions.start_attack("wlan0mon", "AA:BB:CC:DD:EE:FF", "broadcast", 3);
    assert!(result.contains("finished"));
    assert!(!sessions.is_active());
}

#[test]
fn capture_prefix_is_deterministic() {
    assert_eq!(
        capture_prefix("AA:BB:CC:DD:EE:FF"),
        "capture-aabbccddeeff"
    );
}
