use std::io::{self, BufRead, Write};

use airctl::dispatch::{CommandDispatcher, NullAdviser};
use airctl::display::{ConsoleConfirmer, ConsolePresenter};
use airctl::interface::InterfaceProbe;
use airctl::mode::ModeController;
use airctl::session::SessionController;
use airctl::shutdown::ShutdownCoordinator;

#[cfg(unix)]
extern crate libc;

fn check_root_privileges() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

fn main() {
    env_logger::init();

    println!("airctl - wireless interface and capture session controller");
    println!("Type 'help' for commands, 'exit' to leave.");

    if !check_root_privileges() {
        log::warn!("not running as root; mode switches and captures will likely fail");
    }

    let probe = InterfaceProbe::new();
    let modes = ModeController::new();
    let sessions = SessionController::new();

    let coordinator = ShutdownCoordinator::new(sessions.clone(), modes.clone(), probe.clone());
    coordinator.clone().install();

    let mut dispatcher = CommandDispatcher::new(
        probe,
        modes,
        sessions,
        Box::new(ConsolePresenter),
        Box::new(ConsoleConfirmer),
        Box::new(NullAdviser),
    );

    let stdin = io::stdin();
    loop {
        print!("\nairctl> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                airctl::display::display_error(&e.to_string());
                continue;
            }
        }

        let line = line.replace('\r', "");
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !dispatcher.handle(line) {
            break;
        }
    }

    // EOF lands here without passing through the exit command; either way
    // nothing may be left running or in monitor mode.
    coordinator.cleanup();
    println!("Goodbye!");
}
