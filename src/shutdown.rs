use std::process;

use log::info;

use crate::interface::InterfaceProbe;
use crate::mode::ModeController;
use crate::session::SessionController;

/// Runs the ordered interrupt cleanup: kill the tracked session, return
/// every monitor-mode interface to managed mode, say goodbye, exit.
///
/// Installed once via the ctrlc handler, which runs on its own thread, so
/// it can always reach the session slot even while the command loop is
/// blocked on a foreground child.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sessions: SessionController,
    modes: ModeController,
    probe: InterfaceProbe,
}

impl ShutdownCoordinator {
    pub fn new(sessions: SessionController, modes: ModeController, probe: InterfaceProbe) -> Self {
        ShutdownCoordinator {
            sessions,
            modes,
            probe,
        }
    }

    /// Steps 1 and 2 of the shutdown sequence. Both components swallow
    /// their own failures internally, so this always runs to completion.
    pub fn cleanup(&self) {
        self.sessions.terminate_active();
        self.modes.restore_all(&self.probe);
    }

    pub fn run(&self) -> ! {
        info!("interrupt received, cleaning up");
        self.cleanup();
        println!("\nInterfaces restored. Goodbye!");
        process::exit(0);
    }

    pub fn install(self) {
        ctrlc::set_handler(move || self.run()).expect("failed to register interrupt handler");
    }
}
