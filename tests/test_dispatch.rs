// Dispatcher behavior with fake collaborators: confirmation gating before
// implicit mode switches, titled output, and the adviser fallback.

use std::sync::{Arc, Mutex};

use airctl::dispatch::{Advise, CommandDispatcher, Confirm, Present};
use airctl::interface::InterfaceProbe;
use airctl::mode::ModeController;
use airctl::session::SessionController;

#[derive(Clone, Default)]
struct RecordingPresenter {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl Present for RecordingPresenter {
    fn show(&self, text: &str, title: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((text.to_string(), title.to_string()));
    }
}

#[derive(Clone, Default)]
struct RecordingConfirmer {
    questions: Arc<Mutex<Vec<String>>>,
    answer: bool,
}

impl Confirm for RecordingConfirmer {
    fn confirm(&self, question: &str) -> bool {
        self.questions.lock().unwrap().push(question.to_string());
        self.answer
    }
}

struct CannedAdviser;

impl Advise for CannedAdviser {
    fn advise(&self, input: &str, _previous: Option<&str>) -> Option<String> {
        input
            .contains("handshake")
            .then(|| "Capture a handshake with 'capture start', then crack offline.".to_string())
    }
}

fn dispatcher(
    presenter: RecordingPresenter,
    confirmer: RecordingConfirmer,
) -> CommandDispatcher {
    CommandDispatcher::new(
        InterfaceProbe::new(),
        ModeController::new(),
        SessionController::with_programs("true", "true"),
        Box::new(presenter),
        Box::new(confirmer),
        Box::new(CannedAdviser),
    )
}

#[test]
fn missing_parameter_produces_an_error_message_and_nothing_else() {
    let presenter = RecordingPresenter::default();
    let confirmer = RecordingConfirmer::default();
    let mut d = dispatcher(presenter.clone(), confirmer.clone());

    assert!(d.handle("capture start wlan0mon"));

    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "Error: missing parameter");
    // No confirmation prompt, no controller reached.
    assert!(confirmer.questions.lock().unwrap().is_empty());
}

#[test]
fn monitor_mode_is_never_switched_without_assent() {
    let presenter = RecordingPresenter::default();
    let confirmer = RecordingConfirmer::default(); // answers no
    let mut d = dispatcher(presenter.clone(), confirmer.clone());

    // The probe won't find "fake0" on any machine, so the dispatcher must
    // ask before touching modes, and a declined prompt must leave the
    // interface alone.
    assert!(d.handle("attack deauth fake0 AA:BB:CC:DD:EE:FF 11:22:33:44:55:66 3"));

    let questions = confirmer.questions.lock().unwrap();
    assert_eq!(questions.len(), 1);
    assert!(questions[0].contains("fake0"));

    // One command, one titled message: the explanation, the declined-switch
    // note, and the attack result all ride in the same block.
    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "attack");
    assert!(messages[0].0.contains("Performing deauthentication attack"));
    assert!(messages[0].0.contains("without switching modes"));
}

#[test]
fn explanation_leads_the_result_message() {
    let presenter = RecordingPresenter::default();
    let mut d = dispatcher(presenter.clone(), RecordingConfirmer::default());

    assert!(d.handle("interface list"));

    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0]
        .0
        .starts_with("Listing wireless interfaces"));
}

#[test]
fn stop_from_idle_reports_no_active_session() {
    let presenter = RecordingPresenter::default();
    let mut d = dispatcher(presenter.clone(), RecordingConfirmer::default());

    assert!(d.handle("capture stop"));

    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "No active session.");
    assert_eq!(messages[0].1, "capture");
}

#[test]
fn unknown_input_falls_back_to_the_adviser() {
    let presenter = RecordingPresenter::default();
    let mut d = dispatcher(presenter.clone(), RecordingConfirmer::default());

    assert!(d.handle("how do i get a handshake"));

    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages[0].1, "advice");
    assert!(messages[0].0.contains("capture start"));
}

#[test]
fn exit_ends_the_loop() {
    let presenter = RecordingPresenter::default();
    let mut d = dispatcher(presenter.clone(), RecordingConfirmer::default());
    assert!(!d.handle("exit"));
    assert!(!d.handle("quit"));
}

#[test]
fn exit_terminates_the_tracked_session() {
    let sessions = SessionController::with_programs("true", "true");
    let mut d = CommandDispatcher::new(
        InterfaceProbe::new(),
        ModeController::new(),
        sessions.clone(),
        Box::new(RecordingPresenter::default()),
        Box::new(RecordingConfirmer::default()),
        Box::new(CannedAdviser),
    );

    // A declined mode prompt still lets the capture spawn, so the slot is
    // occupied when the operator leaves.
    assert!(d.handle("capture start fake0 AA:BB:CC:DD:EE:FF 6"));
    assert!(sessions.is_active());

    assert!(!d.handle("exit"));
    assert!(!sessions.is_active());
}

#[test]
fn help_is_one_titled_message() {
    let presenter = RecordingPresenter::default();
    let mut d = dispatcher(presenter.clone(), RecordingConfirmer::default());
    assert!(d.handle("help"));

    let messages = presenter.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "commands");
    assert!(messages[0].0.contains("capture start"));
}
