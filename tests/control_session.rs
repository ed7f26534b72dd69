//! End-to-end coverage of `ControlSession` against a fake `tmux`-shaped
//! child process (never the real binary), exercising the reader-thread /
//! request-queue interaction the unit tests in `src/` can't reach.

use std::path::PathBuf;
use std::time::Duration;

use tmux_control::{ControlSession, SessionConfig, UiEvent};

fn fake_tmux_path() -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures/fake_tmux.sh");
    path.to_str().unwrap().to_string()
}

#[test]
fn new_session_delivers_pane_created_event() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SessionConfig::new("test-session").with_tmux_binary(fake_tmux_path());
    let (mut session, rx) = ControlSession::new(config);

    session
        .new_session(None, None, "my-marker")
        .expect("spawning the fake tmux script should succeed");
    assert!(session.is_bound());

    let event = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("expected a UiEvent before the timeout");
    match event {
        UiEvent::PaneCreated { pane_id, marker } => {
            assert_eq!(pane_id, "%0");
            assert_eq!(marker, "stub-marker");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn unbound_session_reports_no_connection() {
    let config = SessionConfig::new("unused").with_tmux_binary(fake_tmux_path());
    let (mut session, _rx) = ControlSession::new(config);
    assert!(session.toggle_zoom(&"%0".to_string()).is_err());
}
