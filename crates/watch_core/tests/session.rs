use watch_core::{Credentials, Session};

fn init_logging() {
    watch_logging::initialize_for_tests();
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    init_logging();
    let creds = Credentials::new("alice", "hunter2");
    let session = Session::new("sessionid=abc123");
    assert!(!format!("{creds:?}").contains("hunter2"));
    assert!(!format!("{session:?}").contains("abc123"));
}

#[test]
fn credentials_need_both_username_and_password() {
    init_logging();
    assert!(Credentials::new("alice", "hunter2").is_complete());
    assert!(!Credentials::new("alice", "").is_complete());
    assert!(!Credentials::new("  ", "hunter2").is_complete());
}

#[test]
fn blank_session_is_empty() {
    init_logging();
    assert!(Session::new(" ").is_empty());
    assert!(!Session::new("sessionid=1").is_empty());
}
