use crate::imap_probe::classifier::{classify, failure_kind, FailureKind};

#[test]
fn test_authentication_failure_from_server_text() {
    let message = classify("No Response: [AUTHENTICATIONFAILED] Invalid credentials (Failure)");
    assert_eq!(message, FailureKind::Authentication.message());
    assert!(message.contains("App Password"));
}

#[test]
fn test_tls_wins_over_later_rules() {
    // Mentions both TLS and a timeout; TLS is checked first.
    assert_eq!(
        failure_kind("TLS handshake failed: operation timed out"),
        Some(FailureKind::Tls)
    );
    assert_eq!(
        failure_kind("self signed certificate in certificate chain"),
        Some(FailureKind::Tls)
    );
}

#[test]
fn test_os_level_connection_errors() {
    assert_eq!(
        failure_kind("Connection refused (os error 111)"),
        Some(FailureKind::ConnectionRefused)
    );
    assert_eq!(
        failure_kind("failed to lookup address information: Name or service not known"),
        Some(FailureKind::HostNotFound)
    );
    assert_eq!(
        failure_kind("getaddrinfo ENOTFOUND imap.gmial.com"),
        Some(FailureKind::HostNotFound)
    );
    assert_eq!(
        failure_kind("Timed out while connecting to the server"),
        Some(FailureKind::Timeout)
    );
    assert_eq!(
        failure_kind("Connection reset by peer (os error 104)"),
        Some(FailureKind::ConnectionReset)
    );
}

#[test]
fn test_missing_mailbox() {
    assert_eq!(
        failure_kind("No Response: Mailbox does not exist"),
        Some(FailureKind::MailboxNotFound)
    );
    assert_eq!(
        failure_kind("No Response: [NONEXISTENT] Unknown Mailbox: Reports (Failure)"),
        Some(FailureKind::MailboxNotFound)
    );
}

#[test]
fn test_unmatched_text_falls_back_to_raw_description() {
    assert_eq!(failure_kind("server exploded"), None);
    assert_eq!(classify("server exploded"), "Connection error: server exploded");
}

#[test]
fn test_classify_is_stable() {
    let text = "Connection reset by peer (os error 104)";
    assert_eq!(classify(text), classify(text));
}

#[test]
fn test_reset_guidance_wording() {
    assert_eq!(
        classify("read: connection reset by peer"),
        "Connection was reset by the server. This may be a TLS/port mismatch — try changing TLS mode or port."
    );
}
