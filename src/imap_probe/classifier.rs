//! Maps raw connection and protocol failure text onto operator guidance.
//!
//! Rules are evaluated in order and the first match wins. Order matters:
//! a TLS failure text can also mention a reset or a timeout.

/// Diagnostic category of a failed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    Tls,
    ConnectionRefused,
    HostNotFound,
    Timeout,
    ConnectionReset,
    MailboxNotFound,
}

impl FailureKind {
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::Authentication => "Authentication failed. Please check your username and password. If using Gmail or Microsoft 365, ensure you are using an App Password, not your regular account password.",
            FailureKind::Tls => "TLS/SSL certificate error. Try toggling the TLS setting or check your host configuration.",
            FailureKind::ConnectionRefused => "Connection refused. The IMAP host rejected the connection. Check the host address and port number.",
            FailureKind::HostNotFound => "Host not found. The IMAP server address could not be resolved. Check for typos in the hostname.",
            FailureKind::Timeout => "Connection timed out. The server did not respond. Check the host, port, and whether your network allows outbound IMAP connections.",
            FailureKind::ConnectionReset => "Connection was reset by the server. This may be a TLS/port mismatch — try changing TLS mode or port.",
            FailureKind::MailboxNotFound => "The specified mailbox folder does not exist. Try \"INBOX\" or check the exact folder name in your email client.",
        }
    }
}

const RULES: &[(FailureKind, &[&str])] = &[
    (
        FailureKind::Authentication,
        &[
            "invalid credentials",
            "authentication failed",
            "authenticationfailed",
            "login failed",
            "bad credentials",
        ],
    ),
    (
        FailureKind::Tls,
        &["self signed", "self-signed", "certificate", "tls", "ssl"],
    ),
    (
        FailureKind::ConnectionRefused,
        &["connection refused", "econnrefused"],
    ),
    (
        FailureKind::HostNotFound,
        &[
            "enotfound",
            "getaddrinfo",
            "failed to lookup address",
            "name or service not known",
            "nodename nor servname",
            "no such host",
        ],
    ),
    (FailureKind::Timeout, &["etimedout", "timed out", "timeout"]),
    (
        FailureKind::ConnectionReset,
        &["econnreset", "connection reset"],
    ),
    (
        FailureKind::MailboxNotFound,
        &[
            "mailbox does not exist",
            "no such mailbox",
            "doesn't exist",
            "nonexistent",
            "unknown mailbox",
        ],
    ),
];

pub fn failure_kind(description: &str) -> Option<FailureKind> {
    let lowered = description.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(kind, _)| *kind)
}

/// Human readable diagnostic for a failure description.
pub fn classify(description: &str) -> String {
    match failure_kind(description) {
        Some(kind) => kind.message().to_string(),
        None => format!("Connection error: {}", description),
    }
}
