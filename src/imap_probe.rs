pub mod classifier;
pub mod connection;

use std::fmt;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::imap_probe::classifier::classify;
use crate::settings::ProbeConfig;

pub const DEFAULT_FOLDER: &str = "INBOX";
pub const ENDED_UNEXPECTEDLY: &str = "Connection ended unexpectedly.";

/// One mailbox reachability check. Built per request, never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub username: String,
    pub password: String,
    pub folder: String,
}

impl fmt::Debug for ConnectionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"******")
            .field("folder", &self.folder)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Success { message: String, total_messages: u32 },
    Failure { reason: String },
}

/// Lifecycle events reported by a running session.
#[derive(Debug)]
pub enum SessionSignal {
    /// Authenticated; the mailbox is being opened.
    Ready,
    Opened { total_messages: u32 },
    Failed(String),
    /// The server went away before anything conclusive happened.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Connecting,
    OpeningMailbox,
    Closed,
}

/// Settles a probe exactly once. Whatever terminal signal arrives first
/// decides the outcome; later signals are dropped.
#[derive(Debug)]
pub struct OutcomeLatch {
    folder: String,
    state: ProbeState,
    outcome: Option<ConnectionOutcome>,
}

impl OutcomeLatch {
    pub fn new(folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            state: ProbeState::Connecting,
            outcome: None,
        }
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    /// Feed one signal; returns true once the outcome is settled.
    pub fn observe(&mut self, signal: SessionSignal) -> bool {
        if self.is_settled() {
            debug!("Ignoring {:?}, probe already settled", signal);
            return true;
        }

        let outcome = match signal {
            SessionSignal::Ready => {
                self.transition(ProbeState::OpeningMailbox);
                return false;
            }
            SessionSignal::Opened { total_messages } => ConnectionOutcome::Success {
                message: format!(
                    "Successfully connected and opened \"{}\" ({} message(s) found).",
                    self.folder, total_messages
                ),
                total_messages,
            },
            SessionSignal::Failed(description) => {
                warn!("Probe failed in state {:?}: {}", self.state, description);
                ConnectionOutcome::Failure {
                    reason: classify(&description),
                }
            }
            SessionSignal::Ended => {
                warn!("Probe session ended in state {:?}", self.state);
                ConnectionOutcome::Failure {
                    reason: ENDED_UNEXPECTEDLY.to_string(),
                }
            }
        };

        self.transition(ProbeState::Closed);
        self.outcome = Some(outcome);
        true
    }

    pub fn into_outcome(self) -> ConnectionOutcome {
        self.outcome.unwrap_or_else(|| ConnectionOutcome::Failure {
            reason: ENDED_UNEXPECTEDLY.to_string(),
        })
    }

    fn transition(&mut self, next: ProbeState) {
        debug!("Probe state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Run a single connect / login / examine cycle against the mailbox.
///
/// Never fails: every problem becomes a `Failure` outcome. The session is
/// torn down before this returns, on the success path as well.
pub async fn probe(request: &ConnectionRequest, config: &ProbeConfig) -> ConnectionOutcome {
    info!(
        "Probing {}:{} (tls: {}) for folder {}",
        request.host, request.port, request.tls, request.folder
    );

    let (signals, mut receiver) = mpsc::unbounded_channel();
    let session = tokio::spawn(connection::drive_session(
        request.clone(),
        config.clone(),
        signals,
    ));

    let mut latch = OutcomeLatch::new(&request.folder);
    while let Some(signal) = receiver.recv().await {
        if latch.observe(signal) {
            break;
        }
    }
    // The channel closing without a terminal signal means the session died.
    latch.observe(SessionSignal::Ended);

    session.abort();
    if let Err(err) = session.await {
        if err.is_panic() {
            warn!("Probe session task panicked: {}", err);
        }
    }

    let outcome = latch.into_outcome();
    match &outcome {
        ConnectionOutcome::Success { total_messages, .. } => info!(
            "Probe of {}:{} succeeded, {} message(s) in {}",
            request.host, request.port, total_messages, request.folder
        ),
        ConnectionOutcome::Failure { reason } => {
            info!("Probe of {}:{} failed: {}", request.host, request.port, reason)
        }
    }
    outcome
}
