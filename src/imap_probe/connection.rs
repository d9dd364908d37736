use std::fmt::Debug;
use std::io::ErrorKind;

use async_imap::error::Error as ImapError;
use async_imap::Client;
use futures::{AsyncRead, AsyncWrite};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{timeout, Duration};
use tokio_native_tls::TlsStream;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::imap_probe::{ConnectionRequest, SessionSignal};
use crate::settings::ProbeConfig;

enum Transport {
    Plain(TcpStream),
    Tls(TlsStream<TcpStream>),
}

// Wrap an established TCP stream in implicit TLS
async fn start_tls(
    host: &str,
    tcp_stream: TcpStream,
    accept_invalid_certs: bool,
) -> Result<TlsStream<TcpStream>, String> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(accept_invalid_certs)
        .danger_accept_invalid_hostnames(accept_invalid_certs)
        .build()
        .map_err(|e| format!("TLS setup failed: {}", e))?;
    let tls = tokio_native_tls::TlsConnector::from(connector);
    tls.connect(host, tcp_stream)
        .await
        .map_err(|e| handshake_failure(&e))
}

/// Describe a failed handshake. A peer that drops the connection mid-way is
/// reported as a reset rather than as a certificate problem.
pub(crate) fn handshake_failure(error: &(dyn std::error::Error + 'static)) -> String {
    let mut cause = Some(error);
    while let Some(current) = cause {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::UnexpectedEof
            ) {
                return format!("Connection reset during handshake: {}", io);
            }
        }
        cause = current.source();
    }
    format!("TLS handshake failed: {}", error)
}

// Establish the transport to the IMAP server, TLS-encrypted when requested
async fn connect_to_server(
    request: &ConnectionRequest,
    accept_invalid_certs: bool,
) -> Result<Transport, String> {
    let imap_addr = (request.host.as_str(), request.port);
    let tcp_stream = TcpStream::connect(imap_addr)
        .await
        .map_err(|e| e.to_string())?;

    let transport = if request.tls {
        Transport::Tls(start_tls(&request.host, tcp_stream, accept_invalid_certs).await?)
    } else {
        Transport::Plain(tcp_stream)
    };

    info!("-- connected to {}:{}", request.host, request.port);
    Ok(transport)
}

fn signal_for(error: ImapError) -> SessionSignal {
    match error {
        ImapError::ConnectionLost => SessionSignal::Ended,
        ImapError::Io(ref io) if io.kind() == ErrorKind::UnexpectedEof => SessionSignal::Ended,
        other => SessionSignal::Failed(other.to_string()),
    }
}

// Login, then open the folder read-only and report its size
async fn open_mailbox<T>(
    stream: T,
    request: &ConnectionRequest,
    command_timeout: Duration,
    signals: &UnboundedSender<SessionSignal>,
) -> SessionSignal
where
    T: AsyncRead + AsyncWrite + Unpin + Debug + Send,
{
    let client = Client::new(stream);

    let login = timeout(
        command_timeout,
        client.login(&request.username, &request.password),
    )
    .await;
    let mut imap_session = match login {
        Ok(Ok(session)) => session,
        Ok(Err((e, _client))) => return signal_for(e),
        Err(_) => return SessionSignal::Failed("Timed out while authenticating".to_string()),
    };
    info!("-- logged in as {}", request.username);

    if signals.send(SessionSignal::Ready).is_err() {
        return SessionSignal::Ended;
    }

    match timeout(command_timeout, imap_session.examine(&request.folder)).await {
        Ok(Ok(mailbox)) => {
            info!("-- {} examined", request.folder);
            SessionSignal::Opened {
                total_messages: mailbox.exists,
            }
        }
        Ok(Err(e)) => signal_for(e),
        Err(_) => SessionSignal::Failed("Timed out while opening the mailbox".to_string()),
    }
}

/// Drive one probe session, reporting lifecycle signals on `signals`.
///
/// The session is dropped, closing the connection, as soon as the
/// terminal signal has been sent.
pub async fn drive_session(
    request: ConnectionRequest,
    config: ProbeConfig,
    signals: UnboundedSender<SessionSignal>,
) {
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let command_timeout = Duration::from_secs(config.auth_timeout_secs);

    let terminal = match timeout(
        connect_timeout,
        connect_to_server(&request, config.accept_invalid_certs),
    )
    .await
    {
        Ok(Ok(Transport::Plain(stream))) => {
            open_mailbox(stream.compat(), &request, command_timeout, &signals).await
        }
        Ok(Ok(Transport::Tls(stream))) => {
            open_mailbox(stream.compat(), &request, command_timeout, &signals).await
        }
        Ok(Err(description)) => SessionSignal::Failed(description),
        Err(_) => SessionSignal::Failed("Timed out while connecting to the server".to_string()),
    };

    if signals.send(terminal).is_err() {
        debug!("Probe already settled, dropping late signal");
    }
}
