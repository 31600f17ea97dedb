//! Local HTTP callback listener for OAuth redirects.
//!
//! The listener owns one loopback socket for the duration of a single
//! authorization attempt. The first request to the redirect path decides the
//! outcome; it is handed to the waiting flow over a oneshot channel. Later
//! requests still get the acknowledgment page but change nothing.
//!
//! Each connection is served on its own task, so a browser's idle
//! preconnect cannot hold up the real redirect. A `localhost` redirect is
//! served on both `127.0.0.1` and `[::1]` when the host has IPv6 loopback.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AuthError;
use crate::state::AuthorizationState;

/// Upper bound on reading one request from a connected browser.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest request head we are willing to buffer.
const MAX_REQUEST_BYTES: usize = 8 * 1024;

const ACK_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Received</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Authorization received</h1>
<p>You may close this window and return to the terminal.</p>
</body>
</html>"#;

const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Not Found</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Not found</h1>
</body>
</html>"#;

/// What the authoritative callback request carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// State matched and an authorization code was present.
    Code(String),
    /// The provider redirected back with an `error` parameter.
    Denied {
        error: String,
        description: Option<String>,
    },
    /// The `state` parameter was missing or did not match this session.
    StateMismatch,
    /// State matched but there was no `code`.
    MissingCode,
}

impl CallbackOutcome {
    /// Convert a rejection into the session error; pass a code through.
    pub fn into_code(self) -> Result<String, AuthError> {
        match self {
            Self::Code(code) => Ok(code),
            Self::Denied { error, description } => {
                Err(AuthError::AuthorizationDenied { error, description })
            }
            Self::StateMismatch => Err(AuthError::StateMismatch),
            Self::MissingCode => Err(AuthError::MissingCode),
        }
    }
}

/// Starts loopback listeners for a redirect URI.
pub struct CallbackListener;

impl CallbackListener {
    /// Bind the host and port of `redirect_uri` and start serving callbacks.
    ///
    /// Port `0` binds an ephemeral port; [`CallbackHandle::redirect_uri`]
    /// reports the address actually in use. Cancelling `shutdown` (or a parent
    /// of it) stops the accept loop and releases the socket.
    pub async fn start(
        redirect_uri: &str,
        expected_state: AuthorizationState,
        shutdown: CancellationToken,
    ) -> Result<CallbackHandle, AuthError> {
        let mut uri = Url::parse(redirect_uri)
            .map_err(|e| AuthError::ConfigMissing(format!("valid redirect URI ({e})")))?;
        let addr = loopback_addr(&uri)?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| AuthError::ListenerBind {
                addr: addr.to_string(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| AuthError::ListenerBind {
                addr: addr.to_string(),
                source,
            })?
            .port();

        if uri.port_or_known_default() != Some(port) {
            uri.set_port(Some(port))
                .map_err(|_| AuthError::ConfigMissing("redirect URI with a port".to_string()))?;
        }

        // Same port on the other loopback family, if the host offers it.
        let companion = match companion_addr(&uri, port) {
            Some(extra) => match TcpListener::bind(extra).await {
                Ok(listener) => Some(listener),
                Err(e) => {
                    debug!(addr = %extra, "Not listening on companion address: {}", e);
                    None
                }
            },
            None => None,
        };

        info!(%addr, port, "Listening for OAuth callback on {}", uri);

        let (tx, rx) = oneshot::channel();
        let route = Route {
            path: uri.path().into(),
            expected_state: Arc::new(expected_state),
        };
        let task = tokio::spawn(serve(listener, companion, route, tx, shutdown.clone()));

        Ok(CallbackHandle {
            result: rx,
            shutdown,
            task: Some(task),
            redirect_uri: uri.to_string(),
            port,
        })
    }
}

/// Handle to a running callback listener.
///
/// Dropping the handle cancels the listener; [`CallbackHandle::close`] also
/// waits until the socket is released.
pub struct CallbackHandle {
    result: oneshot::Receiver<CallbackOutcome>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
    redirect_uri: String,
    port: u16,
}

impl CallbackHandle {
    /// Get the port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI to send to the authorization endpoint.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the authoritative callback.
    ///
    /// Must be awaited at most once to completion.
    pub async fn recv(&mut self) -> Result<CallbackOutcome, AuthError> {
        (&mut self.result).await.map_err(|_| {
            AuthError::Listener(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "listener stopped without a callback",
            ))
        })
    }

    /// Stop the listener and wait for the socket to be released.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Callback listener task ended abnormally: {}", e);
            }
        }
        debug!(port = self.port, "Callback listener closed");
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn loopback_addr(uri: &Url) -> Result<SocketAddr, AuthError> {
    let port = uri
        .port_or_known_default()
        .ok_or_else(|| AuthError::ConfigMissing("redirect URI with a port".to_string()))?;
    let ip = match uri.host() {
        Some(url::Host::Domain(d)) if d.eq_ignore_ascii_case("localhost") => {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        Some(url::Host::Ipv4(ip)) if ip.is_loopback() => IpAddr::V4(ip),
        Some(url::Host::Ipv6(ip)) if ip.is_loopback() => IpAddr::V6(ip),
        _ => {
            return Err(AuthError::ConfigMissing(
                "loopback redirect URI host".to_string(),
            ))
        }
    };
    Ok(SocketAddr::new(ip, port))
}

/// IPv6 loopback for a `localhost` redirect; `localhost` itself binds IPv4.
fn companion_addr(uri: &Url, port: u16) -> Option<SocketAddr> {
    match uri.host() {
        Some(url::Host::Domain(d)) if d.eq_ignore_ascii_case("localhost") => {
            Some(SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), port))
        }
        _ => None,
    }
}

/// What a connection must match to count as the callback.
#[derive(Clone)]
struct Route {
    path: Arc<str>,
    expected_state: Arc<AuthorizationState>,
}

async fn accept(
    primary: &TcpListener,
    companion: Option<&TcpListener>,
) -> std::io::Result<(TcpStream, SocketAddr)> {
    match companion {
        Some(companion) => tokio::select! {
            accepted = primary.accept() => accepted,
            accepted = companion.accept() => accepted,
        },
        None => primary.accept().await,
    }
}

async fn serve(
    listener: TcpListener,
    companion: Option<TcpListener>,
    route: Route,
    tx: oneshot::Sender<CallbackOutcome>,
    shutdown: CancellationToken,
) {
    let mut tx = Some(tx);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = accept(&listener, companion.as_ref()) => match accepted {
                Ok((stream, peer)) => {
                    connections.spawn(serve_connection(stream, peer, route.clone()));
                }
                Err(e) => {
                    warn!("Callback listener accept failed: {}", e);
                    break;
                }
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                let Ok(Some(outcome)) = joined else { continue };
                match tx.take() {
                    Some(tx) => {
                        debug!(?outcome, "Authoritative callback received");
                        let _ = tx.send(outcome);
                    }
                    None => debug!("Ignoring callback after the first one"),
                }
            }
        }
    }

    connections.shutdown().await;
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    route: Route,
) -> Option<CallbackOutcome> {
    let handled = tokio::time::timeout(
        READ_TIMEOUT,
        handle_connection(stream, &route.path, &route.expected_state),
    )
    .await;

    match handled {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            debug!(%peer, "Callback connection error: {}", e);
            None
        }
        Err(_) => {
            debug!(%peer, "Callback connection timed out");
            None
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    path: &str,
    expected_state: &AuthorizationState,
) -> std::io::Result<Option<CallbackOutcome>> {
    let head = read_request_head(&mut stream).await?;

    let outcome = parse_request_line(&head).and_then(|(method, target)| {
        let (req_path, query) = target.split_once('?').unwrap_or((target, ""));
        (method == "GET" && req_path == path).then(|| classify(query, expected_state))
    });

    let response = match outcome {
        Some(_) => http_response("200 OK", ACK_PAGE),
        None => http_response("404 Not Found", NOT_FOUND_PAGE),
    };
    stream.write_all(response.as_bytes()).await?;
    let _ = stream.shutdown().await;

    Ok(outcome)
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_BYTES {
            break;
        }
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    // GET /callback?code=xxx&state=yyy HTTP/1.1
    let mut parts = head.lines().next()?.split_whitespace();
    Some((parts.next()?, parts.next()?))
}

fn classify(query: &str, expected_state: &AuthorizationState) -> CallbackOutcome {
    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return CallbackOutcome::Denied { error, description };
    }
    match state {
        Some(s) if expected_state.matches(&s) => match code {
            Some(code) if !code.is_empty() => CallbackOutcome::Code(code),
            _ => CallbackOutcome::MissingCode,
        },
        _ => CallbackOutcome::StateMismatch,
    }
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}
