//! HTTP callback server for UPnP NOTIFY requests
//!
//! Zone players deliver events by POSTing (well, NOTIFYing) a propertyset to
//! the callback URL given at subscription time. The server runs on its own
//! thread with a single-threaded tokio runtime so the rest of the process can
//! stay blocking. Bodies are routed by SID to registered handlers.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use warp::http::StatusCode;
use warp::Filter;

use crate::error::{ControlError, Result};
use crate::events::{parse_event_body, EventVariables};
use crate::soap::DEVICE_PORT;

/// Callback invoked with the variables of every event of one subscription
pub type EventHandler = Arc<dyn Fn(EventVariables) + Send + Sync>;

/// Bodies kept for SIDs that are not registered yet
const MAX_PENDING_EVENTS: usize = 64;

#[derive(Default)]
struct RouterState {
    handlers: HashMap<String, EventHandler>,
    pending: VecDeque<(String, String)>,
}

/// Routes NOTIFY bodies to handlers by subscription ID
///
/// A device sends the initial event of a subscription right after answering
/// the SUBSCRIBE request, which can be before the caller had a chance to
/// register the SID. Such bodies are held and replayed on `register`.
#[derive(Default)]
pub struct EventRouter {
    state: Mutex<RouterState>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler and replay anything already received for `sid`
    pub fn register(&self, sid: String, handler: EventHandler) {
        let mut state = self.state.lock();

        let mut replay = Vec::new();
        state.pending.retain(|(pending_sid, body)| {
            if *pending_sid == sid {
                replay.push(body.clone());
                false
            } else {
                true
            }
        });

        for body in replay {
            dispatch(&sid, &handler, &body);
        }
        state.handlers.insert(sid, handler);
    }

    pub fn unregister(&self, sid: &str) {
        self.state.lock().handlers.remove(sid);
    }

    /// Deliver a body to its handler; returns false when it was held instead
    pub fn route_event(&self, sid: &str, body: String) -> bool {
        let mut state = self.state.lock();

        if let Some(handler) = state.handlers.get(sid) {
            dispatch(sid, handler, &body);
            return true;
        }

        if state.pending.len() >= MAX_PENDING_EVENTS {
            if let Some((dropped, _)) = state.pending.pop_front() {
                tracing::debug!(sid = %dropped, "dropping unclaimed event");
            }
        }
        state.pending.push_back((sid.to_string(), body));
        false
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }
}

fn dispatch(sid: &str, handler: &EventHandler, body: &str) {
    match parse_event_body(body) {
        Ok(variables) => handler(variables),
        Err(e) => tracing::debug!(sid, error = %e, "dropping malformed event"),
    }
}

/// Running NOTIFY endpoint
pub struct NotifyServer {
    base_url: String,
    router: Arc<EventRouter>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl NotifyServer {
    /// Bind the first free port of `port_range` and start serving
    ///
    /// `route_probe` is the address of any zone player; the callback URL
    /// advertises the local address that routes to it.
    pub fn start(port_range: (u16, u16), route_probe: &str) -> Result<Self> {
        let port = find_available_port(port_range.0, port_range.1).ok_or_else(|| {
            ControlError::CallbackServer(format!(
                "No available port found in range {}-{}",
                port_range.0, port_range.1
            ))
        })?;

        let local_ip = detect_local_ip(route_probe).ok_or_else(|| {
            ControlError::CallbackServer("Failed to detect local IP address".to_string())
        })?;

        let router = Arc::new(EventRouter::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<std::result::Result<SocketAddr, String>>();

        let server_router = Arc::clone(&router);
        let thread = std::thread::Builder::new()
            .name("notify-server".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let routes = notify_route(server_router).recover(handle_rejection);
                    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
                    let bound = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async move {
                        let _ = shutdown_rx.await;
                    });

                    match bound {
                        Ok((addr, server)) => {
                            let _ = ready_tx.send(Ok(addr));
                            server.await;
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e.to_string()));
                        }
                    }
                });
            })
            .map_err(|e| ControlError::CallbackServer(e.to_string()))?;

        let addr = ready_rx
            .recv()
            .map_err(|_| ControlError::CallbackServer("Server thread exited during startup".to_string()))?
            .map_err(ControlError::CallbackServer)?;

        let base_url = format!("http://{}:{}", local_ip, port);
        tracing::info!(%addr, callback_url = %base_url, "NOTIFY server listening");

        Ok(Self {
            base_url,
            router,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Callback URL to hand to devices in SUBSCRIBE requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }
}

impl Drop for NotifyServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn notify_route(
    router: Arc<EventRouter>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::method()
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("nt"))
        .and(warp::header::optional::<String>("nts"))
        .and(warp::body::bytes())
        .and_then(
            move |method: warp::http::Method,
                  sid: Option<String>,
                  nt: Option<String>,
                  nts: Option<String>,
                  body: bytes::Bytes| {
                let router = Arc::clone(&router);
                async move {
                    if method.as_str() != "NOTIFY" {
                        return Err(warp::reject::not_found());
                    }

                    let sid = validate_upnp_headers(sid, nt.as_deref(), nts.as_deref())
                        .ok_or_else(|| warp::reject::custom(InvalidUpnpHeaders))?;

                    let body = String::from_utf8_lossy(&body).into_owned();
                    tracing::trace!(sid = %sid, bytes = body.len(), "NOTIFY received");
                    if !router.route_event(&sid, body) {
                        tracing::debug!(sid = %sid, "holding event for unregistered subscription");
                    }

                    Ok::<_, warp::Rejection>(warp::reply::with_status("", StatusCode::OK))
                }
            },
        )
}

/// SID is required; NT and NTS must carry the GENA values when both present
fn validate_upnp_headers(sid: Option<String>, nt: Option<&str>, nts: Option<&str>) -> Option<String> {
    let sid = sid?;
    if let (Some(nt), Some(nts)) = (nt, nts) {
        if nt != "upnp:event" || nts != "upnp:propchange" {
            return None;
        }
    }
    Some(sid)
}

#[derive(Debug)]
struct InvalidUpnpHeaders;

impl warp::reject::Reject for InvalidUpnpHeaders {}

async fn handle_rejection(err: warp::Rejection) -> std::result::Result<impl warp::Reply, std::convert::Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<InvalidUpnpHeaders>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid UPnP headers")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message, code))
}

fn find_available_port(start: u16, end: u16) -> Option<u16> {
    (start..=end).find(|&port| TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).is_ok())
}

/// Local address of the interface that routes to `probe`; nothing is sent
fn detect_local_ip(probe: &str) -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect((probe, DEVICE_PORT)).ok()?;
    Some(socket.local_addr().ok()?.ip())
}
