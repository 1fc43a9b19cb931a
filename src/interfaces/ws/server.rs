//! OCPP 1.6 WebSocket server
//!
//! Accepts charge-point connections at `ws://<host>:<port>/ocpp/{id}` (or
//! `/ocpp?id=...`), negotiates the `ocpp1.6` subprotocol and bridges the
//! socket into the router: one reader task feeding `Inbound` events, one
//! writer task draining the frame sink.

use std::net::SocketAddr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::application::transport::{
    ConnectClaim, SinkMessage, TransportEvent, TransportEventSender, TransportKind,
};
use crate::config::AppConfig;
use crate::domain::repositories::{RepositoryProvider, SharedRepositoryProvider};
use crate::infrastructure::crypto::verify_password;
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

/// OCPP WebSocket server: one socket = one charger channel.
pub struct OcppWsServer {
    bind_addr: String,
    auth_mode: String,
    intake: TransportEventSender,
    repos: SharedRepositoryProvider,
    shutdown: ShutdownSignal,
}

impl OcppWsServer {
    pub fn new(
        config: &AppConfig,
        intake: TransportEventSender,
        repos: SharedRepositoryProvider,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            bind_addr: format!("{}:{}", config.server.ws_host, config.server.ws_port),
            auth_mode: config.ws_auth.mode.to_lowercase(),
            intake,
            repos,
            shutdown,
        }
    }

    /// Accept connections until shutdown.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("OCPP 1.6 WebSocket server listening on ws://{}", self.bind_addr);
        info!(
            "   Charge points connect to: ws://{}/ocpp/{{charge_point_id}}",
            self.bind_addr
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                }
                _ = self.shutdown.notified().wait() => {
                    info!("WebSocket server received shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let intake = self.intake.clone();
        let repos = self.repos.clone();
        let auth_mode = self.auth_mode.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_connection(stream, addr, intake, repos, auth_mode, shutdown).await
            {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Extract charge point ID from the request path:
/// `/ocpp/{id}`, `/ocpp?id={id}` or `/{id}`.
pub fn extract_charge_point_id(path_and_query: &str) -> Option<String> {
    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };

    if let Some(query) = query {
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("id=") {
                if !id.is_empty() {
                    return Some(id.to_string());
                }
            }
        }
    }

    let path = path.trim_start_matches('/');
    if let Some(id) = path.strip_prefix("ocpp/") {
        let id = id.trim_start_matches('/');
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }
    if !path.is_empty() && path != "ocpp" && !path.contains('/') {
        return Some(path.to_string());
    }

    None
}

struct HandshakeOutcome {
    charge_point_id: Option<String>,
    basic_credentials: Option<(String, String)>,
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    intake: TransportEventSender,
    repos: SharedRepositoryProvider,
    auth_mode: String,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("New WebSocket connection from {}", addr);

    let mut outcome = HandshakeOutcome {
        charge_point_id: None,
        basic_credentials: None,
    };

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
            let path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("");

            let requested_protocols = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let supports_ocpp16 = requested_protocols
                .split(',')
                .map(|s| s.trim())
                .any(|p| p == OCPP_SUBPROTOCOL);

            if supports_ocpp16 {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
            } else if !requested_protocols.is_empty() {
                warn!(addr = %addr, requested_protocols, "Rejecting handshake: no ocpp1.6 subprotocol");
                let mut reject = ErrorResponse::new(Some("ocpp1.6 subprotocol required".into()));
                *reject.status_mut() = StatusCode::BAD_REQUEST;
                return Err(reject);
            }

            outcome.basic_credentials = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Basic "))
                .and_then(|b64| BASE64.decode(b64).ok())
                .and_then(|raw| String::from_utf8(raw).ok())
                .and_then(|pair| {
                    pair.split_once(':')
                        .map(|(u, p)| (u.to_string(), p.to_string()))
                });

            outcome.charge_point_id = extract_charge_point_id(path);
            Ok(response)
        },
    )
    .await?;

    let Some(charge_point_id) = outcome.charge_point_id else {
        warn!(addr = %addr, "No charge point id in path; closing");
        return Ok(());
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Basic auth (Security Profile 1): verify against the device's derived
    // password. Unauthenticated sockets get one diagnostic frame, then close.
    let mut device_serial = None;
    if auth_mode == "basic" {
        let authenticated = match &outcome.basic_credentials {
            Some((username, password)) => {
                match repos.devices().find_by_serial(username).await {
                    Ok(Some(device)) if device.is_active => {
                        device_serial = Some(device.serial_number.clone());
                        verify_password(&device.master_secret_encrypted, username, password)
                    }
                    _ => false,
                }
            }
            None => false,
        };
        if !authenticated {
            warn!(charge_point_id = charge_point_id.as_str(), "WebSocket Basic auth failed");
            let diagnostic =
                OcppFrame::error_response("auth", "SecurityError", "authentication failed");
            let _ = ws_sender.send(Message::Text(diagnostic.serialize())).await;
            let _ = ws_sender.close().await;
            return Ok(());
        }
    }

    info!("[{}] Connected from {}", charge_point_id, addr);

    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel::<SinkMessage>();
    let channel_identity = sink_tx.clone();

    let connected = TransportEvent::Connected {
        charge_point_id: charge_point_id.clone(),
        kind: TransportKind::WebSocket,
        claim: ConnectClaim {
            device_serial,
            type_code: None,
            remote_addr: Some(addr.to_string()),
        },
        sink: sink_tx,
    };
    if intake.send(connected).await.is_err() {
        return Ok(()); // router gone
    }

    // Writer: serialize frames onto the socket in submission order.
    let cp_id_send = charge_point_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = sink_rx.recv().await {
            match msg {
                SinkMessage::Frame(frame) => {
                    let text = frame.serialize();
                    info!("[{}] -> {}", cp_id_send, text);
                    if let Err(e) = ws_sender.send(Message::Text(text)).await {
                        error!("[{}] Send error: {}", cp_id_send, e);
                        break;
                    }
                }
                SinkMessage::Close => {
                    info!("[{}] Closing channel on request", cp_id_send);
                    let _ = ws_sender.close().await;
                    break;
                }
            }
        }
    });

    // Reader: forward text frames to the router in arrival order.
    let cp_id_recv = charge_point_id.clone();
    let recv_intake = intake.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    info!("[{}] <- {}", cp_id_recv, text);
                    let event = TransportEvent::Inbound {
                        charge_point_id: cp_id_recv.clone(),
                        text,
                        received_at: Utc::now(),
                    };
                    if recv_intake.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(data)) => {
                    // OCPP-J is JSON text only
                    warn!(
                        "[{}] Binary frame ({} bytes) rejected",
                        cp_id_recv,
                        data.len()
                    );
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(frame)) => {
                    info!("[{}] Close frame received: {:?}", cp_id_recv, frame);
                    break;
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    error!("[{}] WebSocket error: {}", cp_id_recv, e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
        _ = shutdown.notified().wait() => {
            info!("[{}] Connection closing due to server shutdown", charge_point_id);
        }
    }

    let _ = intake
        .send(TransportEvent::Disconnected {
            charge_point_id: charge_point_id.clone(),
            reason: "socket closed".to_string(),
            sink: Some(channel_identity),
        })
        .await;

    info!("[{}] Disconnected", charge_point_id);
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_ocpp_path() {
        assert_eq!(extract_charge_point_id("/ocpp/CP-001").as_deref(), Some("CP-001"));
        assert_eq!(extract_charge_point_id("/ocpp//CP-001").as_deref(), Some("CP-001"));
    }

    #[test]
    fn extracts_id_from_query() {
        assert_eq!(
            extract_charge_point_id("/ocpp?id=CP-001").as_deref(),
            Some("CP-001")
        );
        assert_eq!(
            extract_charge_point_id("/ocpp?foo=bar&id=CP-002").as_deref(),
            Some("CP-002")
        );
    }

    #[test]
    fn extracts_bare_id() {
        assert_eq!(extract_charge_point_id("/CP-001").as_deref(), Some("CP-001"));
    }

    #[test]
    fn missing_id_is_none() {
        assert_eq!(extract_charge_point_id("/"), None);
        assert_eq!(extract_charge_point_id("/ocpp"), None);
        assert_eq!(extract_charge_point_id("/ocpp/"), None);
        assert_eq!(extract_charge_point_id("/ocpp?id="), None);
    }
}
