//! OCPP 1.6 WebSocket server.
//!
//! Charge points connect at `ws://<host>:<port>/ocpp/{charge_point_id}`;
//! the station identifier is the final path segment. Admission requires
//! the identifier to be provisioned in the station directory; unknown
//! stations are closed with a policy-violation code before any frame is
//! processed.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::audit::SharedMessageLog;
use crate::commands::SharedCommandSender;
use crate::config::AppConfig;
use crate::handlers::vendor::VendorRegistry;
use crate::handlers::OcppHandler;
use crate::services::{ChargePointService, ReservationService};
use crate::session::SharedSessionRegistry;
use crate::shared::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol name.
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

pub struct OcppServer {
    config: AppConfig,
    session_registry: SharedSessionRegistry,
    service: Arc<ChargePointService>,
    reservations: Arc<ReservationService>,
    command_sender: SharedCommandSender,
    vendors: Arc<VendorRegistry>,
    message_log: SharedMessageLog,
    shutdown: Option<ShutdownSignal>,
}

impl OcppServer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        session_registry: SharedSessionRegistry,
        service: Arc<ChargePointService>,
        reservations: Arc<ReservationService>,
        command_sender: SharedCommandSender,
        vendors: Arc<VendorRegistry>,
        message_log: SharedMessageLog,
    ) -> Self {
        Self {
            config,
            session_registry,
            service,
            reservations,
            command_sender,
            vendors,
            message_log,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    pub fn session_registry(&self) -> SharedSessionRegistry {
        self.session_registry.clone()
    }

    pub fn command_sender(&self) -> SharedCommandSender {
        self.command_sender.clone()
    }

    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = self.config.address();
        let listener = TcpListener::bind(&addr).await?;
        info!(
            "OCPP 1.6 central system listening on ws://{}/ocpp/{{charge_point_id}}",
            addr
        );

        match &self.shutdown {
            Some(shutdown) => self.run_with_shutdown(listener, shutdown.clone()).await,
            None => self.run_loop(listener).await,
        }
    }

    async fn run_loop(
        &self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        while let Ok((stream, addr)) = listener.accept().await {
            self.spawn_connection(stream, addr);
        }
        Ok(())
    }

    async fn run_with_shutdown(
        &self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr),
                        Err(e) => error!(error = %e, "Failed to accept connection"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("WebSocket server shutting down");
                    for cp_id in self.session_registry.connected_ids() {
                        self.session_registry.unregister(&cp_id);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ctx = ConnectionContext {
            session_registry: self.session_registry.clone(),
            service: self.service.clone(),
            reservations: self.reservations.clone(),
            command_sender: self.command_sender.clone(),
            vendors: self.vendors.clone(),
            message_log: self.message_log.clone(),
            boot_interval_secs: self.config.ocpp.heartbeat_interval_secs,
            shutdown: self.shutdown.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, ctx).await {
                error!(%addr, error = %e, "Connection error");
            }
        });
    }
}

struct ConnectionContext {
    session_registry: SharedSessionRegistry,
    service: Arc<ChargePointService>,
    reservations: Arc<ReservationService>,
    command_sender: SharedCommandSender,
    vendors: Arc<VendorRegistry>,
    message_log: SharedMessageLog,
    boot_interval_secs: u16,
    shutdown: Option<ShutdownSignal>,
}

/// The station identifier is the final non-empty path segment.
fn extract_charge_point_id(path: &str) -> Option<String> {
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_owned)
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: ConnectionContext,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut charge_point_id: Option<String> = None;

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();
            info!(%addr, path, "WebSocket handshake");

            // Offer "ocpp1.6" back when the client requested it; accept
            // without a subprotocol otherwise.
            let requested = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if requested
                .split(',')
                .map(str::trim)
                .any(|p| p == OCPP_SUBPROTOCOL)
            {
                response.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    OCPP_SUBPROTOCOL.parse().unwrap(),
                );
            } else if !requested.is_empty() {
                warn!(%addr, requested, "Client did not offer ocpp1.6");
            }

            match extract_charge_point_id(path) {
                Some(id) => {
                    charge_point_id = Some(id);
                    Ok(response)
                }
                None => {
                    let mut reject =
                        ErrorResponse::new(Some("charge point id missing in path".to_string()));
                    *reject.status_mut() = StatusCode::BAD_REQUEST;
                    Err(reject)
                }
            }
        },
    )
    .await?;

    let charge_point_id = match charge_point_id {
        Some(id) => id,
        None => return Ok(()),
    };

    // Admission: only provisioned stations may stay connected.
    if !ctx.service.is_provisioned(&charge_point_id).await {
        warn!(
            charge_point_id = charge_point_id.as_str(),
            %addr,
            "Rejecting connection from unprovisioned station"
        );
        let mut ws_stream = ws_stream;
        let _ = ws_stream
            .close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "charge point not provisioned".into(),
            }))
            .await;
        return Ok(());
    }

    info!(charge_point_id = charge_point_id.as_str(), %addr, "Charge point connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // last-wins: a reconnect replaces any prior mapping
    ctx.session_registry.register(&charge_point_id, tx);

    let handler = Arc::new(OcppHandler::new(
        charge_point_id.clone(),
        ctx.service.clone(),
        ctx.reservations.clone(),
        ctx.command_sender.clone(),
        ctx.vendors.clone(),
        ctx.message_log.clone(),
        ctx.boot_interval_secs,
    ));

    let cp_id_send = charge_point_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(msg)).await {
                error!(charge_point_id = cp_id_send.as_str(), error = %e, "Send error");
                break;
            }
        }
    });

    let cp_id_recv = charge_point_id.clone();
    let registry = ctx.session_registry.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    registry.touch(&cp_id_recv);
                    if let Some(response) = handler.handle(&text).await {
                        if let Err(e) = registry.send_to(&cp_id_recv, response) {
                            error!(
                                charge_point_id = cp_id_recv.as_str(),
                                error = %e,
                                "Failed to queue response"
                            );
                            break;
                        }
                    }
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    registry.touch(&cp_id_recv);
                }
                Ok(Message::Close(frame)) => {
                    info!(charge_point_id = cp_id_recv.as_str(), ?frame, "Close frame received");
                    break;
                }
                Ok(Message::Binary(data)) => {
                    warn!(
                        charge_point_id = cp_id_recv.as_str(),
                        bytes = data.len(),
                        "Ignoring binary message"
                    );
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    error!(charge_point_id = cp_id_recv.as_str(), error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    match &ctx.shutdown {
        Some(shutdown) => {
            tokio::select! {
                _ = send_task => {}
                _ = recv_task => {}
                _ = shutdown.notified().wait() => {
                    info!(
                        charge_point_id = charge_point_id.as_str(),
                        "Closing connection on server shutdown"
                    );
                }
            }
        }
        None => {
            tokio::select! {
                _ = send_task => {}
                _ = recv_task => {}
            }
        }
    }

    // Pending outbound commands are left to expire on their own deadline;
    // disconnect only drops the mapping and marks the station offline.
    ctx.session_registry.unregister(&charge_point_id);
    ctx.service.mark_offline(&charge_point_id).await;
    info!(charge_point_id = charge_point_id.as_str(), "Charge point disconnected");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_final_path_segment() {
        assert_eq!(extract_charge_point_id("/ocpp/CP_001").as_deref(), Some("CP_001"));
        assert_eq!(extract_charge_point_id("/CP_001").as_deref(), Some("CP_001"));
        assert_eq!(
            extract_charge_point_id("/tenant/7/ocpp/CP_001/").as_deref(),
            Some("CP_001")
        );
        assert!(extract_charge_point_id("/").is_none());
        assert!(extract_charge_point_id("").is_none());
    }
}
