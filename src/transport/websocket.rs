//! WebSocket transport on tokio-tungstenite.
//!
//! Each `open` spawns one task that owns the socket for that connection:
//! - performs the client handshake, reporting `Opened` or `Error` + `Closed`
//! - forwards inbound text frames as `Frame` events, in arrival order
//! - writes outbound frames queued by `send`
//! - on a local `close`, sends a close frame, gives the peer a moment to
//!   answer, then reports `Closed` with the local code
//!
//! Only one connection is active at a time. Opening a new one drops the
//! command queue of the previous task, which closes its socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Message as WsMessage};
use url::Url;

use super::{
    ABNORMAL_CLOSURE, ConnectionId, NO_STATUS, Transport, TransportEvent, TransportEventKind,
};
use crate::utils::error::TransportError;

/// How long a local close waits for the peer's close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum Outgoing {
    Frame(String),
    Close { code: u16, reason: String },
}

#[derive(Debug)]
pub struct WsTransport {
    events: UnboundedSender<TransportEvent>,
    active: Option<(ConnectionId, UnboundedSender<Outgoing>)>,
}

impl WsTransport {
    /// Events for every connection opened by this transport are posted to
    /// `events`. Must be used from within a tokio runtime.
    pub fn new(events: UnboundedSender<TransportEvent>) -> Self {
        Self {
            events,
            active: None,
        }
    }
}

impl Transport for WsTransport {
    fn open(&mut self, connection: ConnectionId, url: &Url) {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some((previous, _)) = self.active.replace((connection, tx)) {
            debug!("{previous} superseded by {connection}");
        }
        tokio::spawn(run_connection(
            connection,
            url.to_string(),
            rx,
            self.events.clone(),
        ));
    }

    fn send(&mut self, connection: ConnectionId, frame: String) -> Result<(), TransportError> {
        match &self.active {
            Some((active, tx)) if *active == connection => tx
                .send(Outgoing::Frame(frame))
                .map_err(|_| TransportError::Closed),
            _ => Err(TransportError::NotConnected),
        }
    }

    fn close(&mut self, connection: ConnectionId, code: u16, reason: &str) {
        match self.active.take() {
            Some((active, tx)) if active == connection => {
                let _ = tx.send(Outgoing::Close {
                    code,
                    reason: reason.to_string(),
                });
            }
            other => {
                debug!("close requested for inactive {connection}");
                self.active = other;
            }
        }
    }
}

async fn run_connection(
    connection: ConnectionId,
    url: String,
    mut outgoing: UnboundedReceiver<Outgoing>,
    events: UnboundedSender<TransportEvent>,
) {
    let emit = |kind: TransportEventKind| {
        let _ = events.send(TransportEvent::new(connection, kind));
    };
    let closed = |code: u16, reason: String| TransportEventKind::Closed { code, reason };

    let mut ws = tokio::select! {
        handshake = connect_async(url.as_str()) => match handshake {
            Ok((ws, _response)) => ws,
            Err(e) => {
                emit(TransportEventKind::Error(e.to_string()));
                emit(closed(ABNORMAL_CLOSURE, String::new()));
                return;
            }
        },
        command = outgoing.recv() => {
            match command {
                Some(Outgoing::Close { code, reason }) => emit(closed(code, reason)),
                Some(Outgoing::Frame(_)) => {
                    warn!("{connection}: frame queued before handshake, closing");
                    emit(closed(ABNORMAL_CLOSURE, String::new()));
                }
                None => debug!("{connection}: abandoned during handshake"),
            }
            return;
        }
    };

    emit(TransportEventKind::Opened);

    loop {
        tokio::select! {
            incoming = ws.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    emit(TransportEventKind::Frame(text.as_str().to_owned()));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                        .unwrap_or((NO_STATUS, String::new()));
                    emit(closed(code, reason));
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(TransportEventKind::Error(e.to_string()));
                    emit(closed(ABNORMAL_CLOSURE, String::new()));
                    return;
                }
                None => {
                    emit(closed(ABNORMAL_CLOSURE, String::new()));
                    return;
                }
            },
            command = outgoing.recv() => match command {
                Some(Outgoing::Frame(text)) => {
                    if let Err(e) = ws.send(WsMessage::text(text)).await {
                        emit(TransportEventKind::Error(e.to_string()));
                        emit(closed(ABNORMAL_CLOSURE, String::new()));
                        return;
                    }
                }
                Some(Outgoing::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    if let Err(e) = ws.close(Some(frame)).await {
                        debug!("{connection}: close frame not sent: {e}");
                    }
                    let drained = tokio::time::timeout(CLOSE_GRACE, async {
                        while let Some(Ok(_)) = ws.next().await {}
                    })
                    .await;
                    if drained.is_err() {
                        debug!("{connection}: peer did not acknowledge close");
                    }
                    emit(closed(code, reason));
                    return;
                }
                None => {
                    debug!("{connection}: superseded, closing socket");
                    let _ = ws.close(None).await;
                    return;
                }
            },
        }
    }
}
