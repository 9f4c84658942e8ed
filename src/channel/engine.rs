//! The realtime channel state machine.
//!
//! `RealtimeChannel` owns one logical connection and reacts to two kinds of
//! input: transport events (`handle_event`) and fired timers
//! (`handle_timer`). Neither runs concurrently with the other or with the
//! public API, so all state lives in plain fields.
//!
//! Lifecycle:
//! - `connect` starts an attempt unless one is already in flight, in which
//!   case the caller gets the same shared [`ConnectFuture`]
//! - `Opened` resets the reconnect budget, starts the heartbeat and settles
//!   the pending future with `Ok`
//! - a close that was not requested by `disconnect` and does not carry the
//!   normal code schedules a reconnect while budget remains
//! - `disconnect` marks the close as intentional *before* asking the
//!   transport to close, and clears every timer

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::scheduler::{Scheduler, Timer, TimerHandle};
use super::state::{ChannelOptions, ConnectionState, HeartbeatState, ReconnectState};
use crate::dispatch::{Listener, ListenerRegistry, Topic};
use crate::transport::message::{
    DEFAULT_ANALYTICS_PERIOD, DEFAULT_NOTIFICATION_LIMIT, Envelope, Inbound, Request,
};
use crate::transport::{
    ConnectionId, Endpoint, HEARTBEAT_TIMEOUT, NORMAL_CLOSURE, Transport, TransportEvent,
    TransportEventKind,
};
use crate::utils::error::ConnectError;

/// Settles once per connection attempt; clones observe the same outcome.
pub type ConnectFuture = Shared<BoxFuture<'static, Result<(), ConnectError>>>;

struct PendingConnect {
    resolve: oneshot::Sender<Result<(), ConnectError>>,
    future: ConnectFuture,
}

impl PendingConnect {
    fn new() -> Self {
        let (resolve, rx) = oneshot::channel();
        let future = rx
            .map(|outcome| outcome.unwrap_or(Err(ConnectError::Abandoned)))
            .boxed()
            .shared();
        Self { resolve, future }
    }

    fn settle(self, outcome: Result<(), ConnectError>) {
        // Nobody may be waiting, e.g. for automatic reconnects.
        let _ = self.resolve.send(outcome);
    }
}

pub struct RealtimeChannel<T, S> {
    endpoint: Endpoint,
    options: ChannelOptions,
    transport: T,
    scheduler: S,
    registry: ListenerRegistry,
    state: ConnectionState,
    token: Option<String>,
    connection: Option<ConnectionId>,
    next_connection: u64,
    intentional_close: bool,
    pending: Option<PendingConnect>,
    reconnect: ReconnectState,
    heartbeat: HeartbeatState,
    last_message: Option<Envelope>,
}

impl<T: Transport, S: Scheduler> RealtimeChannel<T, S> {
    pub fn new(endpoint: Endpoint, options: ChannelOptions, transport: T, scheduler: S) -> Self {
        Self {
            endpoint,
            options,
            transport,
            scheduler,
            registry: ListenerRegistry::new(),
            state: ConnectionState::Idle,
            token: None,
            connection: None,
            next_connection: 0,
            intentional_close: false,
            pending: None,
            reconnect: ReconnectState::default(),
            heartbeat: HeartbeatState::default(),
            last_message: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// The most recent inbound message routed to subscribers.
    pub fn last_message(&self) -> Option<&Envelope> {
        self.last_message.as_ref()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts_made
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn subscribe(&mut self, topic: Topic, listener: Listener) {
        self.registry.subscribe(topic, listener);
    }

    pub fn unsubscribe(&mut self, topic: Topic, listener: &Listener) -> bool {
        self.registry.unsubscribe(topic, listener)
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.registry.listener_count(topic)
    }

    /// Connect with `token`, or join the attempt already in flight.
    ///
    /// Starting a fresh attempt resets the reconnect budget. While `Open`
    /// this resolves immediately; rotating the token needs `disconnect`
    /// first.
    pub fn connect(&mut self, token: impl Into<String>) -> ConnectFuture {
        if let Some(pending) = &self.pending {
            debug!("connect joined the attempt already in flight");
            return pending.future.clone();
        }

        match self.state {
            ConnectionState::Open => {
                debug!("connect called while open");
                return futures::future::ready(Ok(())).boxed().shared();
            }
            ConnectionState::Closing => {
                if let Some(connection) = self.connection.take() {
                    debug!("{connection} replaced before its close completed");
                }
                self.finish_close(NORMAL_CLOSURE, "Client disconnect");
            }
            _ => {}
        }

        self.token = Some(token.into());
        self.reconnect.attempts_made = 0;
        self.begin_attempt()
    }

    /// Close intentionally. Never triggers a reconnect.
    pub fn disconnect(&mut self) {
        self.intentional_close = true;
        self.cancel_reconnect();
        self.stop_heartbeat();

        if let Some(pending) = self.pending.take() {
            pending.settle(Err(ConnectError::Aborted));
        }

        match self.connection {
            Some(connection) if self.state != ConnectionState::Closing => {
                info!("disconnecting {connection}");
                self.state = ConnectionState::Closing;
                self.transport
                    .close(connection, NORMAL_CLOSURE, "Client disconnect");
            }
            Some(_) => debug!("disconnect already in progress"),
            None => {
                if self.state != ConnectionState::Idle {
                    self.state = ConnectionState::Closed;
                }
            }
        }
    }

    /// Send `data` as a `kind` message. Returns `false`, without writing,
    /// unless the channel is open. Sends are never queued.
    pub fn send(&mut self, kind: &str, data: Value) -> bool {
        let connection = match (self.state, self.connection) {
            (ConnectionState::Open, Some(connection)) => connection,
            _ => {
                warn!("dropping `{kind}` message: channel is {}", self.state);
                return false;
            }
        };

        let envelope = Envelope::new(kind, data, self.scheduler.now_millis());
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("failed to serialize `{kind}` message: {e}");
                return false;
            }
        };

        match self.transport.send(connection, frame) {
            Ok(()) => {
                debug!("sent `{kind}` on {connection}");
                true
            }
            Err(e) => {
                warn!("failed to send `{kind}` on {connection}: {e}");
                false
            }
        }
    }

    pub fn request(&mut self, request: Request) -> bool {
        let (kind, data) = request.into_parts();
        self.send(kind, data)
    }

    pub fn ping(&mut self) -> bool {
        self.request(Request::Ping)
    }

    /// `period` defaults to `"7d"`.
    pub fn request_analytics(&mut self, period: Option<&str>) -> bool {
        self.request(Request::RequestAnalytics {
            period: period.unwrap_or(DEFAULT_ANALYTICS_PERIOD).to_string(),
        })
    }

    /// `limit` defaults to 10.
    pub fn request_notifications(&mut self, limit: Option<u32>) -> bool {
        self.request(Request::RequestNotifications {
            limit: limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT),
        })
    }

    pub fn request_system_status(&mut self) -> bool {
        self.request(Request::RequestSystemStatus)
    }

    pub fn update_job(&mut self, job_id: &str, updates: Value) -> bool {
        self.request(Request::UpdateJob {
            job_id: job_id.to_string(),
            updates,
        })
    }

    pub fn update_content(&mut self, content_id: &str, updates: Value) -> bool {
        self.request(Request::UpdateContent {
            content_id: content_id.to_string(),
            updates,
        })
    }

    pub fn track_activity(&mut self, activity: &str, details: Value) -> bool {
        self.request(Request::UserActivity {
            activity: activity.to_string(),
            details,
        })
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        if self.connection != Some(event.connection) {
            debug!("ignoring {:?} from stale {}", event.kind, event.connection);
            return;
        }

        match event.kind {
            TransportEventKind::Opened => self.on_open(),
            TransportEventKind::Frame(text) => self.on_frame(&text),
            TransportEventKind::Closed { code, reason } => {
                self.connection = None;
                self.finish_close(code, &reason);
            }
            TransportEventKind::Error(message) => self.on_error(message),
        }
    }

    pub fn handle_timer(&mut self, handle: TimerHandle, timer: Timer) {
        match timer {
            Timer::Reconnect if self.reconnect.timer == Some(handle) => {
                self.reconnect.timer = None;
                if self.token.is_some() && self.connection.is_none() {
                    info!(
                        "reconnect attempt {}/{}",
                        self.reconnect.attempts_made, self.options.reconnect.max_attempts
                    );
                    drop(self.begin_attempt());
                }
            }
            Timer::Heartbeat if self.heartbeat.interval == Some(handle) => {
                self.heartbeat.interval = Some(
                    self.scheduler
                        .after(self.options.heartbeat.interval, Timer::Heartbeat),
                );
                if self.heartbeat.pending.is_some() {
                    debug!("previous ping still unanswered, skipping probe");
                } else if self.ping() {
                    self.heartbeat.pending = Some(
                        self.scheduler
                            .after(self.options.heartbeat.timeout, Timer::Liveness),
                    );
                }
            }
            Timer::Liveness if self.heartbeat.pending == Some(handle) => {
                self.heartbeat.pending = None;
                warn!(
                    "no pong within {:?}, closing connection",
                    self.options.heartbeat.timeout
                );
                if let Some(connection) = self.connection.take() {
                    self.transport
                        .close(connection, HEARTBEAT_TIMEOUT, "heartbeat timeout");
                }
                self.finish_close(HEARTBEAT_TIMEOUT, "heartbeat timeout");
            }
            _ => debug!("ignoring stale {timer:?} timer"),
        }
    }

    fn begin_attempt(&mut self) -> ConnectFuture {
        self.intentional_close = false;
        self.cancel_reconnect();

        let Some(token) = self.token.as_deref() else {
            return futures::future::ready(Err(ConnectError::Abandoned))
                .boxed()
                .shared();
        };
        let url = self.endpoint.url_for(token);

        self.next_connection += 1;
        let connection = ConnectionId(self.next_connection);
        self.connection = Some(connection);
        self.state = ConnectionState::Connecting;

        let pending = PendingConnect::new();
        let future = pending.future.clone();
        self.pending = Some(pending);

        info!("connecting {connection} to {}", self.endpoint);
        self.transport.open(connection, &url);
        future
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("open reported while {}, ignoring", self.state);
            return;
        }

        self.state = ConnectionState::Open;
        self.reconnect.attempts_made = 0;
        self.start_heartbeat();
        info!("realtime channel open");

        self.registry.emit(Topic::Connected, &json!({}));
        if let Some(pending) = self.pending.take() {
            pending.settle(Ok(()));
        }
    }

    fn on_error(&mut self, message: String) {
        warn!("transport error: {message}");
        self.registry
            .emit(Topic::Error, &json!({ "message": &message }));

        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Closed;
            if let Some(pending) = self.pending.take() {
                pending.settle(Err(ConnectError::Handshake(message)));
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("dropping malformed frame: {e}");
                return;
            }
        };

        match envelope.classify() {
            Inbound::Pong => {
                if let Some(pending) = self.heartbeat.pending.take() {
                    self.scheduler.cancel(pending);
                    debug!("pong received");
                }
            }
            Inbound::Event(topic) => {
                self.registry.emit(topic, &envelope.data);
                self.last_message = Some(envelope);
            }
            Inbound::Unrecognized(kind) => {
                warn!("unrecognized message type `{kind}`");
            }
        }
    }

    /// Settle the current connection as closed and decide whether to retry.
    /// The caller has already detached `self.connection`.
    fn finish_close(&mut self, code: u16, reason: &str) {
        self.stop_heartbeat();
        self.state = ConnectionState::Closed;

        if let Some(pending) = self.pending.take() {
            pending.settle(Err(ConnectError::Closed {
                code,
                reason: reason.to_string(),
            }));
        }

        info!("realtime channel closed (code {code}: {reason})");
        self.registry.emit(
            Topic::Disconnected,
            &json!({ "code": code, "reason": reason }),
        );

        if self.intentional_close || code == NORMAL_CLOSURE {
            return;
        }
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.token.is_none() {
            return;
        }

        let policy = self.options.reconnect;
        if self.reconnect.attempts_made >= policy.max_attempts {
            warn!(
                "giving up after {} reconnect attempts",
                self.reconnect.attempts_made
            );
            return;
        }

        self.reconnect.attempts_made += 1;
        let delay = policy.delay_for(self.reconnect.attempts_made);
        info!(
            "reconnecting in {delay:?} (attempt {}/{})",
            self.reconnect.attempts_made, policy.max_attempts
        );
        self.cancel_reconnect();
        self.reconnect.timer = Some(self.scheduler.after(delay, Timer::Reconnect));
    }

    fn cancel_reconnect(&mut self) {
        if let Some(handle) = self.reconnect.timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn start_heartbeat(&mut self) {
        self.stop_heartbeat();
        self.heartbeat.interval = Some(
            self.scheduler
                .after(self.options.heartbeat.interval, Timer::Heartbeat),
        );
    }

    fn stop_heartbeat(&mut self) {
        if let Some(handle) = self.heartbeat.interval.take() {
            self.scheduler.cancel(handle);
        }
        if let Some(handle) = self.heartbeat.pending.take() {
            self.scheduler.cancel(handle);
        }
    }
}
