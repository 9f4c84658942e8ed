//! Async handle around a [`RealtimeChannel`].
//!
//! `RealtimeClient::spawn` starts one actor task that exclusively owns the
//! channel, the websocket transport and the tokio scheduler. Handles talk to
//! it over an unbounded command queue, so `subscribe`, `unsubscribe` and
//! `disconnect` never block and may be called from inside a listener.
//! Transport events, fired timers and commands are processed one at a time.

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tracing::debug;

use crate::channel::{
    ChannelOptions, ConnectFuture, ConnectionState, FiredTimer, RealtimeChannel, TokioScheduler,
};
use crate::config::Settings;
use crate::dispatch::{Listener, Topic};
use crate::transport::message::{DEFAULT_ANALYTICS_PERIOD, DEFAULT_NOTIFICATION_LIMIT};
use crate::transport::{Endpoint, Envelope, Request, TransportEvent, WsTransport};
use crate::utils::error::{ChannelError, ConnectError};

type LiveChannel = RealtimeChannel<WsTransport, TokioScheduler>;

enum Command {
    Connect {
        token: String,
        reply: oneshot::Sender<ConnectFuture>,
    },
    Disconnect,
    Send {
        kind: String,
        data: Value,
        reply: oneshot::Sender<bool>,
    },
    Subscribe {
        topic: Topic,
        listener: Listener,
    },
    Unsubscribe {
        topic: Topic,
        listener: Listener,
    },
}

#[derive(Clone)]
pub struct RealtimeClient {
    commands: UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    last_message: watch::Receiver<Option<Envelope>>,
}

impl RealtimeClient {
    /// Build the channel from `settings` and start its actor.
    /// Must be called from within a tokio runtime.
    pub fn spawn(settings: &Settings) -> Result<Self, ChannelError> {
        let endpoint = Endpoint::parse(&settings.endpoint.origin, &settings.endpoint.path)?;
        let options = ChannelOptions::from(settings);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (last_tx, last_rx) = watch::channel(None);

        let channel = RealtimeChannel::new(
            endpoint,
            options,
            WsTransport::new(event_tx),
            TokioScheduler::new(timer_tx),
        );

        tokio::spawn(
            Actor {
                channel,
                commands: command_rx,
                events: event_rx,
                timers: timer_rx,
                state: state_tx,
                last_message: last_tx,
            }
            .run(),
        );

        Ok(Self {
            commands: command_tx,
            state: state_rx,
            last_message: last_rx,
        })
    }

    /// Connect with a bearer token. Concurrent callers share one attempt.
    pub async fn connect(&self, token: impl Into<String>) -> Result<(), ConnectError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Connect {
                token: token.into(),
                reply,
            })
            .map_err(|_| ConnectError::Shutdown)?;
        let attempt = rx.await.map_err(|_| ConnectError::Shutdown)?;
        attempt.await
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Returns `false` when the channel is not open or has shut down.
    pub async fn send(&self, kind: impl Into<String>, data: Value) -> bool {
        let (reply, rx) = oneshot::channel();
        let queued = self.commands.send(Command::Send {
            kind: kind.into(),
            data,
            reply,
        });
        queued.is_ok() && rx.await.unwrap_or(false)
    }

    pub async fn request(&self, request: Request) -> bool {
        let (kind, data) = request.into_parts();
        self.send(kind, data).await
    }

    pub async fn request_analytics(&self, period: Option<&str>) -> bool {
        self.request(Request::RequestAnalytics {
            period: period.unwrap_or(DEFAULT_ANALYTICS_PERIOD).to_string(),
        })
        .await
    }

    pub async fn request_notifications(&self, limit: Option<u32>) -> bool {
        self.request(Request::RequestNotifications {
            limit: limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT),
        })
        .await
    }

    pub async fn request_system_status(&self) -> bool {
        self.request(Request::RequestSystemStatus).await
    }

    pub async fn update_job(&self, job_id: &str, updates: Value) -> bool {
        self.request(Request::UpdateJob {
            job_id: job_id.to_string(),
            updates,
        })
        .await
    }

    pub async fn update_content(&self, content_id: &str, updates: Value) -> bool {
        self.request(Request::UpdateContent {
            content_id: content_id.to_string(),
            updates,
        })
        .await
    }

    pub async fn track_activity(&self, activity: &str, details: Value) -> bool {
        self.request(Request::UserActivity {
            activity: activity.to_string(),
            details,
        })
        .await
    }

    pub fn subscribe(&self, topic: Topic, listener: Listener) {
        let _ = self.commands.send(Command::Subscribe { topic, listener });
    }

    pub fn unsubscribe(&self, topic: Topic, listener: &Listener) {
        let _ = self.commands.send(Command::Unsubscribe {
            topic,
            listener: listener.clone(),
        });
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn last_message(&self) -> Option<Envelope> {
        self.last_message.borrow().clone()
    }

    /// A receiver that observes every state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

struct Actor {
    channel: LiveChannel,
    commands: UnboundedReceiver<Command>,
    events: UnboundedReceiver<TransportEvent>,
    timers: UnboundedReceiver<FiredTimer>,
    state: watch::Sender<ConnectionState>,
    last_message: watch::Sender<Option<Envelope>>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("all realtime client handles dropped, shutting down");
                        self.channel.disconnect();
                        self.publish();
                        return;
                    }
                },
                Some(event) = self.events.recv() => self.channel.handle_event(event),
                Some(fired) = self.timers.recv() => {
                    self.channel.handle_timer(fired.handle, fired.timer);
                }
            }
            self.publish();
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Connect { token, reply } => {
                let _ = reply.send(self.channel.connect(token));
            }
            Command::Disconnect => self.channel.disconnect(),
            Command::Send { kind, data, reply } => {
                let _ = reply.send(self.channel.send(&kind, data));
            }
            Command::Subscribe { topic, listener } => self.channel.subscribe(topic, listener),
            Command::Unsubscribe { topic, listener } => {
                self.channel.unsubscribe(topic, &listener);
            }
        }
    }

    fn publish(&self) {
        let state = self.channel.state();
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });

        let latest = self.channel.last_message();
        self.last_message.send_if_modified(|current| {
            if current.as_ref() == latest {
                false
            } else {
                *current = latest.cloned();
                true
            }
        });
    }
}
