//! Resilient push-channel connection
//!
//! The reconnect policy lives in [`ReconnectMachine`], a plain state machine
//! with no I/O. [`ConnectionManager`] runs it on a background task, feeding
//! it transport events and carrying out the directives it returns.
//!
//! ## States
//!
//! ```text
//!              connect()            dial ok
//! Disconnected ─────────▶ Connecting ───────▶ Open
//!      ▲                      │                 │
//!      └──── dial failed ─────┘                 │
//!      └──────────── closed / transport error ──┘
//! ```
//!
//! Leaving `Connecting` or `Open` for any reason other than `disconnect()`
//! schedules exactly one redial after the reconnect delay. A manual
//! `connect()` before the delay elapses cancels that pending redial.
//! `disconnect()` also abandons a dial that is still in flight.

use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use futures::{StreamExt, future::BoxFuture};
use tokio::{
    sync::{mpsc, watch},
    time::{Instant, sleep_until},
};
use tracing::{debug, info, instrument, trace, warn};

use crate::events::{Decoded, Envelope, EventKind};

use super::{
    bus::{EventBus, SubscriptionId},
    transport::{Connector, MessageStream},
};

/// Phase of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// Inputs to the reconnect machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    ConnectRequested,
    DisconnectRequested,
    Opened,
    Closed,
    Failed,
    RetryElapsed,
}

/// What the driver must do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Idle,
    Dial,
    /// Drop the current channel, if any
    Close,
    ScheduleRetry(Duration),
}

#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    /// Cleared by `disconnect()`, set again by `connect()`
    auto_reconnect: bool,
    /// At most one redial is outstanding
    retry_pending: bool,
    delay: Duration,
}

impl ReconnectMachine {
    pub fn new(delay: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            auto_reconnect: false,
            retry_pending: false,
            delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    pub fn handle(&mut self, event: ConnectionEvent) -> Directive {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match event {
            ConnectRequested => {
                self.auto_reconnect = true;
                self.retry_pending = false;
                if self.state == Disconnected {
                    self.state = Connecting;
                    Directive::Dial
                } else {
                    Directive::Idle
                }
            }

            DisconnectRequested => {
                self.auto_reconnect = false;
                self.retry_pending = false;
                if self.state == Disconnected {
                    Directive::Idle
                } else {
                    self.state = Disconnected;
                    Directive::Close
                }
            }

            Opened => {
                if self.state == Connecting {
                    self.state = Open;
                    self.retry_pending = false;
                    Directive::Idle
                } else {
                    // Dial finished after a disconnect(); discard the channel
                    Directive::Close
                }
            }

            Closed | Failed => {
                if self.state == Disconnected {
                    return Directive::Idle;
                }
                self.state = Disconnected;
                if self.auto_reconnect && !self.retry_pending {
                    self.retry_pending = true;
                    Directive::ScheduleRetry(self.delay)
                } else {
                    Directive::Idle
                }
            }

            RetryElapsed => {
                if !self.retry_pending {
                    return Directive::Idle;
                }
                self.retry_pending = false;
                if self.state == Disconnected && self.auto_reconnect {
                    self.state = Connecting;
                    Directive::Dial
                } else {
                    Directive::Idle
                }
            }
        }
    }
}

enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

/// Dial in flight, owned by the driver so commands keep flowing meanwhile
type PendingDial = BoxFuture<'static, Result<MessageStream>>;

/// Background task owning the channel and the machine
struct Driver {
    connector: Arc<dyn Connector>,
    machine: ReconnectMachine,
    bus: Arc<EventBus>,
    state_tx: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedReceiver<Command>,
    dialing: Option<PendingDial>,
    stream: Option<MessageStream>,
    retry_at: Option<Instant>,
}

impl Driver {
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting connection driver");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(Command::Connect) => self.apply(ConnectionEvent::ConnectRequested),
                        Some(Command::Disconnect) => {
                            self.apply(ConnectionEvent::DisconnectRequested)
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }

                outcome = next_dial(&mut self.dialing) => {
                    self.dialing = None;
                    match outcome {
                        Ok(stream) => {
                            self.stream = Some(stream);
                            self.apply(ConnectionEvent::Opened);
                        }
                        Err(e) => {
                            warn!("connection attempt failed: {e:#}");
                            self.apply(ConnectionEvent::Failed);
                        }
                    }
                }

                frame = next_frame(&mut self.stream) => {
                    match frame {
                        Some(Ok(text)) => self.dispatch(&text),
                        Some(Err(e)) => {
                            warn!("push channel failed: {e:#}");
                            self.stream = None;
                            self.apply(ConnectionEvent::Failed);
                        }
                        None => {
                            info!("push channel closed");
                            self.stream = None;
                            self.apply(ConnectionEvent::Closed);
                        }
                    }
                }

                _ = retry_timer(self.retry_at) => {
                    self.retry_at = None;
                    self.apply(ConnectionEvent::RetryElapsed);
                }
            }
        }

        self.dialing = None;
        self.stream = None;
        self.state_tx.send_replace(ConnectionState::Disconnected);
        debug!("connection driver stopped");
    }

    /// Feed an event to the machine and carry out the directive
    fn apply(&mut self, event: ConnectionEvent) {
        let directive = self.machine.handle(event);
        trace!(?event, ?directive, state = ?self.machine.state(), "connection transition");

        if !self.machine.retry_pending() {
            self.retry_at = None;
        }

        match directive {
            Directive::Idle => {}
            Directive::Dial => {
                let connector = Arc::clone(&self.connector);
                self.dialing = Some(Box::pin(async move { connector.connect().await }));
            }
            Directive::Close => {
                if self.dialing.take().is_some() {
                    debug!("abandoning dial in flight");
                }
                self.stream = None;
            }
            Directive::ScheduleRetry(delay) => {
                info!("reconnecting in {}s", delay.as_secs_f32());
                self.retry_at = Some(Instant::now() + delay);
            }
        }

        self.state_tx.send_replace(self.machine.state());
    }

    fn dispatch(&self, text: &str) {
        match Envelope::decode(text) {
            Ok(Decoded::Event(envelope)) => {
                let handled = self.bus.dispatch(&envelope);
                trace!(kind = %envelope.kind(), handled, "dispatched envelope");
            }
            Ok(Decoded::Unrecognized { kind }) => {
                debug!(kind, "ignoring unrecognized envelope type");
            }
            Err(e) => warn!("dropping undecodable frame: {e}"),
        }
    }
}

async fn next_dial(dialing: &mut Option<PendingDial>) -> Result<MessageStream> {
    match dialing {
        Some(dial) => dial.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(stream: &mut Option<MessageStream>) -> Option<Result<String>> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn retry_timer(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Handle to the background connection task
///
/// Starts disconnected; nothing is dialed until [`connect`](Self::connect).
pub struct ConnectionManager {
    commands: mpsc::UnboundedSender<Command>,
    bus: Arc<EventBus>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionManager {
    pub fn spawn(connector: impl Connector, reconnect_delay: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let bus = Arc::new(EventBus::new());

        let driver = Driver {
            connector: Arc::new(connector),
            machine: ReconnectMachine::new(reconnect_delay),
            bus: Arc::clone(&bus),
            state_tx,
            commands: cmd_rx,
            dialing: None,
            stream: None,
            retry_at: None,
        };

        tokio::spawn(driver.run());

        Self {
            commands: cmd_tx,
            bus,
            state_rx,
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("connection manager is not running"))
    }

    /// Open the channel and re-enable automatic reconnects
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Close the channel; no reconnects until the next `connect()`
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}
