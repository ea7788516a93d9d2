//! Websocket lifecycle with reconnect and outbound queuing
//!
//! The manager runs as its own task. Callers hold a cheap [`ConnectionHandle`]
//! for sending and receive inbound payloads, in arrival order, from a single
//! event channel. The socket is reopened after a fixed delay whenever it
//! closes, forever, and anything sent while it is down is queued and flushed
//! in FIFO order once the next connection opens.

use crate::error::ClientError;
use futures_util::{Sink, SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::ClientMessage;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Events delivered to the consumer of a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Message(String),
}

/// Outbound messages waiting for an open socket.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<ClientMessage>,
    open: bool,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the message back if it can go out now, otherwise queues it.
    pub fn submit(&mut self, message: ClientMessage) -> Option<ClientMessage> {
        if self.open {
            Some(message)
        } else {
            self.pending.push_back(message);
            None
        }
    }

    /// Takes everything queued, oldest first.
    pub fn take_pending(&mut self) -> VecDeque<ClientMessage> {
        std::mem::take(&mut self.pending)
    }

    /// Puts unsent messages back ahead of anything queued since.
    pub fn requeue_front(&mut self, mut unsent: VecDeque<ClientMessage>) {
        unsent.append(&mut self.pending);
        self.pending = unsent;
    }

    pub fn mark_open(&mut self) {
        self.open = true;
    }

    pub fn mark_closed(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Reconnect,
    Shutdown,
}

/// Sending side of a connection. Dropping every handle stops the manager.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    outbound_tx: mpsc::UnboundedSender<ClientMessage>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Transmits immediately when connected, otherwise queues.
    /// Returns false only if the manager task is gone.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.outbound_tx.send(message).is_ok()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Resolves once the connection reaches `state`.
    pub async fn wait_for(&mut self, state: ConnectionState) -> bool {
        self.state_rx.wait_for(|current| *current == state).await.is_ok()
    }
}

pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    queue: OutboundQueue,
    outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    /// Starts the manager task and begins connecting right away.
    pub fn spawn(
        url: &str,
        reconnect_delay: Duration,
    ) -> (
        ConnectionHandle,
        mpsc::UnboundedReceiver<ConnectionEvent>,
        JoinHandle<()>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let manager = ConnectionManager {
            url: url.to_string(),
            reconnect_delay,
            queue: OutboundQueue::new(),
            outbound_rx,
            events_tx,
            state_tx,
        };
        let task = tokio::spawn(manager.run());

        let handle = ConnectionHandle {
            outbound_tx,
            state_rx,
        };
        (handle, events_rx, task)
    }

    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!("Connecting to {}...", self.url);

            let mut was_connected = false;
            let attempt = connect_async(self.url.as_str()).await;
            let flow = match attempt {
                Ok((stream, _)) => {
                    let (mut write, mut read) = stream.split();
                    match self.flush_pending(&mut write).await {
                        Ok(()) => {
                            was_connected = true;
                            self.serve(&mut write, &mut read).await
                        }
                        Err(e) => {
                            error!("Failed to flush queued messages: {}", e);
                            Flow::Reconnect
                        }
                    }
                }
                Err(e) => {
                    error!("Connection to {} failed: {}", self.url, e);
                    Flow::Reconnect
                }
            };

            self.queue.mark_closed();
            self.set_state(ConnectionState::Disconnected);
            if flow == Flow::Shutdown {
                info!("Connection manager stopped");
                return;
            }
            if was_connected && !self.emit(ConnectionEvent::Disconnected) {
                return;
            }

            warn!(
                "Connection closed, reconnecting in {}ms",
                self.reconnect_delay.as_millis()
            );
            if self.wait_before_reconnect().await == Flow::Shutdown {
                info!("Connection manager stopped");
                return;
            }
        }
    }

    /// Sends everything queued while offline, oldest first, then opens the queue.
    async fn flush_pending<W>(&mut self, write: &mut W) -> Result<(), ClientError>
    where
        W: Sink<Message, Error = WsError> + Unpin,
    {
        let mut pending = self.queue.take_pending();
        if !pending.is_empty() {
            info!("Flushing {} queued messages", pending.len());
        }

        while let Some(message) = pending.pop_front() {
            if let Err(e) = transmit(write, &message).await {
                pending.push_front(message);
                self.queue.requeue_front(pending);
                return Err(e);
            }
        }

        self.queue.mark_open();
        self.set_state(ConnectionState::Connected);
        info!("Connected to {}", self.url);
        if !self.emit(ConnectionEvent::Connected) {
            debug!("No consumer for connection events");
        }
        Ok(())
    }

    async fn serve<W, R>(&mut self, write: &mut W, read: &mut R) -> Flow
    where
        W: Sink<Message, Error = WsError> + Unpin,
        R: futures_util::Stream<Item = Result<Message, WsError>> + Unpin,
    {
        loop {
            tokio::select! {
                outbound = self.outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        let _ = write.send(Message::Close(None)).await;
                        return Flow::Shutdown;
                    };
                    if let Some(message) = self.queue.submit(message) {
                        if let Err(e) = transmit(write, &message).await {
                            error!("Failed to send message: {}", e);
                            self.queue.mark_closed();
                            self.queue.requeue_front(VecDeque::from([message]));
                            return Flow::Reconnect;
                        }
                    }
                }

                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            if !self.emit(ConnectionEvent::Message(text)) {
                                return Flow::Shutdown;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Server closed the connection: {:?}", frame);
                            return Flow::Reconnect;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            warn!("Ignoring {} byte binary message", data.len());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            if closes_connection(&e) {
                                return Flow::Reconnect;
                            }
                        }
                        None => return Flow::Reconnect,
                    }
                }
            }
        }
    }

    /// Sleeps out the backoff while still accepting (and queuing) sends.
    async fn wait_before_reconnect(&mut self) -> Flow {
        let delay = tokio::time::sleep(self.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return Flow::Reconnect,
                outbound = self.outbound_rx.recv() => match outbound {
                    Some(message) => {
                        self.queue.submit(message);
                        debug!("Queued message while disconnected ({} pending)", self.queue.len());
                    }
                    None => return Flow::Shutdown,
                },
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: ConnectionEvent) -> bool {
        self.events_tx.send(event).is_ok()
    }
}

async fn transmit<W>(write: &mut W, message: &ClientMessage) -> Result<(), ClientError>
where
    W: Sink<Message, Error = WsError> + Unpin,
{
    let text = message.encode()?;
    write.send(Message::Text(text)).await?;
    Ok(())
}

/// Whether the socket is unusable after `error`.
fn closes_connection(error: &WsError) -> bool {
    !matches!(error, WsError::Utf8)
}
