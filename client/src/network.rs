use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionHandle, ConnectionManager};
use crate::error::ClientError;
use crate::game::ClientGameState;
use crate::input::{InputEmitter, InputEvent};
use crate::sink::EntitySink;
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Owns the session state and is its only mutator.
pub struct Client<S: EntitySink> {
    config: ClientConfig,
    connection: ConnectionHandle,
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    connection_task: JoinHandle<()>,

    game_state: ClientGameState,
    input_emitter: InputEmitter,
    sink: S,

    messages_received: u64,
    messages_dropped: u64,
}

impl<S: EntitySink> Client<S> {
    /// Validates the config and starts connecting in the background.
    pub fn new(config: ClientConfig, sink: S) -> Result<Self, ClientError> {
        config.validate()?;

        let (connection, events, connection_task) =
            ConnectionManager::spawn(&config.server_url, config.reconnect_delay);

        Ok(Client {
            config,
            connection,
            events,
            connection_task,
            game_state: ClientGameState::new(),
            input_emitter: InputEmitter::new(),
            sink,
            messages_received: 0,
            messages_dropped: 0,
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    /// Inbound messages received and those that failed to decode.
    pub fn message_counts(&self) -> (u64, u64) {
        (self.messages_received, self.messages_dropped)
    }

    pub fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Connected => {
                info!("Session started, waiting for player ID");
                self.game_state.begin_session();
            }
            ConnectionEvent::Disconnected => {
                warn!("Disconnected from server");
                self.game_state.end_session(&mut self.sink);
            }
            ConnectionEvent::Message(text) => {
                self.messages_received += 1;
                match ServerMessage::decode(&text) {
                    Ok(message) => self
                        .game_state
                        .handle_server_message(message, &mut self.sink),
                    Err(e) => {
                        self.messages_dropped += 1;
                        warn!("Dropping server message: {}", e);
                    }
                }
            }
        }
    }

    /// Turns one input event into at most one intent and hands it to the connection.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<ClientMessage> {
        let position = self
            .game_state
            .local_player()
            .map(|entity| entity.state.position);
        let message =
            self.input_emitter
                .handle(&event, self.game_state.identity.get(), position)?;

        if self.config.prediction_enabled {
            self.game_state.predict_action(&message, &mut self.sink);
        }

        debug!("Sending {:?}", message);
        if !self.connection.send(message.clone()) {
            error!("Connection manager is gone, dropping {:?}", message);
        }
        Some(message)
    }

    /// Processes connection events, input and render ticks until the
    /// connection manager stops.
    pub async fn run(&mut self, mut inputs: mpsc::Receiver<InputEvent>) {
        let mut render_interval = interval(self.config.render_interval);
        render_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut inputs_open = true;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_connection_event(event),
                    None => {
                        info!("Connection closed for good");
                        return;
                    }
                },

                input = inputs.recv(), if inputs_open => match input {
                    Some(event) => {
                        self.handle_input(event);
                    }
                    None => {
                        debug!("Input source closed");
                        inputs_open = false;
                    }
                },

                _ = render_interval.tick() => {
                    self.sink.on_render_tick(&self.game_state.directory);
                },
            }
        }
    }

    /// Stops the connection manager and waits for it to exit.
    pub async fn shutdown(self) {
        let Client {
            connection,
            connection_task,
            ..
        } = self;
        drop(connection);
        if let Err(e) = connection_task.await {
            error!("Connection task failed: {}", e);
        }
    }
}
