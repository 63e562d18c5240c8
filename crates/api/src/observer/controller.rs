//! Observer reconnection controller.
//!
//! A single driver task owns the whole lifecycle, which structurally
//! guarantees at most one pending reconnection at any time: scheduling is a
//! cancellable sleep inside the loop, and a manual trigger interrupts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::connector::{ObserverConnection, ObserverConnector};

/// Connection lifecycle as observed from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Disconnected,
    Connecting,
    Connected,
    /// Retry budget exhausted; only a manual trigger restarts the cycle.
    Failed,
}

/// Automatic retry policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

enum Command {
    Reconnect,
    Shutdown,
}

/// How an established session ended.
enum SessionEnd {
    /// The connection closed or errored on its own.
    Dropped,
    /// A manual trigger asked for a fresh connection.
    Reconnect,
    Shutdown,
}

/// Handle to a running controller.
pub struct ObserverHandle {
    /// Lifecycle updates.
    pub state: watch::Receiver<ObserverState>,
    /// Text messages received from the hub.
    pub readings: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl ObserverHandle {
    /// Manually restart the connection cycle. Resets the attempt counter and
    /// cancels any pending scheduled reconnection.
    pub fn trigger_reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Stop the controller and close any open connection.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

pub struct ObserverController {
    connector: Arc<dyn ObserverConnector>,
    url: String,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<ObserverState>,
    readings_tx: mpsc::UnboundedSender<String>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl ObserverController {
    /// Spawn the controller; it starts connecting immediately.
    pub fn spawn(
        connector: Arc<dyn ObserverConnector>,
        url: String,
        policy: ReconnectPolicy,
    ) -> ObserverHandle {
        let (state_tx, state_rx) = watch::channel(ObserverState::Disconnected);
        let (readings_tx, readings_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let controller = Self {
            connector,
            url,
            policy,
            state_tx,
            readings_tx,
            commands: commands_rx,
        };
        let task = tokio::spawn(controller.run());

        ObserverHandle {
            state: state_rx,
            readings: readings_rx,
            commands: commands_tx,
            task,
        }
    }

    fn set_state(&self, state: ObserverState) {
        let _ = self.state_tx.send(state);
    }

    async fn run(mut self) {
        let mut attempts: u32 = 0;

        loop {
            // Counter increments before the attempt begins; a successful
            // open resets it.
            attempts += 1;
            self.set_state(ObserverState::Connecting);
            info!(
                attempt = attempts,
                max = self.policy.max_attempts,
                "connecting to hub"
            );

            match self.connector.connect(&self.url).await {
                Ok(connection) => {
                    attempts = 0;
                    self.set_state(ObserverState::Connected);
                    info!("connected to hub");
                    match self.drive_connection(connection).await {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Reconnect => {
                            self.set_state(ObserverState::Disconnected);
                            continue;
                        }
                        SessionEnd::Dropped => {
                            self.set_state(ObserverState::Disconnected);
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, attempt = attempts, "connect attempt failed");
                    self.set_state(ObserverState::Disconnected);
                }
            }

            if attempts >= self.policy.max_attempts {
                warn!("maximum reconnection attempts reached; manual restart required");
                self.set_state(ObserverState::Failed);
                // Automatic retries stop here; wait for a manual trigger.
                loop {
                    match self.commands.recv().await {
                        Some(Command::Reconnect) => {
                            attempts = 0;
                            break;
                        }
                        Some(Command::Shutdown) | None => return,
                    }
                }
                continue;
            }

            // One scheduled reconnection, cancellable by a manual trigger.
            info!(delay = ?self.policy.delay, "scheduling reconnect");
            tokio::select! {
                _ = tokio::time::sleep(self.policy.delay) => {}
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => {
                        attempts = 0;
                    }
                    Some(Command::Shutdown) | None => {
                        self.set_state(ObserverState::Disconnected);
                        return;
                    }
                },
            }
        }
    }

    /// Pump messages until the connection ends or a command interrupts it.
    async fn drive_connection(&mut self, mut connection: Box<dyn ObserverConnection>) -> SessionEnd {
        loop {
            tokio::select! {
                message = connection.next_message() => match message {
                    Some(text) => {
                        let _ = self.readings_tx.send(text);
                    }
                    None => return SessionEnd::Dropped,
                },
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => {
                        connection.close().await;
                        return SessionEnd::Reconnect;
                    }
                    Some(Command::Shutdown) | None => {
                        connection.close().await;
                        self.set_state(ObserverState::Disconnected);
                        return SessionEnd::Shutdown;
                    }
                },
            }
        }
    }
}
