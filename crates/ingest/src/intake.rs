//! Intake - subscriber loop feeding the ingest queue
//!
//! One long-lived task per subscriber connection. Transport errors drive
//! the shared reconnect state machine with a fixed backoff; the loop never
//! terminates on them while the service is running.

use bus::{BusConnection, BusConnector, ConnectionEvent, ConnectionStateHandle, ReconnectPolicy};
use contracts::{RawMessage, TopicPath};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::queue::IngestQueue;

/// Intake configuration
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Topic filters to subscribe to
    pub filters: Vec<String>,

    /// Republished namespace carrying a publisher id as its first segment
    /// after the prefix; subscribed as `<namespace>/+/#` in addition to
    /// the filters above
    pub publisher_namespace: Option<String>,

    /// Reconnect policy
    pub policy: ReconnectPolicy,
}

/// Publisher identity for a topic, honoring the republished namespace.
///
/// Topics outside the namespace carry no identity segment and are
/// recorded as published by "direct".
pub fn extract_publisher(topic: &TopicPath, namespace: Option<&str>) -> String {
    if let Some(namespace) = namespace {
        if topic.has_prefix(namespace) {
            let skip = namespace.trim_end_matches('/').split('/').count();
            if let Some(publisher) = topic.segments().nth(skip) {
                return publisher.to_string();
            }
        }
    }
    "direct".to_string()
}

/// Subscriber loop bound to one bus connector
pub struct Intake<C> {
    connector: C,
    config: IntakeConfig,
    queue: IngestQueue,
    state: ConnectionStateHandle,
    shutdown: watch::Receiver<bool>,
}

/// Handle to a running intake task
pub struct IntakeHandle {
    task: JoinHandle<()>,
    state: ConnectionStateHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl IntakeHandle {
    /// Connection state for health reporting
    pub fn state(&self) -> ConnectionStateHandle {
        self.state.clone()
    }

    /// Request shutdown and await the task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

impl<C> Intake<C>
where
    C: BusConnector + 'static,
    C::Connection: 'static,
{
    /// Spawn the intake loop
    pub fn spawn(connector: C, config: IntakeConfig, queue: IngestQueue) -> IntakeHandle {
        let state = ConnectionStateHandle::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let intake = Intake {
            connector,
            config,
            queue,
            state: state.clone(),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(async move {
            intake.run().await;
        });

        IntakeHandle {
            task,
            state,
            shutdown_tx,
        }
    }

    fn effective_filters(&self) -> Vec<String> {
        let mut filters = self.config.filters.clone();
        if let Some(namespace) = &self.config.publisher_namespace {
            filters.push(format!("{}/+/#", namespace.trim_end_matches('/')));
        }
        filters
    }

    #[instrument(name = "intake_run", skip(self), fields(leg = %self.connector.leg()))]
    async fn run(mut self) {
        let filters = self.effective_filters();
        info!(filters = ?filters, "intake started");

        while !*self.shutdown.borrow() {
            self.state.apply(&ConnectionEvent::AttemptStarted);

            let mut connection = match self.connector.connect().await {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(error = %e, "intake connect failed");
                    self.state.apply(&ConnectionEvent::TransportError(e));
                    if self.backoff().await {
                        break;
                    }
                    continue;
                }
            };

            if let Err(e) = subscribe_all(&mut connection, &filters).await {
                warn!(error = %e, "intake subscribe failed");
                self.state.apply(&ConnectionEvent::TransportError(e));
                if self.backoff().await {
                    break;
                }
                continue;
            }

            self.state.apply(&ConnectionEvent::Established);
            info!("intake connected");

            if self.receive_until_error(&mut connection).await {
                // Clean shutdown requested mid-stream
                let _ = connection.disconnect().await;
                break;
            }

            if self.backoff().await {
                break;
            }
        }

        self.state.apply(&ConnectionEvent::Closed);
        info!("intake stopped");
    }

    /// Receive loop; returns true on shutdown, false on transport error
    async fn receive_until_error(&mut self, connection: &mut C::Connection) -> bool {
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return true;
                    }
                }
                received = connection.recv() => {
                    match received {
                        Ok(message) => {
                            let publisher = extract_publisher(
                                &message.topic,
                                self.config.publisher_namespace.as_deref(),
                            );
                            let raw = RawMessage::new(message.topic, message.payload, publisher);
                            self.queue.try_enqueue(raw);
                        }
                        Err(e) => {
                            warn!(error = %e, "intake transport error");
                            self.state.apply(&ConnectionEvent::TransportError(e));
                            return false;
                        }
                    }
                }
            }
        }
    }

    /// Fixed-delay backoff; returns true if shutdown arrived during it
    async fn backoff(&mut self) -> bool {
        debug!(backoff_secs = self.config.policy.backoff.as_secs(), "intake backing off");
        tokio::select! {
            _ = tokio::time::sleep(self.config.policy.backoff) => false,
            changed = self.shutdown.changed() => {
                changed.is_err() || *self.shutdown.borrow()
            }
        }
    }
}

async fn subscribe_all<Conn: BusConnection>(
    connection: &mut Conn,
    filters: &[String],
) -> Result<(), bus::ConnectionError> {
    for filter in filters {
        connection.subscribe(filter).await?;
    }
    Ok(())
}
