//! MQTT connector backed by rumqttc
//!
//! Real-broker implementation of the bus traits, enabled by the
//! `real-mqtt` feature. One `MqttConnection` owns both the async client
//! and its event loop; any event-loop error surfaces as a typed
//! `ConnectionError` and the session is re-established by the caller.

use bytes::Bytes;
use contracts::{BusEndpoint, QosLevel};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tracing::{debug, instrument, trace};

use crate::client::{BusConnection, BusConnector, BusMessage};
use crate::error::ConnectionError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Connector for one MQTT broker leg
#[derive(Clone)]
pub struct MqttConnector {
    endpoint: BusEndpoint,
    leg: String,
}

impl MqttConnector {
    /// Create a connector for the given endpoint
    pub fn new(endpoint: BusEndpoint, leg: impl Into<String>) -> Self {
        Self {
            endpoint,
            leg: leg.into(),
        }
    }

    fn client_id(&self) -> String {
        self.endpoint
            .client_id
            .clone()
            .unwrap_or_else(|| format!("topic-curator-{}-{}", self.leg, std::process::id()))
    }
}

impl BusConnector for MqttConnector {
    type Connection = MqttConnection;

    fn leg(&self) -> &str {
        &self.leg
    }

    #[instrument(name = "mqtt_connect", skip(self), fields(leg = %self.leg))]
    async fn connect(&self) -> Result<MqttConnection, ConnectionError> {
        let mut options = MqttOptions::new(
            self.client_id(),
            self.endpoint.host.clone(),
            self.endpoint.port,
        );
        if let (Some(user), Some(pass)) = (&self.endpoint.username, &self.endpoint.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, EVENT_CHANNEL_CAPACITY);

        // Wait for the broker handshake so connect failures surface here
        // instead of on the first recv.
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => break,
                Ok(_) => continue,
                Err(e) => {
                    return Err(ConnectionError::connect_failed(&self.leg, e.to_string()));
                }
            }
        }

        debug!(leg = %self.leg, host = %self.endpoint.host, port = self.endpoint.port, "mqtt connected");

        Ok(MqttConnection {
            client,
            eventloop,
            leg: self.leg.clone(),
        })
    }
}

/// One live MQTT session
pub struct MqttConnection {
    client: AsyncClient,
    eventloop: EventLoop,
    leg: String,
}

fn to_mqtt_qos(qos: QosLevel) -> QoS {
    match qos {
        QosLevel::AtMostOnce => QoS::AtMostOnce,
        QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        QosLevel::ExactlyOnce => QoS::ExactlyOnce,
    }
}

impl BusConnection for MqttConnection {
    async fn subscribe(&mut self, filter: &str) -> Result<(), ConnectionError> {
        self.client
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .map_err(|e| ConnectionError::subscribe_failed(filter, e.to_string()))
    }

    async fn recv(&mut self) -> Result<BusMessage, ConnectionError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    trace!(leg = %self.leg, topic = %publish.topic, "mqtt message received");
                    return Ok(BusMessage::new(
                        publish.topic.as_str(),
                        Bytes::from(publish.payload.to_vec()),
                    ));
                }
                Ok(_) => continue,
                Err(e) => return Err(ConnectionError::lost(e.to_string())),
            }
        }
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: Bytes,
        qos: QosLevel,
    ) -> Result<(), ConnectionError> {
        // No retain flag; delivery acknowledgement is pipelined by the
        // event loop, not awaited per message.
        self.client
            .publish(topic, to_mqtt_qos(qos), false, payload)
            .await
            .map_err(|e| ConnectionError::publish_failed(topic, e.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), ConnectionError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| ConnectionError::lost(e.to_string()))
    }
}
