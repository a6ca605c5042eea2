//! rumqttc-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet,
};
use supershow_shared::{BusConfig, BusMessage, QoS};

use crate::transport::{PacketSink, Session, SessionEvent};
use crate::TransportError;

/// rumqttc rejects keepalives under this.
const MIN_KEEPALIVE: Duration = Duration::from_secs(5);

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// Upper bound on polls spent flushing a clean disconnect.
const CLOSE_POLL_LIMIT: usize = 16;

pub fn mqtt_options(config: &BusConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
    options.set_keep_alive(config.keepalive.max(MIN_KEEPALIVE));
    options.set_clean_session(true);
    if let Some(ref username) = config.username {
        options.set_credentials(username, config.password.as_deref().unwrap_or_default());
    }
    options
}

/// Build the request side and the session for `config`. No I/O happens
/// until the session is first polled.
pub fn transport(config: &BusConfig) -> (MqttSink, MqttSession) {
    let (client, event_loop) = AsyncClient::new(mqtt_options(config), REQUEST_CAPACITY);
    (MqttSink { client }, MqttSession { event_loop })
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
}

impl PacketSink for MqttSink {
    fn try_publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.client
            .try_publish(topic, to_rumqttc(qos), retain, payload)
            .map_err(|e| TransportError::request(e.to_string()))
    }

    fn try_subscribe(&self, filter: &str, qos: QoS) -> Result<(), TransportError> {
        self.client
            .try_subscribe(filter, to_rumqttc(qos))
            .map_err(|e| TransportError::request(e.to_string()))
    }

    fn try_disconnect(&self) -> Result<(), TransportError> {
        self.client
            .try_disconnect()
            .map_err(|e| TransportError::request(e.to_string()))
    }
}

pub struct MqttSession {
    event_loop: EventLoop,
}

#[async_trait]
impl Session for MqttSession {
    async fn poll(&mut self) -> Result<SessionEvent, TransportError> {
        match self.event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    Ok(SessionEvent::Connected)
                } else {
                    Err(TransportError::Refused(format!("{:?}", ack.code)))
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                Ok(SessionEvent::Message(BusMessage::new(
                    publish.topic,
                    publish.payload.to_vec(),
                    publish.retain,
                )))
            }
            Ok(Event::Incoming(Packet::Disconnect)) => Ok(SessionEvent::Disconnected),
            Ok(_) => Ok(SessionEvent::Other),
            Err(ConnectionError::ConnectionRefused(code)) => {
                Err(TransportError::Refused(format!("{:?}", code)))
            }
            Err(e) => Err(TransportError::connection(e.to_string())),
        }
    }

    async fn close(&mut self) {
        for _ in 0..CLOSE_POLL_LIMIT {
            match self.event_loop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => return,
                Ok(_) => {}
            }
        }
    }
}
