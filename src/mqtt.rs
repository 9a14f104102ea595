use std::time::Duration;

use log::{debug, error, info};
use rumqttc::{MqttOptions, QoS, SubscribeFilter};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config;
use crate::messages::{BeaconPresence, PresenceAnnouncement, ScanCommand};

#[derive(Debug, Clone)]
pub struct MqttClient {
    client: rumqttc::AsyncClient,
    publisher_id: String,
    topic_path: String,
}

#[derive(Debug, Serialize)]
struct PresenceMqttMessage {
    name: String,
    #[serde(rename = "id")]
    uuid: String,
    confidence: u8,
    retained: bool,
}

impl MqttClient {
    pub fn new(config: &config::MqttConfig) -> (Self, rumqttc::EventLoop) {
        let publisher_id = config
            .publisher_id
            .as_ref()
            .unwrap_or(&"gallery-beacon".to_string())
            .to_string();

        let mut mqttoptions = MqttOptions::new(
            publisher_id.clone(),
            config.host.clone(),
            config.port.unwrap_or(1883),
        );

        mqttoptions.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));

        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            mqttoptions.set_credentials(username.clone(), password.clone());
        }

        let (client, eventloop) = rumqttc::AsyncClient::new(mqttoptions, 10);

        (
            MqttClient {
                client,
                publisher_id,
                topic_path: config.topic_path.clone().unwrap_or("beacon".to_string()),
            },
            eventloop,
        )
    }

    pub async fn subscribe(&self) -> Result<(), rumqttc::ClientError> {
        self.client
            .subscribe_many(vec![SubscribeFilter::new(
                format!("{}/scan/restart", self.topic_path),
                QoS::AtMostOnce,
            )])
            .await?;

        Ok(())
    }

    pub async fn event_loop(
        &self,
        eventloop: &mut rumqttc::EventLoop,
        tx: broadcast::Sender<ScanCommand>,
    ) {
        loop {
            match eventloop.poll().await {
                Ok(notification) => match notification {
                    rumqttc::Event::Incoming(rumqttc::Packet::Publish(p)) => {
                        debug!("Received MQTT message on topic {}: {:?}", p.topic, p.payload);

                        if !p.topic.ends_with("/restart") {
                            continue;
                        }
                        if let Err(err) = tx.send(ScanCommand::Restart) {
                            error!("Error announcing scan restart: {:?}", err);
                        }
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::SubAck(_)) => {
                        debug!("Subscription acknowledged");
                    }
                    rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
                        debug!("Connection acknowledged");
                        if let Err(err) = self.subscribe().await {
                            error!("Error subscribing to MQTT topics: {:?}", err);
                        }
                    }
                    _ => {}
                },
                Err(e) => {
                    error!("Error polling MQTT event loop: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    pub async fn announce_presence(
        &self,
        announcement: &PresenceAnnouncement,
    ) -> Result<(), rumqttc::ClientError> {
        let confidence = match announcement.presence {
            BeaconPresence::Present => 100,
            BeaconPresence::Absent => 0,
        };
        info!(
            "Announcing beacon {} (confidence: {}) on MQTT",
            announcement.name, confidence
        );
        let message = PresenceMqttMessage {
            name: announcement.name.clone(),
            uuid: announcement.uuid.to_string(),
            confidence,
            retained: false,
        };
        let channel_name = sanitize_name(&announcement.name);
        self.client
            .publish(
                format!("{}/{}/{}", self.topic_path, self.publisher_id, channel_name),
                QoS::AtMostOnce,
                false,
                serde_json::to_string(&message).unwrap(),
            )
            .await
    }

    pub async fn disconnect(&self) -> Result<(), rumqttc::ClientError> {
        debug!("Disconnecting MQTT client");
        self.client.disconnect().await
    }
}

fn sanitize_name(name: &str) -> String {
    // Remove any non-alphanumeric characters and replace spaces with underscores
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
}
