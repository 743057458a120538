//! MQTT client for the vendor's confirmation and telemetry streams
//!
//! Both streams arrive over one broker connection. Confirmations are
//! handed straight to the confirmation router; telemetry goes to the
//! pipeline channel via try_send so a slow pipeline can never stall the
//! MQTT eventloop.

use crate::domain::telemetry::VendorMessage;
use crate::domain::types::ConfirmationEvent;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::services::router::ConfirmationRouter;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Start the MQTT client and dispatch incoming messages by topic.
pub async fn start_mqtt_client(
    config: &Config,
    router: Arc<ConfirmationRouter>,
    telemetry_tx: mpsc::Sender<VendorMessage>,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut mqttoptions =
        MqttOptions::new("oracle-gateway", config.mqtt_host(), config.mqtt_port());
    mqttoptions.set_keep_alive(Duration::from_secs(30));

    if let (Some(username), Some(password)) = (config.mqtt_username(), config.mqtt_password()) {
        mqttoptions.set_credentials(username, password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqttoptions, 100);
    client.subscribe(config.mqtt_confirmations_topic(), QoS::AtLeastOnce).await?;
    client.subscribe(config.mqtt_telemetry_topic(), QoS::AtMostOnce).await?;

    info!(
        confirmations_topic = %config.mqtt_confirmations_topic(),
        telemetry_topic = %config.mqtt_telemetry_topic(),
        host = %config.mqtt_host(),
        port = %config.mqtt_port(),
        "MQTT client subscribed"
    );

    let confirmations_topic = config.mqtt_confirmations_topic().to_string();
    let telemetry_topic = config.mqtt_telemetry_topic().to_string();

    // Rate-limit drop warnings to 1 per second
    let mut last_drop_warn = Instant::now() - Duration::from_secs(2);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("mqtt_shutdown");
                    return Ok(());
                }
            }
            result = eventloop.poll() => {
                match result {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = &publish.topic;
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(s) => s,
                            Err(e) => {
                                warn!(topic = %topic, error = %e, "Invalid UTF-8 in MQTT payload");
                                continue;
                            }
                        };

                        if topic == &confirmations_topic {
                            handle_confirmation(payload, &router);
                        } else if topic == &telemetry_topic {
                            handle_telemetry(
                                payload,
                                &telemetry_tx,
                                &metrics,
                                &mut last_drop_warn,
                            );
                        } else {
                            debug!(topic = %topic, "mqtt_unexpected_topic");
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("MQTT connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
    }
}

fn handle_confirmation(payload: &str, router: &ConfirmationRouter) {
    match serde_json::from_str::<ConfirmationEvent>(payload) {
        Ok(event) => {
            debug!(vin = %event.vin, status = %event.status, "confirmation_received");
            router.route(event);
        }
        Err(e) => {
            warn!(error = %e, "Failed to parse confirmation");
        }
    }
}

fn handle_telemetry(
    payload: &str,
    telemetry_tx: &mpsc::Sender<VendorMessage>,
    metrics: &Metrics,
    last_drop_warn: &mut Instant,
) {
    let message: VendorMessage = match serde_json::from_str(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "Failed to parse telemetry message");
            return;
        }
    };

    metrics.record_telemetry_received();
    if let Err(e) = telemetry_tx.try_send(message) {
        match e {
            TrySendError::Full(_) => {
                metrics.record_telemetry_dropped();
                if last_drop_warn.elapsed() > Duration::from_secs(1) {
                    warn!("telemetry_dropped: channel full");
                    *last_drop_warn = Instant::now();
                }
            }
            TrySendError::Closed(_) => {
                warn!("Telemetry channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_handle_telemetry_parses_and_forwards() {
        let metrics = Metrics::new();
        let (tx, mut rx) = mpsc::channel(4);
        let mut last_warn = Instant::now();

        let payload = r#"{
            "id": "msg-1",
            "dataType": "vehicle/status",
            "vehicleId": "ext-9",
            "timestamp": "2024-05-01T12:00:00Z",
            "data": {"speed": {"value": 55.0}}
        }"#;
        handle_telemetry(payload, &tx, &metrics, &mut last_warn);

        let message = rx.recv().await.unwrap();
        assert_eq!(message.vehicle_id, "ext-9");
        assert_eq!(metrics.snapshot().telemetry_received, 1);
        assert_eq!(metrics.snapshot().telemetry_dropped, 0);
    }

    #[tokio::test]
    async fn test_handle_telemetry_counts_drops_when_full() {
        let metrics = Metrics::new();
        let (tx, _rx) = mpsc::channel(1);
        let mut last_warn = Instant::now();

        let payload = r#"{
            "id": "msg-1",
            "dataType": "vehicle/status",
            "vehicleId": "ext-9",
            "timestamp": "2024-05-01T12:00:00Z",
            "data": {}
        }"#;
        handle_telemetry(payload, &tx, &metrics, &mut last_warn);
        handle_telemetry(payload, &tx, &metrics, &mut last_warn);

        let summary = metrics.snapshot();
        assert_eq!(summary.telemetry_received, 2);
        assert_eq!(summary.telemetry_dropped, 1);
    }

    #[test]
    fn test_handle_telemetry_bad_json_is_ignored() {
        let metrics = Metrics::new();
        let (tx, _rx) = mpsc::channel::<VendorMessage>(1);
        let mut last_warn = Instant::now();

        handle_telemetry("not json", &tx, &metrics, &mut last_warn);
        assert_eq!(metrics.snapshot().telemetry_received, 0);
    }
}
