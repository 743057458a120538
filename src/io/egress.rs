//! Egress channel between the telemetry pipeline and the publisher
//!
//! The pipeline hands canonical events to a bounded channel; a dedicated
//! publisher task drains it. Sends never block the pipeline: a full
//! channel drops the event and bumps a counter.

use crate::domain::event::CanonicalEvent;
use crate::infra::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

const EGRESS_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EgressSender {
    tx: mpsc::Sender<CanonicalEvent>,
    metrics: Arc<Metrics>,
}

impl EgressSender {
    /// Queue a canonical event for publishing. Never blocks.
    pub fn send(&self, event: CanonicalEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.metrics.record_publish_failure();
                warn!("egress_channel_full");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("egress_channel_closed");
            }
        }
    }
}

pub fn create_egress_channel(
    metrics: Arc<Metrics>,
) -> (EgressSender, mpsc::Receiver<CanonicalEvent>) {
    let (tx, rx) = mpsc::channel(EGRESS_CHANNEL_CAPACITY);
    (EgressSender { tx, metrics }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::EventHeader;
    use chrono::Utc;
    use serde_json::value::RawValue;

    fn sample_event() -> CanonicalEvent {
        CanonicalEvent {
            header: EventHeader::status(Utc::now(), "did:nft:1:0xabc_2".to_string(), String::new()),
            data: RawValue::from_string("{}".to_string()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let metrics = Arc::new(Metrics::new());
        let (sender, mut rx) = create_egress_channel(metrics);

        sender.send(sample_event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.header.event_type, "vehicle.status");
    }

    #[tokio::test]
    async fn test_full_channel_drops_and_counts() {
        let metrics = Arc::new(Metrics::new());
        let (sender, _rx) = create_egress_channel(metrics.clone());

        for _ in 0..EGRESS_CHANNEL_CAPACITY + 3 {
            sender.send(sample_event());
        }
        assert_eq!(metrics.snapshot().publish_failures, 3);
    }
}
