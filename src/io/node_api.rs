//! Publisher for canonical events
//!
//! Drains the egress channel and POSTs each canonical event to the
//! downstream node's ingest endpoint. Rejections are logged and counted;
//! a bad event is never retried, so one poison message cannot wedge the
//! pipeline.

use crate::domain::event::CanonicalEvent;
use crate::infra::metrics::Metrics;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub struct NodePublisher {
    client: reqwest::Client,
    url: String,
    metrics: Arc<Metrics>,
}

impl NodePublisher {
    pub fn new(url: impl Into<String>, metrics: Arc<Metrics>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), metrics }
    }

    async fn publish(&self, event: &CanonicalEvent) {
        let result = self.client.post(&self.url).json(event).send().await;
        match result {
            Ok(response) if response.status().is_success() => {
                self.metrics.record_event_published();
                debug!(event_id = %event.header.id, "event_published");
            }
            Ok(response) => {
                self.metrics.record_publish_failure();
                warn!(
                    event_id = %event.header.id,
                    status = %response.status().as_u16(),
                    "event_rejected"
                );
            }
            Err(e) => {
                self.metrics.record_publish_failure();
                warn!(event_id = %event.header.id, error = %e, "event_publish_failed");
            }
        }
    }

    /// Run the publisher loop until shutdown or the channel closes.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<CanonicalEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(url = %self.url, "node_publisher_started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("node_publisher_shutdown");
                        return;
                    }
                }
                event = rx.recv() => {
                    match event {
                        Some(event) => self.publish(&event).await,
                        None => {
                            info!("egress_channel_closed_stopping_publisher");
                            return;
                        }
                    }
                }
            }
        }
    }
}
