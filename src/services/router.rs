//! Confirmation demultiplexer
//!
//! The vendor delivers enrollment confirmations on one shared stream,
//! unordered and at-least-once. Each `connect` call registers the VINs it
//! is waiting for and gets its own subscription; incoming confirmations
//! are routed by VIN to whichever caller registered it. A confirmation
//! with no registered VIN is a duplicate or traffic for nobody, so it is
//! counted and dropped, never an error.

use crate::domain::types::{ConfirmationEvent, Vin};
use crate::infra::metrics::Metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Per-subscription buffer. Generous relative to batch sizes so routing
/// never blocks the stream reader.
const SUBSCRIPTION_CAPACITY: usize = 64;

pub struct ConfirmationRouter {
    routes: Mutex<HashMap<String, mpsc::Sender<ConfirmationEvent>>>,
    metrics: Arc<Metrics>,
}

impl ConfirmationRouter {
    pub fn new(metrics: Arc<Metrics>) -> Arc<Self> {
        Arc::new(Self { routes: Mutex::new(HashMap::new()), metrics })
    }

    /// Register a set of VINs for one caller. Must happen before the VINs
    /// are submitted to the vendor, otherwise an early confirmation races
    /// the registration and is dropped.
    pub fn subscribe(self: &Arc<Self>, vins: &[Vin]) -> ConfirmationSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let vins: Vec<String> = vins.iter().map(|v| v.as_str().to_string()).collect();
        {
            let mut routes = self.routes.lock();
            for vin in &vins {
                routes.insert(vin.clone(), tx.clone());
            }
        }
        ConfirmationSubscription { rx, router: self.clone(), vins }
    }

    /// Deliver a confirmation to whichever caller registered its VIN.
    pub fn route(&self, event: ConfirmationEvent) {
        let tx = self.routes.lock().get(&event.vin).cloned();
        match tx {
            Some(tx) => {
                if tx.try_send(event).is_ok() {
                    self.metrics.record_confirmation_routed();
                } else {
                    // Subscriber gone or saturated; same as unregistered.
                    self.metrics.record_confirmation_dropped();
                }
            }
            None => {
                debug!(vin = %event.vin, "confirmation_unrouted");
                self.metrics.record_confirmation_dropped();
            }
        }
    }

    fn unregister(&self, vins: &[String]) {
        let mut routes = self.routes.lock();
        for vin in vins {
            routes.remove(vin);
        }
    }

    #[cfg(test)]
    fn registered_count(&self) -> usize {
        self.routes.lock().len()
    }
}

/// One caller's view of the confirmation stream. Registrations are
/// released as VINs resolve and on drop, so abandoned waits never leak
/// routes.
pub struct ConfirmationSubscription {
    rx: mpsc::Receiver<ConfirmationEvent>,
    router: Arc<ConfirmationRouter>,
    vins: Vec<String>,
}

impl ConfirmationSubscription {
    pub async fn recv(&mut self) -> Option<ConfirmationEvent> {
        self.rx.recv().await
    }

    /// Release one VIN's route once its confirmation has been consumed.
    /// Later duplicates for it then count as dropped.
    pub fn resolve(&mut self, vin: &str) {
        if let Some(pos) = self.vins.iter().position(|v| v == vin) {
            let vin = self.vins.swap_remove(pos);
            self.router.unregister(std::slice::from_ref(&vin));
        }
    }
}

impl Drop for ConfirmationSubscription {
    fn drop(&mut self) {
        self.router.unregister(&self.vins);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vin(s: &str) -> Vin {
        Vin::new(s).unwrap()
    }

    fn confirmation(vin: &str, status: &str) -> ConfirmationEvent {
        ConfirmationEvent {
            vin: vin.to_string(),
            external_id: "ext-1".to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn test_routes_to_registered_subscriber() {
        let metrics = Arc::new(Metrics::new());
        let router = ConfirmationRouter::new(metrics.clone());
        let mut sub = router.subscribe(&[vin("1HGCM82633A123456")]);

        router.route(confirmation("1HGCM82633A123456", "succeeded"));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.vin, "1HGCM82633A123456");
        assert_eq!(metrics.snapshot().confirmations_routed, 1);
        assert_eq!(metrics.snapshot().confirmations_dropped, 0);
    }

    #[tokio::test]
    async fn test_unregistered_vin_is_counted_and_dropped() {
        let metrics = Arc::new(Metrics::new());
        let router = ConfirmationRouter::new(metrics.clone());

        router.route(confirmation("1HGCM82633A123456", "succeeded"));

        assert_eq!(metrics.snapshot().confirmations_dropped, 1);
    }

    #[tokio::test]
    async fn test_duplicate_after_resolve_is_dropped() {
        let metrics = Arc::new(Metrics::new());
        let router = ConfirmationRouter::new(metrics.clone());
        let mut sub = router.subscribe(&[vin("1HGCM82633A123456")]);

        router.route(confirmation("1HGCM82633A123456", "succeeded"));
        let event = sub.recv().await.unwrap();
        sub.resolve(&event.vin);

        router.route(confirmation("1HGCM82633A123456", "succeeded"));

        let summary = metrics.snapshot();
        assert_eq!(summary.confirmations_routed, 1);
        assert_eq!(summary.confirmations_dropped, 1);
    }

    #[tokio::test]
    async fn test_two_callers_receive_independently() {
        let metrics = Arc::new(Metrics::new());
        let router = ConfirmationRouter::new(metrics.clone());
        let mut sub_a = router.subscribe(&[vin("1HGCM82633A123456")]);
        let mut sub_b = router.subscribe(&[vin("5YJSA1E26MF123456")]);

        router.route(confirmation("5YJSA1E26MF123456", "pending"));
        router.route(confirmation("1HGCM82633A123456", "succeeded"));

        assert_eq!(sub_a.recv().await.unwrap().vin, "1HGCM82633A123456");
        assert_eq!(sub_b.recv().await.unwrap().vin, "5YJSA1E26MF123456");
    }

    #[tokio::test]
    async fn test_drop_releases_routes() {
        let metrics = Arc::new(Metrics::new());
        let router = ConfirmationRouter::new(metrics.clone());
        {
            let _sub = router.subscribe(&[vin("1HGCM82633A123456"), vin("5YJSA1E26MF123456")]);
            assert_eq!(router.registered_count(), 2);
        }
        assert_eq!(router.registered_count(), 0);
    }
}
