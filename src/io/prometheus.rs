//! Prometheus metrics HTTP endpoint
//!
//! Exposes gateway counters in Prometheus text format at /metrics.
//! Uses hyper for the HTTP server.

use crate::infra::metrics::{Metrics, MetricsSummary};
use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

fn write_metric(output: &mut String, name: &str, help: &str, typ: MetricType, val: u64) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name} {val}");
}

/// Format all counters in Prometheus text exposition format.
fn format_prometheus_metrics(metrics: &Metrics) -> String {
    let summary = metrics.snapshot();
    let mut output = String::with_capacity(2048);

    write_confirmation_metrics(&mut output, &summary);
    write_telemetry_metrics(&mut output, &summary);
    write_publish_metrics(&mut output, &summary);
    write_metric(
        &mut output,
        "oracle_uptime_seconds",
        "Seconds since the gateway started",
        MetricType::Gauge,
        summary.uptime_secs,
    );

    output
}

fn write_confirmation_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "oracle_confirmations_routed_total",
        "Confirmations delivered to a waiting connect call",
        MetricType::Counter,
        summary.confirmations_routed,
    );
    write_metric(
        output,
        "oracle_confirmations_dropped_total",
        "Confirmations with no registered VIN (duplicate or foreign)",
        MetricType::Counter,
        summary.confirmations_dropped,
    );
}

fn write_telemetry_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "oracle_telemetry_received_total",
        "Telemetry messages parsed off the vendor stream",
        MetricType::Counter,
        summary.telemetry_received,
    );
    write_metric(
        output,
        "oracle_telemetry_dropped_total",
        "Telemetry messages dropped due to channel full",
        MetricType::Counter,
        summary.telemetry_dropped,
    );
    write_metric(
        output,
        "oracle_events_normalized_total",
        "Canonical events successfully normalized",
        MetricType::Counter,
        summary.events_normalized,
    );
    write_metric(
        output,
        "oracle_events_failed_total",
        "Telemetry messages that failed lookup or normalization",
        MetricType::Counter,
        summary.events_failed,
    );
}

fn write_publish_metrics(output: &mut String, summary: &MetricsSummary) {
    write_metric(
        output,
        "oracle_events_published_total",
        "Canonical events accepted by the downstream node",
        MetricType::Counter,
        summary.events_published,
    );
    write_metric(
        output,
        "oracle_publish_failures_total",
        "Publish attempts rejected or failed",
        MetricType::Counter,
        summary.publish_failures,
    );
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    metrics: Arc<Metrics>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = format_prometheus_metrics(&metrics);
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
                .body(Full::new(Bytes::from(body)))
                .expect("static response should not fail"))
        }
        (&Method::GET, "/health") => Ok(Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("ok")))
            .expect("static response should not fail")),
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .expect("static response should not fail")),
    }
}

/// Start the Prometheus metrics HTTP server.
pub async fn start_metrics_server(
    port: u16,
    metrics: Arc<Metrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = %port, "prometheus_metrics_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let metrics = metrics.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let metrics = metrics.clone();
                                async move { handle_request(req, metrics).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "prometheus_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "prometheus_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("prometheus_metrics_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_confirmation_routed();
        metrics.record_confirmation_dropped();
        metrics.record_event_normalized();
        metrics.record_event_published();

        let output = format_prometheus_metrics(&metrics);

        assert!(output.contains("oracle_confirmations_routed_total 1"));
        assert!(output.contains("oracle_confirmations_dropped_total 1"));
        assert!(output.contains("oracle_events_normalized_total 1"));
        assert!(output.contains("oracle_events_published_total 1"));
        assert!(output.contains("# TYPE oracle_uptime_seconds gauge"));
    }
}
