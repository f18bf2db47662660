//! Built-in subscribers of the gateway's event bus.
//!
//! Each consumer runs on its own task, so a slow or panicking consumer never
//! reaches back into request handling.

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::info;

use crate::dispatch::{Dispatcher, GatewaySignal};

/// Logs every status change for operators.
pub fn spawn_status_logger(dispatcher: &Dispatcher) -> JoinHandle<()> {
    let mut signals = Box::pin(dispatcher.stream("status_logger"));
    tokio::spawn(async move {
        while let Some(signal) = signals.next().await {
            if let GatewaySignal::StatusChanged(event) = signal {
                info!(
                    stage = "dispatch",
                    consumer = "status_logger",
                    kind = event.kind.as_str(),
                    subject_id = event.subject_id.as_deref().unwrap_or(""),
                    subject_login = event.subject_login.as_deref().unwrap_or(""),
                    "stream status changed"
                );
            }
        }
    })
}

/// Records the coarse analytics signal as a labelled counter.
pub fn spawn_analytics_sink(dispatcher: &Dispatcher) -> JoinHandle<()> {
    let mut signals = Box::pin(dispatcher.stream("analytics"));
    tokio::spawn(async move {
        while let Some(signal) = signals.next().await {
            if let GatewaySignal::Analytics(status) = signal {
                counter!("stream_status_analytics_total", "status" => status.as_str())
                    .increment(1);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use streamhook_core::types::{EventKind, NotificationEvent};
    use tokio::time::{sleep, timeout};

    use crate::telemetry;

    #[tokio::test]
    async fn analytics_sink_counts_statuses() {
        let handle = telemetry::init_metrics().expect("metrics");
        let dispatcher = Dispatcher::new();
        let sink = spawn_analytics_sink(&dispatcher);
        let logger = spawn_status_logger(&dispatcher);

        dispatcher.dispatch(NotificationEvent {
            kind: EventKind::Offline,
            subject_id: Some("1337".to_string()),
            subject_login: None,
            subscription_type: "stream.offline".to_string(),
            raw_payload: json!({}),
        });

        timeout(Duration::from_secs(2), async {
            while !handle
                .render()
                .contains("stream_status_analytics_total{status=\"offline\"}")
            {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("analytics counter recorded");

        sink.abort();
        logger.abort();
    }
}
