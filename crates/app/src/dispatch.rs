//! In-process event bus between the webhook gateway and its consumers.
//!
//! Delivery is best-effort: the gateway never waits on consumers, a consumer
//! that falls more than the channel capacity behind loses the oldest
//! signals, and publishing with nobody subscribed drops the signal.

use metrics::counter;
use streamhook_core::types::{EventKind, NotificationEvent, StreamStatus};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::errors::BroadcastStreamRecvError, wrappers::BroadcastStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 256;

/// Signals published for every dispatched notification.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewaySignal {
    /// Full status change for the subscription registry.
    StatusChanged(NotificationEvent),
    /// Status-only signal for the analytics sink.
    Analytics(StreamStatus),
}

impl GatewaySignal {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StatusChanged(_) => "status_changed",
            Self::Analytics(_) => "analytics",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::StatusChanged(event) => event.kind,
            Self::Analytics(StreamStatus::Online) => EventKind::Online,
            Self::Analytics(StreamStatus::Offline) => EventKind::Offline,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    sender: broadcast::Sender<GatewaySignal>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Hands `event` to the bus without waiting for it to be published.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, event: NotificationEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.publish_event(event);
        });
    }

    /// Publishes both signals for `event` on the current task.
    pub fn publish_event(&self, event: NotificationEvent) {
        let kind = event.kind;
        counter!("eventsub_dispatched_total", "kind" => kind.as_str()).increment(1);
        self.publish(GatewaySignal::Analytics(StreamStatus::from(kind)));
        self.publish(GatewaySignal::StatusChanged(event));
    }

    fn publish(&self, signal: GatewaySignal) {
        let name = signal.name();
        let kind = signal.kind().as_str();
        match self.sender.send(signal) {
            Ok(receivers) => {
                debug!(stage = "dispatch", signal = name, kind, receivers, "signal published");
            }
            Err(_) => {
                warn!(
                    stage = "dispatch",
                    signal = name,
                    kind,
                    "no consumers subscribed, signal dropped"
                );
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewaySignal> {
        self.sender.subscribe()
    }

    /// Subscribes as a stream that skips over lag instead of ending.
    pub fn stream(
        &self,
        consumer: &'static str,
    ) -> impl Stream<Item = GatewaySignal> + Send + 'static {
        BroadcastStream::new(self.subscribe()).filter_map(move |result| match result {
            Ok(signal) => Some(signal),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(stage = "dispatch", consumer, skipped, "consumer lagged, signals dropped");
                None
            }
        })
    }
}
