//! Change notification delivery
//!
//! The monitor publishes one [`HostStatusEvent`] per detected transition
//! through the [`ChangeNotifier`] seam. Delivery is fire-and-forget,
//! at-most-once per call; there is no acknowledgment contract.

use tokio::sync::broadcast;

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::monitor::events::HostStatusEvent;

/// Receives status change events as they are detected.
///
/// Implemented for plain closures, so a logging callback is enough for
/// simple consumers. [`ChannelNotifier`] bridges events onto a tokio
/// broadcast channel for in-process fan-out.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, channel: &str, event: &HostStatusEvent);
}

impl<F> ChangeNotifier for F
where
    F: Fn(&str, &HostStatusEvent) + Send + Sync,
{
    fn publish(&self, channel: &str, event: &HostStatusEvent) {
        self(channel, event);
    }
}

/// Broadcast-channel notifier filtered by channel name.
///
/// Forwards only events published on the channel it was created for,
/// like a receiver registered for a single broadcast action. Subscribers
/// that fell behind or went away are a debug-level detail, not an error.
pub struct ChannelNotifier {
    channel: String,
    sender: broadcast::Sender<HostStatusEvent>,
}

impl ChannelNotifier {
    pub fn new(channel: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            channel: channel.into(),
            sender,
        }
    }

    /// Channel name this notifier forwards.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Subscribes to events published on this notifier's channel.
    pub fn subscribe(&self) -> broadcast::Receiver<HostStatusEvent> {
        self.sender.subscribe()
    }
}

impl ChangeNotifier for ChannelNotifier {
    fn publish(&self, channel: &str, event: &HostStatusEvent) {
        if channel != self.channel {
            tracing::debug!(
                "ignoring event for channel '{}', listening on '{}'",
                channel,
                self.channel
            );
            return;
        }

        if self.sender.send(event.clone()).is_err() {
            tracing::debug!("no subscribers on '{}', dropping event", self.channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionType, Host, Status};

    fn sample_event() -> HostStatusEvent {
        HostStatusEvent::transition(
            Host::new("svc.example.com", 443),
            &Status::new(true, ConnectionType::Wifi),
            &Status::new(false, ConnectionType::Wifi),
        )
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers_to_subscriber() {
        let notifier = ChannelNotifier::new("test.status");
        let mut receiver = notifier.subscribe();

        let event = sample_event();
        notifier.publish("test.status", &event);

        let delivered = receiver.recv().await.expect("event should be delivered");
        assert_eq!(delivered, event);
    }

    #[tokio::test]
    async fn test_channel_notifier_filters_other_channels() {
        let notifier = ChannelNotifier::new("test.status");
        let mut receiver = notifier.subscribe();

        notifier.publish("other.channel", &sample_event());

        assert!(
            receiver.try_recv().is_err(),
            "events on other channels must not be forwarded"
        );
    }

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let notifier = ChannelNotifier::new("test.status");
        notifier.publish("test.status", &sample_event());
    }

    #[test]
    fn test_closure_notifier() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = AtomicUsize::new(0);
        let notifier = |_channel: &str, _event: &HostStatusEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        notifier.publish("any", &sample_event());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
