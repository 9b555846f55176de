//! Push-event channel
//!
//! Events go out on a tokio broadcast channel. A transport attaches by
//! subscribing; with no subscriber attached an event is dropped, never
//! queued or retried.

use tokio::sync::broadcast;

use super::envelope::Event;

/// Default buffer size for the event broadcast channel
pub const EVENT_CHANNEL_SIZE: usize = 256;

/// Sender half of the event channel (held by the Router)
pub type EventSender = broadcast::Sender<Event>;

/// Receiver half of the event channel (held by a transport)
pub type EventReceiver = broadcast::Receiver<Event>;

/// Create a new event broadcast channel
///
/// Returns the sender. Receivers are created by calling `sender.subscribe()`.
pub fn create_event_channel() -> EventSender {
    let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
    tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_event_broadcast() {
        let tx = create_event_channel();
        let mut rx1 = tx.subscribe();
        let mut rx2 = tx.subscribe();

        tx.send(Event::new("app.ready", json!(null))).unwrap();

        assert_eq!(rx1.recv().await.unwrap().event, "app.ready");
        assert_eq!(rx2.recv().await.unwrap().event, "app.ready");
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_events() {
        let tx = create_event_channel();
        let mut early = tx.subscribe();

        tx.send(Event::new("one", json!(1))).unwrap();
        let mut late = tx.subscribe();
        tx.send(Event::new("two", json!(2))).unwrap();

        assert_eq!(early.recv().await.unwrap().event, "one");
        assert_eq!(early.recv().await.unwrap().event, "two");
        assert_eq!(late.recv().await.unwrap().event, "two");
    }

    #[test]
    fn test_send_without_subscribers_fails() {
        let tx = create_event_channel();
        assert!(tx.send(Event::new("nobody", json!(null))).is_err());
    }
}
