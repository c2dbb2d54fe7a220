use super::*;
use crate::record::{FacilityState, Location};
use std::sync::Mutex;

fn record(id: u64, state: FacilityState) -> Record {
    Record {
        id,
        kind: "ELEVATOR".to_string(),
        description: None,
        location: Location::default(),
        state,
        group_id: 1,
        observed_at: None,
    }
}

struct FailingSink;

impl Sink for FailingSink {
    fn deliver(&self, _message: Message) -> Result<(), DeliveryError> {
        Err(DeliveryError::Closed)
    }
}

/// Unsubscribes itself from inside a delivery
struct SelfRemovingSink {
    publisher: Arc<Publisher>,
    handle: Mutex<Option<SinkHandle>>,
    received: Mutex<Vec<Message>>,
}

impl Sink for SelfRemovingSink {
    fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.received.lock().unwrap().push(message);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            self.publisher.unsubscribe(handle);
        }
        Ok(())
    }
}

#[test]
fn test_publish_reaches_every_subscriber() {
    let publisher = Publisher::default();
    let mut a = publisher.subscribe();
    let mut b = publisher.subscribe();

    let report = publisher.publish(&record(7, FacilityState::Active)).unwrap();
    assert_eq!(report, PublishReport { delivered: 2, failed: 0 });

    let expected = serde_json::to_string(&record(7, FacilityState::Active)).unwrap();
    assert_eq!(&*a.try_recv().unwrap(), expected.as_str());
    assert_eq!(&*b.try_recv().unwrap(), expected.as_str());
}

#[test]
fn test_failing_sink_does_not_affect_others() {
    let publisher = Publisher::default();
    publisher.attach(Arc::new(FailingSink));
    let mut b = publisher.subscribe();

    let report = publisher.publish(&record(7, FacilityState::Active)).unwrap();
    assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
    assert!(b.try_recv().is_some());
}

#[test]
fn test_disconnected_receiver_is_isolated() {
    let publisher = Publisher::default();
    let a = publisher.subscribe();
    let mut b = publisher.subscribe();

    // Client A went away without unsubscribing yet
    drop(a);

    let report = publisher.publish(&record(1, FacilityState::Inactive)).unwrap();
    assert_eq!(report.failed, 1);
    assert!(b.try_recv().is_some());
}

#[test]
fn test_full_sink_drops_message_without_blocking_others() {
    let publisher = Publisher::new(1);
    let mut slow = publisher.subscribe();
    let mut fast = publisher.subscribe();

    publisher.publish(&record(1, FacilityState::Active)).unwrap();
    assert!(fast.try_recv().is_some());

    // slow never read its first message; its buffer is full
    let report = publisher.publish(&record(2, FacilityState::Active)).unwrap();
    assert_eq!(report, PublishReport { delivered: 1, failed: 1 });
    assert!(fast.try_recv().is_some());

    // slow still has only the first message
    let first: Record = serde_json::from_str(&slow.try_recv().unwrap()).unwrap();
    assert_eq!(first.id, 1);
    assert!(slow.try_recv().is_none());
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let publisher = Publisher::default();
    let sub = publisher.subscribe();
    let handle = sub.handle();

    assert_eq!(publisher.subscriber_count(), 1);
    assert!(publisher.unsubscribe(handle));
    assert!(!publisher.unsubscribe(handle));
    assert_eq!(publisher.subscriber_count(), 0);

    // A handle from another publisher is unknown here
    let other = Publisher::default().subscribe();
    assert!(!publisher.unsubscribe(other.handle()));
}

#[test]
fn test_unsubscribed_sink_receives_nothing_more() {
    let publisher = Publisher::default();
    let mut sub = publisher.subscribe();

    publisher.publish(&record(1, FacilityState::Active)).unwrap();
    publisher.unsubscribe(sub.handle());
    publisher.publish(&record(2, FacilityState::Active)).unwrap();

    assert!(sub.try_recv().is_some());
    assert!(sub.try_recv().is_none());
}

#[test]
fn test_late_subscriber_gets_no_replay() {
    let publisher = Publisher::default();
    publisher.publish(&record(1, FacilityState::Active)).unwrap();

    let mut late = publisher.subscribe();
    assert!(late.try_recv().is_none());

    publisher.publish(&record(2, FacilityState::Active)).unwrap();
    let received: Record = serde_json::from_str(&late.try_recv().unwrap()).unwrap();
    assert_eq!(received.id, 2);
}

#[test]
fn test_publish_without_subscribers() {
    let publisher = Publisher::default();
    let report = publisher.publish(&record(1, FacilityState::Active)).unwrap();
    assert_eq!(report, PublishReport::default());
}

#[test]
fn test_unsubscribe_during_publish() {
    let publisher = Arc::new(Publisher::default());
    let sink = Arc::new(SelfRemovingSink {
        publisher: Arc::clone(&publisher),
        handle: Mutex::new(None),
        received: Mutex::new(Vec::new()),
    });
    let handle = publisher.attach(sink.clone());
    *sink.handle.lock().unwrap() = Some(handle);
    let mut other = publisher.subscribe();

    let report = publisher.publish(&record(1, FacilityState::Active)).unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(publisher.subscriber_count(), 1);
    assert!(other.try_recv().is_some());

    publisher.publish(&record(2, FacilityState::Active)).unwrap();
    assert_eq!(sink.received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_subscribe_and_publish() {
    let publisher = Arc::new(Publisher::default());
    let mut steady = publisher.subscribe();

    let churn = {
        let publisher = Arc::clone(&publisher);
        tokio::spawn(async move {
            for _ in 0..100 {
                let sub = publisher.subscribe();
                tokio::task::yield_now().await;
                publisher.unsubscribe(sub.handle());
            }
        })
    };

    for id in 0..50 {
        publisher.publish(&record(id, FacilityState::Active)).unwrap();
        tokio::task::yield_now().await;
    }
    churn.await.unwrap();

    let mut count = 0;
    while steady.try_recv().is_some() {
        count += 1;
    }
    assert_eq!(count, 50);
    assert_eq!(publisher.subscriber_count(), 1);
}

#[tokio::test]
async fn test_close_all_ends_subscriptions() {
    let publisher = Publisher::default();
    let mut sub = publisher.subscribe();
    publisher.publish(&record(1, FacilityState::Active)).unwrap();

    publisher.close_all();

    assert_eq!(publisher.subscriber_count(), 0);
    assert!(sub.recv().await.is_some());
    assert!(sub.recv().await.is_none());
}
