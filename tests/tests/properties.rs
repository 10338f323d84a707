//! Property-based invariants: offline round-trip, dedup uniqueness, and
//! scroll threshold one-shot behavior.

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;

use tracker_collectors::{Collector, ScrollCollector};
use tracker_core::util::DedupSet;
use tracker_core::{
    EventPriority, EventType, OfflineConfig, PartialEvent, ScrollConfig, TrackEvent,
};
use tracker_host::{ManualClock, MemoryStorage, Window};
use tracker_transport::OfflineBuffer;

fn event(id: String, timestamp: i64) -> TrackEvent {
    TrackEvent {
        id,
        event_type: EventType::Custom,
        name: "prop_event".into(),
        timestamp,
        url: "https://example.com/".into(),
        session_id: "s-1".into(),
        page_id: "p-1".into(),
        title: None,
        data: None,
        target: None,
        user_id: None,
        device: None,
        priority: EventPriority::Normal,
        retry_count: 0,
        properties: Default::default(),
        route: None,
        component: None,
        page: None,
    }
}

proptest! {
    /// Offline round-trip: save then load yields exactly the unexpired
    /// events, in order.
    #[test]
    fn prop_offline_round_trip(
        ages in proptest::collection::vec(0i64..48 * 60 * 60 * 1000, 1..40)
    ) {
        let now = 1_700_000_000_000i64;
        let expire_ms = 24 * 60 * 60 * 1000i64;
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(now));
        let buffer = OfflineBuffer::new(
            storage,
            OfflineConfig::default(),
            clock,
        );

        let events: Vec<TrackEvent> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| event(format!("id-{}", i), now - age))
            .collect();
        buffer.save(&events);

        let loaded = buffer.load();
        let expected: Vec<&TrackEvent> =
            events.iter().filter(|e| now - e.timestamp <= expire_ms).collect();
        prop_assert_eq!(loaded.len(), expected.len());
        for (got, want) in loaded.iter().zip(expected) {
            prop_assert_eq!(&got.id, &want.id);
        }
        // Drained after load.
        prop_assert!(buffer.load().is_empty());
    }

    /// Dedup uniqueness: whatever the insertion sequence, a key is accepted
    /// at most once per residency in the window.
    #[test]
    fn prop_dedup_no_duplicate_accepts(
        keys in proptest::collection::vec(0u32..50, 1..200)
    ) {
        let mut set = DedupSet::new(1000);
        let mut accepted = Vec::new();
        for key in &keys {
            if set.insert(key.to_string()) {
                accepted.push(*key);
            }
        }
        // Within a window larger than the input, every key is accepted
        // exactly once.
        let mut unique = accepted.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), accepted.len());
    }

    /// Scroll one-shot: for a monotonically increasing depth sequence, each
    /// threshold produces at most one event naming it as crossed.
    #[test]
    fn prop_scroll_thresholds_one_shot(
        steps in proptest::collection::vec(1.0f64..800.0, 1..30)
    ) {
        let window = Window::builder()
            .with_manual_clock(1_000_000)
            .with_viewport(1280, 800)
            .with_page_size(1280.0, 4800.0)
            .build();
        let collector = ScrollCollector::new(ScrollConfig::default());
        let events: Arc<Mutex<Vec<PartialEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        collector.install(
            &window,
            Arc::new(move |e| {
                sink.lock().push(e);
            }),
        );

        let mut top = 0.0;
        for step in steps {
            top = (top + step).min(4000.0);
            window.scroll_to(0.0, top);
            window.advance(600).unwrap();
        }

        let mut crossed_total: Vec<u8> = Vec::new();
        for e in events.lock().iter() {
            match e.data.as_ref().unwrap() {
                tracker_core::EventData::Scroll(s) => {
                    crossed_total.extend(&s.thresholds_crossed)
                }
                other => prop_assert!(false, "wrong payload: {:?}", other),
            }
        }
        let mut unique = crossed_total.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), crossed_total.len(), "threshold crossed twice");
        for t in &crossed_total {
            prop_assert!([25u8, 50, 75, 100].contains(t));
        }
    }
}

#[test]
fn test_session_id_stable_across_events() {
    use integration_tests::{endpoint_options, installed_tracker};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
        let window = tracker.window().clone();
        window.click(page.pay_button);
        window.advance(200).unwrap();
        window.scroll_to(0.0, 1500.0);
        window.advance(600).unwrap();
        tracker.track("custom_one", None);
        tracker.flush().await.unwrap();

        let session = tracker.session_id();
        let envelopes = client.envelopes();
        assert!(!envelopes.is_empty());
        for envelope in &envelopes {
            assert_eq!(envelope.session_id, session);
            for event in &envelope.events {
                assert_eq!(event.session_id, session);
            }
        }
    });
}
