//! SPA navigation scenarios: pushState page views, page-id rotation, scroll
//! threshold re-arming, and page-leave summaries.

use integration_tests::{endpoint_options, installed_tracker};
use tracker_core::{EventData, EventType, NavigationTrigger};

#[tokio::test]
async fn test_push_state_navigation_rotates_page() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    let first_page_id = tracker.page_id();
    window.push_state("/orders/42");
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let views: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::PageView)
        .collect();
    // Initial page view plus the SPA navigation.
    assert_eq!(views.len(), 2);

    let spa = views
        .iter()
        .find(|e| match e.data.as_ref().unwrap() {
            EventData::PageView(d) => d.trigger == NavigationTrigger::PushState,
            _ => false,
        })
        .expect("pushState page view");
    assert!(spa.url.ends_with("/orders/42"));
    match spa.data.as_ref().unwrap() {
        EventData::PageView(d) => {
            assert_eq!(d.path, "/orders/42");
            assert_eq!(d.referrer.as_deref(), Some("https://shop.example/checkout"));
        }
        other => panic!("wrong payload: {:?}", other),
    }
    assert_ne!(spa.page_id, first_page_id);
    assert_eq!(tracker.page_id(), spa.page_id);
}

#[tokio::test]
async fn test_scroll_thresholds_rearm_after_navigation() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.scroll_to(0.0, 1000.0); // depth 25
    window.advance(600).unwrap();
    window.push_state("/page-two");
    window.scroll_to(0.0, 1100.0); // depth 28, crosses the re-armed 25
    window.advance(600).unwrap();
    tracker.flush().await.unwrap();

    let names: Vec<String> = client
        .envelopes()
        .iter()
        .flat_map(|e| e.events.clone())
        .filter(|e| e.event_type == EventType::Scroll)
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["scroll_depth_25", "scroll_depth_28"]);
}

#[tokio::test]
async fn test_page_leave_carries_page_counters() {
    let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.click(page.pay_button);
    window.advance(200).unwrap();
    window.scroll_to(0.0, 2040.0); // depth 51
    window.advance(600).unwrap();
    window.before_unload();
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let leaves: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::PageLeave)
        .collect();
    assert_eq!(leaves.len(), 1);
    match leaves[0].data.as_ref().unwrap() {
        EventData::PageLeave(d) => {
            assert_eq!(d.click_count, 1);
            assert_eq!(d.max_scroll_depth, 51);
            assert!(d.duration >= 800);
        }
        other => panic!("wrong payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_hidden_then_unload_emits_single_page_leave() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.set_visibility_hidden(true);
    window.page_hide();
    window.before_unload();
    tracker.flush().await.unwrap();

    let leaves = client
        .envelopes()
        .iter()
        .flat_map(|e| e.events.clone())
        .filter(|e| e.event_type == EventType::PageLeave)
        .count();
    assert_eq!(leaves, 1);
}

#[tokio::test]
async fn test_manual_track_page_view() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let before = tracker.page_id();
    tracker.track_page_view(Some(serde_json::json!({"experiment": "b"})));
    assert_ne!(tracker.page_id(), before);
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let manual = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .find(|e| match e.data.as_ref() {
            Some(EventData::PageView(d)) => d.trigger == NavigationTrigger::Manual,
            _ => false,
        })
        .expect("manual page view");
    assert_eq!(
        manual.properties["experiment"],
        serde_json::Value::String("b".into())
    );
}
