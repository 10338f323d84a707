//! End-to-end interaction scenarios: click capture, scroll depth milestones,
//! sensitive input masking, and exposure dwell.

use integration_tests::{endpoint_options, installed_tracker};
use tracker_core::{ClickType, EventData, EventType, InteractionType};

#[tokio::test]
async fn test_click_on_named_button_ships_full_event() {
    let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.click_at(page.pay_button, 120.0, 340.0);
    window.advance(200).unwrap(); // debounce window
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    assert_eq!(envelopes.len(), 1);
    let clicks: Vec<_> = envelopes[0]
        .events
        .iter()
        .filter(|e| e.event_type == EventType::Click)
        .collect();
    assert_eq!(clicks.len(), 1);

    let event = clicks[0];
    assert_eq!(event.name, "pay_submit");
    assert_eq!(event.target.as_ref().unwrap().id.as_deref(), Some("pay"));
    match event.data.as_ref().unwrap() {
        EventData::Click(c) => {
            assert_eq!(c.x, 120.0);
            assert_eq!(c.y, 340.0);
            assert_eq!(c.button, 0);
            assert_eq!(c.click_type, ClickType::Single);
            assert_eq!(c.interaction_type, InteractionType::Button);
            assert_eq!(c.action_text.as_deref(), Some("Pay"));
            assert!(!c.modifiers.ctrl && !c.modifiers.shift);
        }
        other => panic!("wrong payload: {:?}", other),
    }
    // Component context came along from the back-pointer.
    assert_eq!(
        event.target.as_ref().unwrap().component.as_ref().unwrap().name,
        "CheckoutPage"
    );
}

#[tokio::test]
async fn test_scroll_crossing_25_then_26_then_51() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    // Page 4800, viewport 800: scrollable = 4000.
    window.scroll_to(0.0, 1000.0); // depth 25
    window.advance(600).unwrap();
    window.scroll_to(0.0, 1040.0); // depth 26, no new threshold
    window.advance(600).unwrap();
    window.scroll_to(0.0, 2040.0); // depth 51, crosses 50
    window.advance(600).unwrap();
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let scrolls: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::Scroll)
        .collect();
    assert_eq!(scrolls.len(), 2);
    assert_eq!(scrolls[0].name, "scroll_depth_25");
    assert_eq!(scrolls[1].name, "scroll_depth_51");
}

#[tokio::test]
async fn test_sensitive_input_value_never_ships() {
    let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.input(page.password_input, "hunter2");
    window.change(page.password_input);
    tracker.flush().await.unwrap();

    let bodies = client.bodies();
    assert!(!bodies.is_empty());
    for body in &bodies {
        assert!(!body.contains("hunter2"), "raw value leaked: {}", body);
    }

    let envelopes = client.envelopes();
    let inputs: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::Input)
        .collect();
    assert_eq!(inputs.len(), 2);
    match inputs[0].data.as_ref().unwrap() {
        EventData::Input(d) => {
            assert!(d.is_sensitive);
            assert_eq!(d.value, None);
            assert_eq!(d.value_length, 7);
            assert!(!d.is_empty);
        }
        other => panic!("wrong payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_form_submit_ships_summary_only() {
    let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.input(page.email_input, "a@b.example");
    window.submit(page.form);
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let submits: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::FormSubmit)
        .collect();
    assert_eq!(submits.len(), 1);
    match submits[0].data.as_ref().unwrap() {
        EventData::FormSubmit(d) => {
            assert_eq!(d.form_id.as_deref(), Some("checkout-form"));
            assert_eq!(d.field_count, 2);
        }
        other => panic!("wrong payload: {:?}", other),
    }
    for body in client.bodies() {
        assert!(!body.contains("a@b.example"));
    }
}

#[tokio::test]
async fn test_exposure_dwell_ships_once() {
    let (tracker, client, page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.set_intersection(page.promo_banner, 0.9);
    window.advance(1600).unwrap(); // tick catches the dwell at >= 1s
    window.set_intersection(page.promo_banner, 0.0);
    window.set_intersection(page.promo_banner, 0.9);
    window.advance(3000).unwrap(); // trigger_once: no second report
    tracker.flush().await.unwrap();

    let envelopes = client.envelopes();
    let exposures: Vec<_> = envelopes
        .iter()
        .flat_map(|e| e.events.iter())
        .filter(|e| e.event_type == EventType::Exposure)
        .collect();
    assert_eq!(exposures.len(), 1);
    assert_eq!(exposures[0].name, "exposure_promo-banner");
    match exposures[0].data.as_ref().unwrap() {
        EventData::Exposure(d) => {
            assert!(d.duration >= 1000);
            assert!(d.is_first_exposure);
        }
        other => panic!("wrong payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_ignored_subtree_produces_nothing() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    let section = window.append_to_body(
        tracker_host::ElementData::new("section").with_attr("data-track-ignore", ""),
    );
    let button = {
        let mut doc = window.document_mut();
        doc.append_child(section, tracker_host::ElementData::new("button").with_id("nope"))
    };
    window.click(button);
    window.advance(300).unwrap();
    tracker.flush().await.unwrap();

    let clicks = client
        .envelopes()
        .iter()
        .flat_map(|e| e.events.clone())
        .filter(|e| e.event_type == EventType::Click)
        .count();
    assert_eq!(clicks, 0);
}
