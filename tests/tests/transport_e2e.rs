//! Transport scenarios: offline persistence and recovery, retry with
//! backoff, unload beacon preference, and delivery-method selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use integration_tests::{endpoint_options, installed_tracker, MockHttpClient};
use parking_lot::Mutex;
use tracker::Tracker;
use tracker_core::{Error, ReportMethod, RetryConfig, TrackerOptions};
use tracker_host::Window;

#[tokio::test]
async fn test_offline_flush_persists_then_online_ships() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    let window = tracker.window().clone();

    window.set_online(false);
    tracker.track("cart_add", None);
    tracker.track("cart_remove", None);

    let result = tracker.flush().await;
    assert!(matches!(result, Err(Error::Offline)));
    assert_eq!(client.request_count(), 0);
    // Persisted under the fixed storage key.
    assert!(window
        .local_storage()
        .get("ldesign_tracker_events")
        .is_some());

    // Back online: the signal rehydrates the buffer into the queue.
    window.set_online(true);
    let shipped = tracker.flush().await.unwrap();
    assert!(shipped >= 2);
    assert!(window
        .local_storage()
        .get("ldesign_tracker_events")
        .is_none());

    let names: Vec<String> = client
        .envelopes()
        .iter()
        .flat_map(|e| e.events.clone())
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"cart_add".to_string()));
    assert!(names.contains(&"cart_remove".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_flush_loop_ships_within_batch_interval() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    tracker.track("periodic", None);
    assert_eq!(client.request_count(), 0);

    // One batch interval later the loop has flushed on its own.
    tokio::time::sleep(std::time::Duration::from_millis(5500)).await;
    assert!(client.request_count() >= 1);
    assert_eq!(tracker.queue_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_success_invokes_on_success_once() {
    let succeeded = Arc::new(Mutex::new(Vec::new()));
    let succeeded2 = succeeded.clone();
    let mut options = TrackerOptions {
        retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 30_000,
            use_exponential_backoff: true,
        },
        ..endpoint_options()
    };
    options.hooks.on_success = Some(Arc::new(move |events| {
        succeeded2.lock().push(events.len());
    }));

    let (tracker, client, _page) = installed_tracker(options, 1_000_000);
    client.script_statuses(&[500, 500]);

    tracker.track("resilient", None);
    let shipped = tracker.flush().await.unwrap();
    assert!(shipped >= 1);
    // Two failures then a success: three requests total.
    assert_eq!(client.request_count(), 3);
    assert_eq!(succeeded.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_invokes_on_error_and_persists() {
    let failed_batches = Arc::new(AtomicUsize::new(0));
    let failed2 = failed_batches.clone();
    let mut options = TrackerOptions {
        retry: RetryConfig {
            max_retries: 1,
            base_delay_ms: 10,
            max_delay_ms: 100,
            use_exponential_backoff: false,
        },
        ..endpoint_options()
    };
    options.hooks.on_error = Some(Arc::new(move |_err, _events| {
        failed2.fetch_add(1, Ordering::SeqCst);
    }));

    let (tracker, client, _page) = installed_tracker(options, 1_000_000);
    client.script_statuses(&[500, 500]);
    tracker.track("doomed", None);

    assert!(tracker.flush().await.is_err());
    assert_eq!(client.request_count(), 2);
    assert_eq!(failed_batches.load(Ordering::SeqCst), 1);
    assert!(tracker
        .window()
        .local_storage()
        .get("ldesign_tracker_events")
        .is_some());
}

#[tokio::test]
async fn test_unload_prefers_beacon() {
    let (tracker, client, _page) = installed_tracker(endpoint_options(), 1_000_000);
    tracker.track("last_words", None);
    tracker.window().before_unload();
    tracker.flush().await.unwrap();

    assert!(client.beacon_count() >= 1);
    let names: Vec<String> = client
        .envelopes()
        .iter()
        .flat_map(|e| e.events.clone())
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"last_words".to_string()));
    assert!(names.contains(&"page_leave".to_string()));
}

#[tokio::test]
async fn test_image_delivery_for_small_batches() {
    let options = TrackerOptions {
        report_method: ReportMethod::Image,
        auto_page_view: false,
        auto_click: false,
        auto_scroll: false,
        auto_input: false,
        auto_error: false,
        auto_performance: false,
        auto_exposure: false,
        ..endpoint_options()
    };
    let window = Window::builder().with_manual_clock(1_000_000).build();
    let client = MockHttpClient::new();
    let tracker = Tracker::with_http_client(window, options, client.clone());
    tracker.install().unwrap();

    tracker.track("tiny", None);
    tracker.flush().await.unwrap();

    let gets = client.get_urls();
    assert_eq!(gets.len(), 1);
    assert!(gets[0].starts_with("https://t.example/ingest?data="));
    assert!(gets[0].contains("&t="));
}

#[tokio::test]
async fn test_batch_size_reached_notifies_immediate_flush() {
    let options = TrackerOptions {
        batch_size: 3,
        ..endpoint_options()
    };
    let (tracker, client, _page) = installed_tracker(options, 1_000_000);
    // The initial page view is already queued; two more cross the threshold.
    tracker.track("one", None);
    tracker.track("two", None);
    // The notify wakes the loop; give it a turn, then flush for certainty.
    tokio::task::yield_now().await;
    tracker.flush().await.unwrap();
    assert!(client.request_count() >= 1);
    assert_eq!(tracker.queue_len(), 0);
}
