//! Test fixtures: a checkout-style page and tracker builders.

use std::sync::Arc;

use tracker::Tracker;
use tracker_core::{Rect, TrackerOptions};
use tracker_host::{ComponentInstance, ElementData, NodeId, Window};

use crate::mocks::MockHttpClient;

/// Default test ingest endpoint.
pub const ENDPOINT: &str = "https://t.example/ingest";

/// Handles to the interesting nodes of the fixture page.
pub struct CheckoutPage {
    pub nav_link: NodeId,
    pub pay_button: NodeId,
    pub email_input: NodeId,
    pub password_input: NodeId,
    pub form: NodeId,
    pub promo_banner: NodeId,
}

/// Builds a window showing a checkout page: nav, form, pay button, promo.
pub fn checkout_window(start_ms: i64) -> (Window, CheckoutPage) {
    let window = Window::builder()
        .with_url("https://shop.example/checkout")
        .with_title("Checkout")
        .with_viewport(1280, 800)
        .with_page_size(1280.0, 4800.0)
        .with_manual_clock(start_ms)
        .build();

    let body = window.document().body();
    let page = {
        let mut doc = window.document_mut();

        let nav = doc.append_child(body, ElementData::new("nav"));
        let nav_link = doc.append_child(
            nav,
            ElementData::new("a")
                .with_id("home-link")
                .with_attr("href", "/")
                .with_text("Home")
                .with_rect(Rect::new(20.0, 10.0, 60.0, 24.0)),
        );

        let main = doc.append_child(
            body,
            ElementData::new("main")
                .with_component(ComponentInstance::named("CheckoutPage")),
        );
        let form = doc.append_child(
            main,
            ElementData::new("form")
                .with_id("checkout-form")
                .with_attr("action", "/pay")
                .with_attr("method", "post"),
        );
        let email_input = doc.append_child(
            form,
            ElementData::new("input")
                .with_attr("type", "email")
                .with_attr("name", "email")
                .with_rect(Rect::new(100.0, 200.0, 240.0, 32.0)),
        );
        let password_input = doc.append_child(
            form,
            ElementData::new("input")
                .with_attr("type", "password")
                .with_attr("name", "password")
                .with_rect(Rect::new(100.0, 250.0, 240.0, 32.0)),
        );
        let pay_button = doc.append_child(
            form,
            ElementData::new("button")
                .with_id("pay")
                .with_attr("data-track-name", "pay_submit")
                .with_text("Pay")
                .with_rect(Rect::new(100.0, 320.0, 40.0, 40.0)),
        );

        let promo_banner = doc.append_child(
            main,
            ElementData::new("aside")
                .with_attr("data-track-exposure", "promo-banner")
                .with_rect(Rect::new(900.0, 100.0, 300.0, 250.0)),
        );

        CheckoutPage {
            nav_link,
            pay_button,
            email_input,
            password_input,
            form,
            promo_banner,
        }
    };
    (window, page)
}

/// Default options pointed at the test endpoint.
pub fn endpoint_options() -> TrackerOptions {
    TrackerOptions::with_endpoint(ENDPOINT)
}

/// Installed tracker over the fixture page with a mock HTTP client.
pub fn installed_tracker(
    options: TrackerOptions,
    start_ms: i64,
) -> (Tracker, Arc<MockHttpClient>, CheckoutPage) {
    let (window, page) = checkout_window(start_ms);
    let client = MockHttpClient::new();
    let tracker = Tracker::with_http_client(window, options, client.clone());
    tracker.install().expect("install");
    (tracker, client, page)
}
