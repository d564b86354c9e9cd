//! Scrape and lead integration tests.

mod common;

use axum::http::{header, StatusCode};
use common::TestHarness;
use serde_json::json;

use leadscraper_core::{MessageDecoder, ScrapeEvent};

#[tokio::test]
async fn register_fund_scrape_flow() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    assert_eq!(harness.credits(&user).await, 0);

    assert_eq!(harness.add_credits(&user, 10).await, 10);

    let (name, value) = user.cookie_header();
    let response = harness
        .server
        .post("/api/scrape")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "query": "Bäckerei", "location": "Berlin" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["credits"], 9);
    assert_eq!(body["lead"]["businessName"], "Example Business");
    assert_eq!(body["lead"]["userId"], user.id.as_str());

    assert_eq!(harness.credits(&user).await, 9);

    let leads: serde_json::Value = harness
        .server
        .get("/api/leads")
        .add_header(name, value)
        .await
        .json();
    let leads = leads.as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["businessName"], "Example Business");
}

#[tokio::test]
async fn scrape_with_zero_credits_is_forbidden_and_stores_nothing() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    let response = harness
        .server
        .post("/api/scrape")
        .add_header(name.clone(), value.clone())
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["balance"], 0);
    assert_eq!(body["error"]["details"]["required"], 1);

    let leads: serde_json::Value = harness
        .server
        .get("/api/leads")
        .add_header(name, value)
        .await
        .json();
    assert!(leads.as_array().unwrap().is_empty());
    assert_eq!(harness.credits(&user).await, 0);
}

#[tokio::test]
async fn last_credit_can_be_spent_exactly_once() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    harness.add_credits(&user, 1).await;
    let (name, value) = user.cookie_header();

    harness
        .server
        .post("/api/scrape")
        .add_header(name.clone(), value.clone())
        .json(&json!({}))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/api/scrape")
        .add_header(name, value)
        .json(&json!({}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(harness.credits(&user).await, 0);
}

#[tokio::test]
async fn leads_are_private_to_their_owner() {
    let harness = TestHarness::new();
    let alice = harness.register("alice@b.de", "pw").await;
    let bob = harness.register("bob@b.de", "pw").await;
    harness.add_credits(&alice, 1).await;

    let (name, value) = alice.cookie_header();
    harness
        .server
        .post("/api/scrape")
        .add_header(name, value)
        .json(&json!({}))
        .await
        .assert_status_ok();

    let (name, value) = bob.cookie_header();
    let leads: serde_json::Value = harness
        .server
        .get("/api/leads")
        .add_header(name, value)
        .await
        .json();
    assert!(leads.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn scrape_requires_a_session() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/api/scrape")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn streamed_scrape_emits_framed_progress() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    harness.add_credits(&user, 3).await;
    let (name, value) = user.cookie_header();

    let response = harness
        .server
        .post("/api/scrape")
        .add_header(name, value)
        .json(&json!({ "query": "Cafés", "stream": true }))
        .await;

    response.assert_status_ok();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let mut decoder = MessageDecoder::new();
    let mut events: Vec<ScrapeEvent> = decoder
        .push(response.as_bytes())
        .into_iter()
        .map(Result::unwrap)
        .collect();
    if let Some(last) = decoder.finish::<ScrapeEvent>() {
        events.push(last.unwrap());
    }

    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], ScrapeEvent::Progress { percent: 10, message } if message.contains("Cafés")));
    assert!(matches!(events[1], ScrapeEvent::Progress { percent: 60, .. }));
    match &events[2] {
        ScrapeEvent::Complete(result) => {
            assert_eq!(result.credits, 2);
            assert_eq!(result.lead.business_name, "Example Business");
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(events[2].is_terminal());

    assert_eq!(harness.credits(&user).await, 2);
}

#[tokio::test]
async fn streamed_scrape_without_credits_is_a_plain_error() {
    let harness = TestHarness::new();
    let user = harness.register("a@b.de", "pw").await;
    let (name, value) = user.cookie_header();

    let response = harness
        .server
        .post("/api/scrape")
        .add_header(name, value)
        .json(&json!({ "stream": true }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
}
