//! The host pipeline: stage ordering, isolation and runtime toggles.

mod common;

use actionkit::prelude::*;
use actionkit::{ConfigError, PluginError};
use common::{TestDestination, load};
use pretty_assertions::assert_eq;
use serde_json::json;

fn enrich_then_record() -> Vec<Subscription> {
    vec![
        Subscription::new("record", "Enriched tracks", "context.enriched = true")
            .with_mapping(common::mapping(json!({ "event": { "@path": "$.event" } }))),
        Subscription::new("enrich", "Enrich tracks", r#"type = "track""#),
    ]
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let destination = TestDestination::new("Test");
    let recorder = destination.recorder.clone();
    let enricher = destination.enricher.clone();
    let registry = PluginRegistryBuilder::new()
        .register_all(load(destination, enrich_then_record(), RuntimeConfig::default()))
        .build()
        .unwrap();
    registry.load(&AnalyticsContext::new()).await;

    let report = registry.dispatch(Event::track("Signed Up")).await;

    assert_eq!(registry.entries()[0].plugin().name(), "Test enrich");
    assert_eq!(
        registry.entries()[0].plugin().plugin_type(),
        LifecycleHook::Enrichment
    );
    assert_eq!(report.outcomes[0].plugin, "Test enrich");
    assert_eq!(enricher.call_count(), 1);
    assert_eq!(recorder.payloads(), vec![json!({ "event": "Signed Up" })]);
    assert_eq!(report.event.get("context.enriched"), Some(&json!(true)));
}

#[tokio::test]
async fn test_failing_destination_does_not_affect_siblings() {
    let good = TestDestination::new("Good");
    let recorder = good.recorder.clone();
    let subscriptions = || vec![Subscription::new("record", "Tracks", r#"type = "track""#)];
    let registry = PluginRegistryBuilder::new()
        .register_all(load(
            TestDestination::failing("Broken"),
            subscriptions(),
            RuntimeConfig::default(),
        ))
        .register_all(load(good, subscriptions(), RuntimeConfig::default()))
        .build()
        .unwrap();

    let loads = registry.load(&AnalyticsContext::new()).await;
    let load_of = |name: &str| {
        loads
            .iter()
            .find(|(plugin, _)| plugin == name)
            .map(|(_, result)| result.is_ok())
    };
    assert_eq!(load_of("Broken record"), Some(false));
    assert_eq!(load_of("Good record"), Some(true));

    let event = Event::track("Signed Up");
    let report = registry.dispatch(event.clone()).await;

    assert!(matches!(
        report.outcome("Broken record").map(|o| &o.result),
        Some(Err(PluginError::Initialization { .. }))
    ));
    let good = report.outcome("Good record").unwrap();
    assert_eq!(good.result.as_ref().map(|r| r.matched()).ok(), Some(1));
    assert_eq!(recorder.call_count(), 1);
    assert_eq!(report.event, event);
}

#[tokio::test]
async fn test_failed_enrichment_keeps_the_event_flowing() {
    let good = TestDestination::new("Good");
    let recorder = good.recorder.clone();
    let registry = PluginRegistryBuilder::new()
        .register_all(load(
            TestDestination::failing("Broken"),
            vec![Subscription::new("enrich", "Enrich", r#"type = "track""#)],
            RuntimeConfig::default(),
        ))
        .register_all(load(
            good,
            vec![Subscription::new("record", "Tracks", r#"type = "track""#)],
            RuntimeConfig::default(),
        ))
        .build()
        .unwrap();
    registry.load(&AnalyticsContext::new()).await;

    let report = registry.dispatch(Event::track("Signed Up")).await;

    assert!(report.outcome("Broken enrich").unwrap().result.is_err());
    assert_eq!(report.event.get("context.enriched"), None);
    assert_eq!(recorder.call_count(), 1);
}

#[tokio::test]
async fn test_dispatch_before_load_reports_not_loaded() {
    let destination = TestDestination::new("Test");
    let recorder = destination.recorder.clone();
    let registry = PluginRegistryBuilder::new()
        .register_all(load(destination, enrich_then_record(), RuntimeConfig::default()))
        .build()
        .unwrap();

    let event = Event::track("Signed Up");
    let report = registry.dispatch(event.clone()).await;

    assert!(
        report
            .outcomes
            .iter()
            .all(|o| matches!(o.result, Err(PluginError::NotLoaded(_))))
    );
    assert_eq!(report.event, event);
    assert_eq!(recorder.call_count(), 0);
}

#[tokio::test]
async fn test_disabled_plugin_is_skipped() {
    let destination = TestDestination::new("Test");
    let recorder = destination.recorder.clone();
    let registry = PluginRegistryBuilder::new()
        .register_all(load(
            destination,
            vec![Subscription::new("record", "Tracks", r#"type = "track""#)],
            RuntimeConfig::default(),
        ))
        .build()
        .unwrap();
    registry.load(&AnalyticsContext::new()).await;
    let handle = registry.enabled_handle("Test record").unwrap();

    handle.disable();
    let report = registry.dispatch(Event::track("Signed Up")).await;
    assert!(report.outcome("Test record").is_none());
    assert_eq!(recorder.call_count(), 0);

    assert!(handle.toggle());
    registry.dispatch(Event::track("Signed Up")).await;
    assert!(registry.get("Test record").unwrap().is_enabled());
    assert_eq!(recorder.call_count(), 1);
}

#[tokio::test]
async fn test_registered_disabled_plugin_can_be_enabled() {
    let destination = TestDestination::new("Test");
    let recorder = destination.recorder.clone();
    let mut plugins = load(
        destination,
        vec![Subscription::new("record", "Tracks", r#"type = "track""#)],
        RuntimeConfig::default(),
    );
    let record = plugins.remove(0);
    let registry = PluginRegistryBuilder::new()
        .register_with_enabled(record, false)
        .build()
        .unwrap();
    registry.load(&AnalyticsContext::new()).await;

    registry.dispatch(Event::track("Signed Up")).await;
    assert_eq!(recorder.call_count(), 0);

    registry.enabled_handle("Test record").unwrap().enable();
    registry.dispatch(Event::track("Signed Up")).await;
    assert_eq!(recorder.call_count(), 1);
}

#[test]
fn test_duplicate_plugin_names_are_rejected() {
    let first = load(TestDestination::new("Test"), Vec::new(), RuntimeConfig::default());
    let second = load(TestDestination::new("Test"), Vec::new(), RuntimeConfig::default());

    let result = PluginRegistryBuilder::new()
        .register_all(first)
        .register_all(second)
        .build();

    match result {
        Err(ConfigError::DuplicatePlugin(name)) => assert_eq!(name, "Test record"),
        Err(other) => panic!("expected a duplicate plugin error, got {other}"),
        Ok(_) => panic!("expected a duplicate plugin error"),
    }
}

#[test]
fn test_registry_lookup() {
    let registry = PluginRegistryBuilder::new()
        .register_all(load(TestDestination::new("Test"), Vec::new(), RuntimeConfig::default()))
        .build()
        .unwrap();

    assert_eq!(registry.len(), 7);
    assert!(registry.get("Test slow").is_some());
    assert!(registry.get("Test missing").is_none());
    assert!(registry.entries().iter().all(|e| !e.plugin().is_loaded()));
}
