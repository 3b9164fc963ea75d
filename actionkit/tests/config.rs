//! Configuration problems surface when a destination is loaded.

mod common;

use actionkit::actionkit_std::query::QueryError;
use actionkit::prelude::*;
use actionkit::{ActionPlugin, ConfigError};
use common::{TestDestination, mapping, plugin, scripts, settings};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

fn build(
    settings: serde_json::Value,
    subscriptions: Vec<Subscription>,
) -> Result<Vec<ActionPlugin<TestDestination>>, ConfigError> {
    DestinationLoader::new(TestDestination::new("Test"), scripts())
        .settings(settings)
        .subscriptions(subscriptions)
        .build()
}

#[test]
fn test_unknown_action_is_rejected() {
    let result = build(
        settings(),
        vec![Subscription::new("sendEmail", "Emails", r#"type = "track""#)],
    );

    match result {
        Err(ConfigError::UnknownAction {
            destination,
            subscription,
            action,
        }) => {
            assert_eq!(destination, "Test");
            assert_eq!(subscription, "Emails");
            assert_eq!(action, "sendEmail");
        }
        Err(other) => panic!("expected an unknown action error, got {other}"),
        Ok(_) => panic!("expected an unknown action error"),
    }
}

#[test]
fn test_malformed_query_is_rejected() {
    let result = build(
        settings(),
        vec![Subscription::new("record", "Broken", r#"type = "track" and"#)],
    );

    match result {
        Err(ConfigError::Query {
            subscription,
            source: QueryError::Syntax { line, .. },
        }) => {
            assert_eq!(subscription, "Broken");
            assert_eq!(line, 1);
        }
        Err(other) => panic!("expected a query error, got {other}"),
        Ok(_) => panic!("expected a query error"),
    }
}

#[test]
fn test_empty_query_is_rejected() {
    let result = build(settings(), vec![Subscription::new("record", "Blank", "  ")]);

    assert!(matches!(
        result,
        Err(ConfigError::Query {
            source: QueryError::Empty,
            ..
        })
    ));
}

#[test]
fn test_malformed_mapping_reports_every_issue() {
    let result = build(
        settings(),
        vec![
            Subscription::new("record", "Bad mapping", r#"type = "track""#).with_mapping(mapping(
                json!({
                    "a": { "@path": 5 },
                    "b": { "@nope": "$.x" }
                }),
            )),
        ],
    );

    match result {
        Err(ConfigError::Mapping {
            subscription,
            source,
        }) => {
            assert_eq!(subscription, "Bad mapping");
            assert_eq!(source.issues().len(), 2);
            assert!(source.issues().iter().any(|i| i.location == "/b"));
        }
        Err(other) => panic!("expected a mapping error, got {other}"),
        Ok(_) => panic!("expected a mapping error"),
    }
}

#[test]
fn test_disabled_subscription_is_still_validated() {
    let result = build(
        settings(),
        vec![Subscription::new("record", "Off", "type = ").with_enabled(false)],
    );

    assert!(matches!(result, Err(ConfigError::Query { .. })));
}

#[test]
fn test_settings_must_deserialize() {
    let result = build(json!({ "apiKey": "camel case is not accepted" }), Vec::new());

    match result {
        Err(ConfigError::Settings { destination, source }) => {
            assert_eq!(destination, "Test");
            assert!(source.to_string().contains("api_key"));
        }
        Err(other) => panic!("expected a settings error, got {other}"),
        Ok(_) => panic!("expected a settings error"),
    }
}

#[test]
fn test_one_plugin_per_action() {
    let plugins = build(
        settings(),
        vec![
            Subscription::new("record", "A", r#"type = "track""#),
            Subscription::new("record", "B", r#"type = "page""#),
            Subscription::new("echo", "C", r#"type = "track""#),
        ],
    )
    .unwrap();

    let keys: Vec<_> = plugins.iter().map(|p| p.action_key()).collect();
    assert_eq!(
        keys,
        vec!["record", "enrich", "strict", "echo", "flaky", "patch", "slow"]
    );
    let bound: Vec<_> = plugin(&plugins, "record")
        .subscriptions()
        .iter()
        .map(|s| s.name())
        .collect();
    assert_eq!(bound, vec!["A", "B"]);
    assert!(plugin(&plugins, "slow").subscriptions().is_empty());
}

#[tokio::test]
async fn test_presets_subscribe_after_explicit_subscriptions() {
    let destination = TestDestination::new("Test");
    let strict = destination.strict.clone();
    let plugins = DestinationLoader::new(destination, scripts())
        .settings(settings())
        .subscription(Subscription::new("strict", "Explicit", r#"event = "Never""#))
        .with_presets()
        .build()
        .unwrap();
    let strict_plugin = plugin(&plugins, "strict");
    strict_plugin.load(&AnalyticsContext::new()).await.unwrap();

    let names: Vec<_> = strict_plugin
        .subscriptions()
        .iter()
        .map(|s| s.name())
        .collect();
    assert_eq!(names, vec!["Explicit", "Strict"]);

    let event = Event::identify("u-1").with_trait("email", json!("ada@example.com"));
    let report = strict_plugin.dispatch(&event).await.unwrap();

    assert!(report.is_success());
    assert_eq!(strict.payloads(), vec![json!({ "email": "ada@example.com" })]);
}

#[test]
fn test_subscription_records_from_json() {
    let records = json!([
        {
            "partnerAction": "record",
            "name": "Orders",
            "subscribe": "event = \"Order Completed\"",
            "mapping": { "total": { "@path": "$.properties.total" } }
        },
        {
            "partnerAction": "record",
            "name": "Off",
            "enabled": false,
            "subscribe": "type = \"page\""
        }
    ]);

    let subscriptions = Subscription::from_json_list(records).unwrap();
    let plugins = build(settings(), subscriptions).unwrap();
    let bound = plugin(&plugins, "record").subscriptions();

    assert_eq!(bound.len(), 2);
    assert!(bound[0].is_enabled());
    assert!(!bound[1].is_enabled());
}

#[test]
fn test_malformed_subscription_record_is_rejected() {
    let result = Subscription::from_json_list(json!([{ "name": "No action" }]));

    assert!(matches!(result, Err(ConfigError::Subscription(_))));
}

#[test]
fn test_runtime_config_from_json() {
    let config: RuntimeConfig =
        serde_json::from_value(json!({ "performTimeoutMs": null, "readinessTimeoutMs": 2500 }))
            .unwrap();

    assert_eq!(config.perform_timeout, None);
    assert_eq!(config.readiness_timeout, Duration::from_millis(2500));
    assert_eq!(config.readiness_poll_interval, Duration::from_millis(100));
}
