#![allow(dead_code)]

use actionkit::prelude::*;
use actionkit::{ActionPlugin, actionkit_std::testing::{RecordingAction, RecordingScriptLoader, SlowAction}};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Test Destination
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TestSettings {
    pub api_key: String,
    #[serde(default)]
    pub sdk_url: Option<String>,
    /// Wait for a global that never appears.
    #[serde(default)]
    pub await_global: bool,
}

#[derive(Debug)]
pub struct TestClient {
    pub api_key: String,
    pub write_key: Option<String>,
    pub instance: usize,
}

/// A destination whose actions are all observable from the test.
pub struct TestDestination {
    pub name: &'static str,
    pub init_calls: Arc<AtomicUsize>,
    pub fail_init: bool,
    pub init_delay: Duration,
    pub recorder: RecordingAction,
    pub enricher: RecordingAction,
    pub strict: RecordingAction,
    pub echo: EchoAction,
    pub flaky: FlakyAction,
    pub patcher: PatchAction,
    pub slow: SlowAction,
}

impl TestDestination {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            init_calls: Arc::new(AtomicUsize::new(0)),
            fail_init: false,
            init_delay: Duration::ZERO,
            recorder: RecordingAction::new("Record"),
            enricher: RecordingAction::with_definition(
                ActionDefinition::new("Enrich").with_lifecycle(LifecycleHook::Enrichment),
            )
            .with_update("context.enriched", json!(true)),
            strict: RecordingAction::with_definition(
                ActionDefinition::new("Strict")
                    .with_fields(
                        FieldSchema::new().field(
                            "email",
                            InputField::new("Email", FieldType::String)
                                .required()
                                .with_default(json!({ "@path": "$.traits.email" })),
                        ),
                    )
                    .with_default_subscription(r#"type = "identify""#),
            ),
            echo: EchoAction::default(),
            flaky: FlakyAction::default(),
            patcher: PatchAction::default(),
            slow: SlowAction::new("Slow", Duration::from_secs(1)),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail_init: true,
            ..Self::new(name)
        }
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }
}

impl Destination for TestDestination {
    type Settings = TestSettings;
    type Client = TestClient;

    fn name(&self) -> &str {
        self.name
    }

    fn catalog(&self) -> Catalog<TestSettings, TestClient> {
        Catalog::new()
            .action("record", self.recorder.clone())
            .action("enrich", self.enricher.clone())
            .action("strict", self.strict.clone())
            .action("echo", self.echo.clone())
            .action("flaky", self.flaky.clone())
            .action("patch", self.patcher.clone())
            .action("slow", self.slow.clone())
    }

    async fn initialize(
        &self,
        ctx: InitContext<'_, TestSettings>,
        deps: &Dependencies,
    ) -> Result<TestClient, BoxError> {
        let instance = self.init_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.init_delay).await;
        if let Some(url) = &ctx.settings.sdk_url {
            deps.load_script(url, &ScriptAttributes::new()).await?;
        }
        if ctx.settings.await_global {
            deps.resolve_when(|| false).await?;
        }
        if self.fail_init {
            return Err("sdk unavailable".into());
        }
        Ok(TestClient {
            api_key: ctx.settings.api_key.clone(),
            write_key: ctx.analytics.write_key.clone(),
            instance,
        })
    }
}

// ============================================================================
// Test Actions
// ============================================================================

/// Records which client instance and settings each invocation saw.
#[derive(Clone)]
pub struct EchoAction {
    definition: ActionDefinition,
    pub seen: Arc<Mutex<Vec<(usize, String)>>>,
}

impl Default for EchoAction {
    fn default() -> Self {
        Self {
            definition: ActionDefinition::new("Echo"),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Action<TestSettings, TestClient> for EchoAction {
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(
        &self,
        client: &TestClient,
        input: PerformInput<'_, TestSettings>,
    ) -> Result<(), BoxError> {
        assert_eq!(client.api_key, input.settings.api_key);
        self.seen
            .lock()
            .unwrap()
            .push((client.instance, client.write_key.clone().unwrap_or_default()));
        Ok(())
    }
}

/// Fails when the payload has `"fail": true`, records the payload otherwise.
#[derive(Clone)]
pub struct FlakyAction {
    definition: ActionDefinition,
    pub succeeded: Arc<Mutex<Vec<Value>>>,
}

impl Default for FlakyAction {
    fn default() -> Self {
        Self {
            definition: ActionDefinition::new("Flaky"),
            succeeded: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<S, C> Action<S, C> for FlakyAction
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(&self, _client: &C, input: PerformInput<'_, S>) -> Result<(), BoxError> {
        // yield so both invocations are in flight at once
        tokio::task::yield_now().await;
        if input.payload.get("fail") == Some(&json!(true)) {
            return Err("partner rejected the request".into());
        }
        self.succeeded.lock().unwrap().push(input.payload);
        Ok(())
    }
}

/// Sleeps for `delayMs`, then records `tag` into `integrations.Test`.
#[derive(Clone)]
pub struct PatchAction {
    definition: ActionDefinition,
}

impl Default for PatchAction {
    fn default() -> Self {
        Self {
            definition: ActionDefinition::new("Patch"),
        }
    }
}

impl<S, C> Action<S, C> for PatchAction
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn definition(&self) -> &ActionDefinition {
        &self.definition
    }

    async fn perform(&self, _client: &C, input: PerformInput<'_, S>) -> Result<(), BoxError> {
        let delay = input.payload["delayMs"].as_u64().unwrap_or(0);
        let tag = input.payload["tag"].as_str().unwrap_or_default().to_string();
        tokio::time::sleep(Duration::from_millis(delay)).await;

        input.update_event("integrations.Test.last", json!(tag));
        let mut seen = Map::new();
        seen.insert(tag, json!(true));
        input.update_event("integrations.Test.seen", Value::Object(seen));
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn settings() -> Value {
    json!({ "api_key": "secret" })
}

pub fn mapping(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("mapping fixture must be an object")
}

pub fn scripts() -> Arc<RecordingScriptLoader> {
    Arc::new(RecordingScriptLoader::new())
}

pub fn load(
    destination: TestDestination,
    subscriptions: Vec<Subscription>,
    config: RuntimeConfig,
) -> Vec<ActionPlugin<TestDestination>> {
    DestinationLoader::new(destination, scripts())
        .settings(settings())
        .subscriptions(subscriptions)
        .config(config)
        .build()
        .expect("test configuration should be valid")
}

pub fn plugin<'a>(
    plugins: &'a [ActionPlugin<TestDestination>],
    key: &str,
) -> &'a ActionPlugin<TestDestination> {
    plugins
        .iter()
        .find(|p| p.action_key() == key)
        .expect("no plugin for action key")
}
