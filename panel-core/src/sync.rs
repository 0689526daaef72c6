//! Pull/push orchestration between the controls and the camera server.
//!
//! Every store-writing operation draws a sequence number from one shared
//! monotonic counter at issue time; the store only accepts the newest write
//! it has seen, so overlapping round trips resolve last-writer-wins by issue
//! order rather than by arrival order. Message text from a late response may
//! still be shown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::capability::CapabilityGate;
use crate::client::{CameraClient, ServerOutcome, WireSettings};
use crate::error::PanelError;
use crate::schema::{ControlId, ParamValue, ParameterKey, SchemaRegistry, SchemaVersion};
use crate::settings::{CameraSettings, SettingsStore};
use crate::status::{MessageToken, Outcome, StatusMessenger};

const PULL_FAILED: &str = "Failed to fetch current camera settings.";
const PUSH_OK: &str = "Camera settings updated.";
const PUSH_FAILED: &str = "Failed to update camera settings.";
const PRESET_OK: &str = "Preset applied.";
const PRESET_FAILED: &str = "Failed to apply preset.";
const RESET_OK: &str = "Camera reset to defaults.";
const RESET_FAILED: &str = "Failed to reset camera.";

/// What a pull did, for the view to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullReport {
    /// Whether the store now holds the fetched snapshot.
    pub refreshed: bool,
    /// Controls to render disabled, valid whenever `refreshed`.
    pub disabled_controls: Vec<ControlId>,
    /// Status message shown, if any; the view schedules its dismissal.
    pub message: Option<MessageToken>,
}

/// What a push did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// `false` when the edit was refused (unsupported parameter) and no
    /// request went out.
    pub accepted: bool,
    pub message: Option<MessageToken>,
}

/// What a preset application or reset did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetReport {
    /// Whether the follow-up pull replaced the store.
    pub resynced: bool,
    pub disabled_controls: Vec<ControlId>,
    pub message: Option<MessageToken>,
}

fn texts_or(outcome: &ServerOutcome, fallback: &str) -> Vec<String> {
    let texts = outcome.texts();
    if texts.is_empty() {
        vec![fallback.to_string()]
    } else {
        texts
    }
}

/// Orchestrates fetches and updates against one camera server.
#[derive(Debug)]
pub struct SettingsSynchronizer {
    client: CameraClient,
    registry: Arc<SchemaRegistry>,
    store: Arc<SettingsStore>,
    gate: CapabilityGate,
    messenger: Arc<StatusMessenger>,
    next_seq: AtomicU64,
}

impl SettingsSynchronizer {
    pub fn new(
        client: CameraClient,
        registry: Arc<SchemaRegistry>,
        store: Arc<SettingsStore>,
        gate: CapabilityGate,
        messenger: Arc<StatusMessenger>,
    ) -> SettingsSynchronizer {
        SettingsSynchronizer {
            client,
            registry,
            store,
            gate,
            messenger,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &CameraClient {
        &self.client
    }

    pub fn messenger(&self) -> &Arc<StatusMessenger> {
        &self.messenger
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fold a fetched wire snapshot into the store: convert recognized keys
    /// to display units, drop the rest, swap wholesale, recompute the gate.
    ///
    /// Unrecognized keys are skipped and logged, not fatal; a snapshot with
    /// zero recognized keys is malformed and leaves the store untouched.
    fn ingest(&self, seq: u64, wire: WireSettings) -> Result<Vec<ControlId>, PanelError> {
        let mut settings = CameraSettings::new();
        let mut skipped = 0usize;
        for (name, value) in &wire {
            let Some(spec) = self.registry.spec_for_wire(name) else {
                tracing::debug!(key = %name, "skipping parameter not in the active schema");
                skipped += 1;
                continue;
            };
            match ParamValue::from_json(value) {
                Some(server_value) => {
                    // spec_for_wire succeeded, so the conversion cannot miss.
                    if let Some(display) = self.registry.to_display(spec.key, server_value) {
                        settings.insert(spec.key, display);
                    }
                }
                None => {
                    tracing::debug!(key = %name, "skipping undecodable parameter value");
                    skipped += 1;
                }
            }
        }
        if settings.is_empty() {
            return Err(PanelError::EmptySnapshot);
        }
        tracing::debug!(recognized = settings.len(), skipped, seq, "ingesting snapshot");

        self.store.replace_all(settings, seq);
        let supported = self.gate.supported(&self.store.current());
        Ok(self.gate.controls_to_disable(&supported))
    }

    /// Fetch the remote snapshot and replace the store wholesale.
    ///
    /// On any failure the existing store is kept (fail-keep-stale) and a
    /// generic error message is shown; the cause goes to the log only.
    pub async fn pull(&self) -> PullReport {
        let seq = self.next_seq();
        let result = match self.client.get_camera_settings().await {
            Ok(wire) => self.ingest(seq, wire),
            Err(err) => Err(err),
        };
        match result {
            Ok(disabled_controls) => PullReport {
                refreshed: true,
                disabled_controls,
                message: None,
            },
            Err(err) => {
                tracing::warn!(error = %err, "settings fetch failed");
                let token = self.messenger.show(Outcome::Error, [PULL_FAILED]);
                PullReport {
                    refreshed: false,
                    disabled_controls: Vec::new(),
                    message: Some(token),
                }
            }
        }
    }

    /// Current snapshot as an update payload: every supported key (not just
    /// the edited one), server units, raw wire names. Parameters the camera
    /// never reported are omitted.
    fn outbound_payload(&self) -> WireSettings {
        let current = self.store.current();
        let supported = self.gate.supported(&current);
        let mut wire = WireSettings::new();
        for (key, value) in &current {
            if !supported.contains(*key) {
                continue;
            }
            // supported() already filtered to registered keys.
            if let Some(server_value) = self.registry.to_server(*key, *value) {
                wire.insert(key.wire_name().to_string(), server_value.to_json());
            }
        }
        wire
    }

    /// Submit one edited control's value, carrying the full supported
    /// snapshot as the payload.
    ///
    /// The edit is applied to the store optimistically and is not rolled
    /// back on failure; the view keeps showing what the operator typed.
    pub async fn push(&self, key: ParameterKey, display_value: ParamValue) -> PushReport {
        let supported = self.gate.supported(&self.store.current());
        if !supported.contains(key) {
            // Disabled controls are inert; nothing goes out for them.
            tracing::debug!(key = key.wire_name(), "ignoring edit of unsupported parameter");
            return PushReport {
                accepted: false,
                message: None,
            };
        }

        let seq = self.next_seq();
        if let Err(err) = self.store.set_local(key, display_value, seq) {
            tracing::debug!(error = %err, "rejected local edit");
            return PushReport {
                accepted: false,
                message: None,
            };
        }

        let payload = self.outbound_payload();
        let token = match self.client.update_camera(&payload).await {
            Ok(outcome) if outcome.is_success() => self
                .messenger
                .show(Outcome::Success, texts_or(&outcome, PUSH_OK)),
            Ok(outcome) => self
                .messenger
                .show(Outcome::Error, texts_or(&outcome, PUSH_FAILED)),
            Err(err) => {
                tracing::warn!(error = %err, "settings update failed");
                self.messenger.show(Outcome::Error, [PUSH_FAILED])
            }
        };
        PushReport {
            accepted: true,
            message: Some(token),
        }
    }
}

/// Submits named presets and resets, then forces a full resynchronization.
///
/// A preset mutates many server-side fields atomically; the client cannot
/// know the resulting values without refetching, so success is always
/// followed by a pull. Failure shows the error and deliberately does not
/// pull.
#[derive(Debug, Clone)]
pub struct PresetApplier {
    sync: Arc<SettingsSynchronizer>,
}

impl PresetApplier {
    pub fn new(sync: Arc<SettingsSynchronizer>) -> PresetApplier {
        PresetApplier { sync }
    }

    pub async fn apply(&self, preset: &str) -> PresetReport {
        let result = self.sync.client().apply_preset(preset).await;
        self.finish(result, PRESET_OK, PRESET_FAILED).await
    }

    pub async fn reset(&self) -> PresetReport {
        let result = self.sync.client().reset_camera().await;
        self.finish(result, RESET_OK, RESET_FAILED).await
    }

    async fn finish(
        &self,
        result: Result<ServerOutcome, PanelError>,
        ok_text: &str,
        err_text: &str,
    ) -> PresetReport {
        match result {
            Ok(outcome) if outcome.is_success() => {
                let mut message = self
                    .sync
                    .messenger()
                    .show(Outcome::Success, texts_or(&outcome, ok_text));
                let pull = self.sync.pull().await;
                if let Some(token) = pull.message {
                    message = token;
                }
                PresetReport {
                    resynced: pull.refreshed,
                    disabled_controls: pull.disabled_controls,
                    message: Some(message),
                }
            }
            Ok(outcome) => {
                let token = self
                    .sync
                    .messenger()
                    .show(Outcome::Error, texts_or(&outcome, err_text));
                PresetReport {
                    resynced: false,
                    disabled_controls: Vec::new(),
                    message: Some(token),
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "preset request failed");
                let token = self.sync.messenger().show(Outcome::Error, [err_text]);
                PresetReport {
                    resynced: false,
                    disabled_controls: Vec::new(),
                    message: Some(token),
                }
            }
        }
    }
}

/// One handle wiring client, registry, store, gate, synchronizer, applier,
/// and messenger together for the view.
#[derive(Debug, Clone)]
pub struct Panel {
    registry: Arc<SchemaRegistry>,
    store: Arc<SettingsStore>,
    gate: CapabilityGate,
    messenger: Arc<StatusMessenger>,
    sync: Arc<SettingsSynchronizer>,
    presets: PresetApplier,
}

impl Panel {
    /// Assemble a panel for a known schema version.
    pub fn with_version(client: CameraClient, version: SchemaVersion) -> Panel {
        let registry = Arc::new(SchemaRegistry::for_version(version));
        let store = Arc::new(SettingsStore::new(Arc::clone(&registry)));
        let gate = CapabilityGate::new(Arc::clone(&registry));
        let messenger = Arc::new(StatusMessenger::new());
        let sync = Arc::new(SettingsSynchronizer::new(
            client,
            Arc::clone(&registry),
            Arc::clone(&store),
            gate.clone(),
            Arc::clone(&messenger),
        ));
        let presets = PresetApplier::new(Arc::clone(&sync));
        Panel {
            registry,
            store,
            gate,
            messenger,
            sync,
            presets,
        }
    }

    /// Probe the server once, negotiate the schema version from the returned
    /// key set, and seed the store from the probe snapshot.
    pub async fn connect(client: CameraClient) -> Result<Panel, PanelError> {
        let probe = client.get_camera_settings().await?;
        let version = SchemaVersion::detect(probe.keys().map(String::as_str));
        tracing::info!(?version, keys = probe.len(), "negotiated camera schema");

        let panel = Panel::with_version(client, version);
        let seq = panel.sync.next_seq();
        panel.sync.ingest(seq, probe)?;
        Ok(panel)
    }

    pub fn client(&self) -> &CameraClient {
        self.sync.client()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn messenger(&self) -> &StatusMessenger {
        &self.messenger
    }

    /// Controls to disable for the snapshot currently in the store.
    pub fn disabled_controls(&self) -> Vec<ControlId> {
        let supported = self.gate.supported(&self.store.current());
        self.gate.controls_to_disable(&supported)
    }

    pub async fn pull(&self) -> PullReport {
        self.sync.pull().await
    }

    pub async fn push(&self, key: ParameterKey, display_value: ParamValue) -> PushReport {
        self.sync.push(key, display_value).await
    }

    pub async fn apply_preset(&self, preset: &str) -> PresetReport {
        self.presets.apply(preset).await
    }

    pub async fn reset(&self) -> PresetReport {
        self.presets.reset().await
    }

    /// Drop cached state on page unload.
    pub fn teardown(&self) {
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronizer(version: SchemaVersion) -> SettingsSynchronizer {
        let registry = Arc::new(SchemaRegistry::for_version(version));
        let store = Arc::new(SettingsStore::new(Arc::clone(&registry)));
        let gate = CapabilityGate::new(Arc::clone(&registry));
        SettingsSynchronizer::new(
            CameraClient::new("http://unreachable.invalid"),
            registry,
            store,
            gate,
            Arc::new(StatusMessenger::new()),
        )
    }

    fn wire(json: serde_json::Value) -> WireSettings {
        match json {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_ingest_converts_units_and_disables_missing() {
        let sync = synchronizer(SchemaVersion::Legacy);
        let disabled = sync
            .ingest(1, wire(serde_json::json!({"exposureTime": 20000, "iso": 400})))
            .unwrap();

        // 20000 us displays as 20 ms.
        assert_eq!(
            sync.store.get(ParameterKey::ExposureTime),
            Some(ParamValue::Number(20.0))
        );
        assert_eq!(sync.store.get(ParameterKey::Iso), Some(ParamValue::Number(400.0)));
        assert!(disabled.contains(&"awb-mode"));
        assert!(!disabled.contains(&"exposure-time"));
        assert!(!disabled.contains(&"iso"));
    }

    #[test]
    fn test_ingest_skips_unrecognized_keys() {
        let sync = synchronizer(SchemaVersion::Modern);
        sync.ingest(
            1,
            wire(serde_json::json!({"iso": 800, "focusPeaking": true, "lensModel": "f/1.8"})),
        )
        .unwrap();

        let current = sync.store.current();
        assert_eq!(current.len(), 1);
        assert_eq!(current.get(&ParameterKey::Iso), Some(&ParamValue::Number(800.0)));
    }

    #[test]
    fn test_ingest_rejects_snapshot_with_no_recognized_keys() {
        let sync = synchronizer(SchemaVersion::Modern);
        sync.ingest(1, wire(serde_json::json!({"iso": 100}))).unwrap();

        let err = sync
            .ingest(2, wire(serde_json::json!({"focusPeaking": true})))
            .unwrap_err();
        assert!(matches!(err, PanelError::EmptySnapshot));
        // Fail-keep-stale: the previous snapshot survives.
        assert_eq!(sync.store.get(ParameterKey::Iso), Some(ParamValue::Number(100.0)));
    }

    #[test]
    fn test_stale_ingest_leaves_newer_snapshot() {
        let sync = synchronizer(SchemaVersion::Modern);
        let newer_seq = {
            sync.next_seq();
            sync.next_seq()
        };
        sync.ingest(newer_seq, wire(serde_json::json!({"iso": 800}))).unwrap();
        sync.ingest(1, wire(serde_json::json!({"iso": 100}))).unwrap();
        assert_eq!(sync.store.get(ParameterKey::Iso), Some(ParamValue::Number(800.0)));
    }

    #[test]
    fn test_outbound_payload_is_full_supported_snapshot_in_server_units() {
        let sync = synchronizer(SchemaVersion::Legacy);
        sync.ingest(
            1,
            wire(serde_json::json!({"exposureTime": 20000, "iso": 400, "lensShading": true})),
        )
        .unwrap();

        let payload = sync.outbound_payload();
        assert_eq!(payload.len(), 3);
        // Display 20 ms goes back out as 20000 us.
        assert_eq!(payload["exposureTime"], serde_json::json!(20000));
        assert_eq!(payload["iso"], serde_json::json!(400));
        assert_eq!(payload["lensShading"], serde_json::json!(true));
        // Registered but unreported parameters stay out of the payload.
        assert!(!payload.contains_key("blackLevel"));
    }

    #[tokio::test]
    async fn test_push_refuses_unsupported_parameter() {
        let sync = synchronizer(SchemaVersion::Legacy);
        sync.ingest(1, wire(serde_json::json!({"iso": 400}))).unwrap();

        // blackLevel is registered but the camera never reported it; the
        // control is inert and no request goes out.
        let report = sync
            .push(ParameterKey::BlackLevel, ParamValue::Number(16.0))
            .await;
        assert!(!report.accepted);
        assert!(report.message.is_none());
        assert_eq!(sync.store.get(ParameterKey::BlackLevel), None);
        assert!(sync.messenger.current().is_none());
    }
}
