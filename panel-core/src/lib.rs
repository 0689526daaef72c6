//! Settings reconciliation and capability negotiation for a network camera
//! control panel.
//!
//! The camera server owns the configuration; this crate keeps the values the
//! operator sees, the set of controls that are meaningful for the connected
//! firmware, and the server-side state consistent across asynchronous and
//! occasionally failing round trips. Compiles for both the browser
//! (`wasm32-unknown-unknown`, gloo-net transport) and native targets
//! (reqwest transport, used by the test suite).

pub mod capability;
pub mod client;
pub mod error;
pub mod schema;
pub mod settings;
pub mod status;
pub mod stream;
pub mod sync;

pub use capability::{CapabilityGate, SupportedSet};
pub use client::{CameraClient, OutcomeStatus, ServerOutcome, WireSettings};
pub use error::PanelError;
pub use schema::{
    ControlId, EnumOption, ParamValue, ParameterKey, ParameterSpec, SchemaRegistry, SchemaVersion,
    UnitTransform, ValueKind,
};
pub use settings::{CameraSettings, SettingsStore};
pub use status::{MessageToken, Outcome, StatusMessage, StatusMessenger, STATUS_DISMISS_MS};
pub use stream::{StreamHealthMonitor, StreamStatusResponse, STREAM_POLL_MS};
pub use sync::{Panel, PresetApplier, PresetReport, PullReport, PushReport, SettingsSynchronizer};
