//! Capability negotiation: which controls are meaningful for the camera
//! that is actually connected.
//!
//! The supported set is derived from the latest fetched snapshot, not from a
//! static list, so a firmware that stops reporting a parameter disables its
//! control on the next pull.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::schema::{ControlId, ParameterKey, SchemaRegistry};
use crate::settings::CameraSettings;

/// Parameters present in the latest fetch, restricted to the active schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedSet(BTreeSet<ParameterKey>);

impl SupportedSet {
    pub fn contains(&self, key: ParameterKey) -> bool {
        self.0.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ParameterKey> + '_ {
        self.0.iter().copied()
    }
}

/// Derives enable/disable state for controls from a settings snapshot.
///
/// Stateless: both operations are pure functions of their input, recomputed
/// synchronously after every wholesale store replacement.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    registry: Arc<SchemaRegistry>,
}

impl CapabilityGate {
    pub fn new(registry: Arc<SchemaRegistry>) -> CapabilityGate {
        CapabilityGate { registry }
    }

    /// Keys present in the snapshot that the active schema describes.
    pub fn supported(&self, settings: &CameraSettings) -> SupportedSet {
        SupportedSet(
            settings
                .keys()
                .copied()
                .filter(|&key| self.registry.spec_for(key).is_some())
                .collect(),
        )
    }

    /// Every registered control whose parameter the camera did not report.
    pub fn controls_to_disable(&self, supported: &SupportedSet) -> Vec<ControlId> {
        self.registry
            .specs()
            .iter()
            .filter(|spec| !supported.contains(spec.key))
            .map(|spec| spec.control_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamValue, SchemaVersion};

    fn gate(version: SchemaVersion) -> CapabilityGate {
        CapabilityGate::new(Arc::new(SchemaRegistry::for_version(version)))
    }

    #[test]
    fn test_supported_is_snapshot_intersect_schema() {
        let gate = gate(SchemaVersion::Legacy);
        let mut settings = CameraSettings::new();
        settings.insert(ParameterKey::ExposureTime, ParamValue::Number(20.0));
        settings.insert(ParameterKey::Iso, ParamValue::Number(400.0));
        // saturation is a modern-only parameter; the legacy registry does not
        // describe it, so it cannot count as supported.
        settings.insert(ParameterKey::Saturation, ParamValue::Number(1.0));

        let supported = gate.supported(&settings);
        assert_eq!(supported.len(), 2);
        assert!(supported.contains(ParameterKey::ExposureTime));
        assert!(supported.contains(ParameterKey::Iso));
        assert!(!supported.contains(ParameterKey::Saturation));
    }

    #[test]
    fn test_unreported_controls_are_disabled() {
        let gate = gate(SchemaVersion::Legacy);
        let mut settings = CameraSettings::new();
        settings.insert(ParameterKey::ExposureTime, ParamValue::Number(20.0));
        settings.insert(ParameterKey::Iso, ParamValue::Number(400.0));

        let disabled = gate.controls_to_disable(&gate.supported(&settings));
        assert!(!disabled.contains(&"exposure-time"));
        assert!(!disabled.contains(&"iso"));
        assert!(disabled.contains(&"awb-mode"));
        assert!(disabled.contains(&"black-level"));
        // Legacy registers 15 parameters, 2 are present.
        assert_eq!(disabled.len(), 13);
    }

    #[test]
    fn test_empty_snapshot_disables_everything() {
        let gate = gate(SchemaVersion::Modern);
        let supported = gate.supported(&CameraSettings::new());
        assert!(supported.is_empty());
        assert_eq!(gate.controls_to_disable(&supported).len(), 11);
    }
}
