//! Versioned camera parameter registry.
//!
//! Two server generations are in the field and they disagree on which
//! parameters exist, what unit exposure time travels in, and how controls
//! are named in the DOM. Each generation gets its own [`SchemaRegistry`];
//! the rest of the crate is version-agnostic and only talks to the registry.

use std::collections::HashSet;

/// DOM id of the control bound to a parameter.
pub type ControlId = &'static str;

/// Stable logical identifier for a camera parameter.
///
/// This is the union of every parameter any supported server generation
/// exposes; a given registry only registers the subset its generation knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterKey {
    ExposureTime,
    Iso,
    AwbMode,
    FrameRate,
    Brightness,
    Contrast,
    Saturation,
    Sharpness,
    HdrMode,
    AeExposureMode,
    AeMeteringMode,
    NoiseReduction,
    TemporalNoiseReduction,
    HighQualityDenoise,
    LocalToneMapping,
    LensShading,
    DefectivePixelCorrection,
    BlackLevel,
}

impl ParameterKey {
    /// Key name as it appears in request and response bodies.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::ExposureTime => "exposureTime",
            Self::Iso => "iso",
            Self::AwbMode => "awbMode",
            Self::FrameRate => "frameRate",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
            Self::Sharpness => "sharpness",
            Self::HdrMode => "hdrMode",
            Self::AeExposureMode => "aeExposureMode",
            Self::AeMeteringMode => "aeMeteringMode",
            Self::NoiseReduction => "noiseReduction",
            Self::TemporalNoiseReduction => "temporalNoiseReduction",
            Self::HighQualityDenoise => "highQualityDenoise",
            Self::LocalToneMapping => "localToneMapping",
            Self::LensShading => "lensShading",
            Self::DefectivePixelCorrection => "defectivePixelCorrection",
            Self::BlackLevel => "blackLevel",
        }
    }
}

/// A camera parameter value in transit between controls and the store.
///
/// Enum-kind parameters ride as numbers (the wire encodes them as small
/// integers); everything else is a plain number or a flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Bool(bool),
}

impl ParamValue {
    /// Decode a JSON value from a settings snapshot. Strings, nulls, and
    /// nested structures have no registered meaning and decode to `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<ParamValue> {
        match value {
            serde_json::Value::Bool(b) => Some(ParamValue::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(ParamValue::Number),
            _ => None,
        }
    }

    /// Encode for an outbound request body. Whole numbers are written as
    /// integers so enum selectors round-trip the way the server sent them.
    pub fn to_json(self) -> serde_json::Value {
        match self {
            ParamValue::Bool(b) => serde_json::Value::Bool(b),
            ParamValue::Number(n) if n.fract() == 0.0 && n.abs() < 2f64.powi(53) => {
                serde_json::Value::from(n as i64)
            }
            ParamValue::Number(n) => serde_json::Value::from(n),
        }
    }

    pub fn as_number(self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(n),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(b),
            ParamValue::Number(_) => None,
        }
    }
}

/// What sort of control a parameter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Numeric,
    Boolean,
    Enum,
}

/// Bidirectional conversion between the server's stored unit and the
/// displayed unit. Applied symmetrically on pull and push.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitTransform {
    Identity,
    /// server value = display value * `server_per_display`
    Scale { server_per_display: f64 },
}

impl UnitTransform {
    pub fn to_display(self, server_value: f64) -> f64 {
        match self {
            Self::Identity => server_value,
            Self::Scale { server_per_display } => server_value / server_per_display,
        }
    }

    pub fn to_server(self, display_value: f64) -> f64 {
        match self {
            Self::Identity => display_value,
            Self::Scale { server_per_display } => display_value * server_per_display,
        }
    }
}

/// One selectable value of an enum-kind parameter.
///
/// Option lists are presentation metadata for rendering `<select>` controls;
/// they take no part in validation (the server owns range checking).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumOption {
    pub label: &'static str,
    pub value: i64,
}

const fn opt(label: &'static str, value: i64) -> EnumOption {
    EnumOption { label, value }
}

const AWB_MODE_OPTIONS: &[EnumOption] = &[
    opt("Auto", 0),
    opt("Incandescent", 1),
    opt("Fluorescent", 2),
    opt("Daylight", 3),
    opt("Cloudy", 4),
];

const NOISE_REDUCTION_OPTIONS: &[EnumOption] =
    &[opt("Off", 0), opt("Fast", 1), opt("High Quality", 2)];

const HDR_MODE_OPTIONS: &[EnumOption] = &[
    opt("Off", 0),
    opt("Single Exposure", 1),
    opt("Multi Exposure", 2),
    opt("Night", 3),
];

const AE_EXPOSURE_MODE_OPTIONS: &[EnumOption] =
    &[opt("Normal", 0), opt("Short", 1), opt("Long", 2), opt("Custom", 3)];

const AE_METERING_MODE_OPTIONS: &[EnumOption] =
    &[opt("Centre Weighted", 0), opt("Spot", 1), opt("Matrix", 2)];

/// Everything the panel knows about one parameter of the active schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub key: ParameterKey,
    pub wire_name: &'static str,
    pub kind: ValueKind,
    pub control_id: ControlId,
    pub label: &'static str,
    pub transform: UnitTransform,
    /// Non-empty only for `ValueKind::Enum`.
    pub options: &'static [EnumOption],
}

/// Deployed server generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Generation 1: hyphenated control ids, exposure time in microseconds,
    /// the full noise-reduction/sensor-correction parameter family.
    Legacy,
    /// Generation 2: camelCase control ids matching the wire names, exposure
    /// time already in milliseconds, AE mode parameters.
    Modern,
}

impl SchemaVersion {
    /// Pick the version whose registered key set best matches an observed
    /// snapshot. Runs once at panel startup from a probe fetch; ties favour
    /// `Modern`.
    pub fn detect<'a, I>(observed_keys: I) -> SchemaVersion
    where
        I: IntoIterator<Item = &'a str>,
    {
        let observed: HashSet<&str> = observed_keys.into_iter().collect();
        let hits = |version: SchemaVersion| {
            SchemaRegistry::for_version(version)
                .specs()
                .iter()
                .filter(|spec| observed.contains(spec.wire_name))
                .count()
        };
        if hits(SchemaVersion::Legacy) > hits(SchemaVersion::Modern) {
            SchemaVersion::Legacy
        } else {
            SchemaVersion::Modern
        }
    }
}

/// Registry of every parameter one schema version can describe.
///
/// Selection of the active registry is an external concern: it is detected
/// once from a probe fetch and injected into the components that need it,
/// never re-derived per request.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: SchemaVersion,
    specs: Vec<ParameterSpec>,
}

impl SchemaRegistry {
    pub fn for_version(version: SchemaVersion) -> SchemaRegistry {
        let specs = match version {
            SchemaVersion::Legacy => legacy_specs(),
            SchemaVersion::Modern => modern_specs(),
        };
        SchemaRegistry { version, specs }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Registered specs in declaration order (the order controls render in).
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn spec_for(&self, key: ParameterKey) -> Option<&ParameterSpec> {
        self.specs.iter().find(|spec| spec.key == key)
    }

    pub fn spec_for_wire(&self, wire_name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|spec| spec.wire_name == wire_name)
    }

    pub fn all_keys(&self) -> impl Iterator<Item = ParameterKey> + '_ {
        self.specs.iter().map(|spec| spec.key)
    }

    /// Convert a server-unit value to its display unit. `None` for keys this
    /// registry does not describe.
    pub fn to_display(&self, key: ParameterKey, value: ParamValue) -> Option<ParamValue> {
        let spec = self.spec_for(key)?;
        Some(match value {
            ParamValue::Number(n) => ParamValue::Number(spec.transform.to_display(n)),
            ParamValue::Bool(b) => ParamValue::Bool(b),
        })
    }

    /// Convert a display-unit value back to the server's unit.
    pub fn to_server(&self, key: ParameterKey, value: ParamValue) -> Option<ParamValue> {
        let spec = self.spec_for(key)?;
        Some(match value {
            ParamValue::Number(n) => ParamValue::Number(spec.transform.to_server(n)),
            ParamValue::Bool(b) => ParamValue::Bool(b),
        })
    }
}

fn spec(
    key: ParameterKey,
    kind: ValueKind,
    control_id: ControlId,
    label: &'static str,
    transform: UnitTransform,
    options: &'static [EnumOption],
) -> ParameterSpec {
    ParameterSpec {
        key,
        wire_name: key.wire_name(),
        kind,
        control_id,
        label,
        transform,
        options,
    }
}

fn legacy_specs() -> Vec<ParameterSpec> {
    use ParameterKey::*;
    use UnitTransform::{Identity, Scale};
    use ValueKind::*;
    vec![
        // Stored server-side in microseconds, displayed in milliseconds.
        spec(
            ExposureTime,
            Numeric,
            "exposure-time",
            "Exposure Time (ms)",
            Scale {
                server_per_display: 1000.0,
            },
            &[],
        ),
        spec(Iso, Numeric, "iso", "ISO", Identity, &[]),
        spec(AwbMode, Enum, "awb-mode", "White Balance", Identity, AWB_MODE_OPTIONS),
        spec(FrameRate, Numeric, "frame-rate", "Frame Rate (fps)", Identity, &[]),
        spec(
            NoiseReduction,
            Enum,
            "noise-reduction",
            "Noise Reduction",
            Identity,
            NOISE_REDUCTION_OPTIONS,
        ),
        spec(Contrast, Numeric, "contrast", "Contrast", Identity, &[]),
        spec(Brightness, Numeric, "brightness", "Brightness", Identity, &[]),
        spec(Sharpness, Numeric, "sharpness", "Sharpness", Identity, &[]),
        spec(HdrMode, Enum, "hdr-mode", "HDR Mode", Identity, HDR_MODE_OPTIONS),
        spec(
            TemporalNoiseReduction,
            Boolean,
            "temporal-noise-reduction",
            "Temporal Noise Reduction",
            Identity,
            &[],
        ),
        spec(
            HighQualityDenoise,
            Boolean,
            "high-quality-denoise",
            "High Quality Denoise",
            Identity,
            &[],
        ),
        spec(
            LocalToneMapping,
            Boolean,
            "local-tone-mapping",
            "Local Tone Mapping",
            Identity,
            &[],
        ),
        spec(LensShading, Boolean, "lens-shading", "Lens Shading", Identity, &[]),
        spec(
            DefectivePixelCorrection,
            Boolean,
            "defective-pixel-correction",
            "Defective Pixel Correction",
            Identity,
            &[],
        ),
        spec(BlackLevel, Numeric, "black-level", "Black Level", Identity, &[]),
    ]
}

fn modern_specs() -> Vec<ParameterSpec> {
    use ParameterKey::*;
    use UnitTransform::Identity;
    use ValueKind::*;
    vec![
        // Wire unit is already milliseconds in this generation.
        spec(
            ExposureTime,
            Numeric,
            "exposureTime",
            "Exposure Time (ms)",
            Identity,
            &[],
        ),
        spec(Iso, Numeric, "iso", "ISO", Identity, &[]),
        spec(AwbMode, Enum, "awbMode", "White Balance", Identity, AWB_MODE_OPTIONS),
        spec(FrameRate, Numeric, "frameRate", "Frame Rate (fps)", Identity, &[]),
        spec(Brightness, Numeric, "brightness", "Brightness", Identity, &[]),
        spec(Contrast, Numeric, "contrast", "Contrast", Identity, &[]),
        spec(Saturation, Numeric, "saturation", "Saturation", Identity, &[]),
        spec(Sharpness, Numeric, "sharpness", "Sharpness", Identity, &[]),
        spec(HdrMode, Enum, "hdrMode", "HDR Mode", Identity, HDR_MODE_OPTIONS),
        spec(
            AeExposureMode,
            Enum,
            "aeExposureMode",
            "AE Exposure Mode",
            Identity,
            AE_EXPOSURE_MODE_OPTIONS,
        ),
        spec(
            AeMeteringMode,
            Enum,
            "aeMeteringMode",
            "AE Metering Mode",
            Identity,
            AE_METERING_MODE_OPTIONS,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_legacy_exposure_unit_round_trip() {
        let registry = SchemaRegistry::for_version(SchemaVersion::Legacy);

        let displayed = registry
            .to_display(ParameterKey::ExposureTime, ParamValue::Number(20000.0))
            .unwrap();
        assert_eq!(displayed, ParamValue::Number(20.0));

        let back = registry
            .to_server(ParameterKey::ExposureTime, displayed)
            .unwrap();
        assert_relative_eq!(back.as_number().unwrap(), 20000.0);
    }

    #[test]
    fn test_modern_exposure_is_identity() {
        let registry = SchemaRegistry::for_version(SchemaVersion::Modern);
        let displayed = registry
            .to_display(ParameterKey::ExposureTime, ParamValue::Number(20.0))
            .unwrap();
        assert_eq!(displayed, ParamValue::Number(20.0));
    }

    #[test]
    fn test_control_id_conventions() {
        let legacy = SchemaRegistry::for_version(SchemaVersion::Legacy);
        let modern = SchemaRegistry::for_version(SchemaVersion::Modern);

        assert_eq!(
            legacy.spec_for(ParameterKey::ExposureTime).unwrap().control_id,
            "exposure-time"
        );
        assert_eq!(
            modern.spec_for(ParameterKey::ExposureTime).unwrap().control_id,
            "exposureTime"
        );
    }

    #[test]
    fn test_unregistered_keys_resolve_to_none() {
        let modern = SchemaRegistry::for_version(SchemaVersion::Modern);
        assert!(modern.spec_for(ParameterKey::BlackLevel).is_none());
        assert!(modern.spec_for_wire("blackLevel").is_none());
        assert!(modern.spec_for_wire("notAParameter").is_none());
        assert!(modern
            .to_display(ParameterKey::BlackLevel, ParamValue::Number(1.0))
            .is_none());
    }

    #[test]
    fn test_detect_legacy_generation() {
        let version = SchemaVersion::detect(
            ["exposureTime", "iso", "noiseReduction", "blackLevel", "lensShading"],
        );
        assert_eq!(version, SchemaVersion::Legacy);
    }

    #[test]
    fn test_detect_modern_generation() {
        let version =
            SchemaVersion::detect(["exposureTime", "iso", "saturation", "aeExposureMode"]);
        assert_eq!(version, SchemaVersion::Modern);
    }

    #[test]
    fn test_detect_tie_favours_modern() {
        // Keys common to both generations score equally.
        let version = SchemaVersion::detect(["exposureTime", "iso", "awbMode"]);
        assert_eq!(version, SchemaVersion::Modern);
    }

    #[test]
    fn test_param_value_json_round_trip() {
        assert_eq!(
            ParamValue::from_json(&serde_json::json!(400)),
            Some(ParamValue::Number(400.0))
        );
        assert_eq!(
            ParamValue::from_json(&serde_json::json!(true)),
            Some(ParamValue::Bool(true))
        );
        assert_eq!(ParamValue::from_json(&serde_json::json!("auto")), None);

        // Whole numbers encode as integers, not floats.
        assert_eq!(ParamValue::Number(400.0).to_json(), serde_json::json!(400));
        assert_eq!(ParamValue::Number(2.5).to_json(), serde_json::json!(2.5));
    }

    #[test]
    fn test_enum_specs_carry_options() {
        let legacy = SchemaRegistry::for_version(SchemaVersion::Legacy);
        for spec in legacy.specs() {
            match spec.kind {
                ValueKind::Enum => assert!(!spec.options.is_empty(), "{}", spec.wire_name),
                _ => assert!(spec.options.is_empty(), "{}", spec.wire_name),
            }
        }
    }
}
