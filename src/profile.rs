//! Vision profile record and its merge-with-defaults contract.
//!
//! The profile is plain data. Range enforcement happens in the transforms
//! that read each field, so a profile may carry out-of-range values.

use serde::{Deserialize, Serialize};

use crate::vector::clamp;

/// Lower/upper bound for the base font size in px.
pub const FONT_SIZE_RANGE: (f64, f64) = (16.0, 30.0);
/// Lower/upper bound for the page brightness clamp.
pub const LUMINANCE_CLAMP_RANGE: (f64, f64) = (0.65, 1.0);
/// Lower/upper bound for keratoconus severity.
pub const SEVERITY_RANGE: (f64, f64) = (0.0, 5.0);
/// Lower/upper bound for astigmatism power in diopters.
pub const ASTIGMAT_POWER_RANGE: (f64, f64) = (0.0, 6.0);
/// Lower/upper bound for explicit coma intensity.
pub const COMA_INTENSITY_RANGE: (f64, f64) = (0.0, 5.0);

/// The user's optical correction needs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionProfile {
    /// Astigmatism axis in degrees (mod 180).
    pub astigmat_axis: f64,
    /// Astigmatism power in diopters.
    pub astigmat_power: f64,
    /// Keratoconus severity on a continuous 0–5 scale.
    pub kerato_severity: f64,
    /// Base font size in px.
    pub font_size: f64,
    /// Page brightness fraction.
    pub luminance_clamp: f64,
    /// Master switch.
    pub enabled: bool,
    /// Full-document reverse contrast.
    pub polarity_reversed: bool,
    /// Text stroke enhancement.
    pub edge_enhancement: bool,
    /// Pointer-tracked reading strip overlay.
    pub reading_guide: bool,
    /// Coma direction in degrees (0–360, directional).
    pub coma_angle: f64,
    /// Coma intensity (0 derives it from severity).
    pub coma_intensity: f64,
    /// Chromatic aberration hints for the edge stroke.
    pub chromatic_correction: bool,
}

impl Default for VisionProfile {
    fn default() -> Self {
        Self {
            astigmat_axis: 90.0,
            astigmat_power: 1.5,
            kerato_severity: 2.0,
            font_size: 18.0,
            luminance_clamp: 0.95,
            enabled: true,
            polarity_reversed: false,
            edge_enhancement: true,
            reading_guide: false,
            coma_angle: 0.0,
            coma_intensity: 0.0,
            chromatic_correction: true,
        }
    }
}

impl VisionProfile {
    /// Severity clamped to `[0, 5]`.
    pub fn severity(&self) -> f64 {
        clamp(self.kerato_severity, SEVERITY_RANGE.0, SEVERITY_RANGE.1)
    }

    /// Font size clamped to `[16, 30]` px.
    pub fn font_size_px(&self) -> f64 {
        clamp(self.font_size, FONT_SIZE_RANGE.0, FONT_SIZE_RANGE.1)
    }

    /// Brightness clamp limited to `[0.65, 1.0]`.
    pub fn luminance(&self) -> f64 {
        clamp(
            self.luminance_clamp,
            LUMINANCE_CLAMP_RANGE.0,
            LUMINANCE_CLAMP_RANGE.1,
        )
    }

    /// Astigmatism power limited to `[0, 6]` diopters.
    pub fn astigmat_power_diopters(&self) -> f64 {
        clamp(
            self.astigmat_power,
            ASTIGMAT_POWER_RANGE.0,
            ASTIGMAT_POWER_RANGE.1,
        )
    }

    /// Parse a JSON record, filling missing fields from defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<StoredProfile>(raw).map(StoredProfile::merge_with_defaults)
    }
}

/// Partially populated profile as persisted or pushed by the host.
///
/// Every field is optional; unknown keys are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredProfile {
    pub astigmat_axis: Option<f64>,
    pub astigmat_power: Option<f64>,
    pub kerato_severity: Option<f64>,
    pub font_size: Option<f64>,
    pub luminance_clamp: Option<f64>,
    pub enabled: Option<bool>,
    pub polarity_reversed: Option<bool>,
    pub edge_enhancement: Option<bool>,
    pub reading_guide: Option<bool>,
    pub coma_angle: Option<f64>,
    pub coma_intensity: Option<f64>,
    pub chromatic_correction: Option<bool>,
}

impl StoredProfile {
    /// Overlay the stored fields on the documented defaults.
    pub fn merge_with_defaults(self) -> VisionProfile {
        self.merge_onto(VisionProfile::default())
    }

    /// Overlay the stored fields on an arbitrary base profile.
    pub fn merge_onto(self, base: VisionProfile) -> VisionProfile {
        VisionProfile {
            astigmat_axis: self.astigmat_axis.unwrap_or(base.astigmat_axis),
            astigmat_power: self.astigmat_power.unwrap_or(base.astigmat_power),
            kerato_severity: self.kerato_severity.unwrap_or(base.kerato_severity),
            font_size: self.font_size.unwrap_or(base.font_size),
            luminance_clamp: self.luminance_clamp.unwrap_or(base.luminance_clamp),
            enabled: self.enabled.unwrap_or(base.enabled),
            polarity_reversed: self.polarity_reversed.unwrap_or(base.polarity_reversed),
            edge_enhancement: self.edge_enhancement.unwrap_or(base.edge_enhancement),
            reading_guide: self.reading_guide.unwrap_or(base.reading_guide),
            coma_angle: self.coma_angle.unwrap_or(base.coma_angle),
            coma_intensity: self.coma_intensity.unwrap_or(base.coma_intensity),
            chromatic_correction: self
                .chromatic_correction
                .unwrap_or(base.chromatic_correction),
        }
    }

    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<VisionProfile> for StoredProfile {
    fn from(p: VisionProfile) -> Self {
        Self {
            astigmat_axis: Some(p.astigmat_axis),
            astigmat_power: Some(p.astigmat_power),
            kerato_severity: Some(p.kerato_severity),
            font_size: Some(p.font_size),
            luminance_clamp: Some(p.luminance_clamp),
            enabled: Some(p.enabled),
            polarity_reversed: Some(p.polarity_reversed),
            edge_enhancement: Some(p.edge_enhancement),
            reading_guide: Some(p.reading_guide),
            coma_angle: Some(p.coma_angle),
            coma_intensity: Some(p.coma_intensity),
            chromatic_correction: Some(p.chromatic_correction),
        }
    }
}
