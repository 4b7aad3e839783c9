//! Axis/power to compensation shadow vectors.
//!
//! The compensation shadow is cast perpendicular to the distortion axis.
//! Two smaller stabilizer layers (perpendicular and anti-parallel) balance it.

use alloc::format;
use alloc::vec::Vec;

use crate::css::{body_selectors, text_shadow_value, CssNum, StyleFragment, SHADOW_TARGETS};
use crate::profile::VisionProfile;
use crate::vector::{normalize_axis, polar_to_cartesian, ShadowVector};

const DISTANCE_PER_DIOPTER: f64 = 0.8;
const BLUR_PER_PX: f64 = 0.6;
const MAX_OPACITY: f64 = 0.5;

/// Primary vector plus its two stabilizers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AstigmatismShadow {
    pub primary: ShadowVector,
    /// 0.4× magnitude, rotated +90°, half opacity.
    pub perpendicular: ShadowVector,
    /// 0.2× magnitude, reversed, quarter opacity.
    pub anti_parallel: ShadowVector,
}

impl AstigmatismShadow {
    /// Layers in `text-shadow` order.
    pub fn layers(&self) -> [ShadowVector; 3] {
        [self.primary, self.perpendicular, self.anti_parallel]
    }
}

/// Primary compensation vector for `axis_deg` / `power`.
///
/// `power` is expected to be positive; callers gate on [`shadow`].
pub fn primary_vector(axis_deg: f64, power: f64) -> ShadowVector {
    let axis = normalize_axis(axis_deg);
    let distance = power * DISTANCE_PER_DIOPTER;
    let (x, y) = polar_to_cartesian(axis + 90.0, distance);
    let blur = distance * BLUR_PER_PX;
    let opacity = (0.08 + power * 0.07).min(MAX_OPACITY);
    ShadowVector::rounded(x, y, blur, opacity)
}

/// Compensation layers, or `None` when power is zero (disabled).
pub fn shadow(profile: &VisionProfile) -> Option<AstigmatismShadow> {
    let power = profile.astigmat_power_diopters();
    if power <= 0.0 {
        return None;
    }
    let primary = primary_vector(profile.astigmat_axis, power);
    // Stabilizers derive from the rounded primary, as written to CSS.
    let perpendicular = ShadowVector::rounded(
        -primary.y * 0.4,
        primary.x * 0.4,
        primary.blur * 0.5,
        primary.opacity * 0.5,
    );
    let anti_parallel = ShadowVector::rounded(
        -primary.x * 0.2,
        -primary.y * 0.2,
        primary.blur * 0.3,
        primary.opacity * 0.25,
    );
    Some(AstigmatismShadow {
        primary,
        perpendicular,
        anti_parallel,
    })
}

/// Standalone fragment with only the astigmatism layers.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    let Some(shadow) = shadow(profile) else {
        return StyleFragment::Marker("Shadow — disabled (power=0)");
    };
    let p = shadow.primary;
    let layers: Vec<ShadowVector> = shadow.layers().to_vec();
    StyleFragment::Rules(format!(
        "/* KeratoVision: Shadow Vector Compensation */\n\
         /* Axis: {}° | Power: {}D */\n\
         /* Offset: {}px, {}px | Blur: {}px | Opacity: {} */\n\
         {} {{\n  text-shadow:\n    {} !important;\n}}\n",
        CssNum(normalize_axis(profile.astigmat_axis)),
        CssNum(profile.astigmat_power_diopters()),
        CssNum(p.x),
        CssNum(p.y),
        CssNum(p.blur),
        CssNum(p.opacity),
        body_selectors(SHADOW_TARGETS),
        text_shadow_value(&layers),
    ))
}
