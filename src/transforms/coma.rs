//! Directional coma compensation: a four-layer fan opposing the comet tail.

use alloc::format;
use alloc::vec::Vec;

use crate::css::{body_selectors, text_shadow_value, CssNum, Fixed, StyleFragment, SHADOW_TARGETS};
use crate::profile::{VisionProfile, COMA_INTENSITY_RANGE};
use crate::vector::{clamp, normalize_direction, polar_to_cartesian, ShadowVector};

/// Number of fan layers.
pub const LAYER_COUNT: usize = 4;

/// Coma severity tracks keratoconus severity when not set explicitly.
const SEVERITY_TO_COMA: f64 = 0.6;

/// Effective coma intensity for a profile.
///
/// An explicit intensity of 0 derives it from severity. Both the merged
/// shadow rule and the standalone fragment read intensity through here.
pub fn effective_intensity(profile: &VisionProfile) -> f64 {
    let explicit = clamp(
        profile.coma_intensity,
        COMA_INTENSITY_RANGE.0,
        COMA_INTENSITY_RANGE.1,
    );
    if explicit > 0.0 {
        explicit
    } else {
        profile.severity() * SEVERITY_TO_COMA
    }
}

/// Fan layers for `angle_deg` / `intensity`; empty when intensity ≤ 0.
pub fn layers(angle_deg: f64, intensity: f64) -> Vec<ShadowVector> {
    let intensity = clamp(intensity, COMA_INTENSITY_RANGE.0, COMA_INTENSITY_RANGE.1);
    if intensity <= 0.0 {
        return Vec::new();
    }
    let reverse = normalize_direction(angle_deg) + 180.0;
    (1..=LAYER_COUNT)
        .map(|i| {
            let factor = i as f64 / LAYER_COUNT as f64;
            let distance = intensity * 0.5 * factor;
            let (x, y) = polar_to_cartesian(reverse, distance);
            let blur = distance * 0.7 + 0.2;
            let opacity = 0.15 * (1.0 - factor * 0.6) * (intensity / 5.0);
            ShadowVector::rounded(x, y, blur, opacity)
        })
        .collect()
}

/// Fan layers for a profile, using [`effective_intensity`].
pub fn profile_layers(profile: &VisionProfile) -> Vec<ShadowVector> {
    layers(profile.coma_angle, effective_intensity(profile))
}

/// Standalone fragment with only the coma layers.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    let intensity = effective_intensity(profile);
    let fan = layers(profile.coma_angle, intensity);
    if fan.is_empty() {
        return StyleFragment::Marker("Coma — disabled (intensity=0)");
    }
    StyleFragment::Rules(format!(
        "/* KeratoVision: Coma Aberration Compensation */\n\
         /* Angle: {}° | Intensity: {} */\n\
         {} {{\n  text-shadow:\n    {} !important;\n}}\n",
        CssNum(normalize_direction(profile.coma_angle)),
        Fixed(intensity, 1),
        body_selectors(SHADOW_TARGETS),
        text_shadow_value(&fan),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_intensity_and_zero_severity_yield_no_layers() {
        let p = VisionProfile {
            kerato_severity: 0.0,
            coma_intensity: 0.0,
            ..VisionProfile::default()
        };
        assert_eq!(effective_intensity(&p), 0.0);
        assert!(profile_layers(&p).is_empty());
        assert!(generate(&p).is_marker());
        assert!(layers(45.0, -1.0).is_empty());
    }

    #[test]
    fn intensity_derives_from_severity_when_unset() {
        let p = VisionProfile {
            kerato_severity: 2.0,
            coma_intensity: 0.0,
            ..VisionProfile::default()
        };
        assert!((effective_intensity(&p) - 1.2).abs() < 1e-12);
        let explicit = VisionProfile {
            coma_intensity: 3.0,
            ..p
        };
        assert_eq!(effective_intensity(&explicit), 3.0);
    }

    #[test]
    fn fan_grows_farther_and_dimmer() {
        let fan = layers(0.0, 4.0);
        assert_eq!(fan.len(), LAYER_COUNT);
        for pair in fan.windows(2) {
            assert!(pair[1].magnitude() > pair[0].magnitude());
            assert!(pair[1].opacity < pair[0].opacity);
        }
        // Angle 0 is reversed to point left.
        assert_eq!(fan[3].x, -2.0);
        assert_eq!(fan[3].y, 0.0);
        assert_eq!(fan[3].blur, 1.6);
        assert_eq!(fan[0].opacity, 0.102);
    }

    #[test]
    fn opacity_stays_in_range() {
        for intensity in [0.1, 1.0, 2.5, 5.0, 50.0] {
            for layer in layers(300.0, intensity) {
                assert!((0.0..=0.5).contains(&layer.opacity));
            }
        }
    }

    #[test]
    fn angle_is_directional_not_axis_folded() {
        let forward = layers(0.0, 2.0);
        let backward = layers(180.0, 2.0);
        assert_eq!(forward[3].x, -backward[3].x);
    }
}
