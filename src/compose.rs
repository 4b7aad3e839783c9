//! Orchestrator-level merges and full stylesheet composition.
//!
//! Two rules here fold several transforms into one declaration because CSS
//! does not merge repeated properties: the astigmatism and coma layers share
//! one `text-shadow`, and contrast/brightness/saturation share one root
//! `filter`.

use alloc::format;
use alloc::vec::Vec;

use crate::css::{
    body_selectors, text_shadow_value, CssNum, Fixed, Slot, StyleFragment, Stylesheet,
    SHADOW_TARGETS,
};
use crate::profile::VisionProfile;
use crate::transforms::{
    astigmatism, coma, contrast, edge, font, luminance, polarity, reading_guide,
};
use crate::vector::{normalize_axis, normalize_direction, ShadowVector};

/// All shadow layers for a profile: astigmatism layers first, then the coma fan.
pub fn combined_shadow_layers(profile: &VisionProfile) -> Vec<ShadowVector> {
    let mut layers = Vec::with_capacity(3 + coma::LAYER_COUNT);
    if let Some(shadow) = astigmatism::shadow(profile) {
        layers.extend_from_slice(&shadow.layers());
    }
    layers.extend(coma::profile_layers(profile));
    layers
}

/// One `text-shadow` rule carrying both shadow transforms.
pub fn combined_shadows(profile: &VisionProfile) -> StyleFragment {
    let layers = combined_shadow_layers(profile);
    if layers.is_empty() {
        return StyleFragment::Marker("No shadow compensation active");
    }
    StyleFragment::Rules(format!(
        "/* KeratoVision: Combined Shadow Compensation */\n\
         /* Astigmat: Axis {}° Power {}D */\n\
         /* Coma: Angle {}° Intensity {} */\n\
         {} {{\n  text-shadow: {} !important;\n}}\n",
        CssNum(normalize_axis(profile.astigmat_axis)),
        CssNum(profile.astigmat_power_diopters()),
        CssNum(normalize_direction(profile.coma_angle)),
        Fixed(coma::effective_intensity(profile), 1),
        body_selectors(SHADOW_TARGETS),
        text_shadow_value(&layers),
    ))
}

/// Root `filter` combining contrast, brightness and saturation.
///
/// Yields a marker whenever polarity reversal owns the root filter.
pub fn html_filter(profile: &VisionProfile) -> StyleFragment {
    if polarity::is_active(profile) {
        return StyleFragment::Marker("HTML filter handled by polarity reversal");
    }
    let lum = luminance::filter_values(profile);
    StyleFragment::Rules(format!(
        "/* KeratoVision: Combined HTML Filter */\n\
         html {{\n  filter: contrast({}) brightness({}) saturate({}) !important;\n}}\n",
        Fixed(contrast::contrast_value(profile), 3),
        Fixed(lum.brightness, 3),
        Fixed(lum.saturation, 3),
    ))
}

/// Run every transform in slot order.
pub fn compose(profile: &VisionProfile) -> Stylesheet {
    let fragments = Slot::ORDER
        .iter()
        .map(|&slot| {
            let fragment = match slot {
                Slot::Polarity => polarity::generate(profile),
                Slot::HtmlFilter => html_filter(profile),
                Slot::Contrast => contrast::generate(profile),
                Slot::Shadows => combined_shadows(profile),
                Slot::Font => font::generate(profile),
                Slot::Luminance => luminance::generate(profile),
                Slot::Edge => edge::generate(profile),
                Slot::ReadingGuide => reading_guide::generate(profile),
            };
            (slot, fragment)
        })
        .collect();
    Stylesheet::from_fragments(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_is_present_in_order() {
        let sheet = compose(&VisionProfile::default());
        let slots: Vec<Slot> = sheet.iter().map(|(s, _)| *s).collect();
        assert_eq!(slots, Slot::ORDER.to_vec());
    }

    #[test]
    fn polarity_always_wins_root_filter() {
        for severity in [0.0, 2.5, 5.0] {
            for clamp in [0.65, 0.8, 1.0] {
                let p = VisionProfile {
                    polarity_reversed: true,
                    kerato_severity: severity,
                    luminance_clamp: clamp,
                    ..VisionProfile::default()
                };
                assert_eq!(
                    html_filter(&p),
                    StyleFragment::Marker("HTML filter handled by polarity reversal")
                );
                let css = compose(&p).to_css();
                assert_eq!(css.matches("html {\n  filter:").count(), 1, "{}", css);
            }
        }
    }

    #[test]
    fn quiet_profile_has_three_markers_and_neutral_contrast() {
        let p = VisionProfile {
            kerato_severity: 0.0,
            astigmat_power: 0.0,
            coma_intensity: 0.0,
            reading_guide: false,
            enabled: true,
            ..VisionProfile::default()
        };
        let sheet = compose(&p);
        assert_eq!(sheet.marker_count(), 3);
        assert!(sheet.fragment(Slot::Shadows).is_some_and(StyleFragment::is_marker));
        assert!(sheet
            .fragment(Slot::ReadingGuide)
            .is_some_and(StyleFragment::is_marker));
        let filter = sheet
            .fragment(Slot::HtmlFilter)
            .and_then(StyleFragment::rules)
            .expect("filter rules present");
        assert!(filter.contains("contrast(1.000)"), "{}", filter);
    }

    #[test]
    fn merged_shadow_carries_astigmatism_and_coma_layers() {
        let p = VisionProfile {
            astigmat_axis: 90.0,
            astigmat_power: 3.0,
            kerato_severity: 2.0,
            coma_intensity: 0.0,
            ..VisionProfile::default()
        };
        let layers = combined_shadow_layers(&p);
        assert_eq!(layers.len(), 3 + coma::LAYER_COUNT);
        assert_eq!(layers[0].x, -2.4);
        assert_eq!(layers[0].y, 0.0);
        let css = combined_shadows(&p).to_string();
        assert_eq!(css.matches("text-shadow").count(), 1);
        assert!(css.contains("Intensity 1.2"), "{}", css);
    }

    #[test]
    fn merged_and_standalone_coma_agree() {
        let p = VisionProfile {
            astigmat_power: 0.0,
            kerato_severity: 3.5,
            ..VisionProfile::default()
        };
        assert_eq!(combined_shadow_layers(&p), coma::profile_layers(&p));
        assert!(!coma::generate(&p).is_marker());
    }

    #[test]
    fn composition_is_deterministic() {
        let p = VisionProfile {
            reading_guide: true,
            coma_angle: 33.0,
            ..VisionProfile::default()
        };
        assert_eq!(compose(&p).to_css(), compose(&p).to_css());
    }
}
