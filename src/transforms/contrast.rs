//! Severity-driven color remap away from pure black and white.

use alloc::format;
use alloc::string::String;

use crate::css::{
    body_selectors, CssNum, StyleFragment, CONTAINER_TARGETS, SMALL_TEXT_TARGETS,
    TEXT_COLOR_TARGETS,
};
use crate::profile::VisionProfile;

/// Palette derived from severity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContrastPalette {
    /// Body text tone.
    pub text: String,
    /// Small/caption text tone, 10 units darker than `text`.
    pub small_text: String,
    /// Page and container background tone.
    pub background: String,
}

/// `#vvvvcc` where the third channel is tinted by `tint` and capped at 255.
fn tinted_hex(base: u32, tint: f64) -> String {
    let base = base.min(255);
    let third = ((base as f64 * tint).round() as u32).min(255);
    format!("#{:02x}{:02x}{:02x}", base, base, third)
}

/// Palette for a (clamped) severity.
pub fn palette(severity: f64) -> ContrastPalette {
    let dark_floor = (26.0 + severity * 6.0).round() as u32;
    let small_dark = dark_floor.saturating_sub(10).max(10);
    let light_ceil = (245.0 - severity * 7.0).round() as u32;
    ContrastPalette {
        text: tinted_hex(dark_floor, 1.1),
        small_text: tinted_hex(small_dark, 1.1),
        background: tinted_hex(light_ceil, 0.97),
    }
}

/// Document contrast multiplier for the combined html filter.
///
/// Ranges from 1.0 (severity 0) to 0.75 (severity 5).
pub fn contrast_value(profile: &VisionProfile) -> f64 {
    1.0 - profile.severity() * 0.05
}

/// Color overrides for text, small text, backgrounds and affordances.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    let severity = profile.severity();
    let colors = palette(severity);
    StyleFragment::Rules(format!(
        "/* KeratoVision: Contrast Engine — Severity {severity} */\n\
         {text_sel} {{\n  color: {text} !important;\n}}\n\
         {small_sel} {{\n  color: {small} !important;\n}}\n\
         html body {{\n  background-color: {bg} !important;\n}}\n\
         {container_sel} {{\n  background-color: {bg} !important;\n}}\n\
         html body ::selection {{\n  background: rgba(108, 99, 255, 0.25) !important;\n  color: {text} !important;\n}}\n\
         html body a:hover {{\n  text-decoration-color: {text} !important;\n}}\n\
         html body input:focus,\nhtml body textarea:focus,\nhtml body select:focus {{\n  \
         outline: 2px solid rgba(108, 99, 255, 0.4) !important;\n  \
         box-shadow: 0 0 0 3px rgba(108, 99, 255, 0.15) !important;\n}}\n",
        severity = CssNum(severity),
        text_sel = body_selectors(TEXT_COLOR_TARGETS),
        small_sel = body_selectors(SMALL_TEXT_TARGETS),
        container_sel = body_selectors(CONTAINER_TARGETS),
        text = colors.text,
        small = colors.small_text,
        bg = colors.background,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_endpoints() {
        let mild = palette(0.0);
        assert_eq!(mild.text, "#1a1a1d");
        assert_eq!(mild.small_text, "#101012");
        assert_eq!(mild.background, "#f5f5ee");

        let severe = palette(5.0);
        assert_eq!(severe.text, "#38383e");
        assert_eq!(severe.background, "#d2d2cc");
    }

    #[test]
    fn contrast_value_spans_three_quarters_to_one() {
        for severity in [-3.0, 0.0, 1.2, 3.5, 5.0, 12.0] {
            let p = VisionProfile {
                kerato_severity: severity,
                ..VisionProfile::default()
            };
            let v = contrast_value(&p);
            assert!((0.75..=1.0).contains(&v), "severity {} -> {}", severity, v);
        }
    }

    #[test]
    fn fragment_covers_selection_and_focus() {
        let css = generate(&VisionProfile::default()).to_string();
        assert!(css.contains("::selection"));
        assert!(css.contains("input:focus"));
        assert!(css.contains("color: #26262a !important"), "{}", css);
    }
}
