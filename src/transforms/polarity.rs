//! Reverse contrast: invert the whole document and re-invert media.

use alloc::string::String;

use crate::css::{body_selectors, StyleFragment, MEDIA_TARGETS};
use crate::profile::VisionProfile;

/// Filter used both to invert the root and to restore media.
pub const INVERT_FILTER: &str = "invert(1) hue-rotate(180deg)";

/// Whether polarity reversal owns the root `filter` for this profile.
pub fn is_active(profile: &VisionProfile) -> bool {
    profile.polarity_reversed
}

/// Polarity fragment, or a marker in normal mode.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    if !is_active(profile) {
        return StyleFragment::Marker("Polarity — normal mode");
    }
    let mut css = String::with_capacity(1024);
    css.push_str("/* KeratoVision: Polarity Reversal (Reverse Contrast) */\n");
    css.push_str("html {\n  filter: ");
    css.push_str(INVERT_FILTER);
    css.push_str(" !important;\n  background-color: #000 !important;\n}\n");

    // Media keeps its original polarity.
    css.push_str(&body_selectors(MEDIA_TARGETS));
    css.push_str(",\nhtml body [style*=\"background-image\"],\nhtml body iframe {\n  filter: ");
    css.push_str(INVERT_FILTER);
    css.push_str(" !important;\n}\n");
    css.push_str("html body object,\nhtml body embed {\n  filter: ");
    css.push_str(INVERT_FILTER);
    css.push_str(" !important;\n}\n");

    css.push_str(
        "::selection {\n  background: rgba(80, 120, 255, 0.4) !important;\n  color: #fff !important;\n}\n",
    );
    StyleFragment::Rules(css)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_mode_is_marker() {
        assert!(generate(&VisionProfile::default()).is_marker());
    }

    #[test]
    fn reversed_mode_inverts_root_and_media() {
        let p = VisionProfile {
            polarity_reversed: true,
            ..VisionProfile::default()
        };
        let css = generate(&p).to_string();
        assert!(css.starts_with("/* KeratoVision: Polarity Reversal"));
        assert!(css.contains("html {\n  filter: invert(1) hue-rotate(180deg) !important;"));
        assert!(css.contains("background-color: #000"));
        for media in ["img", "video", "canvas", "svg", "iframe", "object", "embed"] {
            assert!(css.contains(&format!("html body {}", media)), "{} missing", media);
        }
        assert!(css.contains("::selection"));
    }
}
