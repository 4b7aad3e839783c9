//! Reading guide overlay: CSS for the bands/strip and the geometry math the
//! pointer handler applies.
//!
//! DOM lifecycle (create once, subscribe, tear down) lives in the renderer.

use alloc::format;

use crate::css::{CssNum, StyleFragment};
use crate::profile::VisionProfile;
use crate::vector::round_to;

/// Reserved id of the overlay root element.
pub const GUIDE_ID: &str = "keratovision-reading-guide";
/// Class of the dimmed band above the strip.
pub const TOP_CLASS: &str = "kv-guide-top";
/// Class of the transparent reading strip.
pub const STRIP_CLASS: &str = "kv-guide-strip";
/// Class of the dimmed band below the strip.
pub const BOTTOM_CLASS: &str = "kv-guide-bottom";

const MIN_STRIP_PX: f64 = 32.0;
const STRIP_PER_FONT_PX: f64 = 2.2;

/// Strip height in px for a profile.
pub fn strip_height(profile: &VisionProfile) -> f64 {
    round_to((profile.font_size_px() * STRIP_PER_FONT_PX).max(MIN_STRIP_PX), 2)
}

/// Heights/offset of the three overlay children for one pointer position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlayGeometry {
    /// Height of the top band in px.
    pub top_height: f64,
    /// Offset of the strip from the viewport top in px.
    pub strip_top: f64,
    /// Height of the bottom band in px.
    pub bottom_height: f64,
}

impl OverlayGeometry {
    /// Geometry centering the strip on `pointer_y`.
    pub fn at(pointer_y: f64, viewport_height: f64, strip_height: f64) -> Self {
        let half = strip_height / 2.0;
        let top_height = (pointer_y - half).max(0.0);
        let bottom_height = (viewport_height - pointer_y - half).max(0.0);
        Self {
            top_height,
            strip_top: top_height,
            bottom_height,
        }
    }
}

/// Overlay CSS, or a marker when the guide is off.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    if !profile.reading_guide {
        return StyleFragment::Marker("Reading Guide — disabled");
    }
    StyleFragment::Rules(format!(
        "/* KeratoVision: Reading Guide Overlay */\n\
         #{id} {{\n  position: fixed !important;\n  top: 0 !important;\n  left: 0 !important;\n  \
         width: 100vw !important;\n  height: 100vh !important;\n  pointer-events: none !important;\n  \
         z-index: 2147483646 !important;\n  transition: none !important;\n}}\n\
         #{id} .{top},\n#{id} .{bottom} {{\n  position: absolute !important;\n  left: 0 !important;\n  \
         width: 100% !important;\n  background: rgba(0, 0, 0, 0.35) !important;\n  \
         transition: height 0.05s linear !important;\n  pointer-events: none !important;\n}}\n\
         #{id} .{top} {{\n  top: 0 !important;\n}}\n\
         #{id} .{bottom} {{\n  bottom: 0 !important;\n}}\n\
         #{id} .{strip} {{\n  position: absolute !important;\n  left: 0 !important;\n  \
         width: 100% !important;\n  height: {height}px !important;\n  \
         border-top: 1.5px solid rgba(108, 99, 255, 0.4) !important;\n  \
         border-bottom: 1.5px solid rgba(108, 99, 255, 0.4) !important;\n  \
         background: transparent !important;\n  pointer-events: none !important;\n  \
         transition: top 0.05s linear !important;\n}}\n",
        id = GUIDE_ID,
        top = TOP_CLASS,
        bottom = BOTTOM_CLASS,
        strip = STRIP_CLASS,
        height = CssNum(strip_height(profile)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_height_scales_with_font_size() {
        let p = VisionProfile::default();
        assert_eq!(strip_height(&p), 39.6);
        let large = VisionProfile {
            font_size: 30.0,
            ..p
        };
        assert_eq!(strip_height(&large), 66.0);
    }

    #[test]
    fn geometry_clamps_at_viewport_edges() {
        let g = OverlayGeometry::at(10.0, 800.0, 40.0);
        assert_eq!(g.top_height, 0.0);
        assert_eq!(g.strip_top, 0.0);
        assert_eq!(g.bottom_height, 770.0);

        let g = OverlayGeometry::at(400.0, 800.0, 40.0);
        assert_eq!(g.top_height, 380.0);
        assert_eq!(g.bottom_height, 380.0);

        let g = OverlayGeometry::at(795.0, 800.0, 40.0);
        assert_eq!(g.bottom_height, 0.0);
    }

    #[test]
    fn disabled_guide_is_marker() {
        assert!(generate(&VisionProfile::default()).is_marker());
        let on = VisionProfile {
            reading_guide: true,
            ..VisionProfile::default()
        };
        let css = generate(&on).to_string();
        assert!(css.contains("#keratovision-reading-guide .kv-guide-strip"));
        assert!(css.contains("height: 39.6px"), "{}", css);
    }
}
