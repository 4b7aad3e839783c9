//! Text stroke edge enhancement and chromatic fringing hints.

use alloc::format;
use alloc::string::String;

use crate::css::{body_selectors, Fixed, StyleFragment, SHADOW_TARGETS};
use crate::profile::VisionProfile;

const CHROMATIC_STROKE: &str = "rgba(25, 25, 45, 0.65)";
const PLAIN_STROKE: &str = "rgba(0, 0, 0, 0.35)";

const RENDERING_HINT_TARGETS: &[&str] = &["p", "span", "a", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Stroke width in px for a profile.
pub fn stroke_width(profile: &VisionProfile) -> f64 {
    0.3 + profile.severity() * 0.14
}

/// Stroke color: darker and cooler when chromatic correction is on.
pub fn stroke_color(chromatic_correction: bool) -> &'static str {
    if chromatic_correction {
        CHROMATIC_STROKE
    } else {
        PLAIN_STROKE
    }
}

fn rendering_hints() -> String {
    format!(
        "/* Chromatic Aberration Reduction */\n\
         {} {{\n  -webkit-font-smoothing: antialiased !important;\n  \
         -moz-osx-font-smoothing: grayscale !important;\n  \
         text-rendering: optimizeLegibility !important;\n}}\n",
        body_selectors(RENDERING_HINT_TARGETS)
    )
}

/// Edge fragment, or a marker when edge enhancement is off.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    if !profile.edge_enhancement {
        return StyleFragment::Marker("Edge Enhancement — disabled");
    }
    let width = Fixed(stroke_width(profile), 2);
    let mut css = format!(
        "/* KeratoVision: Edge Enhancement — Stroke {width}px */\n\
         {sel} {{\n  -webkit-text-stroke: {width}px {color} !important;\n  \
         paint-order: stroke fill !important;\n}}\n",
        sel = body_selectors(SHADOW_TARGETS),
        color = stroke_color(profile.chromatic_correction),
    );
    if profile.chromatic_correction {
        css.push_str(&rendering_hints());
    }
    StyleFragment::Rules(css)
}
