//! Page brightness/saturation and media glare dampening.

use alloc::format;

use crate::css::{body_selectors, Fixed, StyleFragment, MEDIA_TARGETS};
use crate::profile::VisionProfile;

const MIN_SATURATION: f64 = 0.70;
const MIN_MEDIA_BRIGHTNESS: f64 = 0.60;

/// Scalars folded into the combined html filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LuminanceFilter {
    pub brightness: f64,
    pub saturation: f64,
}

/// Brightness and saturation for the document root.
pub fn filter_values(profile: &VisionProfile) -> LuminanceFilter {
    LuminanceFilter {
        brightness: profile.luminance(),
        saturation: (1.0 - profile.severity() * 0.06).max(MIN_SATURATION),
    }
}

/// Brightness applied to media elements, dimmer than the page.
pub fn media_dampening(profile: &VisionProfile) -> f64 {
    (profile.luminance() - profile.severity() * 0.04).max(MIN_MEDIA_BRIGHTNESS)
}

/// Media dampening, bright inline background taming and scrollbar restyle.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    let brightness = Fixed(profile.luminance(), 3);
    let media = Fixed(media_dampening(profile), 3);
    StyleFragment::Rules(format!(
        "/* KeratoVision: Luminance Controller — Brightness {brightness} */\n\
         {media_sel} {{\n  filter: brightness({media}) !important;\n}}\n\
         html body [style*=\"background-image\"],\nhtml body [style*=\"background: url\"] {{\n  \
         filter: brightness({media}) !important;\n}}\n\
         html body [style*=\"background-color: #fff\"],\n\
         html body [style*=\"background-color: #FFF\"],\n\
         html body [style*=\"background-color: white\"],\n\
         html body [style*=\"background-color: rgb(255\"],\n\
         html body [style*=\"background: #fff\"],\n\
         html body [style*=\"background: #FFF\"],\n\
         html body [style*=\"background: white\"] {{\n  filter: brightness({brightness}) !important;\n}}\n\
         ::-webkit-scrollbar-track {{\n  background: rgba(180, 180, 190, 0.25) !important;\n}}\n\
         ::-webkit-scrollbar-thumb {{\n  background: rgba(90, 90, 110, 0.5) !important;\n}}\n",
        media_sel = body_selectors(MEDIA_TARGETS),
    ))
}
