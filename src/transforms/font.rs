//! Typography overrides: family, size, heading scale, spacing, weight, style.

use alloc::format;
use alloc::string::String;

use crate::css::{body_selectors, CssNum, Fixed, StyleFragment, BODY_TEXT_TARGETS, SPACING_TARGETS};
use crate::profile::VisionProfile;

/// Heading sizes as multiples of the base size, `h1` through `h6`.
pub const HEADING_RATIOS: [f64; 6] = [2.0, 1.65, 1.4, 1.2, 1.1, 1.0];

const FONT_STACK: &str =
    "-apple-system, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, sans-serif";

/// Icon fonts keep their own family.
const ICON_EXCLUSIONS: &str = ":not(i[class*=\"icon\"]):not(span[class*=\"icon\"]):not([class*=\"fa-\"]):not([class*=\"material-icon\"])";

/// Spacing derived from severity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    /// Base font size in px.
    pub base_px: f64,
    /// Letter spacing in em.
    pub letter_spacing_em: f64,
    /// Unitless line height.
    pub line_height: f64,
    /// Word spacing in px.
    pub word_spacing_px: f64,
}

/// Metrics for a profile.
pub fn metrics(profile: &VisionProfile) -> FontMetrics {
    let severity = profile.severity();
    FontMetrics {
        base_px: profile.font_size_px(),
        letter_spacing_em: 0.03 + severity * 0.014,
        line_height: 1.55 + severity * 0.08,
        word_spacing_px: 1.0 + severity * 0.6,
    }
}

/// Heading size in px for level 1..=6.
pub fn heading_px(base_px: f64, level: usize) -> f64 {
    let ratio = HEADING_RATIOS
        .get(level.saturating_sub(1))
        .copied()
        .unwrap_or(1.0);
    (base_px * ratio).round()
}

fn heading_rules(base_px: f64) -> String {
    let mut out = String::with_capacity(256);
    for level in 1..=HEADING_RATIOS.len() {
        out.push_str(&format!(
            "html body h{} {{ font-size: {}px !important; }}\n",
            level,
            CssNum(heading_px(base_px, level))
        ));
    }
    out
}

/// Typography fragment.
pub fn generate(profile: &VisionProfile) -> StyleFragment {
    let m = metrics(profile);
    let letter = Fixed(m.letter_spacing_em, 3);
    StyleFragment::Rules(format!(
        "/* KeratoVision: Font Engine — Size {base}px, Spacing {letter}em */\n\
         html body,\nhtml body *{icons} {{\n  font-family: {stack} !important;\n}}\n\
         {body_sel} {{\n  font-size: {base}px !important;\n}}\n\
         {headings}\
         {spacing_sel} {{\n  letter-spacing: {letter}em !important;\n  \
         line-height: {line} !important;\n  word-spacing: {word}px !important;\n}}\n\
         html body *:not(h1):not(h2):not(h3):not(b):not(strong) {{\n  font-weight: 400 !important;\n}}\n\
         html body h1, html body h2, html body h3,\nhtml body b, html body strong {{\n  font-weight: 500 !important;\n}}\n\
         html body *:not(em):not(i):not(cite) {{\n  font-style: normal !important;\n}}\n",
        base = CssNum(m.base_px),
        letter = letter,
        icons = ICON_EXCLUSIONS,
        stack = FONT_STACK,
        body_sel = body_selectors(BODY_TEXT_TARGETS),
        headings = heading_rules(m.base_px),
        spacing_sel = body_selectors(SPACING_TARGETS),
        line = Fixed(m.line_height, 2),
        word = Fixed(m.word_spacing_px, 1),
    ))
}
