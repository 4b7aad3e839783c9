//! Stylesheet fragments, slot ordering and CSS text helpers.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::vector::{round_to, ShadowVector};

/// Prefix written into every comment the pipeline emits.
pub const BRAND: &str = "KeratoVision";

/// Text-bearing elements that receive shadow compensation.
pub const SHADOW_TARGETS: &[&str] = &[
    "p", "span", "a", "li", "td", "th", "label", "div", "button", "input", "textarea", "h1",
    "h2", "h3", "h4", "h5", "h6",
];

/// Elements receiving the general text color override.
pub const TEXT_COLOR_TARGETS: &[&str] = &[
    "", "div", "span", "p", "a", "li", "td", "th", "label", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// High spatial frequency text: captions, fine print, nav links.
pub const SMALL_TEXT_TARGETS: &[&str] = &[
    "small",
    "sub",
    "sup",
    "figcaption",
    "caption",
    "footer a",
    "nav a",
];

/// Generic containers that get the background remap.
pub const CONTAINER_TARGETS: &[&str] = &[
    "main", "article", "section", "header", "footer", "nav", "div",
];

/// Body text elements for size and stroke rules.
pub const BODY_TEXT_TARGETS: &[&str] = &[
    "p", "span", "a", "li", "td", "th", "label", "div", "input", "textarea", "select", "button",
];

/// Elements that receive letter/line/word spacing.
pub const SPACING_TARGETS: &[&str] = &[
    "", "p", "span", "li", "td", "th", "label", "a", "div", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Replaced/media elements dampened or re-inverted.
pub const MEDIA_TARGETS: &[&str] = &["img", "video", "canvas", "svg", "picture"];

/// Join element names under `html body`, one selector per line.
///
/// An empty entry selects `html body` itself.
pub fn body_selectors(targets: &[&str]) -> String {
    let mut out = String::with_capacity(targets.len() * 16);
    for (idx, target) in targets.iter().enumerate() {
        if idx > 0 {
            out.push_str(",\n");
        }
        out.push_str("html body");
        if !target.is_empty() {
            out.push(' ');
            out.push_str(target);
        }
    }
    out
}

/// Number written the way CSS authors write it: shortest form, no `-0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CssNum(pub f64);

impl fmt::Display for CssNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = if self.0 == 0.0 { 0.0 } else { self.0 };
        write!(f, "{}", v)
    }
}

/// Fixed-decimal number (`toFixed`-style), rounded half away from zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fixed(pub f64, pub u32);

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = round_to(self.0, self.1);
        write!(f, "{:.*}", self.1 as usize, v)
    }
}

/// Join shadow layers into one `text-shadow` value.
pub fn text_shadow_value(layers: &[ShadowVector]) -> String {
    let mut out = String::with_capacity(layers.len() * 40);
    for (idx, l) in layers.iter().enumerate() {
        if idx > 0 {
            out.push_str(",\n    ");
        }
        out.push_str(&format!(
            "{}px {}px {}px rgba(0, 0, 0, {})",
            CssNum(l.x),
            CssNum(l.y),
            CssNum(l.blur),
            CssNum(l.opacity)
        ));
    }
    out
}

/// Output of one transform: either CSS rules or a comment-only marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleFragment {
    /// CSS rule text.
    Rules(String),
    /// Explicit no-op; rendered as a comment so every slot stays present.
    Marker(&'static str),
}

impl StyleFragment {
    /// Whether this fragment is a no-op marker.
    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker(_))
    }

    /// Rule text, if any.
    pub fn rules(&self) -> Option<&str> {
        match self {
            Self::Rules(css) => Some(css),
            Self::Marker(_) => None,
        }
    }

    /// Append CSS text for this fragment.
    pub fn write_css(&self, out: &mut String) {
        match self {
            Self::Rules(css) => out.push_str(css),
            Self::Marker(label) => {
                out.push_str("/* ");
                out.push_str(BRAND);
                out.push_str(": ");
                out.push_str(label);
                out.push_str(" */\n");
            }
        }
    }
}

impl fmt::Display for StyleFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_css(&mut out);
        f.write_str(&out)
    }
}

/// Position of a fragment in the composed stylesheet.
///
/// Declaration order is source order and is load-bearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Polarity,
    HtmlFilter,
    Contrast,
    Shadows,
    Font,
    Luminance,
    Edge,
    ReadingGuide,
}

impl Slot {
    /// Every slot in composition order.
    pub const ORDER: [Slot; 8] = [
        Slot::Polarity,
        Slot::HtmlFilter,
        Slot::Contrast,
        Slot::Shadows,
        Slot::Font,
        Slot::Luminance,
        Slot::Edge,
        Slot::ReadingGuide,
    ];

    /// Stable name used in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Slot::Polarity => "polarity",
            Slot::HtmlFilter => "html-filter",
            Slot::Contrast => "contrast",
            Slot::Shadows => "shadows",
            Slot::Font => "font",
            Slot::Luminance => "luminance",
            Slot::Edge => "edge",
            Slot::ReadingGuide => "reading-guide",
        }
    }
}

/// Fully composed stylesheet: one fragment per slot, in slot order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stylesheet {
    fragments: Vec<(Slot, StyleFragment)>,
}

impl Stylesheet {
    /// Build from fragments; they are sorted into slot order.
    pub fn from_fragments(mut fragments: Vec<(Slot, StyleFragment)>) -> Self {
        fragments.sort_by_key(|(slot, _)| *slot);
        Self { fragments }
    }

    /// Iterate `(slot, fragment)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = &(Slot, StyleFragment)> {
        self.fragments.iter()
    }

    /// Fragment for one slot.
    pub fn fragment(&self, slot: Slot) -> Option<&StyleFragment> {
        self.fragments
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, fragment)| fragment)
    }

    /// Number of comment-only markers.
    pub fn marker_count(&self) -> usize {
        self.fragments.iter().filter(|(_, f)| f.is_marker()).count()
    }

    /// Concatenate all fragments into stylesheet text.
    pub fn to_css(&self) -> String {
        let mut out = String::with_capacity(8 * 1024);
        for (idx, (_, fragment)) in self.fragments.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            fragment.write_css(&mut out);
        }
        out
    }
}
