//! Pure profile → fragment transforms.
//!
//! Every transform is total over its input range: out-of-range fields are
//! clamped, never rejected. None of them touch the DOM.

pub mod astigmatism;
pub mod coma;
pub mod contrast;
pub mod edge;
pub mod font;
pub mod luminance;
pub mod polarity;
pub mod reading_guide;
