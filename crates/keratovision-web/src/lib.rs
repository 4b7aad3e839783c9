//! Browser backend and preview tooling for `keratovision`.
//!
//! The `preview` module builds a standalone HTML page for a profile. With
//! the `wasm` feature, [`wasm`] provides a `web_sys` document backend and
//! the `wasm_bindgen` surface a content script loads.

pub mod preview;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use preview::{build_preview_html, render_preview_payload, PreviewPayload};
