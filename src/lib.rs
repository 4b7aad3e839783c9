//! Adaptive vision-compensation rendering.
//!
//! A [`VisionProfile`] describing a reader's optical correction needs
//! (astigmatism, coma, keratoconus severity, glare sensitivity) is turned
//! into one stylesheet plus an optional pointer-tracked reading guide, and
//! applied to a document through the [`DocumentHost`] abstraction.
//!
//! ```
//! use keratovision::{AdaptiveRenderer, MemoryDocument, RendererOptions, VisionProfile, STYLE_ID};
//!
//! let mut renderer = AdaptiveRenderer::new(MemoryDocument::default(), RendererOptions::default());
//! renderer.apply(&VisionProfile::default())?;
//! assert!(renderer.is_active());
//! assert_eq!(renderer.document().count_with_id(STYLE_ID), 1);
//! renderer.remove();
//! assert!(!renderer.is_active());
//! # Ok::<(), keratovision::RenderError>(())
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

extern crate alloc;

pub mod compose;
pub mod css;
pub mod dom;
pub mod guard;
pub mod host;
pub mod profile;
pub mod renderer;
pub mod transforms;
pub mod vector;

pub use compose::{combined_shadow_layers, combined_shadows, compose, html_filter};
pub use css::{Slot, StyleFragment, Stylesheet};
pub use dom::{
    DocumentHost, DomError, GuideOverlay, GuideTracker, MemoryDocument, NodeId,
    PointerSubscription,
};
pub use guard::{
    Clock, Debounced, Debouncer, FrameGuard, Guarded, ManualClock, SystemClock,
    DEFAULT_DEBOUNCE_DELAY, DEFAULT_FRAME_BUDGET,
};
pub use host::{
    AckStatus, ContentSession, HostError, HostMessage, HostResponse, JsonProfileStore,
    MemoryProfileStore, ProfileStore, Responder, VERSION_MARKER,
};
pub use profile::{StoredProfile, VisionProfile};
pub use renderer::{AdaptiveRenderer, RenderDiagnostic, RenderError, RendererOptions, STYLE_ID};
pub use transforms::reading_guide::{OverlayGeometry, GUIDE_ID};
pub use vector::ShadowVector;
