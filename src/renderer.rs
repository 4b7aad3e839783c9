//! Apply/remove orchestration over a [`DocumentHost`].
//!
//! One [`AdaptiveRenderer`] owns one document and everything it injected
//! into it: the stylesheet element (found by id), the reading-guide overlay
//! and the live pointer subscription. Passes are idempotent: applying the
//! same profile twice yields a byte-identical stylesheet, one style element,
//! at most one overlay and at most one listener.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use core::cell::Cell;
use core::fmt;
use core::time::Duration;

use crate::compose::compose;
use crate::css::Stylesheet;
use crate::dom::{DocumentHost, DomError, GuideOverlay, GuideTracker, PointerSubscription};
use crate::guard::{
    Clock, FrameGuard, SystemClock, DEFAULT_DEBOUNCE_DELAY, DEFAULT_FRAME_BUDGET,
};
use crate::profile::VisionProfile;
use crate::transforms::reading_guide::{strip_height, OverlayGeometry, GUIDE_ID};

/// Reserved id of the injected stylesheet element.
pub const STYLE_ID: &str = "keratovision-adaptive";

const MAX_ID_SWEEP: usize = 8;

/// Renderer options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererOptions {
    /// Passes slower than this are logged and reported.
    pub frame_budget: Duration,
    /// Quiet period used by hosts coalescing live updates.
    pub debounce_delay: Duration,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            frame_budget: DEFAULT_FRAME_BUDGET,
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
        }
    }
}

/// Runtime diagnostics from apply/remove passes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderDiagnostic {
    PassTimeMicros(u64),
    FrameBudgetExceeded { elapsed_micros: u64, budget_micros: u64 },
    StylesheetCreated,
    StylesheetRemoved,
    GuideActivated,
    GuideDeactivated,
}

/// Render pass failure. The document keeps its previous stylesheet text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderError {
    /// Document backend rejected a mutation.
    Dom(DomError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dom(err) => write!(f, "render pass failed: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Dom(err) => Some(err),
        }
    }
}

impl From<DomError> for RenderError {
    fn from(value: DomError) -> Self {
        Self::Dom(value)
    }
}

type DiagnosticSink = Option<Box<dyn FnMut(RenderDiagnostic)>>;

struct GuideState<E> {
    overlay: GuideOverlay<E>,
    subscription: Option<PointerSubscription>,
}

/// Everything a renderer has injected.
struct RenderedState<E> {
    guide: Option<GuideState<E>>,
    geometry: Rc<Cell<Option<OverlayGeometry>>>,
    last_stylesheet: Option<String>,
}

impl<E> Default for RenderedState<E> {
    fn default() -> Self {
        Self {
            guide: None,
            geometry: Rc::new(Cell::new(None)),
            last_stylesheet: None,
        }
    }
}

/// Adaptive compensation renderer bound to one document.
pub struct AdaptiveRenderer<D: DocumentHost, C: Clock = SystemClock> {
    doc: D,
    clock: C,
    opts: RendererOptions,
    state: RenderedState<D::Element>,
    diagnostic_sink: DiagnosticSink,
}

impl<D: DocumentHost> AdaptiveRenderer<D> {
    /// Create a renderer timed by the system clock.
    pub fn new(doc: D, opts: RendererOptions) -> Self {
        Self::with_clock(doc, SystemClock::new(), opts)
    }
}

impl<D: DocumentHost, C: Clock> AdaptiveRenderer<D, C> {
    /// Create a renderer with an explicit time source.
    pub fn with_clock(doc: D, clock: C, opts: RendererOptions) -> Self {
        Self {
            doc,
            clock,
            opts,
            state: RenderedState::default(),
            diagnostic_sink: None,
        }
    }

    pub fn options(&self) -> RendererOptions {
        self.opts
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Consume the renderer, leaving injected elements in place.
    pub fn into_document(self) -> D {
        self.doc
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(RenderDiagnostic) + 'static,
    {
        self.diagnostic_sink = Some(Box::new(sink));
    }

    fn emit_diagnostic(&mut self, diagnostic: RenderDiagnostic) {
        if let Some(sink) = self.diagnostic_sink.as_mut() {
            sink(diagnostic);
        }
    }

    /// Bring the document in line with `profile`.
    ///
    /// A disabled profile removes everything. Otherwise the stylesheet is
    /// composed in full before the first DOM write, then written to the
    /// (possibly new) style element, then the reading guide is synced.
    pub fn apply(&mut self, profile: &VisionProfile) -> Result<(), RenderError> {
        if !profile.enabled {
            self.remove();
            return Ok(());
        }
        let guard = FrameGuard::new("apply", self.opts.frame_budget);
        let clock_start = self.clock.now();
        let stylesheet = compose(profile);
        let result = self
            .write_stylesheet(&stylesheet)
            .and_then(|()| self.sync_guide(profile));
        let elapsed = self.clock.now().saturating_sub(clock_start);
        self.report_pass(guard, elapsed);
        result
    }

    fn report_pass(&mut self, guard: FrameGuard, elapsed: Duration) {
        let elapsed_micros = elapsed.as_micros() as u64;
        self.emit_diagnostic(RenderDiagnostic::PassTimeMicros(elapsed_micros));
        if guard.observe(elapsed) {
            self.emit_diagnostic(RenderDiagnostic::FrameBudgetExceeded {
                elapsed_micros,
                budget_micros: guard.budget().as_micros() as u64,
            });
        } else {
            log::debug!("[keratovision] apply pass in {}us", elapsed_micros);
        }
    }

    fn write_stylesheet(&mut self, stylesheet: &Stylesheet) -> Result<(), RenderError> {
        let css = stylesheet.to_css();
        let element = match self.doc.element_by_id(STYLE_ID) {
            Some(element) => element,
            None => {
                let element = self
                    .doc
                    .create_style_element(STYLE_ID)
                    .map_err(|err| err.with_element_id(STYLE_ID))?;
                self.emit_diagnostic(RenderDiagnostic::StylesheetCreated);
                element
            }
        };
        self.doc
            .set_text_content(&element, &css)
            .map_err(|err| err.with_element_id(STYLE_ID))?;
        self.state.last_stylesheet = Some(css);
        Ok(())
    }

    fn sync_guide(&mut self, profile: &VisionProfile) -> Result<(), RenderError> {
        if !profile.reading_guide {
            self.deactivate_guide();
            return Ok(());
        }

        let mut guide = match self.state.guide.take() {
            Some(guide) if self.doc.element_by_id(GUIDE_ID).is_some() => guide,
            stale => {
                // Overlay missing (never built, or removed by the page).
                if let Some(stale) = stale {
                    self.release(stale);
                }
                self.remove_all_by_id(GUIDE_ID);
                let overlay = self
                    .doc
                    .create_guide_overlay(GUIDE_ID)
                    .map_err(|err| err.with_element_id(GUIDE_ID))?;
                self.emit_diagnostic(RenderDiagnostic::GuideActivated);
                GuideState {
                    overlay,
                    subscription: None,
                }
            }
        };

        // Release before acquire: one listener at most.
        if let Some(subscription) = guide.subscription.take() {
            self.doc.unsubscribe_pointer_move(subscription);
        }
        let tracker = GuideTracker::new(
            guide.overlay.clone(),
            strip_height(profile),
            self.state.geometry.clone(),
        );
        let subscribed = self.doc.subscribe_pointer_move(tracker);
        let outcome = match subscribed {
            Ok(subscription) => {
                guide.subscription = Some(subscription);
                Ok(())
            }
            Err(err) => Err(RenderError::from(err.with_element_id(GUIDE_ID))),
        };
        self.state.guide = Some(guide);
        outcome
    }

    fn release(&mut self, guide: GuideState<D::Element>) {
        if let Some(subscription) = guide.subscription {
            self.doc.unsubscribe_pointer_move(subscription);
        }
        self.doc.remove_element(&guide.overlay.root);
    }

    /// Remove every element carrying `id`. Returns whether any was found.
    fn remove_all_by_id(&mut self, id: &str) -> bool {
        let mut removed = false;
        // Bounded so a backend that refuses removal cannot spin us.
        for _ in 0..MAX_ID_SWEEP {
            let Some(element) = self.doc.element_by_id(id) else {
                break;
            };
            self.doc.remove_element(&element);
            removed = true;
        }
        removed
    }

    fn deactivate_guide(&mut self) {
        let had_guide = self.state.guide.is_some();
        if let Some(guide) = self.state.guide.take() {
            self.release(guide);
        }
        self.remove_all_by_id(GUIDE_ID);
        self.state.geometry.set(None);
        if had_guide {
            self.emit_diagnostic(RenderDiagnostic::GuideDeactivated);
        }
    }

    /// Remove everything this renderer injected. Safe to call repeatedly.
    pub fn remove(&mut self) {
        let removed_sheet = self.remove_all_by_id(STYLE_ID);
        self.state.last_stylesheet = None;
        if removed_sheet {
            self.emit_diagnostic(RenderDiagnostic::StylesheetRemoved);
        }
        self.deactivate_guide();
    }

    /// Whether the adaptive stylesheet is currently in the document.
    pub fn is_active(&self) -> bool {
        self.doc.element_by_id(STYLE_ID).is_some()
    }

    /// Last geometry the pointer handler pushed to the overlay.
    pub fn overlay_geometry(&self) -> Option<OverlayGeometry> {
        if self.state.guide.is_none() {
            return None;
        }
        self.state.geometry.get()
    }

    /// Whether a pointer listener is currently held.
    pub fn is_tracking_pointer(&self) -> bool {
        self.state
            .guide
            .as_ref()
            .is_some_and(|guide| guide.subscription.is_some())
    }

    /// Stylesheet text written by the last successful pass.
    pub fn last_stylesheet(&self) -> Option<&str> {
        self.state.last_stylesheet.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, NodeId};
    use crate::guard::ManualClock;
    use crate::transforms::reading_guide::{STRIP_CLASS, TOP_CLASS};
    use std::cell::RefCell;
    use std::rc::Rc as StdRc;
    use std::vec::Vec;

    fn renderer() -> AdaptiveRenderer<MemoryDocument, ManualClock> {
        AdaptiveRenderer::with_clock(
            MemoryDocument::new(600.0),
            ManualClock::new(),
            RendererOptions::default(),
        )
    }

    fn guided() -> VisionProfile {
        VisionProfile {
            reading_guide: true,
            ..VisionProfile::default()
        }
    }

    /// Memory document whose creation calls can be made to fail.
    struct FlakyDocument {
        inner: MemoryDocument,
        fail_style: bool,
        fail_subscribe: bool,
    }

    impl DocumentHost for FlakyDocument {
        type Element = NodeId;

        fn element_by_id(&self, id: &str) -> Option<NodeId> {
            self.inner.element_by_id(id)
        }

        fn create_style_element(&mut self, id: &str) -> Result<NodeId, DomError> {
            if self.fail_style {
                return Err(DomError::new("no_head", "document has no head"));
            }
            self.inner.create_style_element(id)
        }

        fn set_text_content(&mut self, element: &NodeId, text: &str) -> Result<(), DomError> {
            self.inner.set_text_content(element, text)
        }

        fn remove_element(&mut self, element: &NodeId) {
            self.inner.remove_element(element);
        }

        fn create_guide_overlay(&mut self, id: &str) -> Result<GuideOverlay<NodeId>, DomError> {
            self.inner.create_guide_overlay(id)
        }

        fn subscribe_pointer_move(
            &mut self,
            tracker: GuideTracker<NodeId>,
        ) -> Result<PointerSubscription, DomError> {
            if self.fail_subscribe {
                return Err(DomError::new("listener_rejected", "listener rejected"));
            }
            self.inner.subscribe_pointer_move(tracker)
        }

        fn unsubscribe_pointer_move(&mut self, subscription: PointerSubscription) {
            self.inner.unsubscribe_pointer_move(subscription);
        }
    }

    #[test]
    fn apply_is_idempotent() {
        let mut r = renderer();
        let p = guided();
        r.apply(&p).expect("first apply");
        let first = r
            .document()
            .text_by_id(STYLE_ID)
            .expect("stylesheet present")
            .to_string();
        r.apply(&p).expect("second apply");
        let doc = r.document();
        assert_eq!(doc.text_by_id(STYLE_ID), Some(first.as_str()));
        assert_eq!(doc.count_with_id(STYLE_ID), 1);
        assert_eq!(doc.count_with_id(GUIDE_ID), 1);
        assert_eq!(doc.elements_with_class(STRIP_CLASS).len(), 1);
        assert_eq!(doc.listener_count(), 1);
        assert_eq!(r.last_stylesheet(), Some(first.as_str()));
    }

    #[test]
    fn stylesheet_matches_composition() {
        let mut r = renderer();
        let p = VisionProfile::default();
        r.apply(&p).expect("apply");
        assert_eq!(
            r.document().text_by_id(STYLE_ID),
            Some(compose(&p).to_css().as_str())
        );
    }

    #[test]
    fn remove_is_total_and_repeatable() {
        let mut r = renderer();
        r.apply(&guided()).expect("apply");
        assert!(r.is_active());
        r.remove();
        r.remove();
        let doc = r.document();
        assert_eq!(doc.count_with_id(STYLE_ID), 0);
        assert_eq!(doc.count_with_id(GUIDE_ID), 0);
        assert_eq!(doc.listener_count(), 0);
        assert!(!r.is_active());
        assert!(r.overlay_geometry().is_none());
        assert!(r.last_stylesheet().is_none());
    }

    #[test]
    fn remove_without_apply_is_noop() {
        let mut r = renderer();
        r.remove();
        assert!(!r.is_active());
    }

    #[test]
    fn disabled_profile_removes() {
        let mut r = renderer();
        let on = guided();
        r.apply(&on).expect("apply");
        let off = VisionProfile {
            enabled: false,
            ..on
        };
        r.apply(&off).expect("apply disabled");
        assert!(!r.is_active());
        assert_eq!(r.document().count_with_id(GUIDE_ID), 0);

        r.apply(&on).expect("re-enable");
        assert!(r.is_active());
        assert_eq!(r.document().count_with_id(STYLE_ID), 1);
        assert_eq!(r.document().listener_count(), 1);
    }

    #[test]
    fn listener_is_replaced_not_stacked() {
        let mut r = renderer();
        for size in [16.0, 20.0, 24.0, 28.0] {
            let p = VisionProfile {
                font_size: size,
                ..guided()
            };
            r.apply(&p).expect("apply");
            assert_eq!(r.document().listener_count(), 1);
        }
        // Only the latest strip height is in effect.
        r.document_mut().dispatch_pointer_move(300.0);
        let g = r.overlay_geometry().expect("geometry after move");
        assert_eq!(g.top_height, 300.0 - 61.6 / 2.0);
    }

    #[test]
    fn pointer_moves_drive_overlay_geometry() {
        let mut r = renderer();
        r.apply(&guided()).expect("apply");
        assert!(r.overlay_geometry().is_none());
        r.document_mut().dispatch_pointer_move(10.0);
        let g = r.overlay_geometry().expect("geometry");
        assert_eq!(g.top_height, 0.0);
        assert_eq!(g.strip_top, 0.0);
        let top = r.document().elements_with_class(TOP_CLASS)[0];
        assert_eq!(r.document().style_px(top, "height"), Some(0.0));
    }

    #[test]
    fn guide_toggle_tears_down_overlay() {
        let mut r = renderer();
        r.apply(&guided()).expect("apply");
        assert!(r.is_tracking_pointer());
        r.apply(&VisionProfile::default()).expect("guide off");
        assert!(!r.is_tracking_pointer());
        assert_eq!(r.document().count_with_id(GUIDE_ID), 0);
        assert_eq!(r.document().listener_count(), 0);
        assert!(r.is_active());
    }

    #[test]
    fn externally_removed_elements_are_recreated() {
        let mut r = renderer();
        let p = guided();
        r.apply(&p).expect("apply");
        assert!(r.document_mut().remove_by_id(STYLE_ID));
        assert!(r.document_mut().remove_by_id(GUIDE_ID));
        assert!(!r.is_active());
        r.apply(&p).expect("reapply");
        let doc = r.document();
        assert_eq!(doc.count_with_id(STYLE_ID), 1);
        assert_eq!(doc.count_with_id(GUIDE_ID), 1);
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn failed_creation_leaves_document_untouched() {
        let doc = FlakyDocument {
            inner: MemoryDocument::default(),
            fail_style: true,
            fail_subscribe: false,
        };
        let mut r =
            AdaptiveRenderer::with_clock(doc, ManualClock::new(), RendererOptions::default());
        let err = r.apply(&guided()).expect_err("style creation fails");
        let RenderError::Dom(dom) = err;
        assert_eq!(dom.code, "no_head");
        assert_eq!(dom.element_id.as_deref(), Some(STYLE_ID));
        assert_eq!(r.document().inner.count_with_id(GUIDE_ID), 0);
        assert!(r.last_stylesheet().is_none());
    }

    #[test]
    fn failed_subscription_keeps_stylesheet() {
        let doc = FlakyDocument {
            inner: MemoryDocument::default(),
            fail_style: false,
            fail_subscribe: true,
        };
        let mut r =
            AdaptiveRenderer::with_clock(doc, ManualClock::new(), RendererOptions::default());
        assert!(r.apply(&guided()).is_err());
        assert!(r.is_active());
        assert_eq!(r.document().inner.listener_count(), 0);
        r.document_mut().fail_subscribe = false;
        r.apply(&guided()).expect("retry");
        assert_eq!(r.document().inner.count_with_id(GUIDE_ID), 1);
        assert_eq!(r.document().inner.listener_count(), 1);
    }

    #[test]
    fn diagnostics_report_lifecycle() {
        let seen = StdRc::new(RefCell::new(Vec::new()));
        let mut r = renderer();
        let sink = seen.clone();
        r.set_diagnostic_sink(move |d| sink.borrow_mut().push(d));
        r.apply(&guided()).expect("apply");
        r.remove();
        let seen = seen.borrow();
        assert!(seen.contains(&RenderDiagnostic::StylesheetCreated));
        assert!(seen.contains(&RenderDiagnostic::GuideActivated));
        assert!(seen.contains(&RenderDiagnostic::StylesheetRemoved));
        assert!(seen.contains(&RenderDiagnostic::GuideDeactivated));
        assert!(seen
            .iter()
            .any(|d| matches!(d, RenderDiagnostic::PassTimeMicros(_))));
    }

    #[test]
    fn slow_pass_reports_budget_overrun() {
        let seen = StdRc::new(RefCell::new(Vec::new()));
        let mut r = renderer();
        let sink = seen.clone();
        r.set_diagnostic_sink(move |d| sink.borrow_mut().push(d));
        let guard = FrameGuard::new("apply", Duration::from_millis(16));
        r.report_pass(guard, Duration::from_millis(40));
        assert!(seen.borrow().contains(&RenderDiagnostic::FrameBudgetExceeded {
            elapsed_micros: 40_000,
            budget_micros: 16_000,
        }));
    }
}
