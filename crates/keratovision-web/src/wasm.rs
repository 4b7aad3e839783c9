//! `web_sys` document backend and the content-script export surface.

use std::collections::BTreeMap;
use std::time::Duration;

use keratovision::{
    AdaptiveRenderer, Clock, ContentSession, DocumentHost, DomError, GuideOverlay, GuideTracker,
    JsonProfileStore, PointerSubscription, ProfileStore, RendererOptions, VisionProfile,
};
use keratovision::transforms::reading_guide::{BOTTOM_CLASS, STRIP_CLASS, TOP_CLASS};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Element, HtmlElement, MouseEvent, Node};

const POINTER_EVENT: &str = "mousemove";
const MARKER_ATTRIBUTE: &str = "data-keratovision";

fn js_error(code: &'static str, err: JsValue) -> DomError {
    DomError::new(code, format!("{:?}", err))
}

fn set_inline_px(element: &Element, property: &'static str, px: f64) {
    if let Some(html) = element.dyn_ref::<HtmlElement>() {
        if let Err(err) = html.style().set_property(property, &format!("{}px", px)) {
            log::debug!("[keratovision] style write failed: {:?}", err);
        }
    }
}

fn viewport_height() -> f64 {
    web_sys::window()
        .and_then(|w| w.inner_height().ok())
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

/// Live browser document.
pub struct WebDocument {
    document: Document,
    listeners: BTreeMap<u64, Closure<dyn FnMut(MouseEvent)>>,
    next_subscription: u64,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            listeners: BTreeMap::new(),
            next_subscription: 1,
        }
    }

    /// Document of the global window.
    pub fn from_window() -> Result<Self, DomError> {
        let window =
            web_sys::window().ok_or_else(|| DomError::new("no_window", "no global window"))?;
        let document = window
            .document()
            .ok_or_else(|| DomError::new("no_document", "window has no document"))?;
        Ok(Self::new(document))
    }

    fn create_div(&self, class: Option<&str>) -> Result<Element, DomError> {
        let div = self
            .document
            .create_element("div")
            .map_err(|e| js_error("create_failed", e))?;
        if let Some(class) = class {
            div.set_class_name(class);
        }
        Ok(div)
    }
}

impl DocumentHost for WebDocument {
    type Element = Element;

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn create_style_element(&mut self, id: &str) -> Result<Element, DomError> {
        let style = self
            .document
            .create_element("style")
            .map_err(|e| js_error("create_failed", e))?;
        style.set_id(id);
        style
            .set_attribute(MARKER_ATTRIBUTE, "true")
            .map_err(|e| js_error("attribute_failed", e))?;
        // Pages without <head> still have a root element.
        let parent: Node = match self.document.head() {
            Some(head) => head.into(),
            None => self
                .document
                .document_element()
                .ok_or_else(|| DomError::new("no_root", "document has no root element"))?
                .into(),
        };
        parent
            .append_child(&style)
            .map_err(|e| js_error("append_failed", e))?;
        Ok(style)
    }

    fn set_text_content(&mut self, element: &Element, text: &str) -> Result<(), DomError> {
        element.set_text_content(Some(text));
        Ok(())
    }

    fn remove_element(&mut self, element: &Element) {
        element.remove();
    }

    fn create_guide_overlay(&mut self, id: &str) -> Result<GuideOverlay<Element>, DomError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| DomError::new("no_body", "document has no body"))?;
        let root = self.create_div(None)?;
        root.set_id(id);
        let top = self.create_div(Some(TOP_CLASS))?;
        let strip = self.create_div(Some(STRIP_CLASS))?;
        let bottom = self.create_div(Some(BOTTOM_CLASS))?;
        for band in [&top, &strip, &bottom] {
            root.append_child(band).map_err(|e| js_error("append_failed", e))?;
        }
        body.append_child(&root).map_err(|e| js_error("append_failed", e))?;
        Ok(GuideOverlay {
            root,
            top,
            strip,
            bottom,
        })
    }

    fn subscribe_pointer_move(
        &mut self,
        tracker: GuideTracker<Element>,
    ) -> Result<PointerSubscription, DomError> {
        let closure = Closure::wrap(Box::new(move |event: MouseEvent| {
            tracker.track(f64::from(event.client_y()), viewport_height(), set_inline_px);
        }) as Box<dyn FnMut(MouseEvent)>);

        let options = AddEventListenerOptions::new();
        options.set_passive(true);
        self.document
            .add_event_listener_with_callback_and_add_event_listener_options(
                POINTER_EVENT,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(|e| js_error("listener_failed", e))?;

        let raw = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.insert(raw, closure);
        Ok(PointerSubscription::new(raw))
    }

    fn unsubscribe_pointer_move(&mut self, subscription: PointerSubscription) {
        let Some(closure) = self.listeners.remove(&subscription.raw()) else {
            return;
        };
        if let Err(err) = self
            .document
            .remove_event_listener_with_callback(POINTER_EVENT, closure.as_ref().unchecked_ref())
        {
            log::warn!("[keratovision] listener removal failed: {:?}", err);
        }
    }
}

/// `performance.now()` clock, falling back to `Date.now()` in workers
/// without a window.
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        let millis = self
            .performance
            .as_ref()
            .map_or_else(js_sys::Date::now, |p| p.now());
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    }
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("{}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static CONSOLE_LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` output to the devtools console. Later calls are no-ops.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(verbose: bool) {
    if log::set_logger(&CONSOLE_LOGGER).is_ok() {
        log::set_max_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        });
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Content-script handle: one per page.
#[wasm_bindgen]
pub struct KeratoVision {
    session: ContentSession<JsonProfileStore, WebDocument, PerformanceClock>,
}

#[wasm_bindgen]
impl KeratoVision {
    /// Bind to the page document, reading the persisted profile JSON if any.
    #[wasm_bindgen(constructor)]
    pub fn new(stored_json: Option<String>) -> Result<KeratoVision, JsValue> {
        let doc = WebDocument::from_window().map_err(to_js)?;
        let renderer =
            AdaptiveRenderer::with_clock(doc, PerformanceClock::new(), RendererOptions::default());
        let store = stored_json.map(JsonProfileStore::new).unwrap_or_default();
        Ok(Self {
            session: ContentSession::new(store, renderer),
        })
    }

    /// Render the persisted profile.
    pub fn start(&mut self) {
        self.session.start();
    }

    /// Render a full profile given as JSON.
    pub fn apply(&mut self, profile_json: &str) -> Result<(), JsValue> {
        let profile = VisionProfile::from_json(profile_json).map_err(to_js)?;
        self.session.renderer_mut().apply(&profile).map_err(to_js)
    }

    pub fn remove(&mut self) {
        self.session.renderer_mut().remove();
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.session.renderer().is_active()
    }

    /// Handle a host message; returns the JSON reply, or `undefined` for
    /// messages this page does not understand.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&mut self, message_json: &str) -> Result<Option<String>, JsValue> {
        let Some(response) = self
            .session
            .handle_message_json(message_json)
            .map_err(to_js)?
        else {
            return Ok(None);
        };
        response.to_json().map(Some).map_err(to_js)
    }

    /// Storage changed: persist and render the full new record.
    #[wasm_bindgen(js_name = onStorageChange)]
    pub fn on_storage_change(&mut self, profile_json: &str) -> Result<(), JsValue> {
        let profile = VisionProfile::from_json(profile_json).map_err(to_js)?;
        self.session.store_mut().save(&profile).map_err(to_js)?;
        self.session.on_profile_changed(profile);
        Ok(())
    }

    /// Queue a slider-driven update; call [`poll`](Self::poll) from a timer.
    #[wasm_bindgen(js_name = queueLiveUpdate)]
    pub fn queue_live_update(&mut self, profile_json: &str) -> Result<(), JsValue> {
        let profile = VisionProfile::from_json(profile_json).map_err(to_js)?;
        self.session.queue_live_update(profile);
        Ok(())
    }

    pub fn poll(&mut self) -> bool {
        self.session.poll()
    }

    /// Persisted profile merged with defaults, as JSON.
    #[wasm_bindgen(js_name = storedProfile)]
    pub fn stored_profile(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.store().load()).map_err(to_js)
    }
}
