//! Minimal document surface the renderer mutates, plus an in-memory backend.
//!
//! The renderer only ever needs a handful of operations: look an element up
//! by id, create the stylesheet and overlay elements, replace text, remove
//! elements, and (un)subscribe the pointer-move tracker. Backends report
//! missing elements as `None`, never as errors.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;

use crate::transforms::reading_guide::{
    OverlayGeometry, BOTTOM_CLASS, STRIP_CLASS, TOP_CLASS,
};

/// Structured DOM backend error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomError {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional element id context.
    pub element_id: Option<Box<str>>,
}

impl DomError {
    /// Create an error with a stable code.
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into().into_boxed_str(),
            element_id: None,
        }
    }

    /// Attach the id of the element involved.
    pub fn with_element_id(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into().into_boxed_str());
        self
    }
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dom:{}: {}", self.code, self.message)?;
        if let Some(id) = self.element_id.as_deref() {
            write!(f, " [element_id={}]", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for DomError {}

/// Handles to the overlay root and its three bands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuideOverlay<E> {
    pub root: E,
    pub top: E,
    pub strip: E,
    pub bottom: E,
}

/// Pointer-move handler state for the reading guide.
///
/// Holds everything the hot path needs so a move never touches the
/// stylesheet: the overlay handles, the strip height, and the shared
/// geometry cell the renderer reads back.
#[derive(Clone, Debug)]
pub struct GuideTracker<E> {
    overlay: GuideOverlay<E>,
    strip_height: f64,
    geometry: Rc<Cell<Option<OverlayGeometry>>>,
}

impl<E> GuideTracker<E> {
    pub fn new(
        overlay: GuideOverlay<E>,
        strip_height: f64,
        geometry: Rc<Cell<Option<OverlayGeometry>>>,
    ) -> Self {
        Self {
            overlay,
            strip_height,
            geometry,
        }
    }

    pub fn overlay(&self) -> &GuideOverlay<E> {
        &self.overlay
    }

    pub fn strip_height(&self) -> f64 {
        self.strip_height
    }

    /// Recompute geometry for a pointer position and push it to the bands.
    ///
    /// `set_px(element, property, px)` writes one inline style.
    pub fn track<F>(&self, pointer_y: f64, viewport_height: f64, mut set_px: F) -> OverlayGeometry
    where
        F: FnMut(&E, &'static str, f64),
    {
        let g = OverlayGeometry::at(pointer_y, viewport_height, self.strip_height);
        set_px(&self.overlay.top, "height", g.top_height);
        set_px(&self.overlay.strip, "top", g.strip_top);
        set_px(&self.overlay.bottom, "height", g.bottom_height);
        self.geometry.set(Some(g));
        g
    }
}

/// Live pointer-move listener registration.
///
/// Not `Clone`: releasing it consumes the handle, so a listener cannot be
/// released twice or leaked by copy.
#[must_use = "dropping the subscription handle leaks the listener"]
#[derive(Debug, PartialEq, Eq)]
pub struct PointerSubscription(u64);

impl PointerSubscription {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Document operations used by the renderer.
pub trait DocumentHost {
    /// Element handle type.
    type Element: Clone;

    /// Look up an element by id.
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// Create a `<style id=...>` element in the document head.
    fn create_style_element(&mut self, id: &str) -> Result<Self::Element, DomError>;

    /// Replace an element's text content.
    fn set_text_content(&mut self, element: &Self::Element, text: &str) -> Result<(), DomError>;

    /// Detach an element (and its subtree). Missing elements are ignored.
    fn remove_element(&mut self, element: &Self::Element);

    /// Create the overlay root with top band, strip and bottom band children
    /// and attach it to the body.
    fn create_guide_overlay(&mut self, id: &str) -> Result<GuideOverlay<Self::Element>, DomError>;

    /// Start delivering pointer moves to `tracker`.
    fn subscribe_pointer_move(
        &mut self,
        tracker: GuideTracker<Self::Element>,
    ) -> Result<PointerSubscription, DomError>;

    /// Stop a listener started by [`subscribe_pointer_move`](Self::subscribe_pointer_move).
    fn unsubscribe_pointer_move(&mut self, subscription: PointerSubscription);
}

/// Node handle in a [`MemoryDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

#[derive(Clone, Debug)]
struct MemoryNode {
    tag: &'static str,
    id: Option<String>,
    class: Option<&'static str>,
    parent: Option<NodeId>,
    text: String,
    style_px: BTreeMap<&'static str, f64>,
}

impl MemoryNode {
    fn new(tag: &'static str, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            id: None,
            class: None,
            parent,
            text: String::new(),
            style_px: BTreeMap::new(),
        }
    }
}

/// Headless document used by tests, the preview tool and non-browser hosts.
#[derive(Clone, Debug)]
pub struct MemoryDocument {
    nodes: BTreeMap<NodeId, MemoryNode>,
    head: NodeId,
    body: NodeId,
    next_node: u32,
    next_subscription: u64,
    listeners: BTreeMap<u64, GuideTracker<NodeId>>,
    viewport_height: f64,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new(800.0)
    }
}

impl MemoryDocument {
    /// Empty `<html><head/><body/></html>` with a viewport height.
    pub fn new(viewport_height: f64) -> Self {
        let mut doc = Self {
            nodes: BTreeMap::new(),
            head: NodeId(0),
            body: NodeId(0),
            next_node: 0,
            next_subscription: 1,
            listeners: BTreeMap::new(),
            viewport_height,
        };
        doc.head = doc.insert(MemoryNode::new("head", None));
        doc.body = doc.insert(MemoryNode::new("body", None));
        doc
    }

    fn insert(&mut self, node: MemoryNode) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, node);
        id
    }

    fn insert_child(
        &mut self,
        parent: NodeId,
        tag: &'static str,
        class: Option<&'static str>,
    ) -> NodeId {
        let mut node = MemoryNode::new(tag, Some(parent));
        node.class = class;
        self.insert(node)
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        self.viewport_height = viewport_height;
    }

    /// Number of attached elements carrying `id`.
    pub fn count_with_id(&self, id: &str) -> usize {
        self.nodes
            .values()
            .filter(|n| n.id.as_deref() == Some(id))
            .count()
    }

    /// Elements carrying `class`, in creation order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.class == Some(class))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Text content of the element with `id`.
    pub fn text_by_id(&self, id: &str) -> Option<&str> {
        self.nodes
            .values()
            .find(|n| n.id.as_deref() == Some(id))
            .map(|n| n.text.as_str())
    }

    pub fn tag_of(&self, node: NodeId) -> Option<&'static str> {
        self.nodes.get(&node).map(|n| n.tag)
    }

    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// Inline style value in px.
    pub fn style_px(&self, node: NodeId, property: &str) -> Option<f64> {
        self.nodes
            .get(&node)
            .and_then(|n| n.style_px.get(property).copied())
    }

    pub fn set_style_px(&mut self, node: NodeId, property: &'static str, px: f64) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.style_px.insert(property, px);
        }
    }

    /// Active pointer-move listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver a pointer move to every listener.
    pub fn dispatch_pointer_move(&mut self, pointer_y: f64) {
        let Self {
            nodes,
            listeners,
            viewport_height,
            ..
        } = self;
        for tracker in listeners.values() {
            tracker.track(pointer_y, *viewport_height, |node, property, px| {
                if let Some(n) = nodes.get_mut(node) {
                    n.style_px.insert(property, px);
                }
            });
        }
    }

    /// Remove an element by id as a host page script would.
    pub fn remove_by_id(&mut self, id: &str) -> bool {
        match self.element_by_id(id) {
            Some(node) => {
                self.remove_element(&node);
                true
            }
            None => false,
        }
    }

    fn descends_from(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent_of(current);
        }
        false
    }
}

impl DocumentHost for MemoryDocument {
    type Element = NodeId;

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.id.as_deref() == Some(id))
            .map(|(node, _)| *node)
    }

    fn create_style_element(&mut self, id: &str) -> Result<NodeId, DomError> {
        let node = self.insert_child(self.head, "style", None);
        if let Some(n) = self.nodes.get_mut(&node) {
            n.id = Some(id.to_string());
        }
        Ok(node)
    }

    fn set_text_content(&mut self, element: &NodeId, text: &str) -> Result<(), DomError> {
        let node = self
            .nodes
            .get_mut(element)
            .ok_or_else(|| DomError::new("detached_element", "element is not attached"))?;
        node.text.clear();
        node.text.push_str(text);
        Ok(())
    }

    fn remove_element(&mut self, element: &NodeId) {
        if *element == self.head || *element == self.body {
            return;
        }
        let doomed: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|node| self.descends_from(*node, *element))
            .collect();
        for node in doomed {
            self.nodes.remove(&node);
        }
    }

    fn create_guide_overlay(&mut self, id: &str) -> Result<GuideOverlay<NodeId>, DomError> {
        let root = self.insert_child(self.body, "div", None);
        if let Some(n) = self.nodes.get_mut(&root) {
            n.id = Some(id.to_string());
        }
        let top = self.insert_child(root, "div", Some(TOP_CLASS));
        let strip = self.insert_child(root, "div", Some(STRIP_CLASS));
        let bottom = self.insert_child(root, "div", Some(BOTTOM_CLASS));
        Ok(GuideOverlay {
            root,
            top,
            strip,
            bottom,
        })
    }

    fn subscribe_pointer_move(
        &mut self,
        tracker: GuideTracker<NodeId>,
    ) -> Result<PointerSubscription, DomError> {
        let raw = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.insert(raw, tracker);
        Ok(PointerSubscription::new(raw))
    }

    fn unsubscribe_pointer_move(&mut self, subscription: PointerSubscription) {
        self.listeners.remove(&subscription.raw());
    }
}
