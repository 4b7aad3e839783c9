//! Host contract: profile persistence and the message protocol.
//!
//! [`ContentSession`] is the one place entry points meet the renderer:
//! initial load, pushed live updates, storage changes and explicit refresh
//! requests all end in a full [`AdaptiveRenderer::apply`] pass.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::DocumentHost;
use crate::guard::{Clock, Debouncer, SystemClock};
use crate::profile::{StoredProfile, VisionProfile};
use crate::renderer::AdaptiveRenderer;

/// Version marker reported by status queries.
pub const VERSION_MARKER: &str = "2.1";

const LIVE_UPDATE_KEY: &str = "live-update";

/// Host message decode or transport failure.
#[derive(Debug)]
pub enum HostError {
    /// Message payload was not valid JSON for the protocol.
    Decode(serde_json::Error),
    /// Response channel is gone.
    Transport { message: Box<str> },
}

impl HostError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into().into_boxed_str(),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "host message decode failed: {}", err),
            Self::Transport { message } => write!(f, "host transport failed: {}", message),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Transport { .. } => None,
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// Source of the persisted profile.
pub trait ProfileStore {
    /// Current profile merged with defaults. Never fails.
    fn load(&self) -> VisionProfile;
}

type ChangeCallback = Box<dyn FnMut(VisionProfile)>;

/// In-memory store with change notification.
#[derive(Default)]
pub struct MemoryProfileStore {
    stored: StoredProfile,
    listeners: Vec<ChangeCallback>,
}

impl fmt::Debug for MemoryProfileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProfileStore")
            .field("stored", &self.stored)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MemoryProfileStore {
    pub fn new(stored: StoredProfile) -> Self {
        Self {
            stored,
            listeners: Vec::new(),
        }
    }

    pub fn stored(&self) -> StoredProfile {
        self.stored
    }

    /// Register a callback receiving the full merged profile on every change.
    pub fn on_change<F>(&mut self, callback: F)
    where
        F: FnMut(VisionProfile) + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    /// Persist changed fields and notify listeners.
    pub fn update(&mut self, changes: StoredProfile) -> VisionProfile {
        let merged = changes.merge_onto(self.load());
        self.stored = StoredProfile::from(merged);
        for listener in self.listeners.iter_mut() {
            listener(merged);
        }
        merged
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> VisionProfile {
        self.stored.merge_with_defaults()
    }
}

/// Store backed by a serialized JSON record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JsonProfileStore {
    raw: Option<String>,
}

impl JsonProfileStore {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Serialize and persist a full profile.
    pub fn save(&mut self, profile: &VisionProfile) -> Result<(), HostError> {
        self.raw = Some(serde_json::to_string(profile)?);
        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn load(&self) -> VisionProfile {
        let Some(raw) = self.raw.as_deref() else {
            return VisionProfile::default();
        };
        VisionProfile::from_json(raw).unwrap_or_else(|err| {
            log::warn!("[keratovision] stored profile unreadable, using defaults: {}", err);
            VisionProfile::default()
        })
    }
}

/// Host-to-core message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    /// Render a profile pushed by the controller.
    LiveUpdate {
        #[serde(default)]
        config: Option<StoredProfile>,
    },
    /// Enable or disable compensation.
    Toggle { enabled: bool },
    /// Report active status and version.
    GetStatus,
    /// Reload the persisted profile and render it.
    ForceRefresh,
}

/// Acknowledgement status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Applied,
    Enabled,
    Disabled,
    Refreshed,
}

/// Core-to-host reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostResponse {
    Ack { status: AckStatus },
    Status { active: bool, version: String },
}

impl HostResponse {
    pub fn ack(status: AckStatus) -> Self {
        Self::Ack { status }
    }

    pub fn to_json(&self) -> Result<String, HostError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Reply channel back to the host.
pub trait Responder {
    fn respond(&mut self, response: &HostResponse) -> Result<(), HostError>;
}

impl<F> Responder for F
where
    F: FnMut(&HostResponse) -> Result<(), HostError>,
{
    fn respond(&mut self, response: &HostResponse) -> Result<(), HostError> {
        self(response)
    }
}

/// Content-side session: store + renderer + live-update debouncing.
pub struct ContentSession<S, D, C = SystemClock>
where
    S: ProfileStore,
    D: DocumentHost,
    C: Clock,
{
    store: S,
    renderer: AdaptiveRenderer<D, C>,
    live: Debouncer<&'static str, VisionProfile>,
    current: Option<VisionProfile>,
    started: bool,
}

impl<S, D, C> ContentSession<S, D, C>
where
    S: ProfileStore,
    D: DocumentHost,
    C: Clock,
{
    pub fn new(store: S, renderer: AdaptiveRenderer<D, C>) -> Self {
        let delay = renderer.options().debounce_delay;
        Self {
            store,
            renderer,
            live: Debouncer::new(delay),
            current: None,
            started: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn renderer(&self) -> &AdaptiveRenderer<D, C> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut AdaptiveRenderer<D, C> {
        &mut self.renderer
    }

    /// Profile of the last attempted pass.
    pub fn current_profile(&self) -> Option<VisionProfile> {
        self.current
    }

    /// Load the stored profile and render it. Safe to call again.
    pub fn start(&mut self) {
        if self.started {
            log::debug!("[keratovision] session re-initialised");
        }
        self.started = true;
        let profile = self.store.load();
        self.render(profile);
    }

    /// Storage changed; `profile` is the full new record.
    pub fn on_profile_changed(&mut self, profile: VisionProfile) {
        self.render(profile);
    }

    /// Queue a live update; bursts collapse to the last profile.
    pub fn queue_live_update(&mut self, profile: VisionProfile) {
        let now = self.renderer.clock().now();
        self.live.call(LIVE_UPDATE_KEY, profile, now);
    }

    /// Render a queued live update whose quiet period has elapsed.
    pub fn poll(&mut self) -> bool {
        let now = self.renderer.clock().now();
        let mut rendered = false;
        for (_, profile) in self.live.poll(now) {
            self.render(profile);
            rendered = true;
        }
        rendered
    }

    pub fn has_pending_update(&self) -> bool {
        self.live.is_pending(&LIVE_UPDATE_KEY)
    }

    /// Handle one decoded message.
    pub fn handle_message(&mut self, message: HostMessage) -> HostResponse {
        match message {
            HostMessage::LiveUpdate { config } => {
                // A direct push supersedes anything still debouncing.
                self.live.cancel(&LIVE_UPDATE_KEY);
                if let Some(config) = config {
                    self.render(config.merge_with_defaults());
                }
                HostResponse::ack(AckStatus::Applied)
            }
            HostMessage::Toggle { enabled: true } => {
                let profile = VisionProfile {
                    enabled: true,
                    ..self.store.load()
                };
                self.render(profile);
                HostResponse::ack(AckStatus::Enabled)
            }
            HostMessage::Toggle { enabled: false } => {
                self.live.cancel(&LIVE_UPDATE_KEY);
                self.renderer.remove();
                HostResponse::ack(AckStatus::Disabled)
            }
            HostMessage::GetStatus => HostResponse::Status {
                active: self.renderer.is_active(),
                version: String::from(VERSION_MARKER),
            },
            HostMessage::ForceRefresh => {
                // Overwrites in place; a failed pass keeps the current render.
                let profile = self.store.load();
                self.render(profile);
                HostResponse::ack(AckStatus::Refreshed)
            }
        }
    }

    /// Decode and handle a JSON message.
    ///
    /// Messages of an unknown shape are ignored (`Ok(None)`); malformed JSON
    /// is an error.
    pub fn handle_message_json(&mut self, raw: &str) -> Result<Option<HostResponse>, HostError> {
        match serde_json::from_str::<HostMessage>(raw) {
            Ok(message) => Ok(Some(self.handle_message(message))),
            Err(err) if err.is_data() => {
                log::debug!("[keratovision] ignoring message: {}", err);
                Ok(None)
            }
            Err(err) => Err(HostError::Decode(err)),
        }
    }

    /// Handle a message and send the reply. A lost reply is only logged;
    /// the pass already ran against local state.
    pub fn dispatch<R: Responder + ?Sized>(&mut self, message: HostMessage, responder: &mut R) {
        let response = self.handle_message(message);
        if let Err(err) = responder.respond(&response) {
            log::warn!("[keratovision] response not delivered: {}", err);
        }
    }

    fn render(&mut self, profile: VisionProfile) {
        self.current = Some(profile);
        if let Err(err) = self.renderer.apply(&profile) {
            log::error!("[keratovision] pass aborted: {}", err);
        }
    }
}
