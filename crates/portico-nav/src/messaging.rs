//! Typed messages crossing the isolation boundary between the shell and
//! embedded applications.
//!
//! Frames send [`FrameMessage`]s as JSON; the shell answers with
//! [`ShellMessage`]s delivered as
//! [`ShellEffect::PostMessage`](crate::effects::ShellEffect::PostMessage). Incoming messages are routed through a
//! fixed dispatch table to a [`FrameMessageHandler`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;
use crate::route::ResolvedRoute;
use crate::surface::{FrameId, OverlayOptions, SurfaceKind};
use crate::tree::Params;

/// Context pushed to an embedded application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameContext {
    pub path: String,
    pub path_params: Params,
    /// Synced (`~`-prefixed) query params, prefix stripped.
    pub node_params: Params,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub virtual_segments: Vec<String>,
    pub surface: SurfaceKind,
}

impl FrameContext {
    pub fn new(route: &ResolvedRoute, surface: SurfaceKind) -> Self {
        Self {
            path: route.path.clone(),
            path_params: route.path_params.clone(),
            node_params: route.synced_params.clone(),
            virtual_segments: route.virtual_segments.clone(),
            surface,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ShellLifecycle {
    Mount { visits: u32 },
    Unmount,
    Visit { count: u32 },
}

/// Shell to frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum ShellMessage {
    ContextUpdate { context: FrameContext },
    LifecycleEvent { event: ShellLifecycle },
}

impl ShellMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn with_sync_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRequest {
    /// Absolute, or relative to the requesting frame's node.
    pub path: String,
    /// `false` updates URL and chrome but leaves the hosted frame alone.
    #[serde(default = "with_sync_default")]
    pub with_sync: bool,
    /// Synced params to attach.
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
    /// Open the target in an overlay instead of the primary surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_as: Option<OverlayOptions>,
}

impl NavigationRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            with_sync: true,
            params: Params::new(),
            open_as: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameLifecycle {
    /// The frame finished loading.
    Ready,
}

/// Frame to shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum FrameMessage {
    NavigationRequest(NavigationRequest),
    LifecycleEvent { event: FrameLifecycle },
    /// Close the overlay hosting the sender.
    CloseSurface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NavigationRequest,
    LifecycleEvent,
    CloseSurface,
}

impl FrameMessage {
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            FrameMessage::NavigationRequest(_) => MessageKind::NavigationRequest,
            FrameMessage::LifecycleEvent { .. } => MessageKind::LifecycleEvent,
            FrameMessage::CloseSurface => MessageKind::CloseSurface,
        }
    }
}

/// Receiver of decoded frame messages.
pub trait FrameMessageHandler {
    fn navigation_request(&mut self, frame: FrameId, request: NavigationRequest) -> Result<()>;
    fn lifecycle_event(&mut self, frame: FrameId, event: FrameLifecycle) -> Result<()>;
    fn close_surface(&mut self, frame: FrameId) -> Result<()>;
}

type Route<H> = fn(&mut H, FrameId, FrameMessage) -> Result<()>;

fn on_navigation_request<H: FrameMessageHandler>(handler: &mut H, frame: FrameId, message: FrameMessage) -> Result<()> {
    match message {
        FrameMessage::NavigationRequest(request) => handler.navigation_request(frame, request),
        _ => Ok(()),
    }
}

fn on_lifecycle_event<H: FrameMessageHandler>(handler: &mut H, frame: FrameId, message: FrameMessage) -> Result<()> {
    match message {
        FrameMessage::LifecycleEvent { event } => handler.lifecycle_event(frame, event),
        _ => Ok(()),
    }
}

fn on_close_surface<H: FrameMessageHandler>(handler: &mut H, frame: FrameId, _message: FrameMessage) -> Result<()> {
    handler.close_surface(frame)
}

fn routes<H: FrameMessageHandler>() -> [(MessageKind, Route<H>); 3] {
    [
        (MessageKind::NavigationRequest, on_navigation_request::<H> as Route<H>),
        (MessageKind::LifecycleEvent, on_lifecycle_event::<H> as Route<H>),
        (MessageKind::CloseSurface, on_close_surface::<H> as Route<H>),
    ]
}

/// Route one message to its handler method.
pub fn dispatch<H: FrameMessageHandler>(handler: &mut H, frame: FrameId, message: FrameMessage) -> Result<()> {
    let kind = message.kind();
    trace!(%frame, ?kind, "dispatching frame message");
    match routes::<H>().iter().find(|(k, _)| *k == kind) {
        Some((_, route)) => route(handler, frame, message),
        None => Ok(()),
    }
}
