//! View surfaces and the embedded frames they host.
//!
//! There is always one primary surface. Modal, drawer and split-view are
//! overlays with at most one live instance per kind; opening another of the
//! same kind closes the old one and invalidates its handle. Primary frames
//! that belong to a `viewGroup` are parked instead of destroyed when the user
//! navigates away, and restored on return.

use std::fmt;

use portico_config::{DrawerOptions, ModalOptions, SplitViewOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::Shell;
use crate::effects::{Effects, ShellEffect};
use crate::error::{NavError, Result};
use crate::messaging::{FrameContext, ShellLifecycle, ShellMessage};
use crate::route::ResolvedRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceKind {
    Primary,
    Modal,
    Drawer,
    SplitView,
}

impl SurfaceKind {
    pub fn is_overlay(self) -> bool {
        self != SurfaceKind::Primary
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceState {
    Closed,
    /// Frame created, content still loading.
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Options for opening a view in an overlay; the variant picks the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "surface", rename_all = "camelCase")]
pub enum OverlayOptions {
    Modal(ModalOptions),
    Drawer(DrawerOptions),
    SplitView(SplitViewOptions),
}

impl OverlayOptions {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            OverlayOptions::Modal(_) => SurfaceKind::Modal,
            OverlayOptions::Drawer(_) => SurfaceKind::Drawer,
            OverlayOptions::SplitView(_) => SurfaceKind::SplitView,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            OverlayOptions::Modal(o) => o.title.as_deref(),
            OverlayOptions::Drawer(o) => o.title.as_deref(),
            OverlayOptions::SplitView(o) => o.title.as_deref(),
        }
    }
}

/// Handle to one opened surface.
///
/// Identity is stable for the lifetime of the surface. Once the surface is
/// closed or replaced, `exists` is false and every operation is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    kind: SurfaceKind,
    id: SurfaceId,
}

impl SurfaceHandle {
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn exists(&self, shell: &Shell) -> bool {
        shell.surfaces().state(*self) != SurfaceState::Closed
    }

    pub fn state(&self, shell: &Shell) -> SurfaceState {
        shell.surfaces().state(*self)
    }

    /// Returns false when the surface was already gone.
    pub fn close(&self, shell: &mut Shell) -> bool {
        shell.close_surface(*self)
    }

    pub fn collapse(&self, shell: &mut Shell) -> bool {
        shell.set_split_view_collapsed(*self, true)
    }

    pub fn expand(&self, shell: &mut Shell) -> bool {
        shell.set_split_view_collapsed(*self, false)
    }

    pub fn is_collapsed(&self, shell: &Shell) -> bool {
        shell.surfaces().is_collapsed(*self)
    }

    pub fn is_expanded(&self, shell: &Shell) -> bool {
        self.kind == SurfaceKind::SplitView && self.exists(shell) && !self.is_collapsed(shell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameStatus {
    Loading,
    Ready,
}

/// One isolated embedded application instance.
#[derive(Debug, Clone)]
pub struct FrameInstance {
    pub id: FrameId,
    pub surface: SurfaceKind,
    pub view_url: String,
    /// Route the frame currently shows.
    pub route: ResolvedRoute,
    pub view_group: Option<String>,
    pub visits: u32,
    pub status: FrameStatus,
    /// Navigation that created or last reused the frame.
    pub seq: u64,
}

impl FrameInstance {
    fn context(&self) -> ShellMessage {
        ShellMessage::ContextUpdate {
            context: FrameContext::new(&self.route, self.surface),
        }
    }

    fn keep_alive_key(&self) -> Option<(&str, &str)> {
        self.view_group
            .as_deref()
            .map(|group| (group, self.view_url.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub handle: SurfaceHandle,
    pub options: OverlayOptions,
    pub frame: FrameInstance,
    pub state: SurfaceState,
    pub collapsed: bool,
    /// Primary path at the time the overlay was opened.
    pub host_path: String,
}

/// How the primary frame was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    Fresh(FrameId),
    Reused(FrameId),
}

impl Mount {
    pub fn frame(self) -> FrameId {
        match self {
            Mount::Fresh(frame) | Mount::Reused(frame) => frame,
        }
    }
}

/// A request to host a view in the primary surface.
#[derive(Debug, Clone)]
pub struct MountRequest {
    pub route: ResolvedRoute,
    pub view_url: String,
    pub view_group: Option<String>,
    pub seq: u64,
    /// Discard any existing or parked instance and start over.
    pub fresh: bool,
}

#[derive(Debug, Default)]
pub struct SurfaceManager {
    next_surface: u64,
    next_frame: u64,
    primary: Option<FrameInstance>,
    overlays: Vec<Overlay>,
    parked: Vec<FrameInstance>,
}

impl SurfaceManager {
    const PRIMARY: SurfaceHandle = SurfaceHandle {
        kind: SurfaceKind::Primary,
        id: SurfaceId(0),
    };

    pub fn primary_handle(&self) -> SurfaceHandle {
        Self::PRIMARY
    }

    pub fn primary(&self) -> Option<&FrameInstance> {
        self.primary.as_ref()
    }

    pub fn overlay(&self, kind: SurfaceKind) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.handle.kind == kind)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.overlays.iter()
    }

    pub fn parked(&self) -> impl Iterator<Item = &FrameInstance> {
        self.parked.iter()
    }

    pub fn state(&self, handle: SurfaceHandle) -> SurfaceState {
        if handle == Self::PRIMARY {
            return match &self.primary {
                Some(frame) if frame.status == FrameStatus::Ready => SurfaceState::Open,
                Some(_) => SurfaceState::Opening,
                None => SurfaceState::Closed,
            };
        }
        self.overlays
            .iter()
            .find(|o| o.handle == handle)
            .map_or(SurfaceState::Closed, |o| o.state)
    }

    pub fn is_collapsed(&self, handle: SurfaceHandle) -> bool {
        self.overlays
            .iter()
            .any(|o| o.handle == handle && o.collapsed)
    }

    /// Hosted (not parked) frame by id.
    pub fn frame(&self, id: FrameId) -> Option<&FrameInstance> {
        self.primary
            .iter()
            .chain(self.overlays.iter().map(|o| &o.frame))
            .find(|f| f.id == id)
    }

    /// Handle of the surface hosting a frame.
    pub fn surface_of(&self, id: FrameId) -> Option<SurfaceHandle> {
        if self.primary.as_ref().is_some_and(|f| f.id == id) {
            return Some(Self::PRIMARY);
        }
        self.overlays
            .iter()
            .find(|o| o.frame.id == id)
            .map(|o| o.handle)
    }

    fn alloc_frame(&mut self, surface: SurfaceKind, request: MountRequest) -> FrameInstance {
        self.next_frame += 1;
        FrameInstance {
            id: FrameId(self.next_frame),
            surface,
            view_url: request.view_url,
            route: request.route,
            view_group: request.view_group,
            visits: 1,
            status: FrameStatus::Loading,
            seq: request.seq,
        }
    }

    fn destroy(frame: &FrameInstance, out: &mut Effects) {
        if frame.status == FrameStatus::Ready {
            out.post(
                frame.id,
                ShellMessage::LifecycleEvent {
                    event: ShellLifecycle::Unmount,
                },
            );
        }
        out.push(ShellEffect::UnmountFrame { frame: frame.id });
    }

    /// Host a route in the primary surface, reusing a keep-alive instance
    /// when the view group and view URL match.
    pub fn mount_primary(&mut self, request: MountRequest, out: &mut Effects) -> Mount {
        let key = request
            .view_group
            .clone()
            .map(|group| (group, request.view_url.clone()));
        let same_key = |frame: &FrameInstance| {
            key.as_ref()
                .is_some_and(|(g, u)| frame.keep_alive_key() == Some((g.as_str(), u.as_str())))
        };

        let mut reused = None;
        if let Some(old) = self.primary.take() {
            if same_key(&old) && !request.fresh {
                reused = Some(old);
            } else if old.view_group.is_some() && !same_key(&old) {
                trace!(frame = %old.id, "parking keep-alive frame");
                out.push(ShellEffect::ParkFrame { frame: old.id });
                self.parked.push(old);
            } else {
                Self::destroy(&old, out);
            }
        }

        if reused.is_none() {
            if let Some(pos) = self.parked.iter().position(|f| same_key(f)) {
                let parked = self.parked.remove(pos);
                if request.fresh {
                    Self::destroy(&parked, out);
                } else {
                    out.push(ShellEffect::RestoreFrame { frame: parked.id });
                    reused = Some(parked);
                }
            }
        }

        match reused {
            Some(mut frame) => {
                frame.visits += 1;
                frame.route = request.route;
                frame.seq = request.seq;
                if frame.status == FrameStatus::Ready {
                    out.post(
                        frame.id,
                        ShellMessage::LifecycleEvent {
                            event: ShellLifecycle::Visit { count: frame.visits },
                        },
                    );
                    out.post(frame.id, frame.context());
                }
                debug!(frame = %frame.id, visits = frame.visits, "primary frame reused");
                let id = frame.id;
                self.primary = Some(frame);
                Mount::Reused(id)
            }
            None => {
                let frame = self.alloc_frame(SurfaceKind::Primary, request);
                out.push(ShellEffect::MountFrame {
                    frame: frame.id,
                    surface: SurfaceKind::Primary,
                    url: frame.view_url.clone(),
                });
                debug!(frame = %frame.id, url = %frame.view_url, "primary frame mounted");
                let id = frame.id;
                self.primary = Some(frame);
                Mount::Fresh(id)
            }
        }
    }

    /// Push new params to the primary frame without remounting it.
    pub fn update_primary(&mut self, route: ResolvedRoute, out: &mut Effects) -> Option<FrameId> {
        let frame = self.primary.as_mut()?;
        frame.route = route;
        if frame.status == FrameStatus::Ready {
            out.post(frame.id, frame.context());
        }
        Some(frame.id)
    }

    /// Point the primary frame at an equivalent route without notifying it.
    pub fn rebind_primary(&mut self, route: ResolvedRoute) {
        if let Some(frame) = self.primary.as_mut() {
            frame.route = route;
        }
    }

    pub fn open_overlay(
        &mut self,
        options: OverlayOptions,
        request: MountRequest,
        host_path: String,
        out: &mut Effects,
    ) -> SurfaceHandle {
        let kind = options.kind();
        if let Some(existing) = self.overlay(kind).map(|o| o.handle) {
            debug!(?kind, "replacing open overlay");
            self.close(existing, out);
        }

        self.next_surface += 1;
        let handle = SurfaceHandle {
            kind,
            id: SurfaceId(self.next_surface),
        };
        let collapsed = matches!(&options, OverlayOptions::SplitView(o) if o.collapsed);
        let frame = self.alloc_frame(kind, request);
        out.push(ShellEffect::MountFrame {
            frame: frame.id,
            surface: kind,
            url: frame.view_url.clone(),
        });
        debug!(?kind, frame = %frame.id, url = %frame.view_url, host = %host_path, "overlay opened");
        self.overlays.push(Overlay {
            handle,
            options,
            frame,
            state: SurfaceState::Opening,
            collapsed,
            host_path,
        });
        handle
    }

    /// Close an overlay. Closing the primary surface or a dead handle is a no-op.
    pub fn close(&mut self, handle: SurfaceHandle, out: &mut Effects) -> bool {
        let Some(pos) = self.overlays.iter().position(|o| o.handle == handle) else {
            return false;
        };
        let mut overlay = self.overlays.remove(pos);
        overlay.state = SurfaceState::Closing;
        Self::destroy(&overlay.frame, out);
        debug!(kind = ?handle.kind, frame = %overlay.frame.id, "overlay closed");
        true
    }

    pub fn set_collapsed(&mut self, handle: SurfaceHandle, collapsed: bool, out: &mut Effects) -> bool {
        if handle.kind != SurfaceKind::SplitView {
            return false;
        }
        let Some(overlay) = self.overlays.iter_mut().find(|o| o.handle == handle) else {
            return false;
        };
        if overlay.collapsed != collapsed {
            overlay.collapsed = collapsed;
            out.push(ShellEffect::SplitViewToggled {
                frame: overlay.frame.id,
                collapsed,
            });
        }
        true
    }

    /// Close a split-view whose host subtree no longer contains `path`.
    pub fn teardown_out_of_scope(&mut self, path: &str, out: &mut Effects) -> Option<SurfaceHandle> {
        let split = self.overlay(SurfaceKind::SplitView)?;
        let host = split.host_path.trim_end_matches('/');
        let in_scope = host.is_empty()
            || path == host
            || path.strip_prefix(host).is_some_and(|rest| rest.starts_with('/'));
        if in_scope {
            return None;
        }
        let handle = split.handle;
        debug!(host = %split.host_path, %path, collapsed = split.collapsed, "split view left its scope");
        self.close(handle, out);
        Some(handle)
    }

    /// Record load completion. Unknown frames are stale results.
    pub fn mark_ready(&mut self, id: FrameId, out: &mut Effects) -> Result<SurfaceKind> {
        let hosted = self
            .primary
            .iter_mut()
            .chain(self.overlays.iter_mut().map(|o| &mut o.frame))
            .find(|f| f.id == id);

        let Some(frame) = hosted else {
            return match self.parked.iter_mut().find(|f| f.id == id) {
                Some(parked) => {
                    parked.status = FrameStatus::Ready;
                    Ok(SurfaceKind::Primary)
                }
                None => Err(NavError::StaleAsyncResult(id.raw())),
            };
        };

        if frame.status == FrameStatus::Ready {
            return Ok(frame.surface);
        }
        frame.status = FrameStatus::Ready;
        out.post(frame.id, frame.context());
        out.post(
            frame.id,
            ShellMessage::LifecycleEvent {
                event: ShellLifecycle::Mount { visits: frame.visits },
            },
        );
        let surface = frame.surface;
        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.frame.id == id) {
            overlay.state = SurfaceState::Open;
        }
        trace!(frame = %id, ?surface, "frame ready");
        Ok(surface)
    }

    /// Destroy every parked instance.
    pub fn clear_parked(&mut self, out: &mut Effects) {
        for frame in self.parked.drain(..) {
            Self::destroy(&frame, out);
        }
    }
}
