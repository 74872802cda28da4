//! The shell: one control loop tying resolution, activation, surfaces,
//! chrome and history together.
//!
//! Every navigation takes a fresh sequence number. State is only replaced
//! by a navigation whose number is still current, so an answer or load
//! result that arrives after a newer request is discarded.

use std::sync::Arc;

use portico_config::{
    ConfigScope, ConfigStore, DrawerOptions, ModalOptions, ResponsiveNavigation, ShellConfig,
    SplitViewOptions, UnmatchedPathFallback,
};
use tracing::{debug, info, warn};

use crate::activation::{
    ActivationContext, ActivationGate, ActivationHook, ActivationTicket, Alert, Confirmation,
    Decision, NavigationSource,
};
use crate::chrome::{ChromeInput, ChromeState, ChromeUi, ResizeDebouncer};
use crate::effects::{ABSOLUTE_PATH_PREVENTED, Effects, ShellEffect};
use crate::error::{NavError, Result};
use crate::history::{HistoryAdapter, HistoryEntry};
use crate::messaging::{self, FrameLifecycle, FrameMessage, FrameMessageHandler, NavigationRequest};
use crate::route::{Location, PathResolver, Resolution, ResolvedRoute};
use crate::surface::{
    FrameId, FrameInstance, MountRequest, OverlayOptions, SurfaceHandle, SurfaceKind, SurfaceManager,
};
use crate::toggles::FeatureToggles;
use crate::tree::{ChildrenProvider, NodeId, NodeTree, Params};

/// Upper bound on link, hook and fallback redirects per navigation.
const MAX_REDIRECTS: usize = 8;

/// What a navigation call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigated {
    /// A new route is current.
    Committed,
    /// Same view, new synced params pushed to it.
    ParamsUpdated,
    /// Already there.
    Unchanged,
    /// Waiting for the user to answer a confirmation.
    Pending(ActivationTicket),
    /// The target opened in an overlay.
    Overlay(SurfaceHandle),
}

#[derive(Debug, Clone)]
struct Request {
    url: String,
    source: NavigationSource,
    with_sync: bool,
    params: Params,
    /// Node whose activation was already confirmed.
    bypass: Option<NodeId>,
    reload: bool,
}

impl Request {
    fn new(url: impl Into<String>, source: NavigationSource) -> Self {
        Self {
            url: url.into(),
            source,
            with_sync: true,
            params: Params::new(),
            bypass: None,
            reload: false,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingNavigation {
    ticket: ActivationTicket,
    target: String,
    source: NavigationSource,
    with_sync: bool,
    synced: Params,
    /// Modal or drawer whose frame asked for the navigation.
    origin: Option<SurfaceHandle>,
}

pub struct Shell {
    store: ConfigStore,
    config: Arc<ShellConfig>,
    tree: NodeTree,
    toggles: FeatureToggles,
    gate: ActivationGate,
    surfaces: SurfaceManager,
    history: HistoryAdapter,
    ui: ChromeUi,
    resize: ResizeDebouncer,
    chrome: ChromeState,
    route: Option<ResolvedRoute>,
    pending: Option<PendingNavigation>,
    effects: Effects,
    seq: u64,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("route", &self.route.as_ref().map(|r| r.url()))
            .field("seq", &self.seq)
            .field("tree", &self.tree)
            .field("gate", &self.gate)
            .finish()
    }
}

impl Shell {
    pub fn new(config: ShellConfig) -> Result<Self> {
        let tree = NodeTree::from_config(&config.navigation.nodes)?;
        let toggles = FeatureToggles::new(&config.feature_toggles.initially_active);
        let store = ConfigStore::new(config);
        let config = store.snapshot();
        let ui = ChromeUi::default();
        let chrome = ChromeState::derive(&ChromeInput {
            tree: &tree,
            toggles: &toggles,
            route: None,
            config: &config,
            ui: &ui,
        });
        Ok(Self {
            store,
            config,
            tree,
            toggles,
            gate: ActivationGate::default(),
            surfaces: SurfaceManager::default(),
            history: HistoryAdapter::default(),
            ui,
            resize: ResizeDebouncer::default(),
            chrome,
            route: None,
            pending: None,
            effects: Effects::default(),
            seq: 0,
        })
    }

    pub fn register_activation_hook(&mut self, name: impl Into<String>, hook: impl ActivationHook + 'static) {
        self.gate.register(name, Box::new(hook));
    }

    pub fn register_children_provider(&mut self, name: impl Into<String>, provider: impl ChildrenProvider + 'static) {
        self.tree.register_provider(name, Box::new(provider));
    }

    pub fn route(&self) -> Option<&ResolvedRoute> {
        self.route.as_ref()
    }

    pub fn current_url(&self) -> Option<String> {
        self.route.as_ref().map(ResolvedRoute::url)
    }

    pub fn chrome(&self) -> &ChromeState {
        &self.chrome
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn toggles(&self) -> &FeatureToggles {
        &self.toggles
    }

    pub fn history(&self) -> &HistoryAdapter {
        &self.history
    }

    pub fn surfaces(&self) -> &SurfaceManager {
        &self.surfaces
    }

    pub fn primary_frame(&self) -> Option<&FrameInstance> {
        self.surfaces.primary()
    }

    pub fn pending_activation(&self) -> Option<ActivationTicket> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn drain_effects(&mut self) -> Vec<ShellEffect> {
        self.effects.drain()
    }

    /// Initial load or a typed URL. Activation hooks do not run.
    pub fn load(&mut self, url: &str) -> Result<Navigated> {
        self.run(Request::new(url, NavigationSource::DirectEntry))
    }

    /// Builder for programmatic navigation.
    pub fn navigation(&mut self) -> Navigator<'_> {
        Navigator {
            shell: self,
            params: Params::new(),
            with_sync: true,
        }
    }

    pub fn navigate(&mut self, path: &str) -> Result<Navigated> {
        self.navigation().navigate(path)
    }

    pub fn open_as_modal(&mut self, path: &str, options: ModalOptions) -> Result<SurfaceHandle> {
        self.navigation().open_as_modal(path, options)
    }

    pub fn open_as_drawer(&mut self, path: &str, options: DrawerOptions) -> Result<SurfaceHandle> {
        self.navigation().open_as_drawer(path, options)
    }

    pub fn open_as_split_view(&mut self, path: &str, options: SplitViewOptions) -> Result<SurfaceHandle> {
        self.navigation().open_as_split_view(path, options)
    }

    pub fn back(&mut self) -> Result<Navigated> {
        let Some(url) = self.history.back().map(HistoryEntry::url) else {
            return Ok(Navigated::Unchanged);
        };
        self.traverse(url, HistoryAdapter::forward)
    }

    pub fn forward(&mut self) -> Result<Navigated> {
        let Some(url) = self.history.forward().map(HistoryEntry::url) else {
            return Ok(Navigated::Unchanged);
        };
        self.traverse(url, HistoryAdapter::back)
    }

    /// Restore a history entry; the cursor moves back with `undo` when it fails.
    fn traverse(
        &mut self,
        url: String,
        undo: fn(&mut HistoryAdapter) -> Option<&HistoryEntry>,
    ) -> Result<Navigated> {
        self.run(Request::new(url, NavigationSource::History))
            .inspect_err(|err| {
                debug!(error = %err, "history traversal failed, cursor restored");
                undo(&mut self.history);
            })
    }

    /// Answer the confirmation of a pending activation.
    pub fn resolve_activation(&mut self, ticket: ActivationTicket, answer: Confirmation) -> Result<Navigated> {
        let proceed = match self.gate.resolve(ticket, answer) {
            Ok(proceed) => proceed,
            Err(err @ NavError::StaleAsyncResult(_)) => {
                debug!(%ticket, "stale activation answer discarded");
                return Err(err);
            }
            Err(err) => {
                self.pending = None;
                self.effects.push(ShellEffect::DismissConfirmation { ticket });
                info!(%ticket, "activation cancelled");
                return Err(err);
            }
        };
        self.effects.push(ShellEffect::DismissConfirmation { ticket });

        let pending = self.pending.take().filter(|p| p.ticket == ticket);
        let origin = pending.as_ref().and_then(|p| p.origin);
        let base = self.current_path();
        let mut request = Request::new(Location::join(&base, &proceed.path)?, NavigationSource::Api);
        if let Some(pending) = pending {
            request.source = pending.source;
            request.with_sync = pending.with_sync;
            if pending.target == proceed.path {
                request.params = pending.synced;
            }
        }
        request.bypass = Some(proceed.node);
        let outcome = self.run(request)?;
        self.leave_overlay(origin, outcome);
        Ok(outcome)
    }

    /// Close the modal or drawer a navigation came from once it is no longer pending.
    fn leave_overlay(&mut self, origin: Option<SurfaceHandle>, outcome: Navigated) {
        let Some(handle) = origin else {
            return;
        };
        match (outcome, self.pending.as_mut()) {
            (Navigated::Pending(_), Some(pending)) => pending.origin = Some(handle),
            (Navigated::Pending(_), None) => {}
            _ => {
                self.surfaces.close(handle, &mut self.effects);
            }
        }
    }

    fn current_path(&self) -> String {
        self.route
            .as_ref()
            .map_or_else(|| "/".to_string(), |r| r.path.clone())
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        if let Some(ticket) = self.gate.supersede(self.seq) {
            debug!(%ticket, seq = self.seq, "pending activation superseded");
            self.pending = None;
            self.effects.push(ShellEffect::DismissConfirmation { ticket });
        }
        self.seq
    }

    /// Resolve a URL to a route, following link redirects and applying the
    /// unmatched-path and unresolvable-leaf fallbacks.
    fn resolve_target(
        &mut self,
        url: &str,
        source: NavigationSource,
        extra: &Params,
        fallback: bool,
    ) -> Result<ResolvedRoute> {
        let toggle_param = self.config.feature_toggles.query_param.clone();
        let mut location = Location::parse(url, &toggle_param)?;
        location.synced.extend(extra.clone());

        for _ in 0..MAX_REDIRECTS {
            for value in &location.toggles {
                if self.toggles.activate_from_query(value) {
                    debug!(toggles = %value, "feature toggles activated from query");
                }
            }
            let outcome = PathResolver::new(&mut self.tree, &self.toggles).resolve(&location);
            match outcome {
                Ok(Resolution::Route(route)) => return Ok(route),
                Ok(Resolution::Redirect(target)) => {
                    let mut next = Location::parse(&target, &toggle_param)?;
                    if next.synced.is_empty() {
                        next.synced = std::mem::take(&mut location.synced);
                    }
                    location = next;
                }
                Err(NavError::PathNotFound { path, matched }) if fallback => {
                    let to = match self.config.routing.unmatched_path_fallback {
                        UnmatchedPathFallback::Root => "/".to_string(),
                        UnmatchedPathFallback::NearestAncestor => matched.clone(),
                    };
                    warn!(%path, %to, "no node matches path, redirecting");
                    self.effects
                        .warn_console(format!("Could not find the requested route {path}."));
                    if location.path() == to {
                        return Err(NavError::PathNotFound { path, matched });
                    }
                    location = Location::parse(&to, &toggle_param)?;
                }
                Err(NavError::NoResolvableLeaf(path)) => {
                    warn!(%path, ?source, "navigation target has no view");
                    self.effects
                        .alert(Alert::error(format!("Could not find the requested route {path}.")));
                    let direct = matches!(source, NavigationSource::DirectEntry | NavigationSource::History);
                    if !(direct && fallback) || location.is_root() {
                        return Err(NavError::NoResolvableLeaf(path));
                    }
                    location = Location::parse("/", &toggle_param)?;
                }
                Err(err) => return Err(err),
            }
        }
        Err(NavError::InvalidConfig(format!("too many redirects resolving {url}")))
    }

    fn run(&mut self, mut request: Request) -> Result<Navigated> {
        let seq = self.next_seq();
        for _ in 0..MAX_REDIRECTS {
            let route = self.resolve_target(&request.url, request.source, &request.params, true)?;
            if request.source.runs_hooks() && request.bypass != Some(route.leaf()) {
                match self.gate_route(&route, request.source, seq)? {
                    Decision::Allow => {}
                    Decision::Deny(alert) => {
                        if let Some(alert) = alert {
                            self.effects.alert(alert);
                        }
                        info!(seq, path = %route.path, "navigation denied by activation hook");
                        return Err(NavError::ActivationDenied(route.path));
                    }
                    Decision::Redirect(target) => {
                        debug!(seq, from = %route.path, to = %target, "activation hook redirect");
                        request.url = Location::join(&route.path, &target)?;
                        request.params.clear();
                        continue;
                    }
                    Decision::Pending(ticket, prompt) => {
                        self.pending = Some(PendingNavigation {
                            ticket,
                            target: route.path.clone(),
                            source: request.source,
                            with_sync: request.with_sync,
                            synced: route.synced_params.clone(),
                            origin: None,
                        });
                        self.effects.push(ShellEffect::ShowConfirmation { ticket, prompt });
                        debug!(seq, %ticket, path = %route.path, "activation pending confirmation");
                        return Ok(Navigated::Pending(ticket));
                    }
                }
            }
            return self.commit(route, &request, seq);
        }
        Err(NavError::InvalidConfig(format!(
            "too many activation redirects from {}",
            request.url
        )))
    }

    fn gate_route(&mut self, route: &ResolvedRoute, source: NavigationSource, seq: u64) -> Result<Decision> {
        let leaf = route.leaf();
        let node = self.tree.node(leaf);
        let hook = node.config().on_node_activation.clone();
        let ctx = ActivationContext {
            node: leaf,
            label: node.label(),
            path: &route.path,
            path_params: &route.path_params,
            synced_params: &route.synced_params,
            source,
        };
        self.gate.activate(hook.as_deref(), &ctx, seq)
    }

    fn commit(&mut self, route: ResolvedRoute, request: &Request, seq: u64) -> Result<Navigated> {
        if seq != self.seq {
            debug!(seq, current = self.seq, "discarding superseded navigation");
            return Err(NavError::StaleAsyncResult(seq));
        }

        let same_route = self
            .route
            .as_ref()
            .is_some_and(|current| current.same_target(&route) && current.synced_params == route.synced_params);
        let mounted = self.surfaces.primary().map(|f| {
            (
                f.route.same_target(&route),
                f.route.synced_params == route.synced_params,
            )
        });
        let mounted_same = mounted.is_some_and(|(target, _)| target);

        if same_route && !request.reload && (!request.with_sync || mounted_same) {
            self.refresh_chrome();
            return Ok(Navigated::Unchanged);
        }

        let outcome = if !request.with_sync {
            Navigated::Committed
        } else if mounted_same && !request.reload {
            if mounted.is_some_and(|(_, params)| params) {
                self.surfaces.rebind_primary(route.clone());
                Navigated::Committed
            } else {
                self.surfaces.update_primary(route.clone(), &mut self.effects);
                Navigated::ParamsUpdated
            }
        } else {
            let view_url = route
                .view_url(&self.tree)
                .ok_or_else(|| NavError::NoResolvableLeaf(route.path.clone()))?;
            let view_group = self.tree.node(route.leaf()).config().view_group.clone();
            self.surfaces.mount_primary(
                MountRequest {
                    route: route.clone(),
                    view_url,
                    view_group,
                    seq,
                    fresh: request.reload,
                },
                &mut self.effects,
            );
            Navigated::Committed
        };

        self.record(&route, request.source);
        if let Some(closed) = self.surfaces.teardown_out_of_scope(&route.path, &mut self.effects) {
            debug!(surface = ?closed.id(), "split view closed by navigation");
        }
        info!(seq, path = %route.path, ?outcome, source = ?request.source, "navigation committed");
        self.route = Some(route);
        self.refresh_chrome();
        self.reveal_selection();
        Ok(outcome)
    }

    fn record(&mut self, route: &ResolvedRoute, source: NavigationSource) {
        let entry = HistoryEntry::from(route);
        let url = entry.url();
        if self.history.current().map(HistoryEntry::url).as_deref() == Some(url.as_str()) {
            return;
        }
        if source == NavigationSource::History {
            self.history.replace(entry);
            self.effects.push(ShellEffect::HistoryReplace { url });
        } else {
            self.history.push(entry);
            self.effects.push(ShellEffect::HistoryPush { url });
        }
    }

    fn open_overlay(&mut self, path: &str, options: OverlayOptions, base: &str, params: Params) -> Result<SurfaceHandle> {
        let kind = options.kind();
        let url = Location::join(base, path)?;
        let location = Location::parse(&url, &self.config.feature_toggles.query_param)?;
        if location.is_root() {
            warn!(?kind, %path, "overlay navigation to the root path rejected");
            self.effects.warn_console(ABSOLUTE_PATH_PREVENTED);
            return Err(NavError::AbsoluteRootInOverlay(kind));
        }

        let seq = self.next_seq();
        let route = self.resolve_target(&url, NavigationSource::Api, &params, false)?;
        let view_url = route
            .view_url(&self.tree)
            .ok_or_else(|| NavError::NoResolvableLeaf(route.path.clone()))?;
        let host_path = self.current_path();
        let handle = self.surfaces.open_overlay(
            options,
            MountRequest {
                route,
                view_url,
                view_group: None,
                seq,
                fresh: true,
            },
            host_path,
            &mut self.effects,
        );
        debug!(seq, ?kind, surface = ?handle.id(), "overlay opened");
        Ok(handle)
    }

    /// Close an overlay; false when it no longer exists.
    pub fn close_surface(&mut self, handle: SurfaceHandle) -> bool {
        self.surfaces.close(handle, &mut self.effects)
    }

    pub fn set_split_view_collapsed(&mut self, handle: SurfaceHandle, collapsed: bool) -> bool {
        self.surfaces.set_collapsed(handle, collapsed, &mut self.effects)
    }

    /// Handle a raw JSON message posted by a frame.
    pub fn receive(&mut self, frame: FrameId, raw: &str) -> Result<()> {
        let message = FrameMessage::decode(raw).inspect_err(|err| {
            warn!(%frame, error = %err, "undecodable frame message dropped");
        })?;
        self.handle_message(frame, message)
    }

    pub fn handle_message(&mut self, frame: FrameId, message: FrameMessage) -> Result<()> {
        messaging::dispatch(self, frame, message)
    }

    /// A frame finished loading. Results for frames that were replaced
    /// meanwhile are stale.
    pub fn frame_loaded(&mut self, frame: FrameId) -> Result<()> {
        match self.surfaces.mark_ready(frame, &mut self.effects) {
            Ok(_) => Ok(()),
            Err(err @ NavError::StaleAsyncResult(_)) => {
                debug!(%frame, "load result for a replaced frame discarded");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// A click on a nav item. Clicking the active leaf reloads it.
    pub fn click_nav_item(&mut self, node: NodeId) -> Result<Navigated> {
        let n = self
            .tree
            .get(node)
            .ok_or_else(|| NavError::InvalidPath(node.to_string()))?;
        let modal = n.config().modal_options();
        let params = self
            .route
            .as_ref()
            .map(|r| r.path_params.clone())
            .unwrap_or_default();
        let path = self.tree.path_of(node, &params);

        if let Some(options) = modal {
            let handle = self.open_overlay(&path, OverlayOptions::Modal(options), "/", Params::new())?;
            return Ok(Navigated::Overlay(handle));
        }

        let mut request = Request::new(path, NavigationSource::Chrome);
        if let Some(current) = self.route.as_ref().filter(|r| r.leaf() == node) {
            request.url = current.url();
            request.reload = true;
        }
        self.run(request)
    }

    /// Click on the nav item with the given test id.
    pub fn click(&mut self, test_id: &str) -> Result<Navigated> {
        let node = self
            .chrome
            .item(test_id)
            .map(|item| item.node)
            .ok_or_else(|| NavError::InvalidPath(test_id.to_string()))?;
        self.click_nav_item(node)
    }

    /// Toggle a side-nav category by test id. Returns its new open state.
    pub fn toggle_category(&mut self, test_id: &str) -> Option<bool> {
        let side = self.chrome.side_nav.as_ref()?;
        let category = side.category(test_id).filter(|c| c.collapsible)?;
        let (parent, key, accordion) = (side.parent, category.key.clone(), side.accordion);
        let open = self.ui.toggle(parent, &key, accordion);
        self.refresh_chrome();
        Some(open)
    }

    /// Record a viewport resize; applied by [`Shell::tick`] after the debounce delay.
    pub fn resize(&mut self, width: f32, now_ms: u64) {
        self.resize
            .resize(width, now_ms, self.config.settings.layout.resize_debounce_ms);
    }

    /// Returns true when a debounced resize was applied.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let Some(width) = self.resize.tick(now_ms) else {
            return false;
        };
        self.ui.viewport_width = width;
        self.refresh_chrome();
        true
    }

    /// Flip the semi-collapsed side nav; only with semi-collapsible navigation.
    pub fn toggle_semi_collapsed(&mut self) -> bool {
        if self.config.settings.responsive_navigation != ResponsiveNavigation::SemiCollapsible {
            return false;
        }
        self.ui.semi_collapsed = !self.ui.semi_collapsed;
        self.refresh_chrome();
        self.ui.semi_collapsed
    }

    pub fn activate_feature_toggle(&mut self, name: &str) {
        if self.toggles.activate(name) {
            self.refresh_chrome();
        }
    }

    pub fn deactivate_feature_toggle(&mut self, name: &str) {
        if self.toggles.deactivate(name) {
            self.refresh_chrome();
        }
    }

    fn refresh_chrome(&mut self) {
        if let Some(route) = &self.route {
            for id in &route.chain {
                self.tree.bind(*id, &route.path_params);
            }
        }
        self.chrome = ChromeState::derive(&ChromeInput {
            tree: &self.tree,
            toggles: &self.toggles,
            route: self.route.as_ref(),
            config: &self.config,
            ui: &self.ui,
        });
    }

    /// Open the collapsible category that hides the selected item.
    fn reveal_selection(&mut self) {
        let Some((parent, key)) = self.chrome.hidden_selection() else {
            return;
        };
        let accordion = self.chrome.side_nav.as_ref().is_some_and(|s| s.accordion);
        self.ui.set_open(parent, &key, true, accordion);
        self.refresh_chrome();
    }

    /// The published configuration snapshot.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Staged configuration; edits take effect on [`Shell::config_changed`].
    pub fn config_mut(&mut self) -> &mut ShellConfig {
        self.store.stage()
    }

    /// Publish staged configuration and re-derive what the hint covers.
    pub fn config_changed(&mut self, hint: Option<&str>) -> Result<ConfigScope> {
        let scope = self.store.apply(hint);
        self.config = self.store.snapshot();
        info!(?scope, generation = self.store.generation(), "configuration changed");

        if scope >= ConfigScope::Navigation {
            if scope == ConfigScope::Full {
                self.toggles = FeatureToggles::new(&self.config.feature_toggles.initially_active);
            }
            self.tree.rebuild(&self.config.navigation.nodes)?;
            self.ui.reset_categories();
            self.surfaces.clear_parked(&mut self.effects);
            self.reresolve()?;
        }
        self.refresh_chrome();
        Ok(scope)
    }

    /// Resolve the current URL against a rebuilt tree.
    fn reresolve(&mut self) -> Result<()> {
        let Some(url) = self.current_url() else {
            return Ok(());
        };
        let route = match self.resolve_target(&url, NavigationSource::History, &Params::new(), true) {
            Ok(route) => route,
            Err(err) => {
                self.route = None;
                return Err(err);
            }
        };
        let view_url = route.view_url(&self.tree);
        if view_url.is_some() && view_url.as_deref() == self.surfaces.primary().map(|f| f.view_url.as_str()) {
            self.surfaces.rebind_primary(route.clone());
            self.route = Some(route);
            return Ok(());
        }
        self.route = None;
        let seq = self.next_seq();
        let mut request = Request::new(url, NavigationSource::History);
        request.reload = true;
        self.commit(route, &request, seq).map(|_| ())
    }
}

impl FrameMessageHandler for Shell {
    fn navigation_request(&mut self, frame: FrameId, request: NavigationRequest) -> Result<()> {
        let (handle, base) = match (self.surfaces.surface_of(frame), self.surfaces.frame(frame)) {
            (Some(handle), Some(instance)) => (handle, instance.route.path.clone()),
            _ => return Err(NavError::UnknownFrame(frame.raw())),
        };

        if let Some(options) = request.open_as {
            self.open_overlay(&request.path, options, &base, request.params)?;
            return Ok(());
        }

        let mut nav = Request::new(Location::join(&base, &request.path)?, NavigationSource::Frame);
        nav.with_sync = request.with_sync;
        nav.params = request.params;
        let outcome = self.run(nav)?;

        // Navigating from a modal or drawer leaves it, after confirmation if one is pending.
        let origin = matches!(handle.kind(), SurfaceKind::Modal | SurfaceKind::Drawer).then_some(handle);
        self.leave_overlay(origin, outcome);
        Ok(())
    }

    fn lifecycle_event(&mut self, frame: FrameId, event: FrameLifecycle) -> Result<()> {
        match event {
            FrameLifecycle::Ready => self.frame_loaded(frame),
        }
    }

    fn close_surface(&mut self, frame: FrameId) -> Result<()> {
        let handle = self
            .surfaces
            .surface_of(frame)
            .ok_or(NavError::UnknownFrame(frame.raw()))?;
        if !handle.kind().is_overlay() {
            warn!(%frame, "primary surface cannot be closed from its frame");
            return Ok(());
        }
        self.surfaces.close(handle, &mut self.effects);
        Ok(())
    }
}

/// Programmatic navigation builder, relative to the current route.
///
/// ```ignore
/// shell.navigation().with_params([("test", "true")]).navigate("/settings")?;
/// ```
pub struct Navigator<'s> {
    shell: &'s mut Shell,
    params: Params,
    with_sync: bool,
}

impl Navigator<'_> {
    /// Attach synced params (`~key=value` in the URL).
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Update URL and chrome but keep the hosted frame.
    pub fn without_sync(mut self) -> Self {
        self.with_sync = false;
        self
    }

    pub fn navigate(self, path: &str) -> Result<Navigated> {
        let base = self.shell.current_path();
        let mut request = Request::new(Location::join(&base, path)?, NavigationSource::Api);
        request.with_sync = self.with_sync;
        request.params = self.params;
        self.shell.run(request)
    }

    pub fn open_as_modal(self, path: &str, options: ModalOptions) -> Result<SurfaceHandle> {
        self.open(path, OverlayOptions::Modal(options))
    }

    pub fn open_as_drawer(self, path: &str, options: DrawerOptions) -> Result<SurfaceHandle> {
        self.open(path, OverlayOptions::Drawer(options))
    }

    pub fn open_as_split_view(self, path: &str, options: SplitViewOptions) -> Result<SurfaceHandle> {
        self.open(path, OverlayOptions::SplitView(options))
    }

    fn open(self, path: &str, options: OverlayOptions) -> Result<SurfaceHandle> {
        let base = self.shell.current_path();
        self.shell.open_overlay(path, options, &base, self.params)
    }
}

