//! Arena-backed navigation node tree.
//!
//! Nodes are addressed by stable [`NodeId`]s. Children supplied lazily by a
//! [`ChildrenProvider`] are appended to the arena when first needed, so ids
//! handed out earlier stay valid. Below a dynamic segment the provider runs
//! once per set of bound path params and each set keeps its own child ids.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use portico_config::NodeConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{NavError, Result};
use crate::toggles::{FeatureToggles, ToggleCondition};

/// Path params bound by dynamic segments, and synced params.
pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Supplies the children of a node on first use.
pub trait ChildrenProvider {
    fn children(&mut self, node: &Node, params: &Params) -> Vec<NodeConfig>;
}

impl<F> ChildrenProvider for F
where
    F: FnMut(&Node, &Params) -> Vec<NodeConfig>,
{
    fn children(&mut self, node: &Node, params: &Params) -> Vec<NodeConfig> {
        self(node, params)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    /// Configured children followed by the provided set currently bound.
    children: Vec<NodeId>,
    /// Number of children that came from configuration.
    configured: usize,
    provider: Option<String>,
    /// Provided children per bound path params.
    provided: HashMap<Params, Vec<NodeId>>,
    toggles: Vec<ToggleCondition>,
    config: NodeConfig,
    depth: usize,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Node configuration; `children` is always empty here, use the tree.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn segment(&self) -> &str {
        &self.config.path_segment
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn view_url(&self) -> Option<&str> {
        self.config.view_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Name of the path param bound by a dynamic segment.
    pub fn param_name(&self) -> Option<&str> {
        self.config.path_segment.strip_prefix(':')
    }

    pub fn toggle_conditions(&self) -> &[ToggleCondition] {
        &self.toggles
    }

    pub fn keeps_selection(&self) -> bool {
        self.config.keep_selected_for_children || self.config.tab_nav
    }

    /// Configured test id, or `<segment>_<label>` lowercased without spaces.
    pub fn test_id(&self) -> String {
        match &self.config.test_id {
            Some(id) => id.clone(),
            None => format!("{}_{}", self.config.path_segment, self.config.label)
                .to_lowercase()
                .replace(' ', ""),
        }
    }
}

pub struct NodeTree {
    nodes: Vec<Node>,
    root: NodeId,
    providers: HashMap<String, Box<dyn ChildrenProvider>>,
}

impl fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes", &self.nodes.len())
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NodeTree {
    /// Build a tree below a synthetic root from top-level node configs.
    pub fn from_config(nodes: &[NodeConfig]) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            providers: HashMap::new(),
        };
        tree.load(nodes)?;
        Ok(tree)
    }

    /// Replace all nodes, keeping registered children providers.
    pub fn rebuild(&mut self, nodes: &[NodeConfig]) -> Result<()> {
        let mut fresh = Self::from_config(nodes)?;
        fresh.providers = std::mem::take(&mut self.providers);
        *self = fresh;
        Ok(())
    }

    fn load(&mut self, nodes: &[NodeConfig]) -> Result<()> {
        let root_config = NodeConfig {
            children: nodes.to_vec(),
            ..NodeConfig::default()
        };
        self.nodes.clear();
        self.root = self.insert(None, root_config)?;
        debug!(nodes = self.nodes.len(), "navigation tree built");
        Ok(())
    }

    fn insert(&mut self, parent: Option<NodeId>, mut config: NodeConfig) -> Result<NodeId> {
        let id = NodeId(self.nodes.len() as u32);
        let depth = parent.map_or(0, |p| self.nodes[p.index()].depth + 1);
        let children = std::mem::take(&mut config.children);

        if parent.is_some() && config.path_segment.trim().is_empty() {
            return Err(NavError::InvalidConfig(format!(
                "node {:?} below {} has an empty pathSegment",
                config.label,
                self.path_of(parent.unwrap_or(self.root), &Params::new())
            )));
        }
        if let Some(default) = &config.default_child_node {
            if config.children_provider.is_none()
                && !children.iter().any(|c| &c.path_segment == default)
            {
                return Err(NavError::InvalidConfig(format!(
                    "defaultChildNode {default:?} of {:?} is not one of its children",
                    config.path_segment
                )));
            }
        }

        let toggles = config
            .visible_for_feature_toggles
            .iter()
            .filter_map(|raw| ToggleCondition::parse(raw))
            .collect();
        self.nodes.push(Node {
            id,
            parent,
            children: Vec::new(),
            configured: 0,
            provider: config.children_provider.clone(),
            provided: HashMap::new(),
            toggles,
            config,
            depth,
        });
        self.insert_children(id, children)?;
        self.nodes[id.index()].configured = self.nodes[id.index()].children.len();
        Ok(id)
    }

    fn insert_children(&mut self, parent: NodeId, children: Vec<NodeConfig>) -> Result<Vec<NodeId>> {
        {
            let mut seen = HashSet::new();
            for child in &children {
                // Toggle-gated siblings may share a segment; only one is visible at a time.
                let key = (&child.path_segment, &child.visible_for_feature_toggles);
                if !seen.insert(key) {
                    return Err(NavError::InvalidConfig(format!(
                        "duplicate pathSegment {:?} below {}",
                        child.path_segment,
                        self.path_of(parent, &Params::new())
                    )));
                }
            }
        }

        let mut ids = Vec::with_capacity(children.len());
        for child in children {
            let child_id = self.insert(Some(parent), child)?;
            self.nodes[parent.index()].children.push(child_id);
            ids.push(child_id);
        }
        Ok(ids)
    }

    pub fn register_provider(&mut self, name: impl Into<String>, provider: Box<dyn ChildrenProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Path params of the dynamic segments from the root down to `id`.
    fn bound_params(&self, id: NodeId, params: &Params) -> Params {
        self.ancestors(id)
            .into_iter()
            .filter_map(|n| {
                let name = self.node(n).param_name()?;
                params.get(name).map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// Make the provided children for `params` current, calling the node's
    /// children provider if this param set has not been seen yet.
    pub fn ensure_children(&mut self, id: NodeId, params: &Params) -> Result<()> {
        let Some(name) = self.nodes[id.index()].provider.clone() else {
            return Ok(());
        };
        let key = self.bound_params(id, params);
        if self.bind(id, &key) {
            return Ok(());
        }

        let mut provider = self
            .providers
            .remove(&name)
            .ok_or_else(|| NavError::UnknownHook(name.clone()))?;
        let configs = provider.children(&self.nodes[id.index()], params);
        self.providers.insert(name.clone(), provider);

        let configured = self.nodes[id.index()].configured;
        self.nodes[id.index()].children.truncate(configured);
        let attached = self.attach_children(id, configs)?;
        trace!(%id, provider = %name, params = ?key, attached = attached.len(), "lazy children attached");
        self.nodes[id.index()].provided.insert(key, attached);
        Ok(())
    }

    /// Switch `id` to children already provided for `params`. Returns false
    /// when none were provided for them.
    pub fn bind(&mut self, id: NodeId, params: &Params) -> bool {
        let key = self.bound_params(id, params);
        let node = &mut self.nodes[id.index()];
        let Some(set) = node.provided.get(&key) else {
            return false;
        };
        if node.children[node.configured..] != set[..] {
            let set = set.clone();
            node.children.truncate(node.configured);
            node.children.extend(set);
        }
        true
    }

    /// Append children to a node. Existing ids are unaffected; when any child
    /// is rejected nothing is attached.
    pub fn attach_children(&mut self, parent: NodeId, children: Vec<NodeConfig>) -> Result<Vec<NodeId>> {
        let arena = self.nodes.len();
        let attached = self.nodes[parent.index()].children.len();
        self.insert_children(parent, children).inspect_err(|_| {
            self.nodes.truncate(arena);
            self.nodes[parent.index()].children.truncate(attached);
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// All attached children in display order, regardless of visibility.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Whether the node has a provider that has not run yet.
    pub fn has_pending_children(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.provider.is_some() && node.provided.is_empty()
    }

    /// Children that may be navigated to under the active toggles.
    pub fn routable_children<'a>(
        &'a self,
        id: NodeId,
        toggles: &'a FeatureToggles,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(move |child| toggles.satisfies(&self.node(*child).toggles))
    }

    /// Ordered, currently visible children: toggle-gated and not hidden from nav.
    pub fn resolve_children(&self, id: NodeId, toggles: &FeatureToggles) -> Vec<NodeId> {
        self.routable_children(id, toggles)
            .filter(|child| !self.node(*child).config.hide_from_nav)
            .collect()
    }

    /// Child matching a URL segment; static segments win over dynamic ones.
    pub fn match_child(&self, id: NodeId, segment: &str, toggles: &FeatureToggles) -> Option<NodeId> {
        let mut dynamic = None;
        for child in self.routable_children(id, toggles) {
            let node = self.node(child);
            if node.segment() == segment {
                return Some(child);
            }
            if dynamic.is_none() && node.param_name().is_some() {
                dynamic = Some(child);
            }
        }
        dynamic
    }

    /// One default-child step: the configured default child, else the first visible child.
    pub fn default_child(&self, id: NodeId, toggles: &FeatureToggles) -> Option<NodeId> {
        let node = self.node(id);
        if let Some(default) = &node.config.default_child_node {
            if let Some(child) = self
                .routable_children(id, toggles)
                .find(|c| self.node(*c).segment() == default)
            {
                return Some(child);
            }
        }
        self.resolve_children(id, toggles)
            .into_iter()
            .next()
            .or_else(|| self.routable_children(id, toggles).next())
    }

    /// Follow the default-child chain from `id` to a node with a view.
    ///
    /// Stops early at link nodes, which the resolver turns into redirects.
    pub fn find_default_child(&mut self, id: NodeId, toggles: &FeatureToggles, params: &Params) -> Result<NodeId> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            let node = self.node(current);
            if node.view_url().is_some() || node.config.link.is_some() {
                return Ok(current);
            }
            if !visited.insert(current) {
                return Err(NavError::CyclicDefaultChild(self.path_of(id, params)));
            }
            self.ensure_children(current, params)?;
            current = self
                .default_child(current, toggles)
                .ok_or_else(|| NavError::NoResolvableLeaf(self.path_of(id, params)))?;
        }
    }

    /// Chain from the root to `id`, both included.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    /// Absolute path of a node, with dynamic segments filled from `params`.
    pub fn path_of(&self, id: NodeId, params: &Params) -> String {
        let segments: Vec<String> = self
            .ancestors(id)
            .into_iter()
            .skip(1)
            .map(|n| {
                let node = self.node(n);
                match node.param_name().and_then(|name| params.get(name)) {
                    Some(value) => urlencoding::encode(value).into_owned(),
                    None => node.segment().to_string(),
                }
            })
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// Look up a node by its configured segments (`/projects/:projectId`), ignoring toggles.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(self.root, |current, segment| {
                self.node(current)
                    .children
                    .iter()
                    .copied()
                    .find(|c| self.node(*c).segment() == segment)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<NodeConfig> {
        vec![
            NodeConfig::new("overview", "Overview").with_view_url("/overview.html"),
            NodeConfig::new("projects", "Projects")
                .with_view_url("/projects.html")
                .with_children(vec![NodeConfig::new(":projectId", "Project")
                    .with_view_url("/project.html#/:projectId")
                    .with_children(vec![
                        NodeConfig::new("dps", "Default Child node Example")
                            .with_default_child("dps2")
                            .with_children(vec![
                                NodeConfig::new("dps1", "First Child").with_view_url("/dps1.html"),
                                NodeConfig::new("dps2", "Second Child").with_view_url("/dps2.html"),
                            ]),
                        NodeConfig::new("emptyViewUrl", "Empty viewUrl node"),
                        NodeConfig::new("settings_ft", "Project Settings 2")
                            .with_view_url("/ft.html")
                            .with_feature_toggles(["ft1"]),
                        NodeConfig {
                            hide_from_nav: true,
                            ..NodeConfig::new("hidden", "Hidden").with_view_url("/hidden.html")
                        },
                    ])]),
        ]
    }

    #[test]
    fn builds_with_stable_ids() {
        let tree = NodeTree::from_config(&sample()).unwrap();
        let dps = tree.lookup("/projects/:projectId/dps").unwrap();
        assert_eq!(tree.node(dps).label(), "Default Child node Example");
        assert_eq!(tree.ancestors(dps).len(), 4);
        assert!(tree.is_ancestor_or_self(tree.lookup("/projects").unwrap(), dps));
    }

    #[test]
    fn default_child_chain_reaches_leaf() {
        let mut tree = NodeTree::from_config(&sample()).unwrap();
        let toggles = FeatureToggles::default();
        let dps = tree.lookup("/projects/:projectId/dps").unwrap();
        let leaf = tree.find_default_child(dps, &toggles, &Params::new()).unwrap();
        assert_eq!(tree.node(leaf).segment(), "dps2");

        // The root falls back to its first visible child.
        let root = tree.root();
        let first = tree.find_default_child(root, &toggles, &Params::new()).unwrap();
        assert_eq!(tree.node(first).segment(), "overview");
    }

    #[test]
    fn empty_node_has_no_resolvable_leaf() {
        let mut tree = NodeTree::from_config(&sample()).unwrap();
        let empty = tree.lookup("/projects/:projectId/emptyViewUrl").unwrap();
        let mut params = Params::new();
        params.insert("projectId".into(), "pr2".into());
        let err = tree
            .find_default_child(empty, &FeatureToggles::default(), &params)
            .unwrap_err();
        assert!(matches!(err, NavError::NoResolvableLeaf(path) if path == "/projects/pr2/emptyViewUrl"));
    }

    #[test]
    fn visibility_respects_toggles_and_hide_from_nav() {
        let tree = NodeTree::from_config(&sample()).unwrap();
        let project = tree.lookup("/projects/:projectId").unwrap();

        let labels = |toggles: &FeatureToggles| -> Vec<String> {
            tree.resolve_children(project, toggles)
                .into_iter()
                .map(|c| tree.node(c).label().to_string())
                .collect()
        };
        assert!(!labels(&FeatureToggles::default()).contains(&"Project Settings 2".to_string()));
        assert!(labels(&FeatureToggles::new(["ft1"])).contains(&"Project Settings 2".to_string()));
        assert!(!labels(&FeatureToggles::default()).contains(&"Hidden".to_string()));

        // Hidden nodes are still routable.
        assert!(tree.match_child(project, "hidden", &FeatureToggles::default()).is_some());
    }

    #[test]
    fn static_segment_beats_dynamic() {
        let tree = NodeTree::from_config(&[NodeConfig::new("projects", "Projects").with_children(vec![
            NodeConfig::new(":projectId", "Project").with_view_url("/p.html"),
            NodeConfig::new("new", "New Project").with_view_url("/new.html"),
        ])])
        .unwrap();
        let projects = tree.lookup("/projects").unwrap();
        let toggles = FeatureToggles::default();
        let new = tree.match_child(projects, "new", &toggles).unwrap();
        assert_eq!(tree.node(new).label(), "New Project");
        let dynamic = tree.match_child(projects, "pr7", &toggles).unwrap();
        assert_eq!(tree.node(dynamic).param_name(), Some("projectId"));
    }

    #[test]
    fn rejects_unknown_default_child_and_duplicates() {
        let bad_default = NodeConfig::new("a", "A")
            .with_default_child("missing")
            .with_children(vec![NodeConfig::new("b", "B").with_view_url("/b")]);
        assert!(matches!(
            NodeTree::from_config(&[bad_default]),
            Err(NavError::InvalidConfig(_))
        ));

        let duplicate = vec![
            NodeConfig::new("a", "A").with_view_url("/a"),
            NodeConfig::new("a", "A again").with_view_url("/a2"),
        ];
        assert!(matches!(
            NodeTree::from_config(&duplicate),
            Err(NavError::InvalidConfig(_))
        ));
    }

    #[test]
    fn lazy_children_attach_without_moving_ids() {
        let mut tree = NodeTree::from_config(&[NodeConfig {
            children_provider: Some("projects".into()),
            ..NodeConfig::new("projects", "Projects").with_view_url("/projects.html")
        }])
        .unwrap();
        tree.register_provider(
            "projects",
            Box::new(|_node: &Node, _params: &Params| {
                vec![NodeConfig::new("pr1", "Project One").with_view_url("/pr1.html")]
            }),
        );

        let projects = tree.lookup("/projects").unwrap();
        assert!(tree.has_pending_children(projects));
        tree.ensure_children(projects, &Params::new()).unwrap();
        assert!(!tree.has_pending_children(projects));
        assert_eq!(tree.lookup("/projects"), Some(projects));
        assert!(tree.lookup("/projects/pr1").is_some());

        // A second call does not attach twice.
        tree.ensure_children(projects, &Params::new()).unwrap();
        assert_eq!(tree.children(projects).len(), 1);
    }

    #[test]
    fn provided_children_follow_bound_params() {
        let mut tree = NodeTree::from_config(&[NodeConfig::new("lp", "Lazy Projects").with_children(vec![
            NodeConfig {
                children_provider: Some("perProject".into()),
                ..NodeConfig::new(":pid", "Project").with_view_url("/p.html#/:pid")
            },
        ])])
        .unwrap();
        tree.register_provider(
            "perProject",
            Box::new(|_node: &Node, params: &Params| {
                let pid = params.get("pid").cloned().unwrap_or_default();
                vec![NodeConfig::new(format!("only-{pid}"), "Only").with_view_url("/only.html")]
            }),
        );
        let toggles = FeatureToggles::default();
        let project = tree.lookup("/lp/:pid").unwrap();
        let bound = |pid: &str| Params::from([("pid".to_string(), pid.to_string())]);

        tree.ensure_children(project, &bound("pr1")).unwrap();
        let pr1 = tree.match_child(project, "only-pr1", &toggles).unwrap();
        tree.ensure_children(project, &bound("pr2")).unwrap();
        assert!(tree.match_child(project, "only-pr1", &toggles).is_none());
        assert!(tree.match_child(project, "only-pr2", &toggles).is_some());
        assert_eq!(tree.children(project).len(), 1);

        // Switching back reuses the ids handed out for pr1.
        tree.ensure_children(project, &bound("pr1")).unwrap();
        assert_eq!(tree.match_child(project, "only-pr1", &toggles), Some(pr1));
    }

    #[test]
    fn rejected_batch_attaches_nothing_and_retries() {
        let mut tree = NodeTree::from_config(&[NodeConfig {
            children_provider: Some("flaky".into()),
            ..NodeConfig::new("projects", "Projects").with_view_url("/projects.html")
        }])
        .unwrap();
        let mut calls = 0;
        tree.register_provider(
            "flaky",
            Box::new(move |_node: &Node, _params: &Params| {
                calls += 1;
                let mut children = vec![NodeConfig::new("pr1", "Project One").with_view_url("/pr1.html")];
                if calls == 1 {
                    children.push(NodeConfig::new("pr1", "Project One again").with_view_url("/pr1b.html"));
                }
                children
            }),
        );
        let projects = tree.lookup("/projects").unwrap();
        let before = tree.len();

        assert!(matches!(
            tree.ensure_children(projects, &Params::new()),
            Err(NavError::InvalidConfig(_))
        ));
        assert_eq!(tree.len(), before);
        assert!(tree.children(projects).is_empty());
        assert!(tree.has_pending_children(projects));

        tree.ensure_children(projects, &Params::new()).unwrap();
        assert_eq!(tree.children(projects).len(), 1);
        assert!(!tree.has_pending_children(projects));
    }

    #[test]
    fn default_test_id() {
        let tree = NodeTree::from_config(&[NodeConfig::new("tabNav", "Horizontal Navigation Example")]).unwrap();
        let node = tree.lookup("/tabNav").unwrap();
        assert_eq!(tree.node(node).test_id(), "tabnav_horizontalnavigationexample");
    }
}
