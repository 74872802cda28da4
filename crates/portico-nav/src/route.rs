//! Path parsing and resolution against the node tree.

use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

use crate::error::{NavError, Result};
use crate::toggles::FeatureToggles;
use crate::tree::{NodeId, NodeTree, Params};

const BASE: &str = "http://portico.invalid/";

/// Prefix marking query params that are forwarded to the embedded application.
pub const SYNCED_PARAM_PREFIX: char = '~';

/// A parsed shell URL: path segments plus classified query params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub segments: Vec<String>,
    /// `~`-prefixed params with the prefix stripped.
    pub synced: Params,
    /// Values of the feature toggle query param.
    pub toggles: Vec<String>,
    /// Any other structural params.
    pub other: Vec<(String, String)>,
}

impl Location {
    /// Parse an absolute path such as `/projects/pr1?~test=true&ft=ft1`.
    pub fn parse(raw: &str, toggle_param: &str) -> Result<Self> {
        let raw = raw.trim();
        let absolute = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };
        let url = base()?
            .join(&absolute)
            .map_err(|_| NavError::InvalidPath(raw.to_string()))?;
        Ok(Self::from_url(&url, toggle_param))
    }

    /// Resolve `target` against `base_path`: absolute targets start over at
    /// the root, relative ones descend from `base_path` and `..` ascends.
    pub fn resolve(base_path: &str, target: &str, toggle_param: &str) -> Result<Self> {
        if target.starts_with('/') {
            return Self::parse(target, toggle_param);
        }
        let dir = format!("{}/", base_path.trim_end_matches('/'));
        let url = base()?
            .join(&dir)
            .and_then(|base| base.join(target))
            .map_err(|_| NavError::InvalidPath(target.to_string()))?;
        Ok(Self::from_url(&url, toggle_param))
    }

    /// Like [`Location::resolve`] but returns the joined path and its raw
    /// query, so structural params survive for a later parse.
    pub fn join(base_path: &str, target: &str) -> Result<String> {
        if target.starts_with('/') {
            return Ok(target.to_string());
        }
        let dir = format!("{}/", base_path.trim_end_matches('/'));
        let url = base()?
            .join(&dir)
            .and_then(|base| base.join(target))
            .map_err(|_| NavError::InvalidPath(target.to_string()))?;
        Ok(match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        })
    }

    fn from_url(url: &Url, toggle_param: &str) -> Self {
        let segments = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        urlencoding::decode(s)
                            .map(|decoded| decoded.into_owned())
                            .unwrap_or_else(|_| s.to_string())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut synced = Params::new();
        let mut toggles = Vec::new();
        let mut other = Vec::new();
        for (key, value) in url.query_pairs() {
            if let Some(name) = key.strip_prefix(SYNCED_PARAM_PREFIX) {
                synced.insert(name.to_string(), value.into_owned());
            } else if key == toggle_param {
                toggles.push(value.into_owned());
            } else {
                other.push((key.into_owned(), value.into_owned()));
            }
        }

        Self {
            segments,
            synced,
            toggles,
            other,
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

fn base() -> Result<Url> {
    Url::parse(BASE).map_err(|_| NavError::InvalidPath(BASE.to_string()))
}

/// Render a path plus synced params as a shell URL (`/settings?~test=true`).
pub fn format_url(path: &str, synced: &Params) -> String {
    if synced.is_empty() {
        return path.to_string();
    }
    let query: Vec<String> = synced
        .iter()
        .map(|(k, v)| {
            format!(
                "{SYNCED_PARAM_PREFIX}{}={}",
                urlencoding::encode(k),
                urlencoding::encode(v)
            )
        })
        .collect();
    format!("{path}?{}", query.join("&"))
}

/// The outcome of walking a path through the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRoute {
    /// Root to leaf, both included.
    pub chain: Vec<NodeId>,
    /// Canonical path after default-child expansion.
    pub path: String,
    pub path_params: Params,
    pub synced_params: Params,
    /// Trailing segments consumed by a virtual-tree node.
    pub virtual_segments: Vec<String>,
    /// Path that was hit directly before default-child expansion.
    pub expanded_from: Option<String>,
}

impl ResolvedRoute {
    pub fn leaf(&self) -> NodeId {
        self.chain[self.chain.len() - 1]
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.chain.contains(&node)
    }

    pub fn url(&self) -> String {
        format_url(&self.path, &self.synced_params)
    }

    /// Same leaf with the same bound params, ignoring synced params.
    pub fn same_target(&self, other: &ResolvedRoute) -> bool {
        self.leaf() == other.leaf()
            && self.path_params == other.path_params
            && self.virtual_segments == other.virtual_segments
    }

    /// The embedded application address with `:param` tokens substituted.
    pub fn view_url(&self, tree: &NodeTree) -> Option<String> {
        let template = tree.node(self.leaf()).view_url()?;
        let mut url = substitute_params(template, &self.path_params);
        if !self.virtual_segments.is_empty() {
            if !url.ends_with('/') {
                url.push('/');
            }
            url.push_str(&self.virtual_segments.join("/"));
        }
        Some(url)
    }
}

/// Replace `:name` tokens with bound param values; unknown tokens stay as written.
pub fn substitute_params(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(':') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..len];
        match params.get(name) {
            Some(value) if !name.is_empty() => out.push_str(value),
            _ => {
                out.push(':');
                out.push_str(name);
            }
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Result of resolving a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Route(ResolvedRoute),
    /// The path ended on a link node; navigate to this absolute path instead.
    Redirect(String),
}

/// Walks a [`Location`] through the tree under the active toggles.
pub struct PathResolver<'a> {
    tree: &'a mut NodeTree,
    toggles: &'a FeatureToggles,
}

impl<'a> PathResolver<'a> {
    pub fn new(tree: &'a mut NodeTree, toggles: &'a FeatureToggles) -> Self {
        Self { tree, toggles }
    }

    pub fn resolve(&mut self, location: &Location) -> Result<Resolution> {
        let mut current = self.tree.root();
        let mut chain = vec![current];
        let mut params = Params::new();
        let mut virtual_segments = Vec::new();

        for (index, segment) in location.segments.iter().enumerate() {
            self.tree.ensure_children(current, &params)?;
            if self.tree.node(current).config().virtual_tree {
                virtual_segments = location.segments[index..].to_vec();
                break;
            }
            let Some(child) = self.tree.match_child(current, segment, self.toggles) else {
                return Err(NavError::PathNotFound {
                    path: location.path(),
                    matched: self.tree.path_of(current, &params),
                });
            };
            if let Some(name) = self.tree.node(child).param_name() {
                params.insert(name.to_string(), segment.clone());
            }
            chain.push(child);
            current = child;
        }

        if let Some(target) = link_target(self.tree, current, &params) {
            trace!(from = %location.path(), to = %target, "link node redirect");
            return Ok(Resolution::Redirect(target));
        }

        let mut expanded_from = None;
        if virtual_segments.is_empty() && self.tree.node(current).view_url().is_none() {
            let leaf = self.tree.find_default_child(current, self.toggles, &params)?;
            if leaf != current {
                expanded_from = Some(self.tree.path_of(current, &params));
                let below = self.tree.ancestors(leaf);
                let start = below.iter().position(|n| *n == current).map_or(0, |p| p + 1);
                chain.extend_from_slice(&below[start..]);
                current = leaf;
            }
            if let Some(target) = link_target(self.tree, current, &params) {
                return Ok(Resolution::Redirect(target));
            }
        }
        self.tree.ensure_children(current, &params)?;

        let mut path = self.tree.path_of(current, &params);
        for segment in &virtual_segments {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }

        Ok(Resolution::Route(ResolvedRoute {
            chain,
            path,
            path_params: params,
            synced_params: location.synced.clone(),
            virtual_segments,
            expanded_from,
        }))
    }
}

/// Absolute redirect target of a link node. Relative links descend from the
/// node's own path; `..` steps up to its siblings.
pub fn link_target(tree: &NodeTree, node: NodeId, params: &Params) -> Option<String> {
    let link = tree.node(node).config().link.as_deref()?;
    if link.starts_with('/') {
        return Some(link.to_string());
    }
    let base = tree.path_of(node, params);
    Location::resolve(&base, link, "")
        .ok()
        .map(|location| location.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_config::NodeConfig;

    fn tree() -> NodeTree {
        NodeTree::from_config(&[
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
                        NodeConfig {
                            link: Some("../dps/dps1".into()),
                            ..NodeConfig::new("go-relative", "Go to relative path")
                        },
                        NodeConfig {
                            link: Some("/overview".into()),
                            ..NodeConfig::new("go-absolute", "Go to absolute path")
                        },
                        NodeConfig {
                            virtual_tree: true,
                            ..NodeConfig::new("virtual-tree", "Virtual Tree")
                                .with_view_url("/virtual.html")
                        },
                    ])]),
        ])
        .unwrap()
    }

    fn resolve(tree: &mut NodeTree, path: &str) -> Result<Resolution> {
        let toggles = FeatureToggles::default();
        let location = Location::parse(path, "ft")?;
        PathResolver::new(tree, &toggles).resolve(&location)
    }

    fn route(tree: &mut NodeTree, path: &str) -> ResolvedRoute {
        match resolve(tree, path).unwrap() {
            Resolution::Route(route) => route,
            other => panic!("expected route for {path}, got {other:?}"),
        }
    }

    #[test]
    fn parses_query_classes() {
        let location = Location::parse("/settings?~test=true&ft=ft1,ft2&lang=de", "ft").unwrap();
        assert_eq!(location.segments, vec!["settings"]);
        assert_eq!(location.synced.get("test").map(String::as_str), Some("true"));
        assert_eq!(location.toggles, vec!["ft1,ft2"]);
        assert_eq!(location.other, vec![("lang".to_string(), "de".to_string())]);
    }

    #[test]
    fn relative_resolution() {
        let sibling = Location::resolve("/projects/pr2/avengers", "../dps/dps1", "ft").unwrap();
        assert_eq!(sibling.path(), "/projects/pr2/dps/dps1");
        let child = Location::resolve("/projects/pr2", "dps/dps1", "ft").unwrap();
        assert_eq!(child.path(), "/projects/pr2/dps/dps1");
        let absolute = Location::resolve("/projects/pr2", "/settings", "ft").unwrap();
        assert_eq!(absolute.path(), "/settings");

        assert_eq!(
            Location::join("/projects/pr1", "settings_ft?ft=ft1").unwrap(),
            "/projects/pr1/settings_ft?ft=ft1"
        );
        assert_eq!(Location::join("/overview", "..").unwrap(), "/");
    }

    #[test]
    fn binds_dynamic_segments_and_substitutes_view_url() {
        let mut tree = tree();
        let route = route(&mut tree, "/projects/pr1");
        assert_eq!(route.path, "/projects/pr1");
        assert_eq!(route.path_params.get("projectId").map(String::as_str), Some("pr1"));
        assert_eq!(route.view_url(&tree).as_deref(), Some("/project.html#/pr1"));
    }

    #[test]
    fn expands_default_child() {
        let mut tree = tree();
        let route = route(&mut tree, "/projects/pr1/dps");
        assert_eq!(route.path, "/projects/pr1/dps/dps2");
        assert_eq!(route.expanded_from.as_deref(), Some("/projects/pr1/dps"));
        assert_eq!(route.chain.len(), 5);

        let root = self::route(&mut tree, "/");
        assert_eq!(root.path, "/overview");
    }

    #[test]
    fn link_nodes_redirect() {
        let mut tree = tree();
        assert_eq!(
            resolve(&mut tree, "/projects/pr2/go-relative").unwrap(),
            Resolution::Redirect("/projects/pr2/dps/dps1".into())
        );
        assert_eq!(
            resolve(&mut tree, "/projects/pr2/go-absolute").unwrap(),
            Resolution::Redirect("/overview".into())
        );
    }

    #[test]
    fn virtual_tree_passthrough() {
        let mut tree = tree();
        let route = route(&mut tree, "/projects/pr2/virtual-tree/a/b");
        assert_eq!(route.virtual_segments, vec!["a", "b"]);
        assert_eq!(route.path, "/projects/pr2/virtual-tree/a/b");
        assert_eq!(route.view_url(&tree).as_deref(), Some("/virtual.html/a/b"));
    }

    #[test]
    fn unmatched_segments_fail_with_matched_prefix() {
        let mut tree = tree();
        let err = resolve(&mut tree, "/projects/pr1/nope/deeper").unwrap_err();
        match err {
            NavError::PathNotFound { path, matched } => {
                assert_eq!(path, "/projects/pr1/nope/deeper");
                assert_eq!(matched, "/projects/pr1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn formats_synced_params() {
        let mut params = Params::new();
        params.insert("test".into(), "true".into());
        assert_eq!(format_url("/settings", &params), "/settings?~test=true");
        assert_eq!(format_url("/settings", &Params::new()), "/settings");
    }

    #[test]
    fn substitutes_only_known_params() {
        let mut params = Params::new();
        params.insert("projectId".into(), "pr1".into());
        assert_eq!(
            substitute_params("http://localhost:4200/p/:projectId/:unknown", &params),
            "http://localhost:4200/p/pr1/:unknown"
        );
    }
}
