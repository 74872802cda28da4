//! Navigation chrome derived from the resolved route.
//!
//! [`ChromeState::derive`] is a pure function of the tree, the active
//! toggles, the current route, the configuration snapshot and the small
//! amount of UI state the user controls directly ([`ChromeUi`]: open
//! categories, viewport width, semi-collapse).

use std::collections::BTreeSet;

use portico_config::{ProfileType, ResponsiveNavigation, ShellConfig};
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

use crate::route::ResolvedRoute;
use crate::toggles::FeatureToggles;
use crate::tree::{NodeId, NodeTree, Params};

pub const MOBILE_SUFFIX: &str = "-mobile";
pub const MORE_LABEL: &str = "More";

const DEFAULT_VIEWPORT_PX: f32 = 1280.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItem {
    pub node: NodeId,
    pub label: String,
    pub path: String,
    pub test_id: String,
    pub icon: Option<String>,
    pub show_label: bool,
    pub selected: bool,
    pub open_in_modal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub key: String,
    pub label: String,
    pub test_id: String,
    pub icon: Option<String>,
    pub collapsible: bool,
    pub open: bool,
    pub items: Vec<NavItem>,
}

impl Category {
    pub fn selected(&self) -> bool {
        self.items.iter().any(|item| item.selected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SideNavEntry {
    Item(NavItem),
    Category(Category),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideNav {
    /// Node whose children are listed.
    pub parent: NodeId,
    pub entries: Vec<SideNavEntry>,
    /// At most one collapsible category open at a time.
    pub accordion: bool,
    /// Hidden behind the burger button on narrow viewports.
    pub behind_burger: bool,
    pub semi_collapsed: bool,
}

impl SideNav {
    pub fn items(&self) -> impl Iterator<Item = &NavItem> {
        self.entries.iter().flat_map(|entry| match entry {
            SideNavEntry::Item(item) => std::slice::from_ref(item).iter(),
            SideNavEntry::Category(category) => category.items.iter(),
        })
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.entries.iter().filter_map(|entry| match entry {
            SideNavEntry::Category(category) => Some(category),
            SideNavEntry::Item(_) => None,
        })
    }

    pub fn category(&self, test_id: &str) -> Option<&Category> {
        self.categories().find(|c| c.test_id == test_id)
    }

    pub fn selected(&self) -> Option<&NavItem> {
        self.items().find(|item| item.selected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TabEntry {
    Tab(NavItem),
    /// Category rendered as a dropdown.
    Group(Category),
}

impl TabEntry {
    pub fn label(&self) -> &str {
        match self {
            TabEntry::Tab(item) => &item.label,
            TabEntry::Group(group) => &group.label,
        }
    }

    pub fn selected(&self) -> bool {
        match self {
            TabEntry::Tab(item) => item.selected,
            TabEntry::Group(group) => group.selected(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabNav {
    pub node: NodeId,
    pub tabs: Vec<TabEntry>,
    /// Entries that did not fit, in display order.
    pub more: Vec<TabEntry>,
    pub more_selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileMenu {
    Simple,
    Fiori3,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChromeState {
    pub top_nav: Vec<NavItem>,
    pub side_nav: Option<SideNav>,
    pub tab_nav: Option<TabNav>,
    pub global_nav: Option<Vec<NavItem>>,
    pub profile: ProfileMenu,
    pub footer_text: String,
    pub mobile: bool,
}

impl ChromeState {
    pub fn selected_top(&self) -> Option<&NavItem> {
        self.top_nav.iter().find(|item| item.selected)
    }

    pub fn selected_side(&self) -> Option<&NavItem> {
        self.side_nav.as_ref().and_then(SideNav::selected)
    }

    /// Any nav item (top, side, tab, global) by test id.
    pub fn item(&self, test_id: &str) -> Option<&NavItem> {
        let side = self.side_nav.iter().flat_map(SideNav::items);
        let tabs = self.tab_nav.iter().flat_map(|nav| {
            nav.tabs.iter().chain(&nav.more).flat_map(|entry| match entry {
                TabEntry::Tab(item) => std::slice::from_ref(item).iter(),
                TabEntry::Group(group) => group.items.iter(),
            })
        });
        let global = self.global_nav.iter().flatten();
        self.top_nav
            .iter()
            .chain(side)
            .chain(tabs)
            .chain(global)
            .find(|item| item.test_id == test_id)
    }

    /// Collapsible side-nav category holding the selected item while closed.
    pub fn hidden_selection(&self) -> Option<(NodeId, String)> {
        let side = self.side_nav.as_ref()?;
        side.categories()
            .find(|c| c.collapsible && !c.open && c.selected())
            .map(|c| (side.parent, c.key.clone()))
    }
}

/// User-controlled chrome state.
#[derive(Debug, Clone)]
pub struct ChromeUi {
    pub viewport_width: f32,
    pub semi_collapsed: bool,
    open_categories: BTreeSet<(NodeId, String)>,
}

impl Default for ChromeUi {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_PX,
            semi_collapsed: false,
            open_categories: BTreeSet::new(),
        }
    }
}

impl ChromeUi {
    pub fn is_open(&self, parent: NodeId, key: &str) -> bool {
        self.open_categories
            .iter()
            .any(|(p, k)| *p == parent && k == key)
    }

    /// Open or close a category. In accordion mode opening one closes the
    /// others of the same side nav.
    pub fn set_open(&mut self, parent: NodeId, key: &str, open: bool, accordion: bool) {
        if open {
            if accordion {
                self.open_categories.retain(|(p, _)| *p != parent);
            }
            self.open_categories.insert((parent, key.to_string()));
        } else {
            self.open_categories.remove(&(parent, key.to_string()));
        }
    }

    /// Flip a category; returns the new open state.
    pub fn toggle(&mut self, parent: NodeId, key: &str, accordion: bool) -> bool {
        let open = !self.is_open(parent, key);
        self.set_open(parent, key, open, accordion);
        open
    }

    pub fn reset_categories(&mut self) {
        self.open_categories.clear();
    }
}

/// Everything the chrome is derived from.
pub struct ChromeInput<'a> {
    pub tree: &'a NodeTree,
    pub toggles: &'a FeatureToggles,
    pub route: Option<&'a ResolvedRoute>,
    pub config: &'a ShellConfig,
    pub ui: &'a ChromeUi,
}

impl ChromeInput<'_> {
    fn params(&self) -> Params {
        self.route
            .map(|route| route.path_params.clone())
            .unwrap_or_default()
    }

    fn mobile(&self) -> bool {
        self.ui.viewport_width < self.config.settings.layout.mobile_breakpoint_px
    }

    fn global_nav_enabled(&self) -> bool {
        self.config.settings.global_side_navigation && self.config.settings.experimental.global_nav
    }

    fn semi_collapsed(&self) -> bool {
        self.ui.semi_collapsed
            && self.config.settings.responsive_navigation == ResponsiveNavigation::SemiCollapsible
    }

    fn selected(&self, node: NodeId) -> bool {
        self.route.is_some_and(|route| route.contains(node))
    }

    fn item(&self, node: NodeId, params: &Params) -> NavItem {
        let n = self.tree.node(node);
        let config = n.config();
        NavItem {
            node,
            label: n.label().to_string(),
            path: self.tree.path_of(node, params),
            test_id: n.test_id(),
            icon: config.icon.clone(),
            show_label: config.show_label || config.icon.is_none(),
            selected: self.selected(node),
            open_in_modal: config.modal_options().is_some(),
        }
    }

    /// Children of `parent` as items, with category members grouped under
    /// the first occurrence of their category.
    fn grouped(&self, parent: NodeId, params: &Params) -> Vec<SideNavEntry> {
        let mut entries: Vec<SideNavEntry> = Vec::new();
        for child in self.tree.resolve_children(parent, self.toggles) {
            let item = self.item(child, params);
            let Some(category) = &self.tree.node(child).config().category else {
                entries.push(SideNavEntry::Item(item));
                continue;
            };
            let key = category.key();
            let existing = entries.iter_mut().find_map(|entry| match entry {
                SideNavEntry::Category(c) if c.key == key => Some(c),
                _ => None,
            });
            match existing {
                Some(group) => {
                    if let Some(details) = category.details() {
                        group.collapsible |= details.collapsible;
                        group.icon = group.icon.take().or_else(|| details.icon.clone());
                    }
                    group.items.push(item);
                }
                None => {
                    let details = category.details();
                    let label = category.label().to_string();
                    let test_id = details
                        .and_then(|d| d.test_id.clone())
                        .unwrap_or_else(|| label.to_lowercase().replace(' ', ""));
                    entries.push(SideNavEntry::Category(Category {
                        key: key.to_string(),
                        label,
                        test_id,
                        icon: details.and_then(|d| d.icon.clone()),
                        collapsible: details.is_some_and(|d| d.collapsible),
                        open: false,
                        items: vec![item],
                    }));
                }
            }
        }
        for entry in &mut entries {
            if let SideNavEntry::Category(c) = entry {
                c.open = !c.collapsible || self.ui.is_open(parent, &c.key);
            }
        }
        entries
    }

    fn top_nav(&self, params: &Params) -> Vec<NavItem> {
        let root = self.tree.root();
        let global = self.global_nav_enabled();
        let mobile = self.mobile();
        self.tree
            .resolve_children(root, self.toggles)
            .into_iter()
            .filter(|child| !(global && self.tree.node(*child).config().global_nav))
            .map(|child| {
                let mut item = self.item(child, params);
                if mobile {
                    item.test_id.push_str(MOBILE_SUFFIX);
                    item.show_label = true;
                }
                item
            })
            .collect()
    }

    fn global_nav(&self, params: &Params) -> Option<Vec<NavItem>> {
        if !self.global_nav_enabled() {
            return None;
        }
        let root = self.tree.root();
        Some(
            self.tree
                .resolve_children(root, self.toggles)
                .into_iter()
                .filter(|child| self.tree.node(*child).config().global_nav)
                .map(|child| self.item(child, params))
                .collect(),
        )
    }

    /// Node whose children the side nav lists for `route`, if any.
    ///
    /// The chain is cut at the first node that keeps its selection for
    /// descendants. If the last remaining node keeps selection or has no
    /// visible children, its siblings are listed; otherwise its children.
    pub fn side_nav_parent(&self, route: &ResolvedRoute) -> Option<NodeId> {
        let tree = self.tree;
        let cut = route
            .chain
            .iter()
            .skip(1)
            .position(|n| tree.node(*n).keeps_selection())
            .map_or(route.chain.len(), |p| p + 2);
        let last = *route.chain[..cut].last()?;
        let parent = if tree.node(last).keeps_selection()
            || tree.resolve_children(last, self.toggles).is_empty()
        {
            tree.parent(last)?
        } else {
            last
        };
        (parent != tree.root()).then_some(parent)
    }

    fn side_nav(&self, params: &Params) -> Option<SideNav> {
        let route = self.route?;
        if self.tree.node(route.leaf()).config().hide_side_nav {
            return None;
        }
        let parent = self.side_nav_parent(route)?;
        let accordion = self
            .tree
            .node(parent)
            .config()
            .side_nav_accordion_mode
            .unwrap_or(self.config.navigation.defaults.side_nav_accordion_mode);
        Some(SideNav {
            parent,
            entries: self.grouped(parent, params),
            accordion,
            behind_burger: self.mobile(),
            semi_collapsed: self.semi_collapsed(),
        })
    }

    fn tab_width(&self, label: &str) -> f32 {
        let layout = &self.config.settings.layout;
        label.graphemes(true).count() as f32 * layout.tab_char_width_px + layout.tab_padding_px
    }

    fn tab_nav(&self, params: &Params, side_nav: Option<&SideNav>) -> Option<TabNav> {
        let route = self.route?;
        let host = *route
            .chain
            .iter()
            .find(|n| self.tree.node(**n).config().tab_nav)?;

        let entries: Vec<TabEntry> = self
            .grouped(host, params)
            .into_iter()
            .map(|entry| match entry {
                SideNavEntry::Item(item) => TabEntry::Tab(item),
                SideNavEntry::Category(group) => TabEntry::Group(group),
            })
            .collect();

        let layout = &self.config.settings.layout;
        let side_width = match side_nav {
            Some(nav) if !nav.behind_burger && nav.semi_collapsed => layout.side_nav_collapsed_width_px,
            Some(nav) if !nav.behind_burger => layout.side_nav_width_px,
            _ => 0.0,
        };
        let available = self.ui.viewport_width - side_width;
        let (tabs, more) = split_overflow(entries, available, layout.more_button_width_px, |entry| {
            self.tab_width(entry.label())
        });
        let more_selected = more.iter().any(TabEntry::selected);
        Some(TabNav {
            node: host,
            tabs,
            more,
            more_selected,
        })
    }
}

/// Keep leading entries that fit into `available`; everything from the first
/// entry that does not fit moves into the overflow list, order preserved.
fn split_overflow<T>(
    entries: Vec<T>,
    available: f32,
    more_width: f32,
    width: impl Fn(&T) -> f32,
) -> (Vec<T>, Vec<T>) {
    let total: f32 = entries.iter().map(&width).sum();
    if total <= available {
        return (entries, Vec::new());
    }
    let budget = available - more_width;
    let mut used = 0.0;
    let mut fits = 0;
    for entry in &entries {
        used += width(entry);
        if used > budget {
            break;
        }
        fits += 1;
    }
    let mut visible = entries;
    let more = visible.split_off(fits);
    (visible, more)
}

impl ChromeState {
    pub fn derive(input: &ChromeInput<'_>) -> Self {
        let params = input.params();
        let side_nav = input.side_nav(&params);
        let tab_nav = input.tab_nav(&params, side_nav.as_ref());
        let settings = &input.config.settings;
        let profile = if settings.profile_type == ProfileType::Fiori3 && settings.experimental.profile_menu_fiori3 {
            ProfileMenu::Fiori3
        } else {
            ProfileMenu::Simple
        };
        let footer_text = settings
            .side_nav_footer_text
            .clone()
            .unwrap_or_else(|| format!("Portico Client: {}", env!("CARGO_PKG_VERSION")));

        ChromeState {
            top_nav: input.top_nav(&params),
            side_nav,
            tab_nav,
            global_nav: input.global_nav(&params),
            profile,
            footer_text,
            mobile: input.mobile(),
        }
    }
}

/// Coalesces viewport resize events; the last width wins once the delay
/// has passed without another resize.
#[derive(Debug, Clone, Default)]
pub struct ResizeDebouncer {
    pending: Option<(f32, u64)>,
}

impl ResizeDebouncer {
    pub fn resize(&mut self, width: f32, now_ms: u64, delay_ms: u64) {
        self.pending = Some((width, now_ms + delay_ms));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Width to apply, once due.
    pub fn tick(&mut self, now_ms: u64) -> Option<f32> {
        match self.pending {
            Some((width, due)) if now_ms >= due => {
                self.pending = None;
                Some(width)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Location, PathResolver, Resolution};
    use portico_config::{CategoryConfig, CategoryDetails, NodeConfig};

    fn collapsible(label: &str) -> CategoryConfig {
        CategoryConfig::Detailed(CategoryDetails {
            label: label.to_string(),
            collapsible: true,
            ..CategoryDetails::default()
        })
    }

    fn tree() -> NodeTree {
        NodeTree::from_config(&[
            NodeConfig::new("overview", "Overview").with_view_url("/overview.html"),
            NodeConfig::new("projects", "Projects")
                .with_view_url("/projects.html")
                .with_children(vec![
                    NodeConfig::new("pr1", "Project One")
                        .with_view_url("/project.html")
                        .with_children(vec![
                            NodeConfig::new("settings", "Settings").with_view_url("/settings.html"),
                            NodeConfig {
                                category: Some(collapsible("User Management")),
                                ..NodeConfig::new("users", "Users").with_view_url("/users.html")
                            },
                            NodeConfig::new("groups", "Groups")
                                .with_view_url("/groups.html")
                                .with_category("User Management"),
                            NodeConfig {
                                category: Some(collapsible("Misc")),
                                ..NodeConfig::new("misc", "Miscellaneous").with_view_url("/misc.html")
                            },
                            NodeConfig {
                                keep_selected_for_children: true,
                                ..NodeConfig::new("dps", "Default Child")
                                    .with_view_url("/dps.html")
                                    .with_children(vec![
                                        NodeConfig::new("dps1", "First").with_view_url("/dps1.html"),
                                    ])
                            },
                            NodeConfig {
                                tab_nav: true,
                                ..NodeConfig::new("tabs", "Tab Nav").with_children(vec![
                                    NodeConfig::new("a", "Alpha").with_view_url("/a.html"),
                                    NodeConfig::new("b", "Bravo Bravo Bravo").with_view_url("/b.html"),
                                    NodeConfig::new("c", "Charlie Charlie").with_view_url("/c.html"),
                                    NodeConfig::new("d", "Delta").with_view_url("/d.html"),
                                ])
                            },
                        ]),
                ]),
        ])
        .unwrap()
    }

    fn resolve(tree: &mut NodeTree, path: &str) -> ResolvedRoute {
        let toggles = FeatureToggles::default();
        match PathResolver::new(tree, &toggles)
            .resolve(&Location::parse(path, "ft").unwrap())
            .unwrap()
        {
            Resolution::Route(route) => route,
            Resolution::Redirect(to) => panic!("unexpected redirect to {to}"),
        }
    }

    fn derive(tree: &NodeTree, route: &ResolvedRoute, config: &ShellConfig, ui: &ChromeUi) -> ChromeState {
        ChromeState::derive(&ChromeInput {
            tree,
            toggles: &FeatureToggles::default(),
            route: Some(route),
            config,
            ui,
        })
    }

    #[test]
    fn top_level_leaf_has_no_side_nav() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/overview");
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ChromeUi::default());
        assert_eq!(chrome.selected_top().map(|i| i.label.as_str()), Some("Overview"));
        assert!(chrome.side_nav.is_none());
        assert_eq!(chrome.profile, ProfileMenu::Simple);
        assert!(chrome.footer_text.starts_with("Portico Client: "));
    }

    #[test]
    fn keep_selected_for_children_stays_highlighted() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/projects/pr1/dps/dps1");
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ChromeUi::default());
        let side = chrome.side_nav.as_ref().unwrap();
        assert_eq!(tree.node(side.parent).segment(), "pr1");
        assert_eq!(chrome.selected_side().map(|i| i.label.as_str()), Some("Default Child"));
    }

    #[test]
    fn node_with_children_lists_them() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/projects/pr1");
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ChromeUi::default());
        let side = chrome.side_nav.as_ref().unwrap();
        assert_eq!(tree.node(side.parent).segment(), "pr1");
        assert!(chrome.selected_side().is_none());

        let categories: Vec<_> = side.categories().map(|c| c.test_id.as_str()).collect();
        assert_eq!(categories, vec!["usermanagement", "misc"]);
        let users = side.category("usermanagement").unwrap();
        assert!(users.collapsible);
        assert!(!users.open);
        assert_eq!(users.items.len(), 2);
    }

    #[test]
    fn accordion_keeps_one_category_open() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/projects/pr1");
        let pr1 = route.leaf();
        let mut ui = ChromeUi::default();

        ui.toggle(pr1, "User Management", false);
        ui.toggle(pr1, "Misc", false);
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ui);
        assert!(chrome.side_nav.as_ref().unwrap().categories().all(|c| c.open));

        let mut ui = ChromeUi::default();
        ui.toggle(pr1, "User Management", true);
        ui.toggle(pr1, "Misc", true);
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ui);
        let open: Vec<_> = chrome
            .side_nav
            .as_ref()
            .unwrap()
            .categories()
            .filter(|c| c.open)
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(open, vec!["Misc"]);
    }

    #[test]
    fn tabs_overflow_into_more() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/projects/pr1/tabs/d");
        let mut config = ShellConfig::default();
        config.settings.layout.side_nav_width_px = 0.0;
        let mut ui = ChromeUi::default();

        // Alpha 72, Bravo.. 168, Charlie.. 152, Delta 72: 464 in total.
        ui.viewport_width = 500.0;
        let chrome = derive(&tree, &route, &config, &ui);
        let tabs = chrome.tab_nav.as_ref().unwrap();
        assert_eq!(tabs.tabs.len(), 4);
        assert!(tabs.more.is_empty());

        ui.viewport_width = 400.0;
        let chrome = derive(&tree, &route, &config, &ui);
        let tabs = chrome.tab_nav.as_ref().unwrap();
        let visible: Vec<_> = tabs.tabs.iter().map(TabEntry::label).collect();
        let more: Vec<_> = tabs.more.iter().map(TabEntry::label).collect();
        assert_eq!(visible, vec!["Alpha", "Bravo Bravo Bravo"]);
        assert_eq!(more, vec!["Charlie Charlie", "Delta"]);
        assert!(tabs.more_selected);
    }

    #[test]
    fn mobile_suffix_below_breakpoint() {
        let mut tree = tree();
        let route = resolve(&mut tree, "/overview");
        let ui = ChromeUi {
            viewport_width: 400.0,
            ..ChromeUi::default()
        };
        let chrome = derive(&tree, &route, &ShellConfig::default(), &ui);
        assert!(chrome.mobile);
        assert!(chrome.item("overview_overview-mobile").is_some());
    }

    #[test]
    fn debouncer_applies_last_width() {
        let mut debouncer = ResizeDebouncer::default();
        debouncer.resize(800.0, 0, 150);
        debouncer.resize(600.0, 100, 150);
        assert_eq!(debouncer.tick(200), None);
        assert_eq!(debouncer.tick(250), Some(600.0));
        assert_eq!(debouncer.tick(300), None);
    }
}
