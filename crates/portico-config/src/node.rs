//! Navigation node configuration, as supplied by the host application.

use serde::{Deserialize, Serialize};

use crate::overlay::ModalOptions;

/// One entry in the configured navigation tree.
///
/// Keys follow the camelCase names of the host configuration object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
    /// Segment matched against the URL. A leading `:` makes it a dynamic
    /// segment that binds a path param of the same name.
    pub path_segment: String,
    pub label: String,
    pub icon: Option<String>,
    pub test_id: Option<String>,
    /// Show the label next to the icon in the top navigation.
    pub show_label: bool,
    /// Address of the embedded application. Absent for structural nodes.
    pub view_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeConfig>,
    /// Name of a registered provider that supplies children on first use.
    pub children_provider: Option<String>,
    #[serde(alias = "defaultChild")]
    pub default_child_node: Option<String>,
    pub hide_side_nav: bool,
    pub hide_from_nav: bool,
    /// Feature toggles that must be active (`"ft1"`) or inactive (`"!ft2"`).
    pub visible_for_feature_toggles: Vec<String>,
    pub keep_selected_for_children: bool,
    /// Name of a registered activation hook.
    pub on_node_activation: Option<String>,
    /// Redirect target, absolute or relative to this node (`..` reaches siblings).
    pub link: Option<String>,
    /// Keep-alive group; instances of nodes in a group are parked on exit.
    pub view_group: Option<String>,
    pub category: Option<CategoryConfig>,
    pub tab_nav: bool,
    pub virtual_tree: bool,
    pub open_node_in_modal: Option<OpenInModal>,
    pub global_nav: bool,
    pub side_nav_accordion_mode: Option<bool>,
}

impl NodeConfig {
    pub fn new(path_segment: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path_segment: path_segment.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_view_url(mut self, view_url: impl Into<String>) -> Self {
        self.view_url = Some(view_url.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NodeConfig>) -> Self {
        self.children = children;
        self
    }

    pub fn with_default_child(mut self, segment: impl Into<String>) -> Self {
        self.default_child_node = Some(segment.into());
        self
    }

    pub fn with_activation_hook(mut self, name: impl Into<String>) -> Self {
        self.on_node_activation = Some(name.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(CategoryConfig::Label(category.into()));
        self
    }

    pub fn with_feature_toggles<I, S>(mut self, toggles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible_for_feature_toggles = toggles.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.path_segment.starts_with(':')
    }

    pub fn modal_options(&self) -> Option<ModalOptions> {
        match &self.open_node_in_modal {
            Some(OpenInModal::Flag(true)) => Some(ModalOptions::default()),
            Some(OpenInModal::Options(options)) => Some(options.clone()),
            Some(OpenInModal::Flag(false)) | None => None,
        }
    }
}

/// `openNodeInModal` is either a plain flag or a full option set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OpenInModal {
    Flag(bool),
    Options(ModalOptions),
}

/// Side-nav category. A bare string references (or declares) a category by label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CategoryConfig {
    Label(String),
    Detailed(CategoryDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryDetails {
    pub id: Option<String>,
    pub label: String,
    pub icon: Option<String>,
    pub collapsible: bool,
    pub test_id: Option<String>,
}

impl CategoryConfig {
    /// Key shared by all nodes that belong to the same category.
    pub fn key(&self) -> &str {
        match self {
            CategoryConfig::Label(label) => label,
            CategoryConfig::Detailed(details) => details.id.as_deref().unwrap_or(&details.label),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryConfig::Label(label) => label,
            CategoryConfig::Detailed(details) => &details.label,
        }
    }

    pub fn details(&self) -> Option<&CategoryDetails> {
        match self {
            CategoryConfig::Label(_) => None,
            CategoryConfig::Detailed(details) => Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_node() {
        let node: NodeConfig = serde_json::from_str(
            r#"{
                "pathSegment": "dps",
                "label": "Default Child node Example",
                "defaultChildNode": "dps2",
                "children": [
                    {"pathSegment": "dps1", "label": "First Child", "viewUrl": "/sampleapp.html#/dps1"},
                    {"pathSegment": "dps2", "label": "Second Child", "viewUrl": "/sampleapp.html#/dps2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(node.default_child_node.as_deref(), Some("dps2"));
        assert_eq!(node.children.len(), 2);
        assert!(node.view_url.is_none());
    }

    #[test]
    fn open_in_modal_accepts_flag_or_options() {
        let flag: NodeConfig =
            serde_json::from_str(r#"{"pathSegment":"misc2","openNodeInModal":true}"#).unwrap();
        assert!(flag.modal_options().is_some());

        let options: NodeConfig = serde_json::from_str(
            r#"{"pathSegment":"misc2","openNodeInModal":{"title":"Misc","size":"s"}}"#,
        )
        .unwrap();
        assert_eq!(options.modal_options().unwrap().title.as_deref(), Some("Misc"));

        let off: NodeConfig =
            serde_json::from_str(r#"{"pathSegment":"misc2","openNodeInModal":false}"#).unwrap();
        assert!(off.modal_options().is_none());
    }

    #[test]
    fn category_key_prefers_id() {
        let category: CategoryConfig = serde_json::from_str(
            r#"{"id":"usermanagement","label":"User Management","collapsible":true}"#,
        )
        .unwrap();
        assert_eq!(category.key(), "usermanagement");
        assert_eq!(category.label(), "User Management");
        assert!(category.details().unwrap().collapsible);
    }
}
