//! Portico shell configuration
//!
//! This crate holds the configuration surface consumed by the navigation
//! engine: runtime settings, the navigation node tree, feature toggles and
//! routing policy. Configuration can be loaded from `portico.toml` (or a JSON
//! file) and overridden by environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod node;
pub mod overlay;
pub mod store;

pub use node::{CategoryConfig, CategoryDetails, NodeConfig, OpenInModal};
pub use overlay::{
    DrawerOptions, DrawerSize, ModalOptions, ModalSize, SplitViewOptions, SplitViewSize,
};
pub use store::{ConfigScope, ConfigStore};

/// Main configuration structure for the shell
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellConfig {
    /// Runtime-mutable chrome settings
    pub settings: Settings,
    /// Node tree and navigation defaults
    pub navigation: NavigationConfig,
    /// Feature toggle sources
    pub feature_toggles: FeatureToggleConfig,
    /// Path resolution policy
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Replaces the default side-nav footer
    pub side_nav_footer_text: Option<String>,
    pub responsive_navigation: ResponsiveNavigation,
    pub global_side_navigation: bool,
    pub profile_type: ProfileType,
    /// Flags gating incomplete features
    pub experimental: ExperimentalFlags,
    /// Metrics used for responsive chrome and tab overflow
    pub layout: LayoutMetrics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResponsiveNavigation {
    #[default]
    None,
    SemiCollapsible,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProfileType {
    #[default]
    #[serde(rename = "simple")]
    Simple,
    #[serde(rename = "Fiori3")]
    Fiori3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperimentalFlags {
    pub global_nav: bool,
    pub profile_menu_fiori3: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutMetrics {
    /// Average glyph advance used to estimate tab label width
    pub tab_char_width_px: f32,
    /// Horizontal padding added to every tab
    pub tab_padding_px: f32,
    pub more_button_width_px: f32,
    pub side_nav_width_px: f32,
    pub side_nav_collapsed_width_px: f32,
    /// Viewports narrower than this use the mobile chrome
    pub mobile_breakpoint_px: f32,
    pub resize_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationConfig {
    pub nodes: Vec<NodeConfig>,
    pub defaults: NavigationDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationDefaults {
    /// Global accordion mode for collapsible side-nav categories
    pub side_nav_accordion_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureToggleConfig {
    /// Query parameter that activates toggles (`?ft=a,b`)
    pub query_param: String,
    pub initially_active: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    pub unmatched_path_fallback: UnmatchedPathFallback,
}

/// Where to go when a path has segments that match no node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum UnmatchedPathFallback {
    #[default]
    Root,
    NearestAncestor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            side_nav_footer_text: None,
            responsive_navigation: ResponsiveNavigation::None,
            global_side_navigation: false,
            profile_type: ProfileType::Simple,
            experimental: ExperimentalFlags::default(),
            layout: LayoutMetrics::default(),
        }
    }
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            tab_char_width_px: 8.0,
            tab_padding_px: 32.0,
            more_button_width_px: 80.0,
            side_nav_width_px: 320.0,
            side_nav_collapsed_width_px: 60.0,
            mobile_breakpoint_px: 600.0,
            resize_debounce_ms: 150,
        }
    }
}

impl Default for FeatureToggleConfig {
    fn default() -> Self {
        Self {
            query_param: "ft".to_string(),
            initially_active: Vec::new(),
        }
    }
}

impl ShellConfig {
    /// Load configuration from a TOML or JSON file (chosen by extension)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config file {}", path.display()))
        }
    }

    /// Load `portico.toml` from the current directory, or defaults if it is missing
    pub fn load_or_default() -> Self {
        Self::load_from_file("portico.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(toggles) = std::env::var("PORTICO_FEATURE_TOGGLES") {
            for toggle in toggles.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if !self.feature_toggles.initially_active.iter().any(|t| t == toggle) {
                    self.feature_toggles.initially_active.push(toggle.to_string());
                }
            }
        }
        if let Ok(val) = std::env::var("PORTICO_SIDE_NAV_ACCORDION") {
            self.navigation.defaults.side_nav_accordion_mode =
                val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("PORTICO_RESPONSIVE_NAVIGATION") {
            if val.eq_ignore_ascii_case("semiCollapsible") {
                self.settings.responsive_navigation = ResponsiveNavigation::SemiCollapsible;
            } else if val.eq_ignore_ascii_case("none") {
                self.settings.responsive_navigation = ResponsiveNavigation::None;
            }
        }
        if let Ok(val) = std::env::var("PORTICO_PROFILE_TYPE") {
            self.settings.profile_type = if val.eq_ignore_ascii_case("fiori3") {
                ProfileType::Fiori3
            } else {
                ProfileType::Simple
            };
        }
        if let Ok(text) = std::env::var("PORTICO_FOOTER_TEXT") {
            self.settings.side_nav_footer_text = Some(text);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from portico.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
