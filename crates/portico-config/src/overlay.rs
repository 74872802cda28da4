//! Options accepted when a view is opened in an overlay surface.

use serde::{Deserialize, Deserializer, Serialize};

/// Modal dialog size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModalSize {
    Fullscreen,
    #[default]
    L,
    M,
    S,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalOptions {
    pub title: Option<String>,
    pub size: ModalSize,
}

impl ModalOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size: ModalSize) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DrawerSize {
    #[default]
    S,
    M,
    L,
    Xl,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawerOptions {
    /// Render a header bar with title and close button.
    pub header: bool,
    /// Dim the primary surface behind the drawer.
    pub backdrop: bool,
    pub title: Option<String>,
    pub size: DrawerSize,
}

impl Default for DrawerOptions {
    fn default() -> Self {
        Self {
            header: true,
            backdrop: false,
            title: None,
            size: DrawerSize::default(),
        }
    }
}

/// Split-view height as a percentage of the content area (1..=99).
///
/// Accepts both numbers and numeric strings on the wire (`40` or `"40"`).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SplitViewSize(u8);

impl SplitViewSize {
    pub const DEFAULT: SplitViewSize = SplitViewSize(40);

    pub fn new(percent: u8) -> Option<Self> {
        (1..=99).contains(&percent).then_some(Self(percent))
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for SplitViewSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl<'de> Deserialize<'de> for SplitViewSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        let percent = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .parse::<u64>()
                .map_err(serde::de::Error::custom)?,
        };
        u8::try_from(percent)
            .ok()
            .and_then(SplitViewSize::new)
            .ok_or_else(|| serde::de::Error::custom(format!("split view size out of range: {percent}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SplitViewOptions {
    pub title: Option<String>,
    pub size: SplitViewSize,
    pub collapsed: bool,
}
