//! Snapshot-and-notify configuration lifecycle.
//!
//! The engine only ever reads an immutable snapshot. Hosts mutate a staged
//! copy and publish it with [`ConfigStore::apply`], passing the same scope
//! hint the host would give to `configChanged`.

use std::sync::Arc;

use crate::ShellConfig;

/// Which derived state must be recomputed after a configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigScope {
    /// Chrome only (footer, profile menu, responsive settings, global nav).
    Chrome,
    /// Node tree and navigation defaults, plus chrome.
    Navigation,
    /// Everything, including feature toggles.
    Full,
}

impl ConfigScope {
    /// Map a `configChanged` scope hint such as `"settings.footer"`.
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return ConfigScope::Full;
        };
        if hint == "navigation"
            || hint.starts_with("navigation.")
            || hint == "settings.navigation"
            || hint.starts_with("settings.navigation.")
        {
            ConfigScope::Navigation
        } else if hint == "settings" || hint.starts_with("settings.") {
            ConfigScope::Chrome
        } else {
            ConfigScope::Full
        }
    }
}

#[derive(Debug)]
pub struct ConfigStore {
    active: Arc<ShellConfig>,
    staged: Option<ShellConfig>,
    generation: u64,
}

impl ConfigStore {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            active: Arc::new(config),
            staged: None,
            generation: 0,
        }
    }

    /// The currently published configuration.
    pub fn snapshot(&self) -> Arc<ShellConfig> {
        Arc::clone(&self.active)
    }

    /// Mutable staged copy; created from the active snapshot on first access.
    pub fn stage(&mut self) -> &mut ShellConfig {
        let active = &self.active;
        self.staged.get_or_insert_with(|| (**active).clone())
    }

    pub fn has_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Discard staged edits without publishing them.
    pub fn discard(&mut self) {
        self.staged = None;
    }

    /// Publish staged edits (if any) and report the scope to re-derive.
    pub fn apply(&mut self, hint: Option<&str>) -> ConfigScope {
        if let Some(staged) = self.staged.take() {
            self.active = Arc::new(staged);
            self.generation += 1;
        }
        ConfigScope::from_hint(hint)
    }

    /// Incremented once per published change.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_hints() {
        assert_eq!(ConfigScope::from_hint(None), ConfigScope::Full);
        assert_eq!(ConfigScope::from_hint(Some("")), ConfigScope::Full);
        assert_eq!(ConfigScope::from_hint(Some("settings")), ConfigScope::Chrome);
        assert_eq!(ConfigScope::from_hint(Some("settings.footer")), ConfigScope::Chrome);
        assert_eq!(
            ConfigScope::from_hint(Some("settings.navigation")),
            ConfigScope::Navigation
        );
        assert_eq!(ConfigScope::from_hint(Some("navigation.nodes")), ConfigScope::Navigation);
        assert_eq!(ConfigScope::from_hint(Some("auth")), ConfigScope::Full);
    }

    #[test]
    fn staged_changes_are_invisible_until_applied() {
        let mut store = ConfigStore::new(ShellConfig::default());
        let before = store.snapshot();

        store.stage().settings.side_nav_footer_text = Some("Hello from tests.".into());
        assert!(store.snapshot().settings.side_nav_footer_text.is_none());
        assert!(store.has_staged());

        let scope = store.apply(Some("settings.footer"));
        assert_eq!(scope, ConfigScope::Chrome);
        assert_eq!(
            store.snapshot().settings.side_nav_footer_text.as_deref(),
            Some("Hello from tests.")
        );
        assert_eq!(store.generation(), 1);
        // Old snapshots are never mutated in place.
        assert!(before.settings.side_nav_footer_text.is_none());
    }

    #[test]
    fn apply_without_staged_changes_keeps_generation() {
        let mut store = ConfigStore::new(ShellConfig::default());
        assert_eq!(store.apply(None), ConfigScope::Full);
        assert_eq!(store.generation(), 0);

        store.stage();
        store.discard();
        store.apply(None);
        assert_eq!(store.generation(), 0);
    }
}
