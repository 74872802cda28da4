//! Feature toggle state and node visibility predicates.

use std::collections::BTreeSet;

/// One `visibleForFeatureToggles` entry: `"ft1"` requires ft1 active,
/// `"!ft2"` requires ft2 inactive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleCondition {
    pub name: String,
    pub required: bool,
}

impl ToggleCondition {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, required) = match raw.strip_prefix('!') {
            Some(rest) => (rest.trim(), false),
            None => (raw, true),
        };
        (!name.is_empty()).then(|| Self {
            name: name.to_string(),
            required,
        })
    }
}

/// Set of currently active feature toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureToggles {
    active: BTreeSet<String>,
}

impl FeatureToggles {
    pub fn new<I, S>(initial: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut toggles = Self::default();
        for name in initial {
            toggles.activate(name.as_ref());
        }
        toggles
    }

    /// Activate a toggle. Returns true when it was not active before.
    pub fn activate(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name.starts_with('!') {
            return false;
        }
        self.active.insert(name.to_string())
    }

    /// Activate every toggle in a comma separated query value (`ft=a,b`).
    pub fn activate_from_query(&mut self, value: &str) -> bool {
        value
            .split(',')
            .fold(false, |changed, name| self.activate(name) || changed)
    }

    pub fn deactivate(&mut self, name: &str) -> bool {
        self.active.remove(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }

    /// All conditions must hold for the node to be visible.
    pub fn satisfies(&self, conditions: &[ToggleCondition]) -> bool {
        conditions
            .iter()
            .all(|condition| self.is_active(&condition.name) == condition.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions(raw: &[&str]) -> Vec<ToggleCondition> {
        raw.iter().filter_map(|r| ToggleCondition::parse(r)).collect()
    }

    #[test]
    fn parses_negation() {
        assert_eq!(
            ToggleCondition::parse("!ft2"),
            Some(ToggleCondition {
                name: "ft2".into(),
                required: false
            })
        );
        assert_eq!(ToggleCondition::parse("  "), None);
        assert_eq!(ToggleCondition::parse("!"), None);
    }

    #[test]
    fn positive_and_negated_conditions() {
        let settings2 = conditions(&["ft1"]);
        let settings3 = conditions(&["!ft2"]);

        let mut toggles = FeatureToggles::default();
        assert!(!toggles.satisfies(&settings2));
        assert!(toggles.satisfies(&settings3));

        toggles.activate("ft1");
        assert!(toggles.satisfies(&settings2));
        assert!(toggles.satisfies(&settings3));

        let toggles = FeatureToggles::new(["ft2"]);
        assert!(!toggles.satisfies(&settings2));
        assert!(!toggles.satisfies(&settings3));
    }

    #[test]
    fn query_activation_reports_changes() {
        let mut toggles = FeatureToggles::default();
        assert!(toggles.activate_from_query("ft1,ft3"));
        assert!(!toggles.activate_from_query("ft1"));
        assert_eq!(toggles.active().collect::<Vec<_>>(), vec!["ft1", "ft3"]);
        assert!(!toggles.activate("!ft4"));
    }
}
