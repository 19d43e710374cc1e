//! Rule registry and include/exclude filtering

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use parsec_core::error::ConfigError;

use super::builtin;
use super::{Rule, RuleCollection};

/// Every rule parsec knows about, keyed by id.
#[derive(Clone)]
pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Registry of the built-in rules.
    pub fn builtin() -> Self {
        let rules = builtin::all()
            .into_iter()
            .map(|rule| (rule.id(), rule))
            .collect();
        Self { rules }
    }

    /// Builds a registry from an explicit rule list.
    ///
    /// Fails with [`ConfigError::DuplicateRule`] when two rules share an id.
    pub fn with_rules(rules: Vec<Arc<dyn Rule>>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            let id = rule.id();
            if map.insert(id, rule).is_some() {
                return Err(ConfigError::DuplicateRule(id.to_owned()));
            }
        }
        Ok(Self { rules: map })
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.values()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.keys()).finish()
    }
}

/// Builds the active [`RuleCollection`] from include and exclude lists.
///
/// An empty include list means "every registered rule". A name present in
/// both lists is excluded.
#[derive(Debug, Clone, Default)]
pub struct RuleFactory {
    include: BTreeSet<String>,
    exclude: BTreeSet<String>,
}

impl RuleFactory {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolves the lists against `registry`.
    ///
    /// Every name must be registered. The result must not be empty.
    pub fn create(&self, registry: &RuleRegistry) -> Result<RuleCollection, ConfigError> {
        check_known(registry, "include", &self.include)?;
        check_known(registry, "exclude", &self.exclude)?;

        let active: Vec<Arc<dyn Rule>> = registry
            .iter()
            .filter(|rule| self.include.is_empty() || self.include.contains(rule.id()))
            .filter(|rule| !self.exclude.contains(rule.id()))
            .cloned()
            .collect();

        if active.is_empty() {
            return Err(ConfigError::NoActiveRules);
        }

        let collection = RuleCollection::new(active);
        debug!(rules = ?collection.ids(), "active rule set built");
        Ok(collection)
    }
}

fn check_known(
    registry: &RuleRegistry,
    list: &'static str,
    names: &BTreeSet<String>,
) -> Result<(), ConfigError> {
    match names.iter().find(|name| !registry.contains(name)) {
        Some(unknown) => Err(ConfigError::UnknownRule {
            list,
            id: unknown.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstNode;
    use crate::rule::{Captures, RuleError};
    use parsec_core::types::Severity;

    struct Stub(&'static str);

    impl Rule for Stub {
        fn id(&self) -> &'static str {
            self.0
        }
        fn severity(&self) -> Severity {
            Severity::Low
        }
        fn description(&self) -> &'static str {
            "stub"
        }
        fn message_template(&self) -> &'static str {
            "stub"
        }
        fn check(&self, _node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
            Ok(None)
        }
    }

    fn registry() -> RuleRegistry {
        RuleRegistry::with_rules(vec![
            Arc::new(Stub("A")),
            Arc::new(Stub("B")),
            Arc::new(Stub("C")),
        ])
        .unwrap()
    }

    fn none() -> Vec<String> {
        Vec::new()
    }

    #[test]
    fn no_lists_activates_everything() {
        let rules = RuleFactory::new(none(), none()).create(&registry()).unwrap();
        assert_eq!(rules.ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn include_restricts() {
        let rules = RuleFactory::new(["C", "A"], none()).create(&registry()).unwrap();
        assert_eq!(rules.ids(), vec!["A", "C"]);
    }

    #[test]
    fn exclude_removes() {
        let rules = RuleFactory::new(none(), ["B"]).create(&registry()).unwrap();
        assert_eq!(rules.ids(), vec!["A", "C"]);
    }

    #[test]
    fn exclude_wins_over_include() {
        let rules = RuleFactory::new(["A", "B"], ["B"]).create(&registry()).unwrap();
        assert_eq!(rules.ids(), vec!["A"]);
    }

    #[test]
    fn duplicates_in_lists_collapse() {
        let rules = RuleFactory::new(["A", "A"], ["C", "C"]).create(&registry()).unwrap();
        assert_eq!(rules.ids(), vec!["A"]);
    }

    #[test]
    fn unknown_include_is_config_error() {
        let err = RuleFactory::new(["A", "Nope"], none())
            .create(&registry())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownRule { list: "include", ref id } if id == "Nope"
        ));
    }

    #[test]
    fn unknown_exclude_is_config_error() {
        let err = RuleFactory::new(none(), ["Nope"])
            .create(&registry())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRule { list: "exclude", .. }));
    }

    #[test]
    fn excluding_everything_is_rejected() {
        let err = RuleFactory::new(["A"], ["A"]).create(&registry()).unwrap_err();
        assert!(matches!(err, ConfigError::NoActiveRules));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = RuleRegistry::with_rules(vec![Arc::new(Stub("A")), Arc::new(Stub("A"))])
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DuplicateRule(id) if id == "A"));
    }

    #[test]
    fn builtin_registry_is_not_empty() {
        let registry = RuleRegistry::builtin();
        assert!(!registry.is_empty());
        assert!(registry.contains("EvalFunction"));
    }
}
