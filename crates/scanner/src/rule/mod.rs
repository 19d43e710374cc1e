//! Security rules -- node predicates plus the registry and factory around them
//!
//! A [`Rule`] looks at one syntax node at a time and either ignores it or
//! returns the captures used to render its message template.
//!
//! # Architecture
//! - [`Rule`]: stateless predicate with id, severity and message template
//! - [`factory`]: [`RuleRegistry`] (every known rule) and [`RuleFactory`]
//!   (include/exclude filtering)
//! - [`builtin`]: the rules shipped with parsec
//! - [`RuleCollection`]: the active, id-ordered rule set for one scan

pub mod builtin;
pub mod factory;

pub use factory::{RuleFactory, RuleRegistry};

use std::collections::BTreeMap;
use std::sync::Arc;

use parsec_core::types::Severity;

use crate::parser::AstNode;

/// Values substituted into a rule's message template, keyed by placeholder name.
pub type Captures = BTreeMap<&'static str, String>;

/// A rule predicate failed. This is not a finding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Node text was not valid UTF-8
    #[error("invalid node text: {reason}")]
    InvalidText { reason: String },

    /// Any other predicate failure
    #[error("{0}")]
    Failed(String),
}

impl From<std::str::Utf8Error> for RuleError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::InvalidText {
            reason: err.to_string(),
        }
    }
}

/// A security rule.
///
/// Rules hold no per-file state and are shared between workers.
pub trait Rule: Send + Sync {
    /// Unique id, e.g. `EvalFunction`.
    fn id(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// One-line description for `parsec rules`.
    fn description(&self) -> &'static str;

    /// Message with `{name}` placeholders filled from [`Captures`].
    fn message_template(&self) -> &'static str;

    /// Tests one node. `Ok(Some(_))` is a match.
    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError>;
}

/// Replaces each `{key}` in `template` with its capture.
///
/// Placeholders with no capture are left as written.
pub fn render_message(template: &str, captures: &Captures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match captures.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// The active rules of one scan, ordered by id and free of duplicates.
///
/// Built by [`RuleFactory`] and never mutated afterwards.
#[derive(Clone, Default)]
pub struct RuleCollection {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleCollection {
    /// Sorts by id and drops later duplicates.
    pub fn new(mut rules: Vec<Arc<dyn Rule>>) -> Self {
        rules.sort_by(|a, b| a.id().cmp(b.id()));
        rules.dedup_by(|a, b| a.id() == b.id());
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    /// Rule ids in evaluation order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.id()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.iter().any(|rule| rule.id() == id)
    }
}

impl std::fmt::Debug for RuleCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
