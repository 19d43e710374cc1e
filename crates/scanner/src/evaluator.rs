//! Evaluator -- applies the active rules to every node of one file

use parsec_core::types::{Finding, SourcePath};

use crate::parser::SyntaxTree;
use crate::rule::{RuleCollection, render_message};

/// One entry of a file's evaluation result, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// A rule matched
    Finding(Finding),
    /// A rule's predicate failed; it is disabled for the rest of the file
    RuleFailed {
        rule_id: String,
        line: usize,
        reason: String,
    },
}

/// Walks syntax trees and collects rule matches.
///
/// Holds only the immutable rule collection, so it can be shared between
/// workers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Evaluator {
    rules: RuleCollection,
}

impl Evaluator {
    pub fn new(rules: RuleCollection) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleCollection {
        &self.rules
    }

    /// Visits every node of `tree` in pre-order and applies each enabled rule
    /// in id order.
    ///
    /// The walk uses an explicit stack, so nesting depth is bounded by heap
    /// size rather than the call stack.
    pub fn evaluate(&self, path: &SourcePath, tree: &SyntaxTree) -> Vec<FileEvent> {
        let rules: Vec<_> = self.rules.iter().collect();
        let mut enabled = vec![true; rules.len()];
        let mut events = Vec::new();

        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            for (idx, rule) in rules.iter().enumerate() {
                if !enabled[idx] {
                    continue;
                }
                match rule.check(&node) {
                    Ok(Some(captures)) => events.push(FileEvent::Finding(Finding {
                        rule_id: rule.id().to_owned(),
                        path: path.clone(),
                        line: node.line(),
                        column: Some(node.column()),
                        severity: rule.severity(),
                        message: render_message(rule.message_template(), &captures),
                    })),
                    Ok(None) => {}
                    Err(e) => {
                        enabled[idx] = false;
                        events.push(FileEvent::RuleFailed {
                            rule_id: rule.id().to_owned(),
                            line: node.line(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            stack.extend(node.children().into_iter().rev());
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parsec_core::types::Severity;

    use crate::parser::{AstNode, PhpParser};
    use crate::rule::builtin::FunctionCallRule;
    use crate::rule::{Captures, Rule, RuleError};

    /// Fails on every function call.
    struct Exploding;

    impl Rule for Exploding {
        fn id(&self) -> &'static str {
            "AExploding"
        }
        fn severity(&self) -> Severity {
            Severity::Info
        }
        fn description(&self) -> &'static str {
            "fails"
        }
        fn message_template(&self) -> &'static str {
            "never"
        }
        fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
            if node.kind() == "function_call_expression" {
                Err(RuleError::Failed("boom".to_owned()))
            } else {
                Ok(None)
            }
        }
    }

    /// Matches every `echo` statement.
    struct Echo;

    impl Rule for Echo {
        fn id(&self) -> &'static str {
            "Echo"
        }
        fn severity(&self) -> Severity {
            Severity::Info
        }
        fn description(&self) -> &'static str {
            "echo"
        }
        fn message_template(&self) -> &'static str {
            "echo at {where}"
        }
        fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
            Ok((node.kind() == "echo_statement").then(Captures::new))
        }
    }

    fn evaluate(rules: Vec<Arc<dyn Rule>>, source: &str) -> Vec<FileEvent> {
        let tree = PhpParser::new().parse_source(source.as_bytes()).unwrap();
        Evaluator::new(RuleCollection::new(rules)).evaluate(&SourcePath::new("t.php"), &tree)
    }

    fn summary(events: &[FileEvent]) -> Vec<(String, usize)> {
        events
            .iter()
            .map(|e| match e {
                FileEvent::Finding(f) => (f.rule_id.clone(), f.line),
                FileEvent::RuleFailed { rule_id, line, .. } => (format!("!{rule_id}"), *line),
            })
            .collect()
    }

    #[test]
    fn findings_follow_document_order() {
        let src = "<?php\nsystem($a);\neval($b);\nexec($c);\n";
        let events = evaluate(
            vec![
                Arc::new(FunctionCallRule::SHELL_EXEC),
                Arc::new(FunctionCallRule::EVAL),
            ],
            src,
        );
        assert_eq!(
            summary(&events),
            vec![
                ("ShellExecFunction".to_owned(), 2),
                ("EvalFunction".to_owned(), 3),
                ("ShellExecFunction".to_owned(), 4),
            ]
        );
    }

    #[test]
    fn nested_matches_come_parent_first() {
        let src = "<?php\neval(system($x));\n";
        let events = evaluate(
            vec![
                Arc::new(FunctionCallRule::SHELL_EXEC),
                Arc::new(FunctionCallRule::EVAL),
            ],
            src,
        );
        let ids: Vec<_> = summary(&events).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["EvalFunction", "ShellExecFunction"]);
    }

    #[test]
    fn finding_carries_rule_metadata() {
        let events = evaluate(vec![Arc::new(FunctionCallRule::EVAL)], "<?php\n  eval($x);\n");
        match &events[0] {
            FileEvent::Finding(f) => {
                assert_eq!(f.severity, Severity::Critical);
                assert_eq!(f.line, 2);
                assert_eq!(f.column, Some(3));
                assert_eq!(f.path, SourcePath::new("t.php"));
                assert_eq!(f.message, "eval() executes arbitrary PHP code");
            }
            other => panic!("expected finding, got {other:?}"),
        }
    }

    #[test]
    fn unknown_placeholder_is_left_verbatim() {
        let events = evaluate(vec![Arc::new(Echo)], "<?php\necho 1;\n");
        match &events[0] {
            FileEvent::Finding(f) => assert_eq!(f.message, "echo at {where}"),
            other => panic!("expected finding, got {other:?}"),
        }
    }

    #[test]
    fn failing_rule_is_disabled_for_the_rest_of_the_file() {
        let src = "<?php\nfoo();\neval($a);\nbar();\n";
        let events = evaluate(
            vec![Arc::new(Exploding), Arc::new(FunctionCallRule::EVAL)],
            src,
        );
        assert_eq!(
            summary(&events),
            vec![("!AExploding".to_owned(), 2), ("EvalFunction".to_owned(), 3)]
        );
    }

    #[test]
    fn failure_is_recorded_again_for_the_next_file() {
        let evaluator = Evaluator::new(RuleCollection::new(vec![Arc::new(Exploding)]));
        let parser = PhpParser::new();
        let a = parser.parse_source(b"<?php f();").unwrap();
        let b = parser.parse_source(b"<?php g();").unwrap();
        assert_eq!(evaluator.evaluate(&SourcePath::new("a.php"), &a).len(), 1);
        assert_eq!(evaluator.evaluate(&SourcePath::new("b.php"), &b).len(), 1);
    }

    #[test]
    fn deeply_nested_source_does_not_overflow() {
        let depth = 2_000;
        let src = format!("<?php\n$x = {}1{};\n", "(".repeat(depth), ")".repeat(depth));
        let events = evaluate(vec![Arc::new(FunctionCallRule::EVAL)], &src);
        assert!(events.is_empty());
    }

    #[test]
    fn clean_file_yields_nothing() {
        let events = evaluate(
            vec![Arc::new(FunctionCallRule::EVAL)],
            "<?php\necho strlen('x');\n",
        );
        assert!(events.is_empty());
    }
}
