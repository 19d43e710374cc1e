//! Built-in rules
//!
//! | Id | Severity | Triggers on |
//! |---|---|---|
//! | `BackticksOperator` | High | `` `cmd` `` shell execution |
//! | `EvalFunction` | Critical | `eval(...)` |
//! | `ExtractFunction` | Medium | `extract(...)` |
//! | `IncludeWithVariable` | High | `include`/`require` of a non-literal path |
//! | `ParseStrWithoutTarget` | Medium | `parse_str()` with one argument |
//! | `PregReplaceEvalModifier` | Critical | `preg_replace()` pattern with the `e` modifier |
//! | `ShellExecFunction` | High | `exec`, `system`, `shell_exec`, ... |
//! | `WeakHashFunction` | Low | `md5(...)`, `sha1(...)` |

use std::sync::Arc;

use parsec_core::types::Severity;

use crate::parser::AstNode;

use super::{Captures, Rule, RuleError};

/// Every built-in rule, in id order.
pub fn all() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(BackticksOperator),
        Arc::new(FunctionCallRule::EVAL),
        Arc::new(FunctionCallRule::EXTRACT),
        Arc::new(IncludeWithVariable),
        Arc::new(ParseStrWithoutTarget),
        Arc::new(PregReplaceEvalModifier),
        Arc::new(FunctionCallRule::SHELL_EXEC),
        Arc::new(FunctionCallRule::WEAK_HASH),
    ]
}

// --- node helpers ---

const CALL: &str = "function_call_expression";

/// Name of the function called by `node`, without a leading `\`.
///
/// `None` for anything but a plain call to a global function name.
fn called_function<'t>(node: &AstNode<'t>) -> Result<Option<&'t str>, RuleError> {
    if node.kind() != CALL {
        return Ok(None);
    }
    let Some(name) = node.child_by_field_name("function") else {
        return Ok(None);
    };
    if !matches!(name.kind(), "name" | "qualified_name") {
        return Ok(None);
    }
    let text = name.text()?.trim_start_matches('\\');
    if text.contains('\\') {
        return Ok(None);
    }
    Ok(Some(text))
}

/// Argument nodes of a call, in order.
fn call_arguments<'t>(call: &AstNode<'t>) -> Vec<AstNode<'t>> {
    call.child_by_field_name("arguments")
        .map(|args| {
            args.named_children()
                .into_iter()
                .filter(|arg| arg.kind() == "argument")
                .collect()
        })
        .unwrap_or_default()
}

/// Expression carried by an `argument` node.
fn argument_value<'t>(arg: &AstNode<'t>) -> Option<AstNode<'t>> {
    arg.named_children().pop()
}

fn unwrap_parens<'t>(mut node: AstNode<'t>) -> AstNode<'t> {
    while node.kind() == "parenthesized_expression" {
        match node.first_named_child() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Contents of a plain string literal; `None` for anything dynamic.
fn string_literal(node: AstNode<'_>) -> Result<Option<String>, RuleError> {
    let node = unwrap_parens(node);
    match node.kind() {
        "string" => {}
        "encapsed_string" => {
            let interpolated = node
                .named_children()
                .iter()
                .any(|part| !matches!(part.kind(), "string_content" | "string_value" | "escape_sequence"));
            if interpolated {
                return Ok(None);
            }
        }
        _ => return Ok(None),
    }
    let text = node.text()?;
    let Some(open) = text.find(['\'', '"']) else {
        return Err(RuleError::Failed(format!("string literal without quotes: {text}")));
    };
    if text.len() < open + 2 {
        return Err(RuleError::Failed(format!("unterminated string literal: {text}")));
    }
    Ok(Some(text[open + 1..text.len() - 1].to_owned()))
}

/// Modifier letters trailing a PCRE pattern such as `/x/ie` or `{x}e`.
fn pattern_modifiers(pattern: &str) -> Option<&str> {
    let pattern = pattern.trim_start();
    let delimiter = pattern.chars().next()?;
    let closing = match delimiter {
        '(' => ')',
        '{' => '}',
        '[' => ']',
        '<' => '>',
        other => other,
    };
    let body = &pattern[delimiter.len_utf8()..];
    let end = body.rfind(closing)?;
    Some(&body[end + closing.len_utf8()..])
}

// --- rules ---

/// Flags calls to any of a fixed set of global functions.
#[derive(Debug, Clone, Copy)]
pub struct FunctionCallRule {
    id: &'static str,
    severity: Severity,
    description: &'static str,
    template: &'static str,
    functions: &'static [&'static str],
}

impl FunctionCallRule {
    pub const EVAL: Self = Self {
        id: "EvalFunction",
        severity: Severity::Critical,
        description: "eval() executes arbitrary PHP code",
        template: "{function}() executes arbitrary PHP code",
        functions: &["eval"],
    };

    pub const EXTRACT: Self = Self {
        id: "ExtractFunction",
        severity: Severity::Medium,
        description: "extract() can overwrite existing variables",
        template: "{function}() can overwrite existing variables",
        functions: &["extract"],
    };

    pub const SHELL_EXEC: Self = Self {
        id: "ShellExecFunction",
        severity: Severity::High,
        description: "Functions that run shell commands",
        template: "{function}() executes a shell command",
        functions: &[
            "exec",
            "passthru",
            "pcntl_exec",
            "popen",
            "proc_open",
            "shell_exec",
            "system",
        ],
    };

    pub const WEAK_HASH: Self = Self {
        id: "WeakHashFunction",
        severity: Severity::Low,
        description: "md5() and sha1() are too weak for security purposes",
        template: "{function}() is a weak hash, unsuitable for security purposes",
        functions: &["md5", "sha1"],
    };
}

impl Rule for FunctionCallRule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn message_template(&self) -> &'static str {
        self.template
    }

    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
        let Some(name) = called_function(node)? else {
            return Ok(None);
        };
        if !self.functions.iter().any(|f| f.eq_ignore_ascii_case(name)) {
            return Ok(None);
        }
        Ok(Some(Captures::from([("function", name.to_owned())])))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackticksOperator;

impl Rule for BackticksOperator {
    fn id(&self) -> &'static str {
        "BackticksOperator"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> &'static str {
        "The backtick operator runs its contents as a shell command"
    }

    fn message_template(&self) -> &'static str {
        "backtick operator executes a shell command"
    }

    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
        if node.kind() == "shell_command_expression" {
            Ok(Some(Captures::new()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IncludeWithVariable;

const INCLUDE_KINDS: [&str; 4] = [
    "include_expression",
    "include_once_expression",
    "require_expression",
    "require_once_expression",
];

impl Rule for IncludeWithVariable {
    fn id(&self) -> &'static str {
        "IncludeWithVariable"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn description(&self) -> &'static str {
        "include/require of a computed path may allow file inclusion"
    }

    fn message_template(&self) -> &'static str {
        "{construct} with a non-literal path may allow file inclusion"
    }

    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
        if !INCLUDE_KINDS.contains(&node.kind()) {
            return Ok(None);
        }
        let Some(target) = node.first_named_child() else {
            return Ok(None);
        };
        if string_literal(target)?.is_some() {
            return Ok(None);
        }
        let construct = node
            .children()
            .first()
            .map(|keyword| keyword.text())
            .transpose()?
            .unwrap_or("include")
            .to_lowercase();
        Ok(Some(Captures::from([("construct", construct)])))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseStrWithoutTarget;

impl Rule for ParseStrWithoutTarget {
    fn id(&self) -> &'static str {
        "ParseStrWithoutTarget"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn description(&self) -> &'static str {
        "parse_str() without a result array writes into the local scope"
    }

    fn message_template(&self) -> &'static str {
        "parse_str() without a result array overwrites local variables"
    }

    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
        match called_function(node)? {
            Some(name)
                if name.eq_ignore_ascii_case("parse_str") && call_arguments(node).len() == 1 =>
            {
                Ok(Some(Captures::new()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PregReplaceEvalModifier;

impl Rule for PregReplaceEvalModifier {
    fn id(&self) -> &'static str {
        "PregReplaceEvalModifier"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> &'static str {
        "preg_replace() with the /e modifier evaluates the replacement as code"
    }

    fn message_template(&self) -> &'static str {
        "preg_replace() pattern with modifiers '{modifiers}' evaluates the replacement as PHP code"
    }

    fn check(&self, node: &AstNode<'_>) -> Result<Option<Captures>, RuleError> {
        match called_function(node)? {
            Some(name) if name.eq_ignore_ascii_case("preg_replace") => {}
            _ => return Ok(None),
        }
        let Some(pattern_arg) = call_arguments(node).into_iter().next() else {
            return Ok(None);
        };
        let Some(value) = argument_value(&pattern_arg) else {
            return Ok(None);
        };
        let Some(pattern) = string_literal(value)? else {
            return Ok(None);
        };
        match pattern_modifiers(&pattern) {
            Some(modifiers) if modifiers.contains('e') => {
                Ok(Some(Captures::from([("modifiers", modifiers.to_owned())])))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PhpParser;

    /// Lines at which `rule` matches anywhere in `source`.
    fn matched_lines(rule: &dyn Rule, source: &str) -> Vec<usize> {
        let tree = PhpParser::new().parse_source(source.as_bytes()).unwrap();
        let mut lines = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            if rule.check(&node).unwrap().is_some() {
                lines.push(node.line());
            }
            stack.extend(node.children().into_iter().rev());
        }
        lines
    }

    fn message(rule: &dyn Rule, source: &str) -> String {
        let tree = PhpParser::new().parse_source(source.as_bytes()).unwrap();
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            if let Some(captures) = rule.check(&node).unwrap() {
                return crate::rule::render_message(rule.message_template(), &captures);
            }
            stack.extend(node.children().into_iter().rev());
        }
        panic!("rule {} did not match", rule.id());
    }

    #[test]
    fn builtin_ids_are_sorted_and_unique() {
        let ids: Vec<_> = all().iter().map(|r| r.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn eval_matches_any_case_and_leading_backslash() {
        let src = "<?php\neval($a);\nEVAL($b);\n\\eval($c);\n";
        assert_eq!(matched_lines(&FunctionCallRule::EVAL, src), vec![2, 3, 4]);
    }

    #[test]
    fn method_calls_do_not_match() {
        let src = "<?php\n$obj->system('ls');\nFoo::eval($x);\n";
        assert!(matched_lines(&FunctionCallRule::SHELL_EXEC, src).is_empty());
        assert!(matched_lines(&FunctionCallRule::EVAL, src).is_empty());
    }

    #[test]
    fn shell_exec_family() {
        let src = "<?php\nsystem('ls');\nexec($cmd);\npassthru($c);\nstrlen($s);\n";
        assert_eq!(matched_lines(&FunctionCallRule::SHELL_EXEC, src), vec![2, 3, 4]);
        assert_eq!(
            message(&FunctionCallRule::SHELL_EXEC, "<?php\nSystem('ls');"),
            "System() executes a shell command"
        );
    }

    #[test]
    fn weak_hash() {
        let src = "<?php\n$h = md5($p);\n$s = sha1($p);\n$ok = hash('sha256', $p);\n";
        assert_eq!(matched_lines(&FunctionCallRule::WEAK_HASH, src), vec![2, 3]);
    }

    #[test]
    fn extract() {
        assert_eq!(
            matched_lines(&FunctionCallRule::EXTRACT, "<?php\nextract($_GET);\n"),
            vec![2]
        );
    }

    #[test]
    fn backticks() {
        let src = "<?php\n$out = `ls -la`;\n$s = 'not `a` command';\n";
        assert_eq!(matched_lines(&BackticksOperator, src), vec![2]);
    }

    #[test]
    fn include_with_literal_path_is_fine() {
        let src = "<?php\ninclude 'header.php';\nrequire_once(\"config.php\");\n";
        assert!(matched_lines(&IncludeWithVariable, src).is_empty());
    }

    #[test]
    fn include_with_variable_path() {
        let src = "<?php\ninclude $page;\nrequire_once \"pages/$name.php\";\nrequire 'a' . $b;\n";
        assert_eq!(matched_lines(&IncludeWithVariable, src), vec![2, 3, 4]);
        assert_eq!(
            message(&IncludeWithVariable, "<?php\nREQUIRE_ONCE $x;"),
            "require_once with a non-literal path may allow file inclusion"
        );
    }

    #[test]
    fn parse_str_needs_single_argument() {
        let src = "<?php\nparse_str($q);\nparse_str($q, $out);\n";
        assert_eq!(matched_lines(&ParseStrWithoutTarget, src), vec![2]);
    }

    #[test]
    fn preg_replace_with_eval_modifier() {
        let src = "<?php\npreg_replace('/a/e', $r, $s);\npreg_replace('/a/i', $r, $s);\npreg_replace($p, $r, $s);\n";
        assert_eq!(matched_lines(&PregReplaceEvalModifier, src), vec![2]);
        assert_eq!(
            message(&PregReplaceEvalModifier, "<?php preg_replace('#x#ie', 'y', $z);"),
            "preg_replace() pattern with modifiers 'ie' evaluates the replacement as PHP code"
        );
    }

    #[test]
    fn pattern_modifiers_handles_bracket_delimiters() {
        assert_eq!(pattern_modifiers("/abc/e"), Some("e"));
        assert_eq!(pattern_modifiers("{a}ie"), Some("ie"));
        assert_eq!(pattern_modifiers("(a(b))"), Some(""));
        assert_eq!(pattern_modifiers(""), None);
    }
}
