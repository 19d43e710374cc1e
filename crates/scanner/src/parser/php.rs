//! PHP parser backed by the tree-sitter PHP grammar

use std::fs;
use std::path::Path;

use tracing::debug;

use parsec_core::error::ParseError;

use super::{AstNode, SourceParser, SyntaxTree};

/// Default largest file that is parsed (5 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

const MAX_ERROR_SNIPPET: usize = 40;

/// Parses PHP source files (`<?php ... ?>` documents with inline HTML).
///
/// A fresh `tree_sitter::Parser` is created per call, so one `PhpParser`
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct PhpParser {
    max_file_size: u64,
}

impl PhpParser {
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Sets the largest file size (bytes) that is read.
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Parses in-memory source.
    pub fn parse_source(&self, source: &[u8]) -> Result<SyntaxTree, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .map_err(|e| ParseError::Unavailable(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseError::Unavailable("parser returned no tree".to_owned()))?;

        let tree = SyntaxTree::new(tree, source.to_vec());
        if let Some(err) = first_syntax_error(tree.root()) {
            return Err(err);
        }
        Ok(tree)
    }
}

impl Default for PhpParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for PhpParser {
    fn name(&self) -> &str {
        "tree-sitter-php"
    }

    fn parse(&self, path: &Path) -> Result<SyntaxTree, ParseError> {
        let io_err = |source| ParseError::Io {
            path: path.display().to_string(),
            source,
        };

        let size = fs::metadata(path).map_err(io_err)?.len();
        if size > self.max_file_size {
            return Err(ParseError::TooLarge {
                path: path.display().to_string(),
                size,
                max: self.max_file_size,
            });
        }

        let source = fs::read(path).map_err(io_err)?;
        debug!(path = %path.display(), bytes = source.len(), "parsing source file");
        self.parse_source(&source)
    }
}

/// Finds the first ERROR or MISSING node in document order.
fn first_syntax_error(root: AstNode<'_>) -> Option<ParseError> {
    if !root.has_error() {
        return None;
    }

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return Some(ParseError::Syntax {
                line: node.line(),
                column: node.column(),
                detail: format!("missing {}", node.kind()),
            });
        }
        if node.is_error() {
            let detail = match node.text() {
                Ok(text) => format!("unexpected '{}'", snippet(text)),
                Err(_) => "unexpected input".to_owned(),
            };
            return Some(ParseError::Syntax {
                line: node.line(),
                column: node.column(),
                detail,
            });
        }
        if node.has_error() {
            stack.extend(node.children().into_iter().rev());
        }
    }

    // has_error was set but no offending node was reached
    Some(ParseError::Syntax {
        line: root.line(),
        column: root.column(),
        detail: "malformed source".to_owned(),
    })
}

fn snippet(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() > MAX_ERROR_SNIPPET {
        let cut: String = first_line.chars().take(MAX_ERROR_SNIPPET).collect();
        format!("{cut}...")
    } else {
        first_line.to_owned()
    }
}
