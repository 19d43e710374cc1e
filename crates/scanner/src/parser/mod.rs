//! Source parsing -- the seam between the engine and a concrete grammar
//!
//! The scanner only ever talks to [`SourceParser`]. [`php::PhpParser`] is
//! the built-in implementation; tests and embedders can plug in their own.
//!
//! A parsed file is a [`SyntaxTree`], which owns both the tree and the bytes
//! it was parsed from. Rules look at it one [`AstNode`] at a time.

pub mod php;

use std::path::Path;
use std::str::Utf8Error;

use parsec_core::error::ParseError;

pub use php::PhpParser;

/// Turns a source file into a syntax tree.
///
/// Implementations must be stateless across calls so one instance can be
/// shared by every worker.
pub trait SourceParser: Send + Sync {
    /// Parser name, for logs.
    fn name(&self) -> &str;

    /// Reads and parses the file at `path`.
    ///
    /// Unreadable files, oversized files and syntax errors are all reported
    /// as [`ParseError`].
    fn parse(&self, path: &Path) -> Result<SyntaxTree, ParseError>;
}

/// A parsed source file.
pub struct SyntaxTree {
    tree: tree_sitter::Tree,
    source: Vec<u8>,
}

impl SyntaxTree {
    pub fn new(tree: tree_sitter::Tree, source: Vec<u8>) -> Self {
        Self { tree, source }
    }

    /// Root node of the tree.
    pub fn root(&self) -> AstNode<'_> {
        AstNode::new(self.tree.root_node(), &self.source)
    }

    /// Raw source bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("root", &self.tree.root_node().kind())
            .field("bytes", &self.source.len())
            .finish()
    }
}

/// A node of a [`SyntaxTree`], bundled with the source it points into.
#[derive(Clone, Copy)]
pub struct AstNode<'t> {
    node: tree_sitter::Node<'t>,
    source: &'t [u8],
}

impl<'t> AstNode<'t> {
    fn new(node: tree_sitter::Node<'t>, source: &'t [u8]) -> Self {
        Self { node, source }
    }

    /// Grammar kind, e.g. `function_call_expression`.
    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// `false` for anonymous tokens such as punctuation and keywords.
    pub fn is_named(&self) -> bool {
        self.node.is_named()
    }

    /// Source text covered by this node.
    pub fn text(&self) -> Result<&'t str, Utf8Error> {
        self.node.utf8_text(self.source)
    }

    /// 1-based line of the first byte.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }

    /// 1-based column (in bytes) of the first byte.
    pub fn column(&self) -> usize {
        self.node.start_position().column + 1
    }

    pub fn child_by_field_name(&self, name: &str) -> Option<AstNode<'t>> {
        self.node
            .child_by_field_name(name)
            .map(|child| Self::new(child, self.source))
    }

    /// All direct children, named and anonymous, in source order.
    pub fn children(&self) -> Vec<AstNode<'t>> {
        let mut cursor = self.node.walk();
        self.node
            .children(&mut cursor)
            .map(|child| Self::new(child, self.source))
            .collect()
    }

    /// Named direct children in source order.
    pub fn named_children(&self) -> Vec<AstNode<'t>> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|child| Self::new(child, self.source))
            .collect()
    }

    /// First named child, if any.
    pub fn first_named_child(&self) -> Option<AstNode<'t>> {
        self.node
            .named_child(0)
            .map(|child| Self::new(child, self.source))
    }

    pub(crate) fn is_error(&self) -> bool {
        self.node.is_error()
    }

    pub(crate) fn is_missing(&self) -> bool {
        self.node.is_missing()
    }

    pub(crate) fn has_error(&self) -> bool {
        self.node.has_error()
    }
}

impl std::fmt::Debug for AstNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.kind(), self.line(), self.column())
    }
}
