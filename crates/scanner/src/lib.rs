#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ScannerError`)
//! - [`enumerator`]: Source discovery (`FileIterator`, `Entry`)
//! - [`parser`]: Parser seam (`SourceParser`, `SyntaxTree`, `AstNode`, `PhpParser`)
//! - [`rule`]: Rules (`Rule`, `RuleRegistry`, `RuleFactory`, `RuleCollection`)
//! - [`evaluator`]: Per-file tree walk (`Evaluator`, `FileEvent`)
//! - [`scanner`]: Orchestrator (`Scanner`, `ScannerBuilder`, `FileOutcome`)
//! - [`report`]: Event bus and reporters (console, summary, XML, exit code)
//!
//! # Architecture
//!
//! ```text
//! roots --> FileIterator --> Scanner --+--> SourceParser --> SyntaxTree
//!                                      |                         |
//!                                      |                    Evaluator (RuleCollection)
//!                                      |                         |
//!                                      +<------ FileOutcome -----+
//!                                      |
//!                                  EventBus --> ConsoleReporter / SummaryReporter / XmlReporter
//!                                      |
//!                               ExitCodeAggregator
//! ```

pub mod enumerator;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod report;
pub mod rule;
pub mod scanner;

// --- Public API Re-exports ---

// Scanner (main orchestrator)
pub use scanner::{FileOutcome, FileResult, Scanner, ScannerBuilder};

// Error
pub use error::ScannerError;

// Enumeration
pub use enumerator::{Entry, FileIterator};

// Parsing
pub use parser::{AstNode, PhpParser, SourceParser, SyntaxTree};

// Rules
pub use evaluator::{Evaluator, FileEvent};
pub use rule::{Rule, RuleCollection, RuleError, RuleFactory, RuleRegistry};

// Reporting
pub use report::{
    ConsoleReporter, EventBus, ExitCodeAggregator, Reporter, SummaryReporter, Verbosity,
    XmlReporter,
};
