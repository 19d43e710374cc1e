//! `parsec rules` command handler

use std::io::Write;

use serde::Serialize;

use parsec_scanner::RuleRegistry;

use crate::cli::RulesArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `rules` command.
pub fn execute(args: RulesArgs) -> Result<(), CliError> {
    let report = RuleListReport::from_registry(&RuleRegistry::builtin());
    OutputWriter::new(args.output).render(&report)
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub severity: String,
    pub description: String,
}

impl RuleListReport {
    /// Every registered rule, sorted by id.
    pub fn from_registry(registry: &RuleRegistry) -> Self {
        let rules: Vec<RuleEntry> = registry
            .iter()
            .map(|r| RuleEntry {
                id: r.id().to_owned(),
                severity: r.severity().to_string(),
                description: r.description().to_owned(),
            })
            .collect();
        Self {
            total: rules.len(),
            rules,
        }
    }
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Built-in Rules ({} total)", self.total.to_string().bold())?;
        writeln!(w)?;
        writeln!(w, "{:<25} {:<10} Description", "ID", "Severity")?;
        writeln!(w, "{}", "-".repeat(80))?;

        for r in &self.rules {
            writeln!(w, "{:<25} {:<10} {}", r.id, r.severity, r.description)?;
        }

        Ok(())
    }
}
