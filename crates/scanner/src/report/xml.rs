//! XML report
//!
//! Buffers per-file results and writes a single document when the scan
//! finishes:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <report>
//!   <file path="src/a.php">
//!     <problem line="3" column="1" severity="Critical" rule="EvalFunction" message="..."/>
//!   </file>
//!   <file path="src/broken.php">
//!     <error message="syntax error at line 2, column 5: ..."/>
//!   </file>
//! </report>
//! ```
//!
//! Files with neither findings nor a parse failure are left out. Characters
//! XML 1.0 cannot carry (most C0 controls, U+FFFE, U+FFFF) are written as
//! U+FFFD.

use std::borrow::Cow;
use std::io::{self, Write};

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use parsec_core::event::ScanSummary;
use parsec_core::types::{Finding, SourcePath};

use super::Reporter;

#[derive(Debug, Default)]
struct FileRecord {
    path: String,
    problems: Vec<Finding>,
    error: Option<String>,
}

impl FileRecord {
    fn is_reportable(&self) -> bool {
        !self.problems.is_empty() || self.error.is_some()
    }
}

/// Writes the whole scan as one XML document.
pub struct XmlReporter<W: Write> {
    out: W,
    files: Vec<FileRecord>,
}

impl<W: Write> XmlReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            files: Vec::new(),
        }
    }

    fn record_for(&mut self, path: &SourcePath) -> &mut FileRecord {
        let key = path.to_string();
        // events for a file are contiguous, so the match is almost always last
        let idx = match self.files.iter().rposition(|f| f.path == key) {
            Some(idx) => idx,
            None => {
                self.files.push(FileRecord {
                    path: key,
                    ..Default::default()
                });
                self.files.len() - 1
            }
        };
        &mut self.files[idx]
    }

    fn write_document(&mut self) -> io::Result<()> {
        let mut writer = Writer::new_with_indent(&mut self.out, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;

        let reportable: Vec<&FileRecord> =
            self.files.iter().filter(|f| f.is_reportable()).collect();

        if reportable.is_empty() {
            writer
                .write_event(Event::Empty(BytesStart::new("report")))
                .map_err(xml_err)?;
        } else {
            writer
                .write_event(Event::Start(BytesStart::new("report")))
                .map_err(xml_err)?;
            for file in reportable {
                write_file(&mut writer, file)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("report")))
                .map_err(xml_err)?;
        }

        let out = writer.into_inner();
        out.write_all(b"\n")?;
        out.flush()
    }
}

fn write_file<W: Write>(writer: &mut Writer<W>, file: &FileRecord) -> io::Result<()> {
    let mut start = BytesStart::new("file");
    start.push_attribute(("path", xml_safe(&file.path).as_ref()));
    writer.write_event(Event::Start(start)).map_err(xml_err)?;

    for finding in &file.problems {
        let line = finding.line.to_string();
        let column = finding.column.map(|c| c.to_string());
        let severity = finding.severity.to_string();

        let mut problem = BytesStart::new("problem");
        problem.push_attribute(("line", line.as_str()));
        if let Some(column) = &column {
            problem.push_attribute(("column", column.as_str()));
        }
        problem.push_attribute(("severity", severity.as_str()));
        problem.push_attribute(("rule", xml_safe(&finding.rule_id).as_ref()));
        problem.push_attribute(("message", xml_safe(&finding.message).as_ref()));
        writer.write_event(Event::Empty(problem)).map_err(xml_err)?;
    }

    if let Some(reason) = &file.error {
        let mut error = BytesStart::new("error");
        error.push_attribute(("message", xml_safe(reason).as_ref()));
        writer.write_event(Event::Empty(error)).map_err(xml_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("file")))
        .map_err(xml_err)
}

fn is_xml_char(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Replaces characters XML 1.0 forbids with U+FFFD.
fn xml_safe(value: &str) -> Cow<'_, str> {
    if value.chars().all(is_xml_char) {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(
            value
                .chars()
                .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
                .collect(),
        )
    }
}

fn xml_err(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

impl<W: Write> Reporter for XmlReporter<W> {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn file_started(&mut self, path: &SourcePath) -> io::Result<()> {
        self.record_for(path);
        Ok(())
    }

    fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        self.record_for(&finding.path).problems.push(finding.clone());
        Ok(())
    }

    fn parse_failed(&mut self, path: &SourcePath, reason: &str) -> io::Result<()> {
        self.record_for(path).error = Some(reason.to_owned());
        Ok(())
    }

    fn scan_finished(&mut self, _summary: &ScanSummary) -> io::Result<()> {
        self.write_document()
    }
}
