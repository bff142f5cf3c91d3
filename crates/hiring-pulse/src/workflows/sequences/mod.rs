//! CSV import of per-sequence outreach stats.

mod normalizer;
mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::workflows::pulse::SequenceStatInput;

pub use normalizer::SequenceDirectory;
use parser::SequenceRecord;

/// Sender recorded when neither the row nor the directory names one.
pub const UNKNOWN_SENDER: &str = "unknown";

#[derive(Debug)]
pub enum SequenceImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for SequenceImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceImportError::Io(err) => write!(f, "failed to read sequence export: {}", err),
            SequenceImportError::Csv(err) => write!(f, "invalid sequence CSV data: {}", err),
        }
    }
}

impl std::error::Error for SequenceImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SequenceImportError::Io(err) => Some(err),
            SequenceImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for SequenceImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SequenceImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Row left out of the import, with the CSV line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub line: u64,
    pub sequence: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub stats: Vec<SequenceStatInput>,
    pub skipped: Vec<SkippedRow>,
}

pub struct SequenceStatImporter;

impl SequenceStatImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        directory: &SequenceDirectory,
    ) -> Result<ImportSummary, SequenceImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, directory)
    }

    /// Rows for untracked sequences, with unreadable numbers, or repeating an earlier
    /// (sequence, date) pair are skipped rather than failing the import.
    pub fn from_reader<R: Read>(
        reader: R,
        directory: &SequenceDirectory,
    ) -> Result<ImportSummary, SequenceImportError> {
        let mut summary = ImportSummary::default();
        let mut seen = HashSet::new();

        for record in parser::parse_records(reader)? {
            let line = record.line;
            match resolve(record, directory) {
                Ok(stat) => {
                    if seen.insert((stat.sequence.to_lowercase(), stat.date)) {
                        summary.stats.push(stat);
                    } else {
                        summary.skipped.push(SkippedRow {
                            line,
                            sequence: stat.sequence,
                            reason: format!("duplicate row for {}", stat.date),
                        });
                    }
                }
                Err(skipped) => summary.skipped.push(skipped),
            }
        }

        for skipped in &summary.skipped {
            warn!(
                line = skipped.line,
                sequence = %skipped.sequence,
                reason = %skipped.reason,
                "sequence row skipped"
            );
        }
        info!(
            imported = summary.stats.len(),
            skipped = summary.skipped.len(),
            "sequence stats imported"
        );
        Ok(summary)
    }
}

fn resolve(
    record: SequenceRecord,
    directory: &SequenceDirectory,
) -> Result<SequenceStatInput, SkippedRow> {
    let skip = |reason: String| SkippedRow {
        line: record.line,
        sequence: record.sequence.clone(),
        reason,
    };

    if record.sequence.is_empty() {
        return Err(skip("blank sequence name".to_string()));
    }
    let counts = record.counts.clone().map_err(skip)?;
    if counts.replied > counts.sent {
        return Err(skip(format!(
            "replied {} exceeds sent {}",
            counts.replied, counts.sent
        )));
    }

    let role = match record
        .role
        .clone()
        .or_else(|| directory.role_for(&record.sequence).map(str::to_string))
    {
        Some(role) => role,
        None => return Err(skip("sequence is not tracked for any role".to_string())),
    };
    let sender = record
        .sender
        .clone()
        .or_else(|| directory.sender_for(&record.sequence).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string());

    Ok(SequenceStatInput {
        sequence: record.sequence,
        role,
        sender,
        date: counts.date,
        sent: counts.sent,
        opened: counts.opened,
        clicked: counts.clicked,
        replied: counts.replied,
        bounced: counts.bounced,
    })
}
