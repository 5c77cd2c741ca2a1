use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// One line of the operation journal.
#[derive(Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: String,
    pub action: String,
    pub input: String,
    pub output: Option<String>,
    pub report: serde_json::Value,
}

impl JournalEntry {
    pub fn new<T: Serialize>(
        action: &str,
        input: &Path,
        output: Option<&Path>,
        report: &T,
    ) -> io::Result<Self> {
        Ok(Self {
            timestamp: Utc::now().to_rfc3339(),
            action: action.to_string(),
            input: input.display().to_string(),
            output: output.map(|p| p.display().to_string()),
            report: serde_json::to_value(report)?,
        })
    }
}

/// Appends `entry` as a single JSON line, creating the journal if needed.
pub fn append(journal: &Path, entry: &JournalEntry) -> io::Result<()> {
    let json = serde_json::to_string(entry)?;

    let mut file = OpenOptions::new().create(true).append(true).open(journal)?;

    writeln!(file, "{}", json)
}
