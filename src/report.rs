//! The persisted equivalence report.
//!
//! Classification may prove distinct concepts logically equivalent; those
//! findings are exported for human review and never auto-applied. The
//! line-oriented format is deliberately stable — sorted members, sorted
//! groups, tab separators — so reports from consecutive runs can be diffed
//! with ordinary text tools.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::concept::ConceptId;
use crate::error::{BridgeResult, StoreError};

/// Ordered collection of equivalence groups from one run.
///
/// Each group holds ≥2 external identifiers sorted ascending; groups are
/// sorted lexicographically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceReport {
    pub groups: Vec<Vec<ConceptId>>,
}

impl EquivalenceReport {
    /// Whether classification proved any equivalences.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Write the report: one group per line, members tab-separated.
    pub fn write_to<W: Write>(&self, mut w: W) -> BridgeResult<()> {
        for group in &self.groups {
            let mut first = true;
            for member in group {
                if !first {
                    write!(w, "\t").map_err(StoreError::from)?;
                }
                write!(w, "{}", member.get()).map_err(StoreError::from)?;
                first = false;
            }
            writeln!(w).map_err(StoreError::from)?;
        }
        Ok(())
    }

    /// Write the report to a file at the caller-specified location.
    pub fn write_to_path(&self, path: &Path) -> BridgeResult<()> {
        let file = std::fs::File::create(path).map_err(StoreError::from)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    /// Render to a string (the same format `write_to` produces).
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        String::from_utf8(buf).unwrap_or_default()
    }
}
