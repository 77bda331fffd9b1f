//! Batch rendering from a request list.
//!
//! A list file holds one `identifier request` pair per line:
//!
//! ```text
//! # cover images
//! page1 full/max/0/default.jpg
//! page2 square/200,/0/gray.png
//! ```
//!
//! Blank lines and `#` comments are skipped. Lines that do not split into an
//! identifier and a valid request path are reported and skipped; the rest
//! render in parallel on the global rayon pool.

use crate::output::output_file_name;
use crate::request::RequestSegments;
use crate::service::IiifService;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// 1-based line number in the list file.
    pub line: usize,
    pub identifier: String,
    pub segments: RequestSegments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

/// Split a list file into entries and skipped lines.
pub fn parse_batch_list(content: &str) -> (Vec<BatchEntry>, Vec<SkippedLine>) {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let (Some(identifier), Some(request), None) = (parts.next(), parts.next(), parts.next())
        else {
            skipped.push(SkippedLine {
                line,
                reason: "expected '<identifier> <request>'".to_string(),
            });
            continue;
        };

        match RequestSegments::from_path(request) {
            Ok(segments) => entries.push(BatchEntry {
                line,
                identifier: identifier.to_string(),
                segments,
            }),
            Err(e) => skipped.push(SkippedLine {
                line,
                reason: e.to_string(),
            }),
        }
    }
    (entries, skipped)
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    /// `(line, error)` for every entry that failed to render or write.
    pub failed: Vec<(usize, String)>,
}

/// Render every entry into `output_dir`.
///
/// Files are named `{line}-{identifier}.{ext}` so repeated identifiers do
/// not overwrite each other.
pub fn run_batch(
    service: &IiifService,
    entries: &[BatchEntry],
    tier: Option<&str>,
    output_dir: &Path,
) -> BatchReport {
    let results: Vec<_> = entries
        .par_iter()
        .map(|entry| -> Result<PathBuf, (usize, String)> {
            let fail = |e: &dyn std::error::Error| (entry.line, e.to_string());
            let (compiled, rendered) = service
                .derive(&entry.identifier, tier, &entry.segments)
                .map_err(|e| fail(&e))?;
            let path = output_dir.join(format!(
                "{:04}-{}",
                entry.line,
                output_file_name(&entry.identifier, &compiled)
            ));
            std::fs::write(&path, &rendered.bytes).map_err(|e| fail(&e))?;
            Ok(path)
        })
        .collect();

    let mut report = BatchReport::default();
    for result in results {
        match result {
            Ok(path) => report.written.push(path),
            Err((line, message)) => {
                log::warn!("line {line}: {message}");
                report.failed.push((line, message));
            }
        }
    }
    report
}
