//! CSV export of fetched records.
//!
//! Records are fetched in full before the output file is touched, and the
//! file is written to a sibling `.partial` path then renamed into place. A
//! failed run never leaves a truncated export behind.

use anyhow::{Context, Result};
use miro_client::{fetch_all, Board, Member, PageSource, RetryPolicy};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Placeholder for absent timestamps.
const NOT_AVAILABLE: &str = "N/A";

/// A record that renders as one CSV row.
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

impl CsvRow for Member {
    fn header() -> &'static [&'static str] {
        &[
            "id",
            "active",
            "adminRoles",
            "email",
            "lastActivityAt",
            "license",
            "licenseAssignedAt",
            "role",
            "type",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.active.map(|a| a.to_string()).unwrap_or_default(),
            self.admin_roles_display(),
            self.email.clone().unwrap_or_default(),
            self.last_activity_at
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            self.license.clone().unwrap_or_default(),
            self.license_assigned_at
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            self.role.clone().unwrap_or_default(),
            self.member_type.clone().unwrap_or_default(),
        ]
    }
}

impl CsvRow for Board {
    fn header() -> &'static [&'static str] {
        &["Board ID", "Name", "Owner", "Created At", "Modified At", "Link"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone().unwrap_or_default(),
            self.owner
                .as_ref()
                .and_then(|o| o.name.clone())
                .unwrap_or_default(),
            self.created_at.clone().unwrap_or_default(),
            self.modified_at.clone().unwrap_or_default(),
            self.view_link.clone().unwrap_or_default(),
        ]
    }
}

/// Outcome of a completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Write a header plus one row per record.
pub fn write_rows<W: Write, R: CsvRow>(writer: W, records: &[R]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(R::header())?;
    for record in records {
        csv.write_record(record.row())?;
    }
    csv.flush()?;
    Ok(())
}

/// Write records to `path`, replacing it only once the full file is on disk.
pub fn write_export<R: CsvRow>(path: &Path, records: &[R]) -> Result<ExportSummary> {
    let partial = partial_path(path);

    let result = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))
        .and_then(|file| write_rows(std::io::BufWriter::new(file), records))
        .and_then(|_| {
            std::fs::rename(&partial, path)
                .with_context(|| format!("Failed to move export into {}", path.display()))
        });

    if let Err(err) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(err);
    }

    Ok(ExportSummary {
        path: path.to_path_buf(),
        rows: records.len(),
    })
}

/// Fetch every page from `source` and write the export.
///
/// Nothing is written if any page fails.
pub async fn run_export<S>(source: S, policy: RetryPolicy, path: &Path) -> Result<ExportSummary>
where
    S: PageSource + 'static,
    S::Item: CsvRow,
{
    let name = source.name().to_string();
    tracing::info!(source = %name, path = %path.display(), "Starting export");

    let records = fetch_all(source, policy)
        .await
        .with_context(|| format!("Export of {} aborted; no file was written", name))?;

    if records.is_empty() {
        tracing::warn!(source = %name, "No records returned; writing header-only export");
    }

    let summary = write_export(path, &records)?;
    tracing::info!(rows = summary.rows, path = %summary.path.display(), "Export written");
    Ok(summary)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export.csv".into());
    name.push(".partial");
    path.with_file_name(name)
}
