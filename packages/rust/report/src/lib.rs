//! CSV report artifacts for completed batch runs.
//!
//! One row per result, columns in the fixed wire order. File names carry a
//! generation timestamp so repeated runs never clobber each other.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use phonescout_shared::{PhoneLookupResult, PhonescoutError, Result};

/// File-name prefix for batch reports.
pub const REPORT_PREFIX: &str = "validated_numbers";

/// Render results as CSV text: header row first, then one row per result.
pub fn render_csv(results: &[PhoneLookupResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer
            .serialize(result)
            .map_err(|e| PhonescoutError::Csv(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PhonescoutError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PhonescoutError::Csv(e.to_string()))
}

/// Write a timestamped report into `dir`, creating the directory if needed.
/// Returns the path of the written file.
pub fn write_report(dir: &Path, results: &[PhoneLookupResult]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| PhonescoutError::io(dir, e))?;

    let path = dir.join(report_file_name(Local::now()));
    std::fs::write(&path, render_csv(results)?).map_err(|e| PhonescoutError::io(&path, e))?;

    info!(path = %path.display(), rows = results.len(), "wrote batch report");
    Ok(path)
}

/// `validated_numbers_YYYYMMDD_HHMMSS.csv`
pub fn report_file_name(at: DateTime<Local>) -> String {
    format!("{REPORT_PREFIX}_{}.csv", at.format("%Y%m%d_%H%M%S"))
}
