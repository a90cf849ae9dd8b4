//! JSON run reports.
//!
//! Each run writes a single report to `{output_dir}/{date}/{run}.json`, where
//! `date` is the local date the run finished. A later run of the same kind on
//! the same day replaces the earlier report.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::GatherError;

/// Path of the report for `run` on `date`.
pub fn report_path(output_dir: &str, date: NaiveDate, run: &str) -> PathBuf {
    Path::new(output_dir)
        .join(date.to_string())
        .join(format!("{run}.json"))
}

/// Serialize `report` and write it under today's date directory.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, run = %run))]
pub async fn write_report<T: Serialize + ?Sized>(
    report: &T,
    output_dir: &str,
    run: &str,
) -> Result<PathBuf, GatherError> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(output_dir, Local::now().date_naive(), run);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring report directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CohortGatherResult;

    #[test]
    fn test_report_path_layout() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(
            report_path("/tmp/out", date, "cohorts"),
            PathBuf::from("/tmp/out/2025-05-06/cohorts.json")
        );
    }

    #[tokio::test]
    async fn test_write_report_roundtrips_through_disk() {
        let dir = std::env::temp_dir().join(format!("goodnews_report_{}", std::process::id()));
        let dir = dir.to_string_lossy().to_string();
        let result = CohortGatherResult {
            facultyNewsCount: 2,
            errors: vec!["Error gathering news for faculty Ann Lee: search API error: HTTP 500".into()],
            ..Default::default()
        };

        let path = write_report(&result, &dir, "cohorts").await.unwrap();
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(written["facultyNewsCount"], 2);
        assert_eq!(written["errors"].as_array().unwrap().len(), 1);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
