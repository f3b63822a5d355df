//! Semicolon-delimited report files — the durable handoff between the
//! extraction stage and the markup/write stage.

use std::path::Path;

use thiserror::Error;

use satsync_core::ExtractedPrice;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("report format error at {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Writes extraction results as a semicolon-delimited report.
///
/// Parent directories are created as needed. Columns:
/// `sku;name;price;availability;source_url;confidence;extracted_at`.
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be created or a row fails to
/// serialize.
pub fn write_report(path: &Path, results: &[ExtractedPrice]) -> Result<(), ReportError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: display.clone(),
                source,
            })?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|source| ReportError::Csv {
            path: display.clone(),
            source,
        })?;

    for result in results {
        writer.serialize(result).map_err(|source| ReportError::Csv {
            path: display.clone(),
            source,
        })?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        path: display,
        source,
    })?;

    tracing::info!(path = %path.display(), rows = results.len(), "report written");
    Ok(())
}

/// Reads a report previously written by [`write_report`].
///
/// # Errors
///
/// Returns [`ReportError`] if the file cannot be opened or a row fails to
/// deserialize.
pub fn read_report(path: &Path) -> Result<Vec<ExtractedPrice>, ReportError> {
    let display = path.display().to_string();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .map_err(|source| ReportError::Csv {
            path: display.clone(),
            source,
        })?;

    let mut results = Vec::new();
    for row in reader.deserialize::<ExtractedPrice>() {
        let result = row.map_err(|source| ReportError::Csv {
            path: display.clone(),
            source,
        })?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use satsync_core::{Availability, MatchConfidence};

    fn sample(sku: &str, confidence: MatchConfidence) -> ExtractedPrice {
        ExtractedPrice {
            sku: sku.to_string(),
            name: format!("Брусок строганый {sku}"),
            price: 1234.56,
            availability: Availability::InStock,
            source_url: "https://nnv.saturn.net/catalog/?s=103516".to_string(),
            confidence,
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn report_round_trips_including_confidence() {
        let path = std::env::temp_dir().join(format!(
            "satsync-report-test-{}.csv",
            std::process::id()
        ));
        let written = vec![
            sample("103516", MatchConfidence::Confirmed),
            sample("007556", MatchConfidence::Heuristic),
        ];

        write_report(&path, &written).unwrap();
        let read = read_report(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read, written);
        assert_eq!(read[0].confidence, MatchConfidence::Confirmed);
        assert_eq!(read[1].confidence, MatchConfidence::Heuristic);
    }

    #[test]
    fn report_uses_semicolon_delimiter() {
        let path = std::env::temp_dir().join(format!(
            "satsync-report-delim-test-{}.csv",
            std::process::id()
        ));
        write_report(&path, &[sample("103516", MatchConfidence::Confirmed)]).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let header = raw.lines().next().unwrap();
        assert_eq!(
            header,
            "sku;name;price;availability;source_url;confidence;extracted_at"
        );
    }

    #[test]
    fn missing_report_is_an_error() {
        let path = std::env::temp_dir().join("satsync-report-test-definitely-missing.csv");
        assert!(matches!(read_report(&path), Err(ReportError::Csv { .. })));
    }
}
