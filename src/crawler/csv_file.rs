//! CSV hand-off file between the crawl step and the data movement step

use std::fs;
use std::path::Path;
use tracing::debug;

use super::PriceRecord;
use crate::error::{ErrorCode, PipelineError, Result};

/// Column order of the hand-off file
pub const CSV_HEADER: [&str; 7] = ["time", "open", "high", "low", "close", "volume", "symbol"];

/// Write records to `path`. The header is written even when there are no
/// records so a previous crawl's file never survives an empty crawl.
pub fn write_csv(path: &Path, records: &[PriceRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Read records written by [`write_csv`]. A leading unnamed index column, as
/// written by dataframe tools, is ignored.
pub fn read_csv(path: &Path) -> Result<Vec<PriceRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            PipelineError::data_with_code(
                ErrorCode::DATA_INVALID_FORMAT,
                format!("{} has no '{}' column", path.display(), name),
            )
        })
    };
    let columns = [
        position("time")?,
        position("open")?,
        position("high")?,
        position("low")?,
        position("close")?,
        position("volume")?,
        position("symbol")?,
    ];

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let text = |idx: usize| row.get(columns[idx]).unwrap_or_default().trim();
        let number = |idx: usize| {
            text(idx).parse::<f64>().map_err(|e| {
                PipelineError::data_with_code(
                    ErrorCode::DATA_INVALID_FORMAT,
                    format!("row {}: invalid {} '{}': {}", line + 1, CSV_HEADER[idx], text(idx), e),
                )
            })
        };

        records.push(PriceRecord {
            time: text(0).to_string(),
            open: number(1)?,
            high: number(2)?,
            low: number(3)?,
            close: number(4)?,
            volume: number(5)? as i64,
            symbol: text(6).to_string(),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(time: &str, close: f64) -> PriceRecord {
        PriceRecord {
            time: time.to_string(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close,
            volume: 1200,
            symbol: "NVDA".to_string(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prices.csv");
        let records = vec![
            record("2024-11-14 09:30:00", 1.5),
            record("2024-11-14 09:31:00", 1.75),
        ];

        write_csv(&path, &records).unwrap();
        assert_eq!(read_csv(&path).unwrap(), records);
    }

    #[test]
    fn test_empty_crawl_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        write_csv(&path, &[record("2024-11-14 09:30:00", 1.0)]).unwrap();

        write_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "time,open,high,low,close,volume,symbol");
        assert!(read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_skips_unnamed_index_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("indexed.csv");
        fs::write(
            &path,
            ",time,open,high,low,close,volume,symbol\n\
             0,2024-11-14 19:59:00,146.25,146.3,146.2,146.28,5321,NVDA\n",
        )
        .unwrap();

        let records = read_csv(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, "2024-11-14 19:59:00");
        assert_eq!(records[0].volume, 5321);
    }

    #[test]
    fn test_read_missing_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "time,open\n2024-11-14 19:59:00,1\n").unwrap();

        let err = read_csv(&path).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DATA_INVALID_FORMAT);
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(read_csv(&dir.path().join("absent.csv")).is_err());
    }
}
