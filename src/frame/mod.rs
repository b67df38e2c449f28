//! Tabular reshaping of crawled prices and the Parquet encoding of a partition
//!
//! Rows are kept as typed structs while they are reshaped; polars is only used
//! at the Parquet boundary.

use chrono::NaiveDate;
use polars::prelude::*;
use std::io::Cursor;

use crate::crawler::PriceRecord;
use crate::error::{ErrorCode, PipelineError, Result};

/// Columns of a cleaned partition, in file order
pub const COLUMNS: [&str; 9] = [
    "time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "symbol",
    "stock_date",
    "stock_time",
];

/// Date formats accepted in the `time` column before normalisation
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Canonical date format of `stock_date`
pub const STOCK_DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub symbol: String,
    pub stock_date: String,
    pub stock_time: String,
}

/// A cleaned day of intraday prices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockFrame {
    rows: Vec<StockRow>,
}

impl StockFrame {
    /// Split `time` into `stock_date` and `stock_time` and normalise the date.
    pub fn clean(records: &[PriceRecord]) -> Result<Self> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                let (date, time) = split_timestamp(&record.time).ok_or_else(|| {
                    PipelineError::data_with_code(
                        ErrorCode::DATA_INVALID_FORMAT,
                        format!("row {}: '{}' is not '<date> <time>'", idx, record.time),
                    )
                })?;
                Ok(StockRow {
                    time: record.time.clone(),
                    open: record.open,
                    high: record.high,
                    low: record.low,
                    close: record.close,
                    volume: record.volume,
                    symbol: record.symbol.clone(),
                    stock_date: normalize_date(date).ok_or_else(|| {
                        PipelineError::data_with_code(
                            ErrorCode::DATA_INVALID_FORMAT,
                            format!("row {}: unrecognised date '{}'", idx, date),
                        )
                    })?,
                    stock_time: time.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[StockRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `stock_date` of the newest row; the partition the frame is stored under.
    /// Rows arrive oldest first, so a window spanning midnight lands on the later day.
    pub fn partition_date(&self) -> Option<&str> {
        self.rows.last().map(|row| row.stock_date.as_str())
    }

    pub fn symbol(&self) -> Option<&str> {
        self.rows.first().map(|row| row.symbol.as_str())
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.volume as f64).collect()
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let rows = &self.rows;
        let df = df!(
            "time" => rows.iter().map(|r| r.time.clone()).collect::<Vec<String>>(),
            "open" => rows.iter().map(|r| r.open).collect::<Vec<f64>>(),
            "high" => rows.iter().map(|r| r.high).collect::<Vec<f64>>(),
            "low" => rows.iter().map(|r| r.low).collect::<Vec<f64>>(),
            "close" => rows.iter().map(|r| r.close).collect::<Vec<f64>>(),
            "volume" => rows.iter().map(|r| r.volume).collect::<Vec<i64>>(),
            "symbol" => rows.iter().map(|r| r.symbol.clone()).collect::<Vec<String>>(),
            "stock_date" => rows.iter().map(|r| r.stock_date.clone()).collect::<Vec<String>>(),
            "stock_time" => rows.iter().map(|r| r.stock_time.clone()).collect::<Vec<String>>(),
        )?;
        Ok(df)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let time = string_column(df, "time")?;
        let open = float_column(df, "open")?;
        let high = float_column(df, "high")?;
        let low = float_column(df, "low")?;
        let close = float_column(df, "close")?;
        let volume = int_column(df, "volume")?;
        let symbol = string_column(df, "symbol")?;
        let stock_date = string_column(df, "stock_date")?;
        let stock_time = string_column(df, "stock_time")?;

        let rows = (0..df.height())
            .map(|i| StockRow {
                time: time[i].clone(),
                open: open[i],
                high: high[i],
                low: low[i],
                close: close[i],
                volume: volume[i],
                symbol: symbol[i].clone(),
                stock_date: stock_date[i].clone(),
                stock_time: stock_time[i].clone(),
            })
            .collect();

        Ok(Self { rows })
    }

    /// Encode the frame as a Parquet file
    pub fn to_parquet(&self) -> Result<Vec<u8>> {
        let mut df = self.to_dataframe()?;
        let mut buffer = Vec::new();
        ParquetWriter::new(&mut buffer).finish(&mut df)?;
        Ok(buffer)
    }

    /// Decode a Parquet file written by [`StockFrame::to_parquet`]
    pub fn from_parquet(bytes: Vec<u8>) -> Result<Self> {
        let df = ParquetReader::new(Cursor::new(bytes)).finish()?;
        Self::from_dataframe(&df)
    }

    /// First `n` rows as a Markdown table
    pub fn preview_markdown(&self, n: usize) -> String {
        let mut out = format!("| {} |\n", COLUMNS.join(" | "));
        out.push_str(&format!("|{}\n", "---|".repeat(COLUMNS.len())));
        for row in self.rows.iter().take(n) {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                row.time,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume,
                row.symbol,
                row.stock_date,
                row.stock_time
            ));
        }
        out
    }
}

fn split_timestamp(timestamp: &str) -> Option<(&str, &str)> {
    let mut parts = timestamp.split(' ').filter(|p| !p.is_empty());
    let date = parts.next()?;
    let time = parts.next()?;
    Some((date, time))
}

fn normalize_date(date: &str) -> Option<String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .map(|d| d.format(STOCK_DATE_FMT).to_string())
}

fn null_error(name: &str, row: usize) -> PipelineError {
    PipelineError::data_with_code(
        ErrorCode::DATA_INVALID_FORMAT,
        format!("column '{}' has a null at row {}", name, row),
    )
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df.column(name)?.as_materialized_series();
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.map(str::to_string).ok_or_else(|| null_error(name, i)))
        .collect()
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| null_error(name, i)))
        .collect()
}

fn int_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    series
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| null_error(name, i)))
        .collect()
}
