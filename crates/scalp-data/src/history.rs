//! CSV warm-up candle source.

use async_trait::async_trait;
use csv::ReaderBuilder;
use scalp_core::error::DataError;
use scalp_core::traits::HistoricalSource;
use scalp_core::types::Candle;
use serde::Deserialize;
use std::path::PathBuf;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Timestamp", alias = "ts")]
    timestamp: i64,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
}

/// Reads warm-up candles from `{dir}/{symbol}.csv`, one row per closed
/// candle with unix-second timestamps. Intended for pre-seeding the
/// indicator engine, never for trading decisions.
pub struct CsvHistory {
    dir: PathBuf,
}

impl CsvHistory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl HistoricalSource for CsvHistory {
    async fn recent_candles(
        &self,
        symbol: &str,
        timeframe_secs: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, DataError> {
        let path = self.dir.join(format!("{symbol}.csv"));
        if !path.exists() {
            return Err(DataError::NoDataAvailable(symbol.to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut candles = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
            candles.push(
                Candle::new(
                    record.timestamp,
                    record.timestamp + timeframe_secs,
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                )
                .warmup(),
            );
        }

        candles.sort_by_key(|c| c.start_ts);
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalp_core::types::CandleSource;
    use std::io::Write;

    #[tokio::test]
    async fn loads_sorted_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NIFTY25SEP24500CE.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "timestamp,open,high,low,close").unwrap();
        writeln!(f, "120,101.0,102.0,100.5,101.5").unwrap();
        writeln!(f, "0,100.0,101.0,99.5,100.5").unwrap();
        writeln!(f, "60,100.5,101.5,100.0,101.0").unwrap();

        let source = CsvHistory::new(dir.path());
        let candles = source
            .recent_candles("NIFTY25SEP24500CE", 60, 2)
            .await
            .unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].start_ts, 60);
        assert_eq!(candles[1].start_ts, 120);
        assert_eq!(candles[1].end_ts, 180);
        assert_eq!(candles[0].source, CandleSource::Warmup);
    }

    #[tokio::test]
    async fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvHistory::new(dir.path());
        let err = source.recent_candles("MISSING", 60, 10).await;
        assert!(matches!(err, Err(DataError::NoDataAvailable(_))));
    }
}
