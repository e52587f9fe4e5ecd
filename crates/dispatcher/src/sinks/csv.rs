//! CsvSink - appends one row per source per snapshot

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use contracts::{AggregateSnapshot, ContractError, PresentationSink};
use tracing::{debug, error, instrument};

const HEADER: &str = "emitted_at,source_id,value,min,max,avg,count,dropped,last_timestamp";

const DEFAULT_FLUSH_EVERY: u64 = 10;

/// Configuration for CsvSink
#[derive(Debug, Clone)]
pub struct CsvSinkConfig {
    /// Output file
    pub path: PathBuf,
    /// Flush the buffered writer after this many snapshots
    pub flush_every: u64,
}

impl CsvSinkConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_every: DEFAULT_FLUSH_EVERY,
        }
    }

    /// Create config from params map
    ///
    /// `path` is required, `flush_every` defaults to 10.
    pub fn from_params(params: &HashMap<String, String>) -> std::io::Result<Self> {
        let path = params.get("path").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing 'path' parameter")
        })?;

        let flush_every = match params.get("flush_every") {
            Some(raw) => raw.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid 'flush_every' parameter: {raw}"),
                )
            })?,
            None => DEFAULT_FLUSH_EVERY,
        };

        Ok(Self {
            path: PathBuf::from(path),
            flush_every,
        })
    }
}

/// Sink that appends snapshot rows to a CSV file
pub struct CsvSink {
    name: String,
    config: CsvSinkConfig,
    writer: BufWriter<File>,
    rows: u64,
    unflushed: u64,
}

impl CsvSink {
    /// Open (or create) the CSV file; the header is written only to an empty file
    pub fn new(name: impl Into<String>, config: CsvSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = BufWriter::new(file);
        if is_empty {
            writeln!(writer, "{HEADER}")?;
        }

        Ok(Self {
            name: name.into(),
            config,
            writer,
            rows: 0,
            unflushed: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = CsvSinkConfig::from_params(params)?;
        Self::new(name, config)
    }

    /// Rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn write_rows(&mut self, snapshot: &AggregateSnapshot) -> std::io::Result<()> {
        let emitted_at = format_millis(snapshot.taken_at_ms);

        for (source_id, stats) in &snapshot.sources {
            writeln!(
                self.writer,
                "{},{},{},{},{},{:.3},{},{},{}",
                emitted_at,
                source_id,
                stats.current_value,
                stats.min_value,
                stats.max_value,
                stats.average(),
                stats.message_count,
                stats.dropped_count,
                stats.last_timestamp,
            )?;
            self.rows += 1;
        }

        self.unflushed += 1;
        if self.unflushed >= self.config.flush_every {
            self.writer.flush()?;
            self.unflushed = 0;
        }
        Ok(())
    }
}

/// RFC 3339 UTC with millisecond precision
fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}

impl PresentationSink for CsvSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "csv_sink_present",
        skip(self, snapshot),
        fields(sink = %self.name, generation = snapshot.generation)
    )]
    async fn present(&mut self, snapshot: &AggregateSnapshot) -> Result<(), ContractError> {
        self.write_rows(snapshot).map_err(|e| {
            error!(sink = %self.name, path = %self.config.path.display(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "csv_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.unflushed = 0;
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "csv_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, rows = self.rows, "CsvSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SourceId, SourceStats};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn snapshot() -> AggregateSnapshot {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::new(1),
            SourceStats {
                message_count: 2,
                dropped_count: 1,
                current_value: 3.0,
                min_value: 1.0,
                max_value: 3.0,
                sum_value: 4.0,
                last_timestamp: 1_700_000_000_500,
                ..Default::default()
            },
        );
        sources.insert(SourceId::new(0), SourceStats::default());
        AggregateSnapshot {
            generation: 2,
            taken_at_ms: 1_700_000_000_000,
            sources,
        }
    }

    #[tokio::test]
    async fn test_csv_sink_writes_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("telemetry.csv");
        let mut sink = CsvSink::new("csv", CsvSinkConfig::new(&path)).unwrap();

        sink.present(&snapshot()).await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(sink.rows(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("2023-11-14T22:13:20.000Z,0,"));
        assert_eq!(
            lines[2],
            "2023-11-14T22:13:20.000Z,1,3,1,3,2.000,2,1,1700000000500"
        );
    }

    #[tokio::test]
    async fn test_csv_sink_appends_without_second_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");

        for _ in 0..2 {
            let mut sink = CsvSink::new("csv", CsvSinkConfig::new(&path)).unwrap();
            sink.present(&snapshot()).await.unwrap();
            sink.close().await.unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(HEADER).count(), 1);
        assert_eq!(content.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_csv_sink_flushes_periodically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");
        let config = CsvSinkConfig {
            flush_every: 2,
            ..CsvSinkConfig::new(&path)
        };
        let mut sink = CsvSink::new("csv", config).unwrap();

        sink.present(&snapshot()).await.unwrap();
        sink.present(&snapshot()).await.unwrap();

        // Two snapshots reached the file without an explicit flush
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 5);
        sink.close().await.unwrap();
    }

    #[test]
    fn test_from_params() {
        assert!(CsvSinkConfig::from_params(&HashMap::new()).is_err());

        let mut params = HashMap::new();
        params.insert("path".to_string(), "a.csv".to_string());
        let config = CsvSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.path, PathBuf::from("a.csv"));
        assert_eq!(config.flush_every, DEFAULT_FLUSH_EVERY);

        params.insert("flush_every".to_string(), "0".to_string());
        assert!(CsvSinkConfig::from_params(&params).is_err());
    }
}
