//! RecordLog - one CSV row per consumed record
//!
//! Fed by the hub's record tap rather than by snapshots, so every record the
//! aggregator consumed shows up, duplicates included, stamped with the time
//! the hub received it.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::time::Duration;

use chrono::{Local, TimeZone};
use contracts::{ReceivedRecord, RecordLogConfig};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

const HEADER: &str = "timestamp,sensor_id,value,sequence,received_at";

/// Totals reported when the log task ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordLogStats {
    pub written: u64,
    pub write_errors: u64,
}

/// Buffered per-record CSV writer
pub struct RecordLog {
    config: RecordLogConfig,
    writer: BufWriter<File>,
    stats: RecordLogStats,
}

impl RecordLog {
    /// Open (or create) the file; the header is written only to an empty file
    pub fn open(config: RecordLogConfig) -> std::io::Result<Self> {
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
            config,
            writer,
            stats: RecordLogStats::default(),
        })
    }

    pub fn stats(&self) -> RecordLogStats {
        self.stats
    }

    pub fn write(&mut self, received: &ReceivedRecord) -> std::io::Result<()> {
        let record = &received.record;
        writeln!(
            self.writer,
            "{},{},{:.2},{},{}",
            record.timestamp,
            record.source_id,
            record.value,
            record.sequence,
            format_local_millis(received.received_at_ms),
        )?;
        self.stats.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Drain `rx` on a background task until every sender is gone
    ///
    /// Buffered rows are flushed every `flush_interval` and once more at the
    /// end.
    pub fn spawn(self, rx: mpsc::Receiver<ReceivedRecord>) -> JoinHandle<RecordLogStats> {
        tokio::spawn(self.run(rx))
    }

    #[instrument(name = "record_log", skip_all, fields(path = %self.config.path.display()))]
    async fn run(mut self, mut rx: mpsc::Receiver<ReceivedRecord>) -> RecordLogStats {
        let period = self.config.flush_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("record log started");

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(received) => {
                        if let Err(e) = self.write(&received) {
                            self.stats.write_errors += 1;
                            warn!(error = %e, "record log write failed");
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.flush() {
                        warn!(error = %e, "record log flush failed");
                    }
                }
            }
        }

        if let Err(e) = self.flush() {
            self.stats.write_errors += 1;
            warn!(error = %e, "record log final flush failed");
        }
        info!(
            written = self.stats.written,
            write_errors = self.stats.write_errors,
            "record log closed"
        );
        self.stats
    }
}

/// Local wall-clock time, `YYYY-MM-DD HH:MM:SS.mmm`
fn format_local_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}
