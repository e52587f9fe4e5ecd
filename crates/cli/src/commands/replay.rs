//! `replay` command implementation.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use aggregator::{FinalSummary, TelemetryHub};
use anyhow::{Context, Result};
use ingestion::TransportAdapter;
use tracing::{debug, info};

use crate::cli::ReplayArgs;
use crate::commands::load_blueprint;
use crate::error::CliError;

/// Lines read from a replay input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReplayCounts {
    pub lines: u64,
    pub queued: u64,
    pub rejected: u64,
}

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let blueprint = load_blueprint(args.config.as_deref())?;
    let hub = TelemetryHub::from_blueprint(&blueprint);
    hub.start()
        .await
        .map_err(CliError::HubStart)?;

    let transport = hub.transport();
    let counts = if args.input == Path::new("-") {
        info!("Replaying records from stdin");
        feed_in_background(BufReader::new(io::stdin()), transport).await?
    } else {
        if !args.input.exists() {
            return Err(CliError::InputNotFound(args.input.clone()).into());
        }
        info!(input = %args.input.display(), "Replaying records from file");
        let file = File::open(&args.input)
            .with_context(|| format!("Failed to open {}", args.input.display()))?;
        feed_in_background(BufReader::new(file), transport).await?
    };

    hub.shutdown()
        .await
        .map_err(CliError::HubShutdown)?;

    let summary = hub.summary();
    info!(
        lines = counts.lines,
        queued = counts.queued,
        rejected = counts.rejected,
        accepted = summary.total_messages,
        "Replay finished"
    );

    print_replay_result(&counts, &summary);
    Ok(())
}

/// Run [`feed_lines`] on the blocking pool so the ingest task keeps running
/// while input is read
pub(crate) async fn feed_in_background<R>(
    reader: R,
    transport: TransportAdapter,
) -> Result<ReplayCounts>
where
    R: BufRead + Send + 'static,
{
    tokio::task::spawn_blocking(move || feed_lines(reader, &transport))
        .await
        .context("Replay reader task failed")?
}

/// Push every non-blank line through the transport adapter
pub(crate) fn feed_lines<R: BufRead>(reader: R, transport: &TransportAdapter) -> Result<ReplayCounts> {
    let mut counts = ReplayCounts::default();

    for line in reader.lines() {
        let line = line.context("Failed to read replay input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        counts.lines += 1;
        if transport.on_message(line.as_bytes()) {
            counts.queued += 1;
        } else {
            counts.rejected += 1;
            debug!(line = counts.lines, "replay line rejected");
        }
    }

    Ok(counts)
}

fn print_replay_result(counts: &ReplayCounts, summary: &FinalSummary) {
    println!(
        "Replayed {} lines ({} queued, {} rejected)\n",
        counts.lines, counts.queued, counts.rejected
    );
    println!("{summary}");
}
