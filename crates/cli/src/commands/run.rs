//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::{HubBlueprint, RecordLogConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::commands::load_blueprint;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(refresh_ms) = args.refresh_ms {
        info!(refresh_ms, "Overriding refresh interval from CLI");
        blueprint.presentation.refresh_interval_ms = refresh_ms;
    }
    if let Some(delay_ms) = args.delay_ms {
        info!(delay_ms, "Overriding source delay from CLI");
        for source in &mut blueprint.sources {
            source.delay_ms = delay_ms;
        }
    }
    if let Some(path) = &args.record_log {
        info!(path = %path.display(), "Enabling record log from CLI");
        let log = blueprint
            .record_log
            .get_or_insert_with(|| RecordLogConfig::new(path));
        log.path = path.clone();
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid configuration")?;

    info!(
        sources = blueprint.sources.len(),
        sinks = blueprint.sinks.len(),
        refresh_ms = blueprint.presentation.refresh_interval_ms,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        duration: if args.duration == 0 {
            None
        } else {
            Some(Duration::from_secs(args.duration))
        },
        buffer_size: args.buffer_size,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        records = stats.summary.total_messages,
        dropped = stats.summary.total_dropped,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.records_per_second()),
        "Pipeline completed successfully"
    );

    stats.print_summary();

    info!("Telemetry Hub finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &HubBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Queue:");
    match blueprint.queue.capacity {
        Some(capacity) => println!(
            "  Capacity: {} ({:?} on overflow)",
            capacity, blueprint.queue.overflow_policy
        ),
        None => println!("  Capacity: unbounded"),
    }
    println!("  Dedup: {:?}", blueprint.aggregator.dedup_policy());
    println!(
        "  Refresh interval: {} ms",
        blueprint.presentation.refresh_interval_ms
    );

    println!("\nSources ({}):", blueprint.sources.len());
    for source in &blueprint.sources {
        let drop = source
            .drop_every
            .map(|k| format!(", skips every {k}th"))
            .unwrap_or_default();
        println!(
            "  - {} ({}) @ {} Hz from #{}{}",
            source.id,
            source.kind.label(),
            source.rate_hz,
            source.start_sequence,
            drop
        );
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    if let Some(log) = &blueprint.record_log {
        println!(
            "\nRecord log: {} (flush every {} ms)",
            log.path.display(),
            log.flush_interval_ms
        );
    }

    println!();
}
