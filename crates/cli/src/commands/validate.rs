//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::ContractError;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Loading step that failed: read, parse or validate
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    queue_capacity: Option<usize>,
    dedup_window: Option<usize>,
    refresh_interval_ms: u64,
    source_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            failed_stage: Some("read"),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                failed_stage: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    queue_capacity: blueprint.queue.capacity,
                    dedup_window: blueprint.aggregator.dedup_window,
                    refresh_interval_ms: blueprint.presentation.refresh_interval_ms,
                    source_count: blueprint.sources.len(),
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            failed_stage: Some(failed_stage(&e)),
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn failed_stage(err: &ContractError) -> &'static str {
    match err {
        ContractError::ConfigRead { .. } => "read",
        ContractError::ConfigParse { .. } => "parse",
        ContractError::ConfigValidation { .. } | ContractError::SinkWrite { .. } => "validate",
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::HubBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - snapshots will be dropped".to_string());
    }

    if blueprint.sources.is_empty() {
        warnings.push("No simulated sources configured - `run` will only idle".to_string());
    }

    if blueprint.queue.capacity.is_none() {
        warnings.push("Handoff queue is unbounded - backlog can grow without limit".to_string());
    }

    if blueprint.aggregator.dedup_window.is_none() {
        warnings.push(
            "Dedup set is unbounded - memory grows with every distinct sequence".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            match summary.queue_capacity {
                Some(capacity) => println!("  Queue capacity: {}", capacity),
                None => println!("  Queue capacity: unbounded"),
            }
            match summary.dedup_window {
                Some(window) => println!("  Dedup window: {}", window),
                None => println!("  Dedup window: unbounded"),
            }
            println!("  Refresh interval: {} ms", summary.refresh_interval_ms);
            println!("  Sources: {}", summary.source_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(stage) = result.failed_stage {
            println!("\n  Failed at: {}", stage);
        }
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
        }
    }
}
