//! 配置校验模块
//!
//! 校验规则：
//! - source id 唯一
//! - MIN_RATE_HZ <= rate_hz <= MAX_RATE_HZ, drop_every >= 2
//! - 队列容量 / 去重窗口 / 刷新间隔 > 0
//! - sink 名称非空且唯一，csv sink 必须提供 path
//! - record_log 路径非空，刷盘间隔与通道容量 > 0

use std::collections::HashSet;

use contracts::{ContractError, HubBlueprint, SinkType};

/// 最低发送频率 (每 1000 秒一条)
pub const MIN_RATE_HZ: f64 = 0.001;
/// 最高发送频率 (间隔 10 微秒)
pub const MAX_RATE_HZ: f64 = 100_000.0;

/// 校验 HubBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    validate_queue(blueprint)?;
    validate_aggregator(blueprint)?;
    validate_presentation(blueprint)?;
    validate_source_ids(blueprint)?;
    validate_source_rates(blueprint)?;
    validate_sinks(blueprint)?;
    validate_record_log(blueprint)?;
    Ok(())
}

/// 校验队列容量
fn validate_queue(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    if blueprint.queue.capacity == Some(0) {
        return Err(ContractError::config_validation(
            "queue.capacity",
            "capacity must be > 0 (omit it for an unbounded queue)",
        ));
    }
    Ok(())
}

/// 校验去重窗口
fn validate_aggregator(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    if blueprint.aggregator.dedup_window == Some(0) {
        return Err(ContractError::config_validation(
            "aggregator.dedup_window",
            "dedup_window must be > 0 (omit it for exact duplicate detection)",
        ));
    }
    Ok(())
}

/// 校验刷新间隔
fn validate_presentation(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    if blueprint.presentation.refresh_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "presentation.refresh_interval_ms",
            "refresh_interval_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验 source id 唯一性
fn validate_source_ids(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for source in &blueprint.sources {
        if !seen.insert(source.id) {
            return Err(ContractError::config_validation(
                format!("sources[id={}]", source.id),
                "duplicate source id",
            ));
        }
    }
    Ok(())
}

/// 校验发送频率与丢包模拟参数
fn validate_source_rates(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    for source in &blueprint.sources {
        if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&source.rate_hz) {
            return Err(ContractError::config_validation(
                format!("sources[{}].rate_hz", source.id),
                format!(
                    "rate_hz must be within {MIN_RATE_HZ}..={MAX_RATE_HZ}, got {}",
                    source.rate_hz
                ),
            ));
        }
        if let Some(k) = source.drop_every {
            if k < 2 {
                return Err(ContractError::config_validation(
                    format!("sources[{}].drop_every", source.id),
                    format!("drop_every must be >= 2, got {k}"),
                ));
            }
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::Csv && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "csv sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}

/// 校验逐条记录日志配置
fn validate_record_log(blueprint: &HubBlueprint) -> Result<(), ContractError> {
    let Some(log) = &blueprint.record_log else {
        return Ok(());
    };
    if log.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "record_log.path",
            "path cannot be empty",
        ));
    }
    if log.flush_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "record_log.flush_interval_ms",
            "flush_interval_ms must be > 0",
        ));
    }
    if log.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "record_log.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RecordLogConfig, SinkConfig, SourceConfig, SourceKind};
    use std::collections::HashMap;

    fn minimal_blueprint() -> HubBlueprint {
        HubBlueprint::simulation()
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_source_id() {
        let mut bp = minimal_blueprint();
        bp.sources.push(SourceConfig::new(0, SourceKind::Generic));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate source id"), "got: {err}");
    }

    #[test]
    fn test_invalid_rate() {
        let mut bp = minimal_blueprint();
        bp.sources[0].rate_hz = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("rate_hz must be within"), "got: {err}");
    }

    #[test]
    fn test_rate_outside_bounds() {
        for rate in [1e-300, f64::NAN, f64::INFINITY, 1e9, -2.0] {
            let mut bp = minimal_blueprint();
            bp.sources[1].rate_hz = rate;
            let err = validate(&bp).unwrap_err().to_string();
            assert!(err.contains("sources[1].rate_hz"), "rate {rate}, got: {err}");
        }

        let mut bp = minimal_blueprint();
        bp.sources[0].rate_hz = MIN_RATE_HZ;
        bp.sources[1].rate_hz = MAX_RATE_HZ;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_record_log_checks() {
        let mut bp = minimal_blueprint();
        bp.record_log = Some(RecordLogConfig::new("records.csv"));
        assert!(validate(&bp).is_ok());

        bp.record_log = Some(RecordLogConfig::new(""));
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("record_log.path"), "got: {err}");

        bp.record_log = Some(RecordLogConfig {
            flush_interval_ms: 0,
            ..RecordLogConfig::new("records.csv")
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("flush_interval_ms"), "got: {err}");

        bp.record_log = Some(RecordLogConfig {
            queue_capacity: 0,
            ..RecordLogConfig::new("records.csv")
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("record_log.queue_capacity"), "got: {err}");
    }

    #[test]
    fn test_invalid_drop_every() {
        let mut bp = minimal_blueprint();
        bp.sources[2].drop_every = Some(1);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("drop_every must be >= 2"), "got: {err}");
    }

    #[test]
    fn test_zero_capacity() {
        let mut bp = minimal_blueprint();
        bp.queue.capacity = Some(0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("queue.capacity"), "got: {err}");
    }

    #[test]
    fn test_zero_dedup_window() {
        let mut bp = minimal_blueprint();
        bp.aggregator.dedup_window = Some(0);
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_zero_refresh_interval() {
        let mut bp = minimal_blueprint();
        bp.presentation.refresh_interval_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("refresh_interval_ms"), "got: {err}");
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate sink name"), "got: {err}");
    }

    #[test]
    fn test_csv_sink_requires_path() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(SinkConfig {
            name: "csv".into(),
            sink_type: SinkType::Csv,
            queue_capacity: 8,
            params: HashMap::new(),
        });
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("path"), "got: {err}");

        bp.sinks[1]
            .params
            .insert("path".into(), "telemetry_log.csv".into());
        assert!(validate(&bp).is_ok());
    }
}
