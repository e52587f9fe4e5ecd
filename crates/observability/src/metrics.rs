//! Telemetry Hub 指标收集模块
//!
//! 记录聚合器、交接队列与输出路由的运行指标。
//! 未安装 recorder 时所有调用均为空操作。

use contracts::{AggregateSnapshot, SourceId};
use metrics::{counter, gauge, histogram};

/// 从快照记录每个数据源的指标
///
/// 每次展示循环发出快照时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_snapshot_metrics;
///
/// let snapshot = hub.snapshot();
/// record_snapshot_metrics(&snapshot);
/// ```
pub fn record_snapshot_metrics(snapshot: &AggregateSnapshot) {
    counter!("telemetry_hub_snapshots_emitted_total").increment(1);
    gauge!("telemetry_hub_generation").set(snapshot.generation as f64);
    gauge!("telemetry_hub_sources").set(snapshot.len() as f64);

    for (source_id, stats) in &snapshot.sources {
        let source = source_id.to_string();

        gauge!("telemetry_hub_source_value", "source_id" => source.clone())
            .set(stats.current_value);
        gauge!("telemetry_hub_source_average", "source_id" => source.clone())
            .set(stats.average());
        gauge!("telemetry_hub_source_messages", "source_id" => source.clone())
            .set(stats.message_count as f64);
        gauge!("telemetry_hub_source_dropped", "source_id" => source)
            .set(stats.dropped_count as f64);
    }
}

/// 记录一条被接受的记录
pub fn record_accepted(source_id: SourceId) {
    counter!(
        "telemetry_hub_records_accepted_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// 记录重复记录 (被丢弃)
pub fn record_duplicate(source_id: SourceId) {
    counter!(
        "telemetry_hub_duplicates_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// 记录序列缺口
pub fn record_gap(source_id: SourceId, missed: u64) {
    let source = source_id.to_string();
    counter!("telemetry_hub_gaps_total", "source_id" => source.clone()).increment(1);
    counter!("telemetry_hub_dropped_messages_total", "source_id" => source).increment(missed);
}

/// 记录迟到记录 (序列号回退)
pub fn record_late(source_id: SourceId) {
    counter!(
        "telemetry_hub_late_records_total",
        "source_id" => source_id.to_string()
    )
    .increment(1);
}

/// 记录交接队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("telemetry_hub_queue_depth").set(depth as f64);
}

/// 记录快照分发
pub fn record_snapshot_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_hub_snapshots_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录端到端延迟 (生产时间戳到聚合完成)
pub fn record_ingest_latency_ms(latency_ms: f64) {
    histogram!("telemetry_hub_ingest_latency_ms").record(latency_ms);
}
