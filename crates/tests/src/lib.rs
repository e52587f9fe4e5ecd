//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（mock 数据源 → hub → dispatcher）
//! - 多生产者并发计数校验
//! - 逐条记录日志 (hub 记录旁路 → RecordLog)

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{HubBlueprint, OverflowPolicy, SinkType};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_blueprint_toml_round_trip() {
        let toml = r#"
            [queue]
            capacity = 1024
            overflow_policy = "drop_newest"

            [aggregator]
            dedup_window = 256

            [presentation]
            refresh_interval_ms = 100

            [[sources]]
            id = 3
            kind = "pressure"
            rate_hz = 5.0
            drop_every = 4

            [[sinks]]
            name = "console"
            sink_type = "log"
        "#;

        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let text = ConfigLoader::to_toml(&blueprint).unwrap();
        let reparsed: HubBlueprint = ConfigLoader::load_from_str(&text, ConfigFormat::Toml).unwrap();

        assert_eq!(reparsed.queue.capacity, Some(1024));
        assert_eq!(reparsed.queue.overflow_policy, OverflowPolicy::DropNewest);
        assert_eq!(reparsed.aggregator.dedup_window, Some(256));
        assert_eq!(reparsed.presentation.refresh_interval_ms, 100);
        assert_eq!(reparsed.sources.len(), 1);
        assert_eq!(reparsed.sources[0].drop_every, Some(4));
        assert_eq!(reparsed.sinks[0].sink_type, SinkType::Log);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use aggregator::{HubOutputs, TelemetryHub};
    use contracts::{
        DedupPolicy, HubBlueprint, QueueConfig, RecordLogConfig, SensorRecord, SinkConfig,
        SinkType, SourceConfig, SourceKind,
    };
    use dispatcher::{create_dispatcher, RecordLog};
    use ingestion::{IngestionPipeline, MockRecordSource};
    use tokio::sync::mpsc;

    fn fast_source(id: i64, kind: SourceKind) -> SourceConfig {
        SourceConfig {
            rate_hz: 500.0,
            ..SourceConfig::new(id, kind)
        }
    }

    /// End-to-end test: MockRecordSource -> TelemetryHub -> Dispatcher(CSV)
    ///
    /// 验证完整的数据流：
    /// 1. MockRecordSource 生成带跳号的记录
    /// 2. TelemetryHub 聚合并检测丢包
    /// 3. Dispatcher 将 AggregateSnapshot 写入 CSV
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("telemetry.csv");

        let hub = Arc::new(TelemetryHub::new(
            QueueConfig::default(),
            DedupPolicy::Unbounded,
            Duration::from_millis(10),
        ));

        let (snapshot_tx, snapshot_rx) = mpsc::channel(16);
        let dispatcher = create_dispatcher(
            &[SinkConfig {
                name: "csv".to_string(),
                sink_type: SinkType::Csv,
                queue_capacity: 16,
                params: HashMap::from([(
                    "path".to_string(),
                    csv_path.to_string_lossy().into_owned(),
                )]),
            }],
            snapshot_rx,
        )
        .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        hub.start_with_presenter(snapshot_tx).await.unwrap();

        // sensor 0: 0,1,_,3,4,_,6,7 → 6 条，丢 2 条
        let lossy = SourceConfig {
            drop_every: Some(3),
            ..fast_source(0, SourceKind::Temperature)
        };
        let mut pipeline = IngestionPipeline::new(hub.submitter());
        pipeline.register_source(Box::new(MockRecordSource::new(lossy).with_max_records(6)));
        pipeline.register_source(Box::new(
            MockRecordSource::new(fast_source(1, SourceKind::Humidity)).with_max_records(10),
        ));
        pipeline.start_all();

        tokio::time::sleep(Duration::from_millis(300)).await;
        pipeline.stop_all();
        hub.shutdown().await.unwrap();

        let summary = hub.summary();
        let lossy = summary.get(0).unwrap();
        assert_eq!(lossy.messages, 6);
        assert_eq!(lossy.dropped, 2);
        assert!(lossy.min >= 20.0 && lossy.max < 30.0);

        let clean = summary.get(1).unwrap();
        assert_eq!(clean.messages, 10);
        assert_eq!(clean.dropped, 0);
        assert_eq!(summary.total_messages, 16);

        let sink_metrics = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .expect("dispatcher timed out")
            .unwrap();
        assert_eq!(sink_metrics.len(), 1);
        assert!(sink_metrics[0].1.presented > 0);

        let csv = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("emitted_at,source_id,value,min,max,avg,count,dropped,last_timestamp")
        );
        assert!(lines.next().is_some());
    }

    /// P 个生产者 × M 条记录：无丢失、无重复计数
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_are_counted_exactly() {
        const PRODUCERS: i64 = 6;
        const PER_PRODUCER: u64 = 500;

        let hub = Arc::new(TelemetryHub::from_blueprint(&HubBlueprint::default()));
        hub.start().await.unwrap();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|id| {
                let queue = hub.submitter();
                std::thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        queue
                            .push(SensorRecord::new(id, seq as f64, 0, seq))
                            .unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        hub.shutdown().await.unwrap();

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.generation, PRODUCERS as u64 * PER_PRODUCER);
        assert_eq!(snapshot.sources.len(), PRODUCERS as usize);
        for stats in snapshot.sources.values() {
            assert_eq!(stats.message_count, PER_PRODUCER);
            assert_eq!(stats.dropped_count, 0);
            assert_eq!(stats.duplicate_count, 0);
            assert_eq!(stats.min_value, 0.0);
            assert_eq!(stats.max_value, (PER_PRODUCER - 1) as f64);
        }
    }

    /// 线格式回放：重复、乱序与损坏的负载
    #[tokio::test]
    async fn test_transport_replay_scenario() {
        let hub = TelemetryHub::from_blueprint(&HubBlueprint::default());
        hub.start().await.unwrap();

        let transport = hub.transport();
        let payloads: [&[u8]; 6] = [
            br#"{"id": 9, "value": 1.0, "timestamp": 10, "sequence": 0}"#,
            br#"{"id": 9, "value": 2.0, "timestamp": 20, "sequence": 1}"#,
            br#"{"id": 9, "value": 5.0, "timestamp": 50, "sequence": 4}"#,
            br#"{"id": 9, "value": 2.0, "timestamp": 20, "sequence": 1}"#,
            br#"{"id": 9, "value": 3.0, "timestamp": 30, "sequence": 2}"#,
            b"not json",
        ];
        let accepted = payloads.iter().filter(|p| transport.on_message(p)).count();
        assert_eq!(accepted, 5);

        hub.shutdown().await.unwrap();

        let stats = hub.snapshot().sources[&contracts::SourceId::new(9)];
        assert_eq!(stats.message_count, 4);
        assert_eq!(stats.duplicate_count, 1);
        assert_eq!(stats.dropped_count, 2);
        assert_eq!(stats.late_count, 1);
        assert_eq!(stats.expected_sequence, 3);
        assert_eq!(stats.current_value, 3.0);
        assert_eq!(stats.last_timestamp, 30);

        assert_eq!(hub.ingestion_metrics().snapshot().decode_errors, 1);
    }

    /// 有界队列 + DropNewest：溢出记录被拒绝并计数
    #[tokio::test]
    async fn test_bounded_queue_overflow_before_start() {
        let hub = TelemetryHub::new(
            QueueConfig {
                capacity: Some(4),
                overflow_policy: contracts::OverflowPolicy::DropNewest,
            },
            DedupPolicy::Window(16),
            Duration::from_millis(50),
        );

        let rejected = (0..10u64)
            .filter(|seq| hub.submit(SensorRecord::new(1, 0.5, 0, *seq)).is_err())
            .count();
        assert_eq!(rejected, 6);

        hub.shutdown().await.unwrap();

        let summary = hub.summary();
        assert_eq!(summary.total_messages, 4);
        assert_eq!(hub.ingestion_metrics().snapshot().overflow_dropped, 6);
    }

    /// 记录日志包含每条被消费的记录 (含重复)，快照只反映被接受的记录；
    /// 关闭时最后一个快照仍会送达
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_record_log_and_final_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("records.csv");

        let hub = TelemetryHub::new(
            QueueConfig::default(),
            DedupPolicy::Unbounded,
            Duration::from_secs(30),
        );
        let log = RecordLog::open(RecordLogConfig::new(&log_path)).unwrap();
        let (record_tx, record_rx) = mpsc::channel(64);
        let log_handle = log.spawn(record_rx);
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(4);

        hub.start_with(HubOutputs::default().snapshots(snapshot_tx).records(record_tx))
            .await
            .unwrap();

        for seq in [0u64, 1, 1, 2, 5] {
            hub.submit(SensorRecord::new(11, 1.25 * seq as f64, 1_000 + seq as i64, seq))
                .unwrap();
        }
        hub.shutdown().await.unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(2), log_handle)
            .await
            .expect("record log timed out")
            .unwrap();
        assert_eq!(stats.written, 5);

        let content = std::fs::read_to_string(&log_path).unwrap();
        let rows: Vec<Vec<&str>> = content
            .lines()
            .skip(1)
            .map(|line| line.split(',').collect())
            .collect();
        let sequences: Vec<&str> = rows.iter().map(|row| row[3]).collect();
        assert_eq!(sequences, vec!["0", "1", "1", "2", "5"]);
        assert_eq!(&rows[4][..3], &["1005", "11", "6.25"]);

        // Refresh interval never elapsed; the shutdown flush still emitted
        let last = snapshot_rx.recv().await.unwrap();
        assert_eq!(last.generation, 4);
        assert_eq!(last.sources[&contracts::SourceId::new(11)].dropped_count, 2);
        assert!(snapshot_rx.recv().await.is_none());
    }
}
