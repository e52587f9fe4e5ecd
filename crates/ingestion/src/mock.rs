//! Mock 数据源
//!
//! 模拟生产者：每个数据源一个后台线程，按频率生成随机读数，
//! 可配置起始序列号、周期性跳号 (模拟丢包) 与额外延迟。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{
    unix_millis_now, RecordCallback, RecordSource, SensorRecord, SourceConfig, SourceId,
};
use rand::Rng;
use tracing::{debug, trace, warn};

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Mock 数据源
///
/// 实现 `RecordSource`，`stop()` 会等待后台线程退出后才返回。
pub struct MockRecordSource {
    config: SourceConfig,
    max_records: Option<u64>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl MockRecordSource {
    /// 根据数据源配置创建
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            max_records: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// 发送 `max_records` 条记录后停止生成 (线程保持到 `stop()`)
    pub fn with_max_records(mut self, max_records: u64) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// 数据源配置
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// 两次发送之间的间隔
    fn interval(&self) -> Duration {
        emit_interval(self.config.rate_hz, self.config.delay_ms)
    }
}

/// 频率换算为间隔；非法或过小的频率退化为 1 秒
fn emit_interval(rate_hz: f64, delay_ms: u64) -> Duration {
    let base = if rate_hz.is_finite() && rate_hz > 0.0 {
        Duration::try_from_secs_f64(1.0 / rate_hz).unwrap_or(Duration::from_secs(1))
    } else {
        Duration::from_secs(1)
    };
    base.saturating_add(Duration::from_millis(delay_ms))
}

/// 是否跳过该序列号 (每 k 个跳过第 k 个，序列号回绕后继续计数)
fn is_skipped(drop_every: Option<u64>, start_sequence: u64, sequence: u64) -> bool {
    match drop_every {
        Some(k) if k > 1 => sequence.wrapping_sub(start_sequence) % k == k - 1,
        _ => false,
    }
}

impl RecordSource for MockRecordSource {
    fn source_id(&self) -> SourceId {
        self.config.id
    }

    fn listen(&self, callback: RecordCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let config = self.config.clone();
        let interval = self.interval();
        let max_records = self.max_records;

        debug!(source_id = %config.id, ?interval, "starting mock record source");

        let handle = thread::spawn(move || {
            let mut rng = rand::rng();
            let (low, high) = config.kind.value_range();
            let mut sequence = config.start_sequence;
            let mut emitted = 0u64;

            loop {
                let exhausted = max_records.is_some_and(|max| emitted >= max);

                if !exhausted {
                    if is_skipped(config.drop_every, config.start_sequence, sequence) {
                        trace!(source_id = %config.id, sequence, "mock sequence skipped");
                    } else {
                        let value = rng.random_range(low..high);
                        callback(SensorRecord::new(
                            config.id,
                            value,
                            unix_millis_now(),
                            sequence,
                        ));
                        emitted += 1;
                    }
                    sequence = sequence.wrapping_add(1);
                }

                let wait = if exhausted { Duration::from_secs(3600) } else { interval };
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            debug!(source_id = %config.id, emitted, "mock record source stopped");
        });

        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Worker { stop_tx, handle });
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(Worker { stop_tx, handle }) = worker {
            let _ = stop_tx.send(());
            if handle.join().is_err() {
                warn!(source_id = %self.config.id, "mock record source thread panicked");
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for MockRecordSource {
    fn drop(&mut self) {
        self.stop();
    }
}
