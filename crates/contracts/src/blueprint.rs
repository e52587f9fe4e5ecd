//! HubBlueprint - Config Loader 输出
//!
//! 描述完整的 hub 配置：交接队列、聚合器、展示节流、模拟数据源、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::SourceId;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的 hub 配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 交接队列配置
    #[serde(default)]
    pub queue: QueueConfig,

    /// 聚合器配置
    #[serde(default)]
    pub aggregator: AggregatorConfig,

    /// 展示节流配置
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// 模拟数据源列表 (`run` 命令使用)
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// 逐条记录日志 (None = 不记录)
    #[serde(default)]
    pub record_log: Option<RecordLogConfig>,
}

impl HubBlueprint {
    /// 默认模拟场景：三个传感器 (温度/气压/湿度) + 日志输出
    pub fn simulation() -> Self {
        Self {
            sources: vec![
                SourceConfig::new(0, SourceKind::Temperature),
                SourceConfig::new(1, SourceKind::Pressure),
                SourceConfig::new(2, SourceKind::Humidity),
            ],
            sinks: vec![SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: default_queue_capacity(),
                params: HashMap::new(),
            }],
            ..Default::default()
        }
    }
}

/// 交接队列配置
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    /// 队列容量 (None = 无界)
    #[serde(default)]
    pub capacity: Option<usize>,

    /// 队列满时的溢出策略 (仅有界队列生效)
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

/// 溢出策略 (有界队列满时)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 丢弃最旧的记录
    #[default]
    DropOldest,
    /// 丢弃最新的记录
    DropNewest,
}

/// 聚合器配置
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// 去重窗口大小 (None = 无界精确去重)
    #[serde(default)]
    pub dedup_window: Option<usize>,
}

impl AggregatorConfig {
    /// 转换为去重策略
    pub fn dedup_policy(&self) -> DedupPolicy {
        match self.dedup_window {
            Some(window) => DedupPolicy::Window(window),
            None => DedupPolicy::Unbounded,
        }
    }
}

/// 重复序列号检测策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// 记住每个见过的序列号 (精确，内存无界)
    #[default]
    Unbounded,
    /// 只记住最近 K 个序列号；更早的重复会被当作新记录
    Window(usize),
}

/// 展示节流配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// 最小刷新间隔 (毫秒)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl PresentationConfig {
    /// 刷新间隔
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

fn default_refresh_interval_ms() -> u64 {
    200
}

/// 模拟数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 数据源 ID
    pub id: SourceId,

    /// 物理量类型
    #[serde(default)]
    pub kind: SourceKind,

    /// 发送频率 (Hz)，必须 > 0
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// 起始序列号
    #[serde(default)]
    pub start_sequence: u64,

    /// 每 k 个序列号跳过一个 (模拟丢包)
    #[serde(default)]
    pub drop_every: Option<u64>,

    /// 每次发送后的额外延迟 (毫秒)
    #[serde(default)]
    pub delay_ms: u64,
}

impl SourceConfig {
    /// 使用默认频率创建
    pub fn new(id: impl Into<SourceId>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            rate_hz: default_rate_hz(),
            start_sequence: 0,
            drop_every: None,
            delay_ms: 0,
        }
    }
}

fn default_rate_hz() -> f64 {
    2.0
}

/// 物理量类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// 温度 (°C)
    Temperature,
    /// 气压 (hPa)
    Pressure,
    /// 湿度 (%)
    Humidity,
    /// 通用
    #[default]
    Generic,
}

impl SourceKind {
    /// 模拟取值范围 [low, high)
    pub fn value_range(self) -> (f64, f64) {
        match self {
            Self::Temperature => (20.0, 30.0),
            Self::Pressure => (1000.0, 1020.0),
            Self::Humidity => (40.0, 60.0),
            Self::Generic => (0.0, 100.0),
        }
    }

    /// 显示名称
    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Humidity => "humidity",
            Self::Generic => "generic",
        }
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    16
}

/// 逐条记录 CSV 日志配置
///
/// 每条被聚合器消费的记录 (含重复) 写一行，附带 hub 接收时间。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordLogConfig {
    /// 输出文件路径
    pub path: PathBuf,

    /// 刷盘间隔 (毫秒)
    #[serde(default = "default_record_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// 记录通道容量，写入跟不上时多出的记录被丢弃并计数
    #[serde(default = "default_record_queue_capacity")]
    pub queue_capacity: usize,
}

impl RecordLogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_interval_ms: default_record_flush_interval_ms(),
            queue_capacity: default_record_queue_capacity(),
        }
    }

    /// 刷盘间隔
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

fn default_record_flush_interval_ms() -> u64 {
    1000
}

fn default_record_queue_capacity() -> usize {
    1024
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// CSV 文件输出
    Csv,
}
