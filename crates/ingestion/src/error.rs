//! Ingestion 错误类型

use contracts::SourceId;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 线格式解码失败 (消息被丢弃，不计入丢包)
    #[error("failed to decode wire record: {message}")]
    Decode {
        /// 错误消息
        message: String,
    },

    /// 线格式编码失败
    #[error("failed to encode wire record: {message}")]
    Encode {
        /// 错误消息
        message: String,
    },

    /// 队列已停止，拒绝新记录
    #[error("handoff queue stopped, record {source_id}#{sequence} rejected")]
    QueueStopped {
        /// 数据源 ID
        source_id: SourceId,
        /// 序列号
        sequence: u64,
    },

    /// 有界队列已满 (drop_newest 策略)
    #[error("handoff queue full, record {source_id}#{sequence} dropped")]
    QueueFull {
        /// 数据源 ID
        source_id: SourceId,
        /// 序列号
        sequence: u64,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
