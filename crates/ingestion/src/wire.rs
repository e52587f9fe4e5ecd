//! 线格式编解码
//!
//! 一条记录一个 JSON 对象：
//! `{"id": 42, "value": 25.5, "timestamp": 1234567890, "sequence": 7}`

use contracts::SensorRecord;

use crate::error::{IngestionError, Result};

/// 编码为 JSON 文本
pub fn encode(record: &SensorRecord) -> Result<String> {
    serde_json::to_string(record).map_err(|e| IngestionError::Encode {
        message: e.to_string(),
    })
}

/// 从 JSON 字节解码
///
/// 缺少字段、类型不符、非 JSON 都返回 `IngestionError::Decode`。
pub fn decode(payload: &[u8]) -> Result<SensorRecord> {
    serde_json::from_slice(payload).map_err(|e| IngestionError::Decode {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let record = SensorRecord::new(42, 25.5, 1_234_567_890, 7);
        let text = encode(&record).unwrap();
        let decoded = decode(text.as_bytes()).unwrap();

        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_external_payload() {
        let payload = br#"{"id":3,"value":-1.25,"timestamp":1700000000000,"sequence":0}"#;
        let record = decode(payload).unwrap();

        assert_eq!(record.source_id.get(), 3);
        assert_eq!(record.value, -1.25);
        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert_eq!(record.sequence, 0);
    }

    #[test]
    fn test_decode_missing_field() {
        let err = decode(br#"{"id":1,"value":2.0,"timestamp":3}"#).unwrap_err();
        assert!(matches!(err, IngestionError::Decode { .. }));
    }

    #[test]
    fn test_decode_wrong_type() {
        let err = decode(br#"{"id":"one","value":2.0,"timestamp":3,"sequence":4}"#).unwrap_err();
        assert!(matches!(err, IngestionError::Decode { .. }));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"not json").is_err());
        assert!(decode(b"").is_err());
    }
}
