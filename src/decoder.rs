//! Record decoding
//!
//! Each stream record is a compressed CloudWatch Logs subscription envelope.
//! Only `DATA_MESSAGE` envelopes carry log events; everything else is
//! discarded without error.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::client::RawRecord;
use crate::compression::{CompressionFactory, Decompressor};
use crate::config::CompressionAlgorithm;
use crate::error::{Error, Result};
use crate::metrics::ReaderMetrics;

/// One log event: field name to scalar value
pub type LogEvent = Map<String, Value>;

/// Envelope message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "String")]
pub enum MessageType {
    /// Carries log events
    Data,
    /// Health checks and other service chatter
    Control,
    /// Any other type, including a missing or non-string one
    Other(String),
}

impl MessageType {
    /// The wire name of the message type
    pub fn as_str(&self) -> &str {
        match self {
            Self::Data => "DATA_MESSAGE",
            Self::Control => "CONTROL_MESSAGE",
            Self::Other(name) => name,
        }
    }

    /// Whether this envelope carries log events
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data)
    }
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for MessageType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "DATA_MESSAGE" => Self::Data,
            "CONTROL_MESSAGE" => Self::Control,
            _ => Self::Other(name),
        }
    }
}

impl From<Value> for MessageType {
    fn from(value: Value) -> Self {
        match value {
            Value::String(name) => Self::from(name),
            Value::Null => Self::default(),
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<MessageType> for String {
    fn from(message_type: MessageType) -> Self {
        message_type.as_str().to_string()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log event entry inside an envelope
///
/// Only `extracted_fields` is read; the other members are kept as raw JSON
/// so their shape never affects decoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeEvent {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub extracted_fields: Option<Value>,
}

/// The decompressed JSON payload of a record
///
/// Everything except `message_type` is raw JSON. It is only interpreted
/// once the envelope is known to be a data message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(default)]
    pub log_group: Option<Value>,
    #[serde(default)]
    pub log_stream: Option<Value>,
    #[serde(default)]
    pub subscription_filters: Option<Value>,
    #[serde(default)]
    pub log_events: Option<Value>,
}

impl Envelope {
    /// Parse an envelope from decompressed bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::decode(format!("Invalid envelope JSON: {}", e)))
    }

    /// Extract the events of a data envelope
    ///
    /// Non-data envelopes yield nothing and are not inspected further. For
    /// data envelopes a missing or null event list is empty; a list of
    /// another JSON type, or an entry without an object of extracted
    /// fields, is an error.
    pub fn into_events(self) -> Result<Vec<LogEvent>> {
        if !self.message_type.is_data() {
            return Ok(Vec::new());
        }

        let entries = match self.log_events {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(Error::decode("logEvents of a data message is not a list"));
            }
        };

        entries
            .into_iter()
            .enumerate()
            .map(|(position, entry)| {
                let entry: EnvelopeEvent = serde_json::from_value(entry).map_err(|e| {
                    Error::decode(format!("Log event {} is not an object: {}", position, e))
                })?;
                match entry.extracted_fields {
                    Some(Value::Object(fields)) => Ok(fields),
                    Some(Value::Null) | None => Err(Error::decode(format!(
                        "Log event {} of a data message has no extractedFields",
                        position
                    ))),
                    Some(_) => Err(Error::decode(format!(
                        "extractedFields of log event {} is not an object",
                        position
                    ))),
                }
            })
            .collect()
    }
}

/// The outcome of decoding one record
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// The envelope's message type
    pub message_type: MessageType,
    /// Events in envelope order; empty unless `message_type` is data
    pub events: Vec<LogEvent>,
}

/// Decompresses and parses records into log events
pub struct RecordDecoder {
    decompressor: Box<dyn Decompressor>,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new(CompressionAlgorithm::Gzip)
    }
}

impl fmt::Debug for RecordDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDecoder")
            .field("algorithm", &self.decompressor.algorithm())
            .finish()
    }
}

impl RecordDecoder {
    /// Create a decoder for payloads compressed with `algorithm`
    pub fn new(algorithm: CompressionAlgorithm) -> Self {
        Self {
            decompressor: CompressionFactory::create_decompressor(algorithm),
        }
    }

    /// Create a decoder around a custom decompressor
    pub fn with_decompressor(decompressor: Box<dyn Decompressor>) -> Self {
        Self { decompressor }
    }

    /// The compression algorithm this decoder expects
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.decompressor.algorithm()
    }

    /// Decode one compressed payload
    ///
    /// Decompression and JSON failures are fatal; there is no partial
    /// recovery.
    pub fn decode(&self, data: &[u8]) -> Result<DecodedRecord> {
        self.decode_with_metrics(data, None)
    }

    /// Decode a fetched record
    pub fn decode_record(&self, record: &RawRecord) -> Result<DecodedRecord> {
        self.decode(&record.data)
    }

    pub(crate) fn decode_with_metrics(
        &self,
        data: &[u8],
        metrics: Option<&ReaderMetrics>,
    ) -> Result<DecodedRecord> {
        let start = Instant::now();

        let decompressed = self
            .decompressor
            .decompress(data)
            .map_err(|e| Error::decode(format!("Cannot decompress record: {}", e)))?;
        let envelope = Envelope::from_slice(&decompressed)?;
        let message_type = envelope.message_type.clone();
        let events = envelope.into_events()?;

        if let Some(metrics) = metrics {
            metrics.add_bytes_decompressed(decompressed.len());
            if message_type.is_data() {
                metrics.record_data_message(events.len());
            } else {
                metrics.record_skipped_message();
            }
            metrics.record_decode_duration(start.elapsed());
        }

        if !message_type.is_data() {
            trace!(message_type = %message_type, "skipping non-data envelope");
        }

        Ok(DecodedRecord {
            message_type,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::util::gzip_bytes;
    use proptest::prelude::*;
    use serde_json::json;

    fn flow_event(index: u64) -> Value {
        json!({
            "srcaddr": "192.0.2.1",
            "srcport": index,
            "dstaddr": "198.51.100.1",
            "dstport": 443,
            "protocol": 6,
        })
    }

    fn data_message(events: &[Value]) -> Vec<u8> {
        let log_events: Vec<Value> = events
            .iter()
            .enumerate()
            .map(|(i, fields)| {
                json!({
                    "id": format!("{}", i),
                    "timestamp": 1463180100000i64,
                    "message": "2 123456789010 eni-1235b8ca ...",
                    "extractedFields": fields,
                })
            })
            .collect();
        let envelope = json!({
            "messageType": "DATA_MESSAGE",
            "owner": "123456789010",
            "logGroup": "flow-logs",
            "logStream": "eni-1235b8ca-all",
            "subscriptionFilters": ["to-kinesis"],
            "logEvents": log_events,
        });
        gzip_bytes(envelope.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_decode_data_message() {
        let decoder = RecordDecoder::default();
        let decoded = decoder
            .decode(&data_message(&[flow_event(0), flow_event(1)]))
            .unwrap();

        assert_eq!(decoded.message_type, MessageType::Data);
        assert_eq!(decoded.events.len(), 2);
        assert_eq!(Value::Object(decoded.events[0].clone()), flow_event(0));
        assert_eq!(Value::Object(decoded.events[1].clone()), flow_event(1));
    }

    #[test]
    fn test_decode_control_message() {
        let payload = json!({
            "messageType": "CONTROL_MESSAGE",
            "owner": "CloudwatchLogs",
            "logEvents": [{
                "id": "",
                "timestamp": 1463180100000i64,
                "message": "CWL CONTROL MESSAGE: Checking health of destination Kinesis stream.",
            }],
        });
        let decoded = RecordDecoder::default()
            .decode(&gzip_bytes(payload.to_string().as_bytes()).unwrap())
            .unwrap();

        assert_eq!(decoded.message_type, MessageType::Control);
        assert!(decoded.events.is_empty());
    }

    #[test]
    fn test_decode_unknown_and_missing_types() {
        let decoder = RecordDecoder::default();

        let unknown = gzip_bytes(
            br#"{"messageType": "SOMETHING_ELSE", "logEvents": [{"extractedFields": {"a": 1}}]}"#,
        )
        .unwrap();
        let decoded = decoder.decode(&unknown).unwrap();
        assert_eq!(decoded.message_type, MessageType::Other("SOMETHING_ELSE".to_string()));
        assert!(decoded.events.is_empty());

        let missing = gzip_bytes(br#"{"logEvents": []}"#).unwrap();
        let decoded = decoder.decode(&missing).unwrap();
        assert_eq!(decoded.message_type, MessageType::default());
        assert!(decoded.events.is_empty());

        let null = gzip_bytes(br#"{"messageType": null}"#).unwrap();
        assert!(decoder.decode(&null).unwrap().events.is_empty());
    }

    #[test]
    fn test_decode_data_message_without_events() {
        let decoder = RecordDecoder::default();

        let missing = gzip_bytes(br#"{"messageType": "DATA_MESSAGE"}"#).unwrap();
        assert!(decoder.decode(&missing).unwrap().events.is_empty());

        let null = gzip_bytes(br#"{"messageType": "DATA_MESSAGE", "logEvents": null}"#).unwrap();
        assert!(decoder.decode(&null).unwrap().events.is_empty());
    }

    #[test]
    fn test_decode_entry_without_extracted_fields() {
        let payload = gzip_bytes(
            br#"{"messageType": "DATA_MESSAGE", "logEvents": [{"extractedFields": {"a": 1}}, {"message": "raw"}]}"#,
        )
        .unwrap();

        let err = RecordDecoder::default().decode(&payload).unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("Log event 1"));
    }

    #[test]
    fn test_decode_failures_are_fatal() {
        let decoder = RecordDecoder::default();

        // Not gzip
        let err = decoder.decode(b"{\"messageType\": \"DATA_MESSAGE\"}").unwrap_err();
        assert!(err.is_decode_error());

        // Gzip, but not JSON
        let err = decoder.decode(&gzip_bytes(b"not json").unwrap()).unwrap_err();
        assert!(err.is_decode_error());

        // Truncated JSON
        let err = decoder
            .decode(&gzip_bytes(br#"{"messageType": "DATA_MESS"#).unwrap())
            .unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_decode_with_other_algorithm() {
        let payload = crate::compression::util::compress(
            br#"{"messageType": "DATA_MESSAGE", "logEvents": [{"extractedFields": {"action": "ACCEPT"}}]}"#,
            CompressionAlgorithm::Zstd,
            3,
        )
        .unwrap();

        let decoder = RecordDecoder::new(CompressionAlgorithm::Zstd);
        assert_eq!(decoder.algorithm(), CompressionAlgorithm::Zstd);

        let decoded = decoder.decode_record(&RawRecord::new(payload)).unwrap();
        assert_eq!(decoded.events.len(), 1);
        assert_eq!(decoded.events[0]["action"], "ACCEPT");
    }

    #[test]
    fn test_decode_records_metrics() {
        let metrics = ReaderMetrics::new();
        let decoder = RecordDecoder::default();

        decoder
            .decode_with_metrics(&data_message(&[flow_event(7)]), Some(&metrics))
            .unwrap();
        decoder
            .decode_with_metrics(
                &gzip_bytes(br#"{"messageType": "CONTROL_MESSAGE"}"#).unwrap(),
                Some(&metrics),
            )
            .unwrap();

        assert_eq!(metrics.get_data_message_count(), 1);
        assert_eq!(metrics.get_skipped_message_count(), 1);
        assert_eq!(metrics.get_event_count(), 1);
        assert!(metrics.get_bytes_decompressed() > 0);
    }

    #[test]
    fn test_non_data_envelopes_ignore_field_shapes() {
        let decoder = RecordDecoder::default();

        let payloads = [
            json!({ "messageType": "CONTROL_MESSAGE", "owner": 123 }),
            json!({ "messageType": "CONTROL_MESSAGE", "logEvents": "n/a" }),
            json!({
                "messageType": "CONTROL_MESSAGE",
                "subscriptionFilters": { "a": 1 },
                "logGroup": [],
            }),
            json!({ "messageType": 7 }),
            json!({
                "messageType": ["DATA_MESSAGE"],
                "logEvents": [{ "extractedFields": { "a": 1 } }],
            }),
        ];

        for payload in payloads {
            let decoded = decoder
                .decode(&gzip_bytes(payload.to_string().as_bytes()).unwrap())
                .unwrap();
            assert!(!decoded.message_type.is_data());
            assert!(decoded.events.is_empty());
        }

        let numeric = gzip_bytes(br#"{"messageType": 7}"#).unwrap();
        assert_eq!(
            decoder.decode(&numeric).unwrap().message_type,
            MessageType::Other("7".to_string())
        );
    }

    #[test]
    fn test_data_envelope_reads_only_extracted_fields() {
        let payload = json!({
            "messageType": "DATA_MESSAGE",
            "owner": 123456789010u64,
            "subscriptionFilters": "to-kinesis",
            "logEvents": [{
                "id": 5,
                "timestamp": "yesterday",
                "message": { "raw": true },
                "extractedFields": { "action": "ACCEPT" },
            }],
        });
        let decoded = RecordDecoder::default()
            .decode(&gzip_bytes(payload.to_string().as_bytes()).unwrap())
            .unwrap();

        assert_eq!(decoded.events.len(), 1);
        assert_eq!(decoded.events[0]["action"], "ACCEPT");
    }

    #[test]
    fn test_data_envelope_with_malformed_events() {
        let decoder = RecordDecoder::default();

        let payloads = [
            json!({ "messageType": "DATA_MESSAGE", "logEvents": "n/a" }),
            json!({ "messageType": "DATA_MESSAGE", "logEvents": [42] }),
            json!({ "messageType": "DATA_MESSAGE", "logEvents": [{ "extractedFields": "a=1" }] }),
            json!({ "messageType": "DATA_MESSAGE", "logEvents": [{ "extractedFields": null }] }),
        ];

        for payload in payloads {
            let err = decoder
                .decode(&gzip_bytes(payload.to_string().as_bytes()).unwrap())
                .unwrap_err();
            assert!(err.is_decode_error());
        }
    }

    fn any_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z_ ]{0,12}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::hash_map("[a-zA-Z]{1,8}", inner, 0..4)
                    .prop_map(|fields| Value::Object(fields.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_non_data_envelope_never_fails(
            message_type in any_json()
                .prop_filter("not a data message", |value| value != "DATA_MESSAGE"),
            members in proptest::collection::hash_map(
                prop_oneof![
                    Just("owner".to_string()),
                    Just("logGroup".to_string()),
                    Just("logStream".to_string()),
                    Just("subscriptionFilters".to_string()),
                    Just("logEvents".to_string()),
                    "[a-zA-Z]{1,8}",
                ],
                any_json(),
                0..6,
            ),
        ) {
            let mut envelope: Map<String, Value> = members.into_iter().collect();
            envelope.insert("messageType".to_string(), message_type);

            let payload = gzip_bytes(Value::Object(envelope).to_string().as_bytes()).unwrap();
            let decoded = RecordDecoder::default().decode(&payload);

            prop_assert!(decoded.is_ok());
            prop_assert!(decoded.unwrap().events.is_empty());
        }
    }

    #[test]
    fn test_message_type_names() {
        assert_eq!(MessageType::from("DATA_MESSAGE".to_string()), MessageType::Data);
        assert_eq!(MessageType::Control.to_string(), "CONTROL_MESSAGE");
        assert_eq!(String::from(MessageType::Other("X".to_string())), "X");
        assert!(MessageType::Data.is_data());
        assert!(!MessageType::Control.is_data());
    }
}
