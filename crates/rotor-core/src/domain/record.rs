//! Deployment history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Block number of a deploying transaction.
///
/// Serialized as text: chain heights can exceed the double-precision
/// safe-integer range, so native JSON numbers would lose precision in
/// any tooling that round-trips the log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum BlockNumber {
    /// Height of the block that confirmed the transaction, as decimal text.
    Confirmed(String),

    /// The transaction was never confirmed while the record was written.
    Pending,
}

impl BlockNumber {
    /// Wire form of the pending sentinel.
    pub const PENDING: &'static str = "pending";

    pub fn is_confirmed(&self) -> bool {
        matches!(self, BlockNumber::Confirmed(_))
    }

    /// The confirmed height as text, or the pending sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            BlockNumber::Confirmed(height) => height,
            BlockNumber::Pending => Self::PENDING,
        }
    }
}

impl From<String> for BlockNumber {
    fn from(s: String) -> Self {
        // Earlier log schemas wrote "N/A (pending or failed)" for
        // unconfirmed transactions; map both sentinels to Pending.
        if s == Self::PENDING || s.starts_with("N/A") {
            BlockNumber::Pending
        } else {
            BlockNumber::Confirmed(s)
        }
    }
}

impl From<BlockNumber> for String {
    fn from(b: BlockNumber) -> Self {
        b.as_str().to_string()
    }
}

impl std::fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of deployment history.
///
/// Written by the external deployer into the transient buffer, then folded
/// into the durable log by the orchestrator. Field names on disk are
/// camelCase to match the log format consumed by downstream tooling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Human-readable instance name. Unique per record, not across history.
    pub key: String,

    /// Catalog identifier tying this record to a contract definition.
    pub log_name: String,

    /// Deployed contract address.
    pub address: String,

    /// Hash of the deploying transaction.
    pub transaction_hash: String,

    /// Block that confirmed the deployment, or the pending sentinel.
    pub block_number: BlockNumber,

    /// Instant of the deploying block, or of record creation when the
    /// block could not be resolved. Records without a timestamp are
    /// excluded from all time-windowed computations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Ordered encoded constructor argument values, absent when the
    /// contract takes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor_args: Option<Vec<serde_json::Value>>,

    /// Block explorer URL for the deploying transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer: Option<String>,
}

impl DeploymentRecord {
    /// Whether this record can participate in time-windowed computations.
    pub fn is_schedulable(&self) -> bool {
        self.timestamp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json() -> &'static str {
        r#"{
            "key": "FeeCollector #3",
            "logName": "FeeCollector",
            "address": "0xabc0000000000000000000000000000000000001",
            "transactionHash": "0xdeadbeef",
            "blockNumber": "18446744073709551617",
            "timestamp": "2026-08-01T12:00:00Z",
            "constructorArgs": ["0x01", 7]
        }"#
    }

    #[test]
    fn test_record_deserializes_camel_case() {
        let record: DeploymentRecord = serde_json::from_str(record_json()).expect("parse record");
        assert_eq!(record.key, "FeeCollector #3");
        assert_eq!(record.log_name, "FeeCollector");
        assert!(record.is_schedulable());
        assert_eq!(record.constructor_args.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_block_number_beyond_safe_integer_survives() {
        let record: DeploymentRecord = serde_json::from_str(record_json()).expect("parse record");
        // 2^64 + 1: representable as text, not as an f64-backed JSON number
        assert_eq!(record.block_number.as_str(), "18446744073709551617");

        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["blockNumber"], "18446744073709551617");
    }

    #[test]
    fn test_legacy_pending_sentinel_maps_to_pending() {
        let legacy: BlockNumber = "N/A (pending or failed)".to_string().into();
        assert_eq!(legacy, BlockNumber::Pending);

        let current: BlockNumber = "pending".to_string().into();
        assert_eq!(current, BlockNumber::Pending);

        let confirmed: BlockNumber = "12345".to_string().into();
        assert!(confirmed.is_confirmed());
    }

    #[test]
    fn test_missing_timestamp_is_unschedulable() {
        let json = r#"{
            "key": "Heartbeat",
            "logName": "Heartbeat",
            "address": "0xabc",
            "transactionHash": "0xdef",
            "blockNumber": "pending"
        }"#;
        let record: DeploymentRecord = serde_json::from_str(json).expect("parse record");
        assert!(!record.is_schedulable());
        assert_eq!(record.block_number, BlockNumber::Pending);
    }
}
