use serde::{Deserialize, Serialize};

/// Chat id (numeric). Admin membership is exact integer equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Read-only view of a routed connection: its tag and cumulative traffic in
/// bytes. Supplied by the panel's inbound service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSummary {
    pub tag: String,
    pub total: i64,
}
