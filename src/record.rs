//! Structured representation of one ALB access-log entry.
//!
//! Field order follows the wire format: 25 fixed positions, then an optional tail
//! (`target_port_list` onward) that only newer log schema versions emit.

use chrono::{DateTime, FixedOffset};

/// Snake_case column names for every record field, in wire order.
///
/// Used by the `fields` CLI command and as the store's column schema.
pub const FIELD_NAMES: [&str; 29] = [
    "type",
    "time",
    "elb",
    "client",
    "target",
    "request_processing_time",
    "target_processing_time",
    "response_processing_time",
    "elb_status_code",
    "target_status_code",
    "received_bytes",
    "sent_bytes",
    "request",
    "user_agent",
    "ssl_cipher",
    "ssl_protocol",
    "target_group_arn",
    "trace_id",
    "domain_name",
    "chosen_cert_arn",
    "matched_rule_priority",
    "request_creation_time",
    "actions_executed",
    "redirect_url",
    "error_reason",
    "target_port_list",
    "target_status_code_list",
    "classification",
    "classification_reason",
];

/// One parsed access-log line.
///
/// Time-like and numeric fields other than [`timestamp`](Self::timestamp) are kept as the
/// raw strings from the line: the ALB format uses `-` (and `-1` for processing times) as
/// "not applicable" sentinels, and downstream consumers decide how to interpret them.
///
/// A record exists only if at least 25 positional tokens were present and the primary
/// timestamp parsed. The four tail fields are each `Some` only when their own token was
/// present on the line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub request_type: String,
    pub timestamp: DateTime<FixedOffset>,
    pub elb: String,
    pub client: String,
    pub target: String,
    pub request_processing_time: String,
    pub target_processing_time: String,
    pub response_processing_time: String,
    pub elb_status_code: String,
    pub target_status_code: String,
    pub received_bytes: String,
    pub sent_bytes: String,
    pub request: String,
    pub user_agent: String,
    pub ssl_cipher: String,
    pub ssl_protocol: String,
    pub target_group_arn: String,
    pub trace_id: String,
    pub domain_name: String,
    pub chosen_cert_arn: String,
    pub matched_rule_priority: String,
    pub request_creation_time: String,
    pub actions_executed: String,
    pub redirect_url: String,
    pub error_reason: String,
    pub target_port_list: Option<String>,
    pub target_status_code_list: Option<String>,
    pub classification: Option<String>,
    pub classification_reason: Option<String>,
}
