//! Positional token-to-record mapping.

use chrono::DateTime;

use crate::record::LogRecord;

/// Minimum token count for a line to map to a record at all.
pub const MIN_FIELD_COUNT: usize = 25;

/// Map an ordered token sequence into a [`LogRecord`].
///
/// Returns `None` (a silent reject, not an error) when fewer than
/// [`MIN_FIELD_COUNT`] tokens are present or the timestamp token does not parse
/// as RFC 3339. Rejected lines still count toward pipeline statistics; they are
/// just excluded from output.
///
/// The four tail fields only exist on newer log schema versions. Each is filled
/// independently, left to right, only while further tokens exist.
pub fn map_tokens(tokens: &[String]) -> Option<LogRecord> {
    if tokens.len() < MIN_FIELD_COUNT {
        return None;
    }
    let timestamp = DateTime::parse_from_rfc3339(&tokens[1]).ok()?;

    Some(LogRecord {
        request_type: tokens[0].clone(),
        timestamp,
        elb: tokens[2].clone(),
        client: tokens[3].clone(),
        target: tokens[4].clone(),
        request_processing_time: tokens[5].clone(),
        target_processing_time: tokens[6].clone(),
        response_processing_time: tokens[7].clone(),
        elb_status_code: tokens[8].clone(),
        target_status_code: tokens[9].clone(),
        received_bytes: tokens[10].clone(),
        sent_bytes: tokens[11].clone(),
        // The tokenizer already strips enclosing quotes; trim again in case the
        // tokens came from another source.
        request: trim_quotes(&tokens[12]),
        user_agent: trim_quotes(&tokens[13]),
        ssl_cipher: tokens[14].clone(),
        ssl_protocol: tokens[15].clone(),
        target_group_arn: tokens[16].clone(),
        trace_id: tokens[17].clone(),
        domain_name: tokens[18].clone(),
        chosen_cert_arn: tokens[19].clone(),
        matched_rule_priority: tokens[20].clone(),
        request_creation_time: tokens[21].clone(),
        actions_executed: tokens[22].clone(),
        redirect_url: tokens[23].clone(),
        error_reason: tokens[24].clone(),
        target_port_list: tokens.get(25).cloned(),
        target_status_code_list: tokens.get(26).cloned(),
        classification: tokens.get(27).cloned(),
        classification_reason: tokens.get(28).cloned(),
    })
}

fn trim_quotes(token: &str) -> String {
    token.trim_matches('"').to_string()
}
