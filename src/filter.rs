//! Composable record predicates.
//!
//! Each constructor returns a pure predicate closure; a record is emitted only if
//! every active predicate accepts it. Predicates carry no shared mutable state, so
//! the pipeline can evaluate the same chain from any worker thread.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::SieveResult;
use crate::record::LogRecord;

/// A boolean-valued filter over a record. Multiple predicates compose with AND
/// semantics; evaluation order does not affect the result.
pub type FilterPredicate = Box<dyn Fn(&LogRecord) -> bool + Send + Sync>;

/// True when every predicate accepts the record. Short-circuits on the first
/// rejection, so cheap predicates placed first cost less.
pub fn matches_all(filters: &[FilterPredicate], record: &LogRecord) -> bool {
    filters.iter().all(|filter| filter(record))
}

/// Keep records whose timestamp falls within `[start, end]`. An unset bound
/// leaves that side unbounded.
pub fn within_time_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> FilterPredicate {
    Box::new(move |record| {
        let ts = record.timestamp.with_timezone(&Utc);
        if let Some(start) = start {
            if ts < start {
                return false;
            }
        }
        if let Some(end) = end {
            if ts > end {
                return false;
            }
        }
        true
    })
}

/// Keep records whose request line matches `pattern`.
///
/// An invalid pattern fails here, before any line is processed.
pub fn url_matches(pattern: &str) -> SieveResult<FilterPredicate> {
    let regex = Regex::new(pattern)?;
    Ok(Box::new(move |record| regex.is_match(&record.request)))
}

/// Keep records whose user-agent matches `pattern`.
///
/// An invalid pattern fails here, before any line is processed.
pub fn user_agent_matches(pattern: &str) -> SieveResult<FilterPredicate> {
    let regex = Regex::new(pattern)?;
    Ok(Box::new(move |record| regex.is_match(&record.user_agent)))
}

/// Keep records whose load-balancer status code equals `code` exactly.
pub fn elb_status_is(code: &str) -> FilterPredicate {
    let code = code.to_string();
    Box::new(move |record| record.elb_status_code == code)
}

/// Keep records whose target status code equals `code` exactly.
pub fn target_status_is(code: &str) -> FilterPredicate {
    let code = code.to_string();
    Box::new(move |record| record.target_status_code == code)
}

/// Keep records whose target processing time is at least `threshold` seconds.
///
/// Fails closed: a field that does not parse as a number (the `-` sentinel on
/// connection-level entries) excludes the record.
pub fn min_target_processing_time(threshold: f64) -> FilterPredicate {
    Box::new(move |record| match record.target_processing_time.parse::<f64>() {
        Ok(time) => time >= threshold,
        Err(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{map_tokens, tokenize};

    fn sample_record() -> LogRecord {
        let line = concat!(
            "http 2018-11-30T22:23:00.000000Z myelb 1.2.3.4:80 5.6.7.8:8080 ",
            "0.001 0.002 0.003 200 404 100 200 \"GET /health HTTP/1.1\" \"curl/7.0\" ",
            "- - arn1 trace1 - - - 2018-11-30T22:22:59.000000Z - - -"
        );
        map_tokens(&tokenize(line)).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn time_range_bounds_are_inclusive_and_optional() {
        let record = sample_record();

        assert!(within_time_range(None, None)(&record));
        assert!(within_time_range(
            Some(utc("2018-11-30T22:23:00Z")),
            Some(utc("2018-11-30T22:23:00Z")),
        )(&record));
        assert!(!within_time_range(Some(utc("2018-11-30T23:00:00Z")), None)(&record));
        assert!(!within_time_range(None, Some(utc("2018-11-30T22:00:00Z")))(&record));
        assert!(within_time_range(None, Some(utc("2018-12-01T00:00:00Z")))(&record));
    }

    #[test]
    fn url_filter_matches_request_line() {
        let record = sample_record();
        assert!(url_matches("/health").unwrap()(&record));
        assert!(url_matches(".*").unwrap()(&record));
        assert!(!url_matches("/admin").unwrap()(&record));
    }

    #[test]
    fn invalid_pattern_fails_at_construction() {
        assert!(url_matches("(").is_err());
        assert!(user_agent_matches("[").is_err());
    }

    #[test]
    fn user_agent_filter_matches() {
        let record = sample_record();
        assert!(user_agent_matches("^curl").unwrap()(&record));
        assert!(!user_agent_matches("Mozilla").unwrap()(&record));
    }

    #[test]
    fn status_filters_use_exact_equality() {
        let record = sample_record();
        assert!(elb_status_is("200")(&record));
        assert!(!elb_status_is("20")(&record));
        assert!(target_status_is("404")(&record));
        assert!(!target_status_is("200")(&record));
    }

    #[test]
    fn min_processing_time_fails_closed_on_sentinel() {
        let mut record = sample_record();
        assert!(min_target_processing_time(0.001)(&record));
        assert!(min_target_processing_time(0.002)(&record));
        assert!(!min_target_processing_time(0.01)(&record));

        record.target_processing_time = "-".to_string();
        assert!(!min_target_processing_time(0.0)(&record));
    }

    #[test]
    fn matches_all_requires_every_predicate() {
        let record = sample_record();
        let accept: Vec<FilterPredicate> =
            vec![elb_status_is("200"), url_matches(".*").unwrap()];
        let mixed: Vec<FilterPredicate> =
            vec![elb_status_is("200"), target_status_is("500")];

        assert!(matches_all(&[], &record));
        assert!(matches_all(&accept, &record));
        assert!(!matches_all(&mixed, &record));
    }
}
