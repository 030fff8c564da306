//! Polars-backed storage and querying for imported records.
//!
//! The pipeline itself never retains records; this module is the retention side.
//! Imported records become one [`DataFrame`] per session, persisted as Parquet at
//! the session's storage path, queryable with SQL (under the table name
//! `alb_logs`) and summarized by [`LogStore::per_minute_stats`].

use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{SieveError, SieveResult};
use crate::record::{LogRecord, FIELD_NAMES};

/// Convert records into a [`DataFrame`] with one column per wire field.
///
/// Columns follow [`FIELD_NAMES`]. The `-` sentinel becomes a null, matching how
/// the log format encodes "not applicable"; processing times, the ELB status code
/// and the byte counts additionally parse into numeric columns so aggregate
/// queries work without casts. The timestamp is stored as its RFC 3339 string,
/// which sorts and truncates lexicographically.
pub fn records_to_frame(records: &[LogRecord]) -> SieveResult<DataFrame> {
    let n = records.len();
    let mut request_types = Vec::with_capacity(n);
    let mut times = Vec::with_capacity(n);
    let mut elbs = Vec::with_capacity(n);
    let mut clients = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    let mut request_processing_times = Vec::with_capacity(n);
    let mut target_processing_times = Vec::with_capacity(n);
    let mut response_processing_times = Vec::with_capacity(n);
    let mut elb_status_codes = Vec::with_capacity(n);
    let mut target_status_codes = Vec::with_capacity(n);
    let mut received_bytes = Vec::with_capacity(n);
    let mut sent_bytes = Vec::with_capacity(n);
    let mut requests = Vec::with_capacity(n);
    let mut user_agents = Vec::with_capacity(n);
    let mut ssl_ciphers = Vec::with_capacity(n);
    let mut ssl_protocols = Vec::with_capacity(n);
    let mut target_group_arns = Vec::with_capacity(n);
    let mut trace_ids = Vec::with_capacity(n);
    let mut domain_names = Vec::with_capacity(n);
    let mut chosen_cert_arns = Vec::with_capacity(n);
    let mut matched_rule_priorities = Vec::with_capacity(n);
    let mut request_creation_times = Vec::with_capacity(n);
    let mut actions_executed = Vec::with_capacity(n);
    let mut redirect_urls = Vec::with_capacity(n);
    let mut error_reasons = Vec::with_capacity(n);
    let mut target_port_lists = Vec::with_capacity(n);
    let mut target_status_code_lists = Vec::with_capacity(n);
    let mut classifications = Vec::with_capacity(n);
    let mut classification_reasons = Vec::with_capacity(n);

    for record in records {
        request_types.push(record.request_type.clone());
        times.push(record.timestamp.to_rfc3339());
        elbs.push(null_dash(&record.elb));
        clients.push(null_dash(&record.client));
        targets.push(null_dash(&record.target));
        request_processing_times.push(opt_f64(&record.request_processing_time));
        target_processing_times.push(opt_f64(&record.target_processing_time));
        response_processing_times.push(opt_f64(&record.response_processing_time));
        elb_status_codes.push(opt_i64(&record.elb_status_code));
        target_status_codes.push(null_dash(&record.target_status_code));
        received_bytes.push(opt_i64(&record.received_bytes));
        sent_bytes.push(opt_i64(&record.sent_bytes));
        requests.push(null_dash(&record.request));
        user_agents.push(null_dash(&record.user_agent));
        ssl_ciphers.push(null_dash(&record.ssl_cipher));
        ssl_protocols.push(null_dash(&record.ssl_protocol));
        target_group_arns.push(null_dash(&record.target_group_arn));
        trace_ids.push(null_dash(&record.trace_id));
        domain_names.push(null_dash(&record.domain_name));
        chosen_cert_arns.push(null_dash(&record.chosen_cert_arn));
        matched_rule_priorities.push(null_dash(&record.matched_rule_priority));
        request_creation_times.push(null_dash(&record.request_creation_time));
        actions_executed.push(null_dash(&record.actions_executed));
        redirect_urls.push(null_dash(&record.redirect_url));
        error_reasons.push(null_dash(&record.error_reason));
        target_port_lists.push(record.target_port_list.as_deref().and_then(null_dash));
        target_status_code_lists.push(record.target_status_code_list.as_deref().and_then(null_dash));
        classifications.push(record.classification.as_deref().and_then(null_dash));
        classification_reasons.push(record.classification_reason.as_deref().and_then(null_dash));
    }

    let frame = df!(
        FIELD_NAMES[0] => request_types,
        FIELD_NAMES[1] => times,
        FIELD_NAMES[2] => elbs,
        FIELD_NAMES[3] => clients,
        FIELD_NAMES[4] => targets,
        FIELD_NAMES[5] => request_processing_times,
        FIELD_NAMES[6] => target_processing_times,
        FIELD_NAMES[7] => response_processing_times,
        FIELD_NAMES[8] => elb_status_codes,
        FIELD_NAMES[9] => target_status_codes,
        FIELD_NAMES[10] => received_bytes,
        FIELD_NAMES[11] => sent_bytes,
        FIELD_NAMES[12] => requests,
        FIELD_NAMES[13] => user_agents,
        FIELD_NAMES[14] => ssl_ciphers,
        FIELD_NAMES[15] => ssl_protocols,
        FIELD_NAMES[16] => target_group_arns,
        FIELD_NAMES[17] => trace_ids,
        FIELD_NAMES[18] => domain_names,
        FIELD_NAMES[19] => chosen_cert_arns,
        FIELD_NAMES[20] => matched_rule_priorities,
        FIELD_NAMES[21] => request_creation_times,
        FIELD_NAMES[22] => actions_executed,
        FIELD_NAMES[23] => redirect_urls,
        FIELD_NAMES[24] => error_reasons,
        FIELD_NAMES[25] => target_port_lists,
        FIELD_NAMES[26] => target_status_code_lists,
        FIELD_NAMES[27] => classifications,
        FIELD_NAMES[28] => classification_reasons,
    )?;
    Ok(frame)
}

fn null_dash(value: &str) -> Option<String> {
    if value == "-" {
        None
    } else {
        Some(value.to_string())
    }
}

fn opt_f64(value: &str) -> Option<f64> {
    if value == "-" {
        None
    } else {
        value.parse().ok()
    }
}

fn opt_i64(value: &str) -> Option<i64> {
    if value == "-" {
        None
    } else {
        value.parse().ok()
    }
}

/// Session-scoped store of imported records.
pub struct LogStore {
    frame: DataFrame,
}

impl LogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            frame: DataFrame::empty(),
        }
    }

    /// Create a store holding `records`.
    pub fn from_records(records: &[LogRecord]) -> SieveResult<Self> {
        Ok(Self {
            frame: records_to_frame(records)?,
        })
    }

    /// Load a store previously written with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> SieveResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SieveError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = ParquetReader::new(file).finish()?;
        Ok(Self { frame })
    }

    /// Persist the store as Parquet at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> SieveResult<()> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|source| SieveError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let mut frame = self.frame.clone();
        ParquetWriter::new(&mut file).finish(&mut frame)?;
        Ok(())
    }

    /// Append records to the store.
    pub fn append(&mut self, records: &[LogRecord]) -> SieveResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let new = records_to_frame(records)?;
        if self.frame.width() == 0 {
            self.frame = new;
        } else {
            self.frame.vstack_mut(&new)?;
        }
        Ok(())
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }

    /// Run a SQL query against the store; the records are registered as the table
    /// `alb_logs`.
    #[cfg(feature = "sql")]
    pub fn query(&self, sql: &str) -> SieveResult<DataFrame> {
        let mut ctx = polars_sql::SQLContext::new();
        ctx.register("alb_logs", self.frame.clone().lazy());
        Ok(ctx.execute(sql)?.collect()?)
    }

    /// Per-minute request count and min/max/mean target processing time, optionally
    /// restricted to requests matching `request_pattern`.
    ///
    /// The pattern is validated up front so a bad regex fails before the engine runs.
    pub fn per_minute_stats(&self, request_pattern: Option<&str>) -> SieveResult<DataFrame> {
        if let Some(pattern) = request_pattern {
            regex::Regex::new(pattern)?;
        }

        let mut lazy = self.frame.clone().lazy();
        if let Some(pattern) = request_pattern {
            lazy = lazy.filter(col("request").str().contains(lit(pattern), false));
        }
        let out = lazy
            // RFC 3339 keeps minute truncation a prefix operation.
            .group_by([col("time").str().slice(lit(0), lit(16)).alias("minute")])
            .agg([
                len().alias("requests"),
                col("target_processing_time").min().alias("min_response_time"),
                col("target_processing_time").max().alias("max_response_time"),
                col("target_processing_time").mean().alias("avg_response_time"),
            ])
            .sort(["minute"], SortMultipleOptions::default())
            .collect()?;
        Ok(out)
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}
