//! Fan-out/fan-in line-processing pipeline.
//!
//! The concurrent [`run`] wires a single line producer to a fixed pool of parsing
//! workers over a bounded queue, and the workers to a single sink over a second
//! bounded queue. Bounded capacities mean a slow sink applies backpressure all the
//! way to the reader instead of buffering a large file in memory. Matched-record
//! order across workers is unspecified; [`run_sequential`] keeps input order on a
//! single thread for callers that need determinism.

mod stats;

pub use stats::PipelineStats;

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::bounded;

use crate::error::{SieveError, SieveResult};
use crate::filter::{matches_all, FilterPredicate};
use crate::ingest::{map_tokens, open_source, tokenize};
use crate::record::LogRecord;

/// Configuration for pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Number of parsing workers.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub workers: Option<usize>,
    /// Capacity of the line and matched-record queues.
    pub queue_capacity: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: None,
            queue_capacity: 100,
        }
    }
}

impl PipelineOptions {
    fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }
}

/// Run the concurrent pipeline over `paths`, in order, invoking `sink` once per
/// matching record.
///
/// Each file is read by one producer thread and parsed by the worker pool; the sink
/// runs on the calling thread only, so it needs no synchronization of its own. A
/// missing file contributes zero lines. The first fatal file error (unreadable file,
/// broken gzip stream) is returned and ends the run; continuing past a bad file in a
/// batch is the caller's decision, made by invoking this per file.
pub fn run<S>(
    paths: &[PathBuf],
    filters: &[FilterPredicate],
    mut sink: S,
    options: &PipelineOptions,
    stats: &PipelineStats,
) -> SieveResult<()>
where
    S: FnMut(LogRecord),
{
    for path in paths {
        run_file(path, filters, &mut sink, options, stats)?;
    }
    Ok(())
}

fn run_file<S>(
    path: &Path,
    filters: &[FilterPredicate],
    sink: &mut S,
    options: &PipelineOptions,
    stats: &PipelineStats,
) -> SieveResult<()>
where
    S: FnMut(LogRecord),
{
    let Some(source) = open_source(path)? else {
        return Ok(());
    };

    let workers = options.worker_count();
    let (line_tx, line_rx) = bounded::<String>(options.queue_capacity);
    let (record_tx, record_rx) = bounded::<LogRecord>(options.queue_capacity);

    thread::scope(|scope| -> SieveResult<()> {
        let producer = scope.spawn(move || -> std::io::Result<()> {
            let reader = BufReader::new(source);
            for line in reader.lines() {
                // A send fails only once every worker is gone; nothing left to feed.
                if line_tx.send(line?).is_err() {
                    break;
                }
            }
            Ok(())
        });

        for _ in 0..workers {
            let line_rx = line_rx.clone();
            let record_tx = record_tx.clone();
            scope.spawn(move || {
                for line in line_rx {
                    stats.on_line();
                    let tokens = tokenize(&line);
                    let Some(record) = map_tokens(&tokens) else {
                        continue;
                    };
                    if matches_all(filters, &record) && record_tx.send(record).is_err() {
                        break;
                    }
                }
            });
        }

        // The scope thread holds no senders, so the matched queue closes exactly
        // when the last worker exits; no in-flight match can be dropped.
        drop(line_rx);
        drop(record_tx);

        for record in record_rx {
            sink(record);
        }

        producer
            .join()
            .expect("line producer panicked")
            .map_err(|source| SieveError::File {
                path: path.to_path_buf(),
                source,
            })
    })
}

/// Run the same tokenize → map → filter transforms synchronously on the calling
/// thread. Output order exactly matches input order.
pub fn run_sequential<S>(
    paths: &[PathBuf],
    filters: &[FilterPredicate],
    mut sink: S,
    stats: &PipelineStats,
) -> SieveResult<()>
where
    S: FnMut(LogRecord),
{
    for path in paths {
        let Some(source) = open_source(path)? else {
            continue;
        };
        let reader = BufReader::new(source);
        for line in reader.lines() {
            let line = line.map_err(|source| SieveError::File {
                path: path.clone(),
                source,
            })?;
            stats.on_line();
            let tokens = tokenize(&line);
            let Some(record) = map_tokens(&tokens) else {
                continue;
            };
            if matches_all(filters, &record) {
                sink(record);
            }
        }
    }
    Ok(())
}
