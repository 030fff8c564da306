//! Command-line frontend: session management, import, scan, query, stats.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use logsieve::filter::{self, FilterPredicate};
use logsieve::pipeline::{self, PipelineOptions, PipelineStats};
use logsieve::record::{LogRecord, FIELD_NAMES};
use logsieve::session::{self, SessionRegistry, SessionState};
use logsieve::store::{records_to_frame, LogStore};
use logsieve::{SieveError, SieveResult};

/// Columns shown by `scan`, mirroring the store schema names.
const SCAN_COLUMNS: [&str; 11] = [
    "time",
    "client",
    "target",
    "request",
    "elb_status_code",
    "target_status_code",
    "received_bytes",
    "sent_bytes",
    "target_processing_time",
    "user_agent",
    "ssl_protocol",
];

#[derive(Parser)]
#[command(
    name = "logsieve",
    version,
    about = "Process AWS ALB access logs: import, filter and query them in named sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage analysis sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Import log files into the active session's store
    Import {
        /// Log files to import; reads a newline-separated list from stdin when empty
        files: Vec<PathBuf>,
        /// Number of parsing workers (defaults to available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Run the filter pipeline over log files and print matching entries
    Scan {
        /// Log files to scan
        files: Vec<PathBuf>,
        /// Keep entries whose request line matches this regex
        #[arg(long)]
        url: Option<String>,
        /// Keep entries whose user-agent matches this regex
        #[arg(long)]
        user_agent: Option<String>,
        /// Keep entries with this exact ELB status code
        #[arg(long)]
        elb_status: Option<String>,
        /// Keep entries with this exact target status code
        #[arg(long)]
        target_status: Option<String>,
        /// Keep entries at or after this RFC 3339 timestamp
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Keep entries at or before this RFC 3339 timestamp
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Keep entries whose target processing time is at least this many seconds
        #[arg(long)]
        min_target_time: Option<f64>,
        /// Number of parsing workers (defaults to available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,
        /// Process on one thread, preserving input line order
        #[arg(long)]
        sequential: bool,
    },
    /// Run a SQL query against the active session's store (table `alb_logs`)
    #[cfg(feature = "sql")]
    Query {
        /// SQL statement to execute
        sql: String,
    },
    /// Show per-minute performance statistics for the active session
    Stats {
        /// Regex pattern to filter requests
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Manage log fields available for queries
    Fields {
        #[command(subcommand)]
        action: FieldsAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a session and make it active
    Create { name: String },
    /// Make an existing session active
    Attach { name: String },
    /// List known sessions
    List,
    /// Remove the active session and its stored logs
    Kill,
}

#[derive(Subcommand)]
enum FieldsAction {
    /// Print the field names, one per line
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> SieveResult<()> {
    let registry = SessionRegistry::default_location();
    match cli.command {
        Command::Session { action } => run_session(&registry, action),
        Command::Import { files, workers } => run_import(&registry, files, workers),
        Command::Scan {
            files,
            url,
            user_agent,
            elb_status,
            target_status,
            from,
            to,
            min_target_time,
            workers,
            sequential,
        } => {
            let filters = build_filters(
                url,
                user_agent,
                elb_status,
                target_status,
                from,
                to,
                min_target_time,
            )?;
            run_scan(files, &filters, workers, sequential)
        }
        #[cfg(feature = "sql")]
        Command::Query { sql } => {
            let store = open_active_store(&registry)?;
            let frame = store.query(&sql)?;
            println!("{frame}");
            Ok(())
        }
        Command::Stats { filter } => {
            let store = open_active_store(&registry)?;
            let frame = store.per_minute_stats(filter.as_deref())?;
            if frame.height() == 0 {
                println!("No matching entries");
            } else {
                println!("{frame}");
            }
            Ok(())
        }
        Command::Fields { action } => {
            match action {
                FieldsAction::List => {
                    for name in FIELD_NAMES {
                        println!("{name}");
                    }
                }
            }
            Ok(())
        }
    }
}

fn run_session(registry: &SessionRegistry, action: SessionAction) -> SieveResult<()> {
    match action {
        SessionAction::Create { name } => {
            let name = session::sanitize_name(&name)?;
            let store_path = std::env::current_dir()?.join(format!("logsieve_{name}.parquet"));
            let created = registry.create(&name, store_path)?;
            println!("Session '{}' created successfully", created.name);
        }
        SessionAction::Attach { name } => {
            let attached = registry.attach(&name)?;
            println!("Attached to session: {}", attached.name);
        }
        SessionAction::List => {
            let sessions = registry.list()?;
            if sessions.is_empty() {
                println!("No sessions available");
                return Ok(());
            }
            for session in sessions {
                if session.state == SessionState::Active {
                    println!("{} (active), store: {}", session.name, session.store_path.display());
                } else {
                    println!("{}, store: {}", session.name, session.store_path.display());
                }
            }
        }
        SessionAction::Kill => {
            let killed = registry.kill()?;
            match std::fs::remove_file(&killed.store_path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
            println!("Session '{}' killed", killed.name);
        }
    }
    Ok(())
}

fn run_import(
    registry: &SessionRegistry,
    files: Vec<PathBuf>,
    workers: Option<usize>,
) -> SieveResult<()> {
    let session = registry.active()?;
    let files = resolve_files(files)?;
    if files.is_empty() {
        println!("No files to import");
        return Ok(());
    }

    let mut store = if session.store_path.exists() {
        LogStore::load(&session.store_path)?
    } else {
        LogStore::new()
    };

    let options = PipelineOptions {
        workers,
        ..Default::default()
    };
    let stats = Arc::new(PipelineStats::new());
    let progress = spawn_progress(Arc::clone(&stats));

    let mut imported = 0usize;
    for file in &files {
        let mut batch: Vec<LogRecord> = Vec::new();
        match pipeline::run(
            std::slice::from_ref(file),
            &[],
            |record| batch.push(record),
            &options,
            &stats,
        ) {
            Ok(()) => {
                store.append(&batch)?;
                imported += 1;
            }
            // Batch-level continue-on-error lives here, not in the pipeline.
            Err(err) => warn!("skipping file: {err}"),
        }
    }

    progress.finish();
    store.save(&session.store_path)?;
    println!(
        "Imported {imported}/{} file(s) into session '{}' ({} lines processed, {} records stored)",
        files.len(),
        session.name,
        stats.lines_seen(),
        store.row_count(),
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_filters(
    url: Option<String>,
    user_agent: Option<String>,
    elb_status: Option<String>,
    target_status: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    min_target_time: Option<f64>,
) -> SieveResult<Vec<FilterPredicate>> {
    // Cheap equality and range checks go first so the regexes run on fewer records.
    let mut filters = Vec::new();
    if let Some(code) = elb_status {
        filters.push(filter::elb_status_is(&code));
    }
    if let Some(code) = target_status {
        filters.push(filter::target_status_is(&code));
    }
    if from.is_some() || to.is_some() {
        filters.push(filter::within_time_range(from, to));
    }
    if let Some(threshold) = min_target_time {
        filters.push(filter::min_target_processing_time(threshold));
    }
    if let Some(pattern) = url {
        filters.push(filter::url_matches(&pattern)?);
    }
    if let Some(pattern) = user_agent {
        filters.push(filter::user_agent_matches(&pattern)?);
    }
    Ok(filters)
}

fn run_scan(
    files: Vec<PathBuf>,
    filters: &[FilterPredicate],
    workers: Option<usize>,
    sequential: bool,
) -> SieveResult<()> {
    let files = resolve_files(files)?;
    let stats = PipelineStats::new();
    let mut matched: Vec<LogRecord> = Vec::new();

    if sequential {
        pipeline::run_sequential(&files, filters, |record| matched.push(record), &stats)?;
    } else {
        let options = PipelineOptions {
            workers,
            ..Default::default()
        };
        pipeline::run(&files, filters, |record| matched.push(record), &options, &stats)?;
    }

    if matched.is_empty() {
        println!("No matching entries ({} lines processed)", stats.lines_seen());
        return Ok(());
    }

    let frame = records_to_frame(&matched)?.select(SCAN_COLUMNS)?;
    println!("{frame}");
    println!("{} matched of {} lines processed", matched.len(), stats.lines_seen());
    Ok(())
}

fn open_active_store(registry: &SessionRegistry) -> SieveResult<LogStore> {
    let session = registry.active()?;
    if !session.store_path.exists() {
        return Err(SieveError::Session {
            message: format!("session '{}' has no imported logs", session.name),
        });
    }
    LogStore::load(&session.store_path)
}

fn resolve_files(files: Vec<PathBuf>) -> SieveResult<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files);
    }
    let stdin = std::io::stdin();
    let mut out = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            out.push(PathBuf::from(trimmed));
        }
    }
    Ok(out)
}

/// Progress line driven by the shared stats counter, redrawn until stopped.
struct Progress {
    done: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl Progress {
    fn finish(self) {
        self.done.store(true, Ordering::SeqCst);
        let _ = self.handle.join();
    }
}

fn spawn_progress(stats: Arc<PipelineStats>) -> Progress {
    let done = Arc::new(AtomicBool::new(false));
    let done_flag = Arc::clone(&done);
    let handle = thread::spawn(move || {
        while !done_flag.load(Ordering::SeqCst) {
            eprint!("\r{} lines processed", stats.lines_seen());
            thread::sleep(Duration::from_millis(200));
        }
        eprintln!("\r{} lines processed", stats.lines_seen());
    });
    Progress { done, handle }
}
