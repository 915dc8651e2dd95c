//! Logging setup for the client core.
//!
//! Records go through the `log` facade. `init_logging` installs
//! `env_logger` (filter from `RUST_LOG`, `info` by default) and, when a log
//! directory is given, sends its output to a daily file with size-based
//! rotation and cleanup instead of stderr.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use env_logger::{Env, Target};
use parking_lot::Mutex;

use crate::error::{ClassMeetError, ClassMeetResult, ResultExt};

/// Maximum log file size before rotation (5MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum number of log files to keep
const MAX_LOG_FILES: usize = 5;

const LOG_PREFIX: &str = "classmeet";

/// Daily log file in a directory, rotated above [`MAX_LOG_SIZE`].
pub struct LogFile {
    dir: PathBuf,
    max_size: u64,
    file: Mutex<Option<OpenLog>>,
}

/// Handle plus the path it was opened at.
struct OpenLog {
    path: PathBuf,
    file: File,
}

impl OpenLog {
    fn open(path: PathBuf) -> ClassMeetResult<Self> {
        let file = open_append(&path)?;
        Ok(Self { path, file })
    }
}

impl LogFile {
    /// Create `dir` if needed, open today's file and prune old files.
    pub fn open(dir: impl AsRef<Path>) -> ClassMeetResult<Self> {
        Self::with_max_size(dir, MAX_LOG_SIZE)
    }

    fn with_max_size(dir: impl AsRef<Path>, max_size: u64) -> ClassMeetResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let log = OpenLog::open(current_log_path(&dir))?;
        cleanup_old_logs(&dir, MAX_LOG_FILES);

        Ok(Self {
            dir,
            max_size,
            file: Mutex::new(Some(log)),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of today's file.
    pub fn current_path(&self) -> PathBuf {
        current_log_path(&self.dir)
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        let current_path = self.current_path();
        let mut guard = self.file.lock();
        // Follow the date: after midnight, records go to the new day's file.
        if guard.as_ref().map(|log| &log.path) != Some(&current_path) {
            *guard = OpenLog::open(current_path).ok();
        }
        match guard.as_mut() {
            Some(log) => log.file.write_all(bytes),
            None => Ok(()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        if let Some(log) = self.file.lock().as_mut() {
            log.file.flush()?;
        }
        self.rotate_if_needed();
        Ok(())
    }

    /// Move today's file aside once it grows past the size limit.
    fn rotate_if_needed(&self) {
        let current_path = self.current_path();
        let Ok(metadata) = fs::metadata(&current_path) else {
            return;
        };
        if metadata.len() <= self.max_size {
            return;
        }

        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S%.3f");
        let rotated_path = self.dir.join(format!("{}_{}.log", LOG_PREFIX, timestamp));
        let mut guard = self.file.lock();
        let _ = fs::rename(&current_path, &rotated_path);
        *guard = OpenLog::open(current_path).ok();
        drop(guard);

        cleanup_old_logs(&self.dir, MAX_LOG_FILES);
    }

    /// The last `lines` lines of today's file.
    pub fn recent_lines(&self, lines: usize) -> ClassMeetResult<String> {
        let path = self.current_path();
        if !path.exists() {
            return Ok(String::new());
        }
        let content = fs::read_to_string(&path).context("Failed to read log file")?;
        let mut recent: Vec<&str> = content.lines().rev().take(lines).collect();
        recent.reverse();
        Ok(recent.join("\n"))
    }
}

/// `io::Write` adapter handed to `env_logger`.
struct LogFileWriter(Arc<LogFile>);

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn open_append(path: &Path) -> ClassMeetResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Path for the current log file (one per day).
fn current_log_path(dir: &Path) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    dir.join(format!("{}_{}.log", LOG_PREFIX, date))
}

/// Keep only the `keep` most recently modified `.log` files in `dir`.
pub fn cleanup_old_logs(dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(keep) {
        let _ = fs::remove_file(file.path());
    }
}

/// Install the global logger. With `log_dir`, output goes to a rotating
/// daily file there; otherwise to stderr.
///
/// Returns the file handle so callers can read recent lines back.
pub fn init_logging(log_dir: Option<&Path>) -> ClassMeetResult<Option<Arc<LogFile>>> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    let log_file = match log_dir {
        Some(dir) => {
            let log_file = Arc::new(LogFile::open(dir)?);
            builder.target(Target::Pipe(Box::new(LogFileWriter(Arc::clone(&log_file)))));
            Some(log_file)
        },
        None => None,
    };

    builder
        .try_init()
        .map_err(|e| ClassMeetError::Other(format!("Logger already initialized: {}", e)))?;

    log::info!("[LOGGING] Logging system initialized");
    if let Some(file) = &log_file {
        log::info!("[LOGGING] Log directory: {}", file.dir().display());
    }
    Ok(log_file)
}

/// Parse a UI log level. Unknown levels map to `Info`.
pub fn parse_level(level: &str) -> log::Level {
    match level.to_lowercase().as_str() {
        "trace" => log::Level::Trace,
        "debug" => log::Level::Debug,
        "warn" | "warning" => log::Level::Warn,
        "error" => log::Level::Error,
        _ => log::Level::Info,
    }
}

/// Forward a log line from the UI layer into the same sink.
pub fn write_client_log(level: &str, source: &str, message: &str) {
    log::log!(target: "client", parse_level(level), "[{}] {}", source, message);
}
