use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::mpsc;

use crate::error::LogTailError;

const LOG_WAIT_STEP: Duration = Duration::from_secs(1);

fn is_server_log_file_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".log")
}

/// Newest non-empty `*.log` in `log_dir` by modification time. A missing
/// directory is treated as "no log yet".
pub fn find_latest_log(log_dir: &Path) -> Result<Option<PathBuf>, LogTailError> {
    let directory_entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(error) => {
            if log_dir.exists() {
                return Err(LogTailError::Io {
                    path: log_dir.to_path_buf(),
                    source: error,
                });
            }
            return Ok(None);
        }
    };

    let mut latest_match: Option<(SystemTime, PathBuf)> = None;

    for entry in directory_entries.filter_map(Result::ok) {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_server_log_file_name(file_name) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() || metadata.len() == 0 {
            continue;
        }

        let modified_time = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if latest_match
            .as_ref()
            .map(|(latest_time, _)| modified_time > *latest_time)
            .unwrap_or(true)
        {
            latest_match = Some((modified_time, path));
        }
    }

    Ok(latest_match.map(|(_, path)| path))
}

#[derive(Debug)]
struct TailedFile {
    path: PathBuf,
    offset: u64,
    partial_line: Vec<u8>,
}

impl TailedFile {
    fn at_end(path: PathBuf) -> Result<Self, LogTailError> {
        let offset = std::fs::metadata(&path)
            .map(|metadata| metadata.len())
            .map_err(|error| LogTailError::Io {
                path: path.clone(),
                source: error,
            })?;
        Ok(Self {
            path,
            offset,
            partial_line: Vec::new(),
        })
    }

    /// Complete lines appended since the last read. A trailing fragment
    /// without a newline is held back until the rest of it arrives.
    fn read_new_lines(&mut self) -> Result<Vec<String>, LogTailError> {
        let io_error = |error: std::io::Error| LogTailError::Io {
            path: self.path.clone(),
            source: error,
        };

        let mut file = File::open(&self.path).map_err(io_error)?;
        let file_length = file.metadata().map_err(io_error)?.len();
        if file_length < self.offset {
            tracing::info!(log_path = %self.path.display(), "Server log truncated, reading from start");
            self.offset = 0;
            self.partial_line.clear();
        }
        if file_length == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset)).map_err(io_error)?;
        let mut appended = Vec::new();
        let bytes_read = file.read_to_end(&mut appended).map_err(io_error)?;
        self.offset = self.offset.saturating_add(bytes_read as u64);

        self.partial_line.extend_from_slice(&appended);
        let Some(last_newline) = self.partial_line.iter().rposition(|byte| *byte == b'\n') else {
            return Ok(Vec::new());
        };

        let remainder = self.partial_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial_line, remainder);
        Ok(String::from_utf8_lossy(&complete)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

struct DirectoryWatch {
    _watcher: RecommendedWatcher,
    notifications: mpsc::UnboundedReceiver<Result<Event, notify::Error>>,
}

fn start_directory_watch(log_dir: &Path) -> Result<DirectoryWatch, LogTailError> {
    let (notify_sender, notifications) = mpsc::unbounded_channel::<Result<Event, notify::Error>>();

    let mut watcher = notify::recommended_watcher(move |result| {
        if notify_sender.send(result).is_err() {
            tracing::debug!("Server log watcher notification receiver dropped");
        }
    })?;
    watcher.watch(log_dir, RecursiveMode::NonRecursive)?;

    Ok(DirectoryWatch {
        _watcher: watcher,
        notifications,
    })
}

/// Follows the newest server log in a directory, switching to newer files as
/// they appear. Reads are woken by filesystem notifications, with the poll
/// interval as an upper bound on each wait.
pub struct LogTail {
    log_dir: PathBuf,
    poll_interval: Duration,
    current: Option<TailedFile>,
    pending: VecDeque<String>,
    watch: Option<DirectoryWatch>,
}

impl LogTail {
    pub fn new(log_dir: PathBuf, poll_interval: Duration) -> Self {
        Self {
            log_dir,
            poll_interval,
            current: None,
            pending: VecDeque::new(),
            watch: None,
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|file| file.path.as_path())
    }

    /// Waits up to `max_wait` for a log to appear and attaches to its end.
    pub async fn wait_for_log(&mut self, max_wait: Duration) -> Result<PathBuf, LogTailError> {
        let started_at = Instant::now();
        let mut announced = false;

        loop {
            if let Some(log_path) = find_latest_log(&self.log_dir)? {
                self.attach(log_path.clone())?;
                self.ensure_watch();
                return Ok(log_path);
            }

            if started_at.elapsed() >= max_wait {
                return Err(LogTailError::NoLogFile {
                    directory: self.log_dir.clone(),
                    waited_seconds: max_wait.as_secs(),
                });
            }

            if !announced {
                tracing::info!(log_dir = %self.log_dir.display(), "Waiting for server log");
                announced = true;
            }
            tokio::time::sleep(LOG_WAIT_STEP).await;
        }
    }

    /// Next complete line, or `None` when nothing new arrived within one
    /// poll interval.
    pub async fn next_line(&mut self) -> Result<Option<String>, LogTailError> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        self.refresh()?;
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }

        self.wait_for_change().await;
        self.refresh()?;
        Ok(self.pending.pop_front())
    }

    fn attach(&mut self, log_path: PathBuf) -> Result<(), LogTailError> {
        tracing::info!(log_path = %log_path.display(), "Following server log");
        self.current = Some(TailedFile::at_end(log_path)?);
        self.pending.clear();
        Ok(())
    }

    fn ensure_watch(&mut self) {
        if self.watch.is_some() {
            return;
        }
        match start_directory_watch(&self.log_dir) {
            Ok(watch) => self.watch = Some(watch),
            Err(error) => {
                tracing::warn!(error = %error, "Falling back to polling the server log");
            }
        }
    }

    fn refresh(&mut self) -> Result<(), LogTailError> {
        if let Some(latest_path) = find_latest_log(&self.log_dir)? {
            if self.current_path() != Some(latest_path.as_path()) {
                self.attach(latest_path)?;
            }
        }

        if let Some(file) = self.current.as_mut() {
            let lines = file.read_new_lines()?;
            self.pending.extend(lines);
        }
        Ok(())
    }

    async fn wait_for_change(&mut self) {
        let Some(watch) = self.watch.as_mut() else {
            tokio::time::sleep(self.poll_interval).await;
            return;
        };

        match tokio::time::timeout(self.poll_interval, watch.notifications.recv()).await {
            Ok(Some(Ok(event))) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    tracing::trace!(?event.kind, "Ignoring log directory event");
                }
            }
            Ok(Some(Err(error))) => {
                tracing::warn!(error = %error, "Server log watcher error");
            }
            Ok(None) => {
                tracing::warn!("Server log watcher stopped, polling instead");
                self.watch = None;
            }
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{find_latest_log, LogTail, TailedFile};
    use crate::error::LogTailError;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .expect("Failed to open log fixture");
        file.write_all(text.as_bytes())
            .expect("Failed to write log fixture");
    }

    fn set_modified(path: &Path, seconds_after_epoch: u64) {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .expect("Failed to open log fixture");
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds_after_epoch))
            .expect("Failed to set modified time");
    }

    #[test]
    fn picks_newest_non_empty_log() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let older = temp_directory.path().join("l0103000.log");
        let newer = temp_directory.path().join("l0103001.log");
        let empty = temp_directory.path().join("l0103002.log");
        append(&older, "old\n");
        append(&newer, "new\n");
        append(&empty, "");
        append(&temp_directory.path().join("notes.txt"), "ignored\n");
        set_modified(&older, 1_000);
        set_modified(&newer, 2_000);
        set_modified(&empty, 3_000);

        let latest = find_latest_log(temp_directory.path()).expect("Expected directory scan");
        assert_eq!(latest.as_deref(), Some(newer.as_path()));

        let missing = temp_directory.path().join("absent");
        assert!(find_latest_log(&missing).expect("Expected Ok").is_none());
    }

    #[test]
    fn yields_only_complete_lines_appended_after_attach() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let log_path = temp_directory.path().join("server.log");
        append(&log_path, "history that is skipped\n");

        let mut tailed = TailedFile::at_end(log_path.clone()).expect("Expected attach");
        append(&log_path, "first line\r\nsecond ");
        assert_eq!(
            tailed.read_new_lines().expect("Expected read"),
            vec!["first line".to_string()]
        );

        append(&log_path, "half\n\n");
        assert_eq!(
            tailed.read_new_lines().expect("Expected read"),
            vec!["second half".to_string()]
        );
    }

    #[test]
    fn truncated_log_is_read_from_the_start() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let log_path = temp_directory.path().join("server.log");
        append(&log_path, "a fairly long line of old content\n");

        let mut tailed = TailedFile::at_end(log_path.clone()).expect("Expected attach");
        std::fs::write(&log_path, "fresh\n").expect("Failed to truncate fixture");

        assert_eq!(
            tailed.read_new_lines().expect("Expected read"),
            vec!["fresh".to_string()]
        );
    }

    #[tokio::test]
    async fn next_line_returns_new_lines_then_none() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let log_path = temp_directory.path().join("server.log");
        append(&log_path, "boot\n");

        let mut tail = LogTail::new(temp_directory.path().to_path_buf(), Duration::from_millis(10));
        tail.wait_for_log(Duration::from_secs(1))
            .await
            .expect("Expected log to be found");

        append(&log_path, "L 01/03/2026 - 18:00:00: Loading map \"de_dust2\"\n");
        let line = tail.next_line().await.expect("Expected read");
        assert_eq!(
            line.as_deref(),
            Some("L 01/03/2026 - 18:00:00: Loading map \"de_dust2\"")
        );
        assert_eq!(tail.next_line().await.expect("Expected read"), None);
    }

    #[tokio::test]
    async fn missing_log_fails_after_wait_window() {
        let temp_directory = tempfile::tempdir().expect("Failed to create temp dir");
        let mut tail = LogTail::new(temp_directory.path().to_path_buf(), Duration::from_millis(10));

        let error = tail
            .wait_for_log(Duration::ZERO)
            .await
            .expect_err("Expected missing log error");
        assert!(matches!(error, LogTailError::NoLogFile { .. }));
    }
}
