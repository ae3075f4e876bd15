//! Event log: JSON lines from remote nodes, appended to a rotating file.
//!
//! Each record is one line:
//!
//!   {"level":"info","message":"<record>","msg":"","time":"<RFC3339>"}
//!
//! When a write would push the active file past `max_size_mb`, the file is
//! renamed to `<stem>-<UTC timestamp>.<ext>` and a fresh one is opened.
//! After each rotation the backups are gzipped (if `compress`), those older
//! than `max_age_days` are deleted, and only the newest `max_backups` are
//! kept.
//!
//! The log is an explicit object: open it at startup, share it by `Arc`,
//! call `shutdown` on exit.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use dweb_core::config::EventLogConfig;

/// Timestamp embedded in backup file names.
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

struct ActiveFile {
    writer: BufWriter<File>,
    size: u64,
}

impl ActiveFile {
    fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open event log: {}", path.display()))?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            writer: BufWriter::new(file),
            size,
        })
    }
}

/// A rotated file next to the active log.
#[derive(Debug, Clone)]
pub struct Backup {
    pub path: PathBuf,
    pub rotated_at: DateTime<Utc>,
    pub compressed: bool,
}

pub struct EventLog {
    config: EventLogConfig,
    max_bytes: u64,
    active: Mutex<Option<ActiveFile>>,
}

impl EventLog {
    /// Open (or create) the active log file.
    pub fn open(config: EventLogConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log dir: {}", parent.display()))?;
        }
        let active = ActiveFile::open(&config.path)?;
        tracing::info!(path = %config.path.display(), size = active.size, "event log opened");
        Ok(Self {
            max_bytes: config.max_size_mb.saturating_mul(1024 * 1024),
            config,
            active: Mutex::new(Some(active)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Append one record.
    pub fn record(&self, message: &str) -> Result<()> {
        self.record_fields(message, Map::new())
    }

    /// Append one record with extra fields. `level`, `message`, `msg` and
    /// `time` are always set by the log and override same-named fields.
    pub fn record_fields(&self, message: &str, mut fields: Map<String, Value>) -> Result<()> {
        fields.insert("level".into(), Value::from("info"));
        fields.insert("message".into(), Value::from(message));
        fields.insert("msg".into(), Value::from(""));
        fields.insert(
            "time".into(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let mut line = serde_json::to_vec(&fields).context("failed to encode event")?;
        line.push(b'\n');
        self.write_line(&line)
    }

    /// Flush and close. Later records fail.
    pub fn shutdown(&self) -> Result<()> {
        if let Some(mut active) = self.active.lock().take() {
            active.writer.flush().context("failed to flush event log")?;
            active
                .writer
                .get_ref()
                .sync_all()
                .context("failed to sync event log")?;
            tracing::info!(path = %self.config.path.display(), "event log closed");
        }
        Ok(())
    }

    /// Rotated files, newest first.
    pub fn backups(&self) -> Vec<Backup> {
        let (dir, prefix, ext) = self.name_parts();
        let mut backups: Vec<Backup> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    parse_backup_name(&name, &prefix, &ext).map(|(rotated_at, compressed)| {
                        Backup {
                            path: entry.path(),
                            rotated_at,
                            compressed,
                        }
                    })
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        backups.sort_by(|a, b| b.rotated_at.cmp(&a.rotated_at));
        backups
    }

    fn write_line(&self, line: &[u8]) -> Result<()> {
        let len = line.len() as u64;
        let mut guard = self.active.lock();
        let active = guard.as_mut().context("event log is shut down")?;

        if self.max_bytes > 0 {
            if len > self.max_bytes {
                bail!(
                    "event of {} bytes exceeds the maximum log size of {} bytes",
                    len,
                    self.max_bytes
                );
            }
            if active.size + len > self.max_bytes {
                self.rotate(active)?;
            }
        }

        active
            .writer
            .write_all(line)
            .context("failed to write event")?;
        active.writer.flush().context("failed to flush event log")?;
        active.size += len;
        Ok(())
    }

    fn rotate(&self, active: &mut ActiveFile) -> Result<()> {
        active.writer.flush().context("failed to flush event log")?;

        let backup = self.next_backup_path(Utc::now());
        fs::rename(&self.config.path, &backup).with_context(|| {
            format!(
                "failed to rename {} to {}",
                self.config.path.display(),
                backup.display()
            )
        })?;
        *active = ActiveFile::open(&self.config.path)?;
        tracing::debug!(backup = %backup.display(), "event log rotated");

        // Retention failures never block new writes.
        if let Err(e) = self.enforce_retention(Utc::now()) {
            tracing::warn!(error = %e, "event log retention failed");
        }
        Ok(())
    }

    /// Drop backups over the count or age limit, then compress the rest.
    fn enforce_retention(&self, now: DateTime<Utc>) -> io::Result<()> {
        let mut keep = Vec::new();
        for (i, backup) in self.backups().into_iter().enumerate() {
            let too_many = self.config.max_backups > 0 && i >= self.config.max_backups;
            let too_old = self.config.max_age_days > 0
                && now - backup.rotated_at
                    > chrono::Duration::days(i64::from(self.config.max_age_days));
            if too_many || too_old {
                fs::remove_file(&backup.path)?;
                tracing::debug!(backup = %backup.path.display(), "event log backup removed");
            } else {
                keep.push(backup);
            }
        }

        if self.config.compress {
            for backup in keep.iter().filter(|b| !b.compressed) {
                compress_file(&backup.path)?;
            }
        }
        Ok(())
    }

    /// `<stem>-<timestamp><ext>`, always later than the newest backup so
    /// name order stays rotation order.
    fn next_backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let (dir, prefix, ext) = self.name_parts();
        let mut at = match self.backups().first() {
            Some(newest) => now.max(newest.rotated_at + chrono::Duration::milliseconds(1)),
            None => now,
        };
        loop {
            let name = format!("{}{}{}", prefix, at.format(BACKUP_TIME_FORMAT), ext);
            let path = dir.join(&name);
            let gz = dir.join(format!("{name}.gz"));
            if !path.exists() && !gz.exists() {
                return path;
            }
            at += chrono::Duration::milliseconds(1);
        }
    }

    /// (directory, "<stem>-", ".<ext>" or "")
    fn name_parts(&self) -> (PathBuf, String, String) {
        let path = &self.config.path;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "events".to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (dir, format!("{stem}-"), ext)
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "event log shutdown on drop failed");
        }
    }
}

fn parse_backup_name(name: &str, prefix: &str, ext: &str) -> Option<(DateTime<Utc>, bool)> {
    let rest = name.strip_prefix(prefix)?;
    let (rest, compressed) = match rest.strip_suffix(".gz") {
        Some(r) => (r, true),
        None => (rest, false),
    };
    let stamp = rest.strip_suffix(ext)?;
    let naive = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()?;
    Some((naive.and_utc(), compressed))
}

/// Gzip `path` to `path.gz` and remove the original.
fn compress_file(path: &Path) -> io::Result<()> {
    let mut gz_name = path.as_os_str().to_owned();
    gz_name.push(".gz");
    let gz_path = PathBuf::from(gz_name);

    let mut source = File::open(path)?;
    let mut encoder = GzEncoder::new(File::create(&gz_path)?, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.sync_all()?;
    fs::remove_file(path)?;
    tracing::trace!(path = %gz_path.display(), "event log backup compressed");
    Ok(())
}
