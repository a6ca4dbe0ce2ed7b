use crate::kernel::event::Event;
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// `events-2024-01-31.jsonl`
pub fn log_file_name(day: NaiveDate) -> String {
    format!("events-{}.jsonl", day.format("%Y-%m-%d"))
}

/// Appends events as JSON lines to one file per UTC day.
///
/// Invariant: a record is always written to the file of its own timestamp's
/// day, so no record crosses files.
#[derive(Debug)]
pub struct DailyLogWriter {
    dir: PathBuf,
    day: Option<NaiveDate>,
    file: Option<BufWriter<File>>,
}

impl DailyLogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            day: None,
            file: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(log_file_name(day))
    }

    pub async fn write(&mut self, event: &Event) -> io::Result<()> {
        let day = event.time().date_naive();
        if self.day != Some(day) || self.file.is_none() {
            self.rotate(day).await?;
        }

        let mut line = serde_json::to_vec(event).map_err(io::Error::other)?;
        line.push(b'\n');

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file not open"))?;
        file.write_all(&line).await?;
        // Each record reaches the OS before the next is taken off the queue.
        file.flush().await
    }

    async fn rotate(&mut self, day: NaiveDate) -> io::Result<()> {
        self.close().await?;

        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(day);
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        tracing::debug!("event log opened: {}", path.display());

        self.file = Some(BufWriter::new(file));
        self.day = Some(day);
        Ok(())
    }

    /// Flush and close the open file, if any.
    pub async fn close(&mut self) -> io::Result<()> {
        self.day = None;
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.get_mut().sync_all().await?;
        }
        Ok(())
    }
}
